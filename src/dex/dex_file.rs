/* Dex file format structures */

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use bitflags::bitflags;
use log::{error, info, warn};

use crate::dex::error::{DexError, Fault};
use crate::dex::{read_mutf8, read_u2, read_u4, read_uleb128, read_x};
use crate::pseudocode;
use crate::types::{Decompilation, FaultCounts};

/* Constants */
pub const DEX_MAGIC_PREFIX: [u8; 4] = [0x64, 0x65, 0x78, 0x0a]; // "dex\n"
pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const REVERSE_ENDIAN_CONSTANT: u32 = 0x78563412;
pub const NO_INDEX: usize = 0xffffffff;
pub const HEADER_SIZE: u32 = 0x70;

// Guard against nonsense uleb counts from a corrupt class_data_item
const MAX_PLAUSIBLE_COUNT: u32 = 1_000_000;

bitflags! {
    /// Class / field / method access masks as stored in the DEX.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

type StringId = usize;
type TypeId = usize;
type ProtoId = usize;
type MethodId = usize;

#[derive(Debug, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl Header {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<Header, DexError> {
        let magic = <[u8; 8]>::try_from(read_x(bytes, ix, 8)?.as_slice()).unwrap();
        if !magic_supported(&magic) {
            return Err(DexError::BadMagic { found: magic });
        }
        if bytes.len() < HEADER_SIZE as usize {
            return Err(DexError::truncated("header", bytes.len()));
        }

        let header = Header {
            magic,
            checksum: read_u4(bytes, ix)?,
            signature: <[u8; 20]>::try_from(read_x(bytes, ix, 20)?.as_slice()).unwrap(),
            file_size: read_u4(bytes, ix)?,
            header_size: read_u4(bytes, ix)?,
            endian_tag: read_u4(bytes, ix)?,
            link_size: read_u4(bytes, ix)?,
            link_off: read_u4(bytes, ix)?,
            map_off: read_u4(bytes, ix)?,
            string_ids_size: read_u4(bytes, ix)?,
            string_ids_off: read_u4(bytes, ix)?,
            type_ids_size: read_u4(bytes, ix)?,
            type_ids_off: read_u4(bytes, ix)?,
            proto_ids_size: read_u4(bytes, ix)?,
            proto_ids_off: read_u4(bytes, ix)?,
            field_ids_size: read_u4(bytes, ix)?,
            field_ids_off: read_u4(bytes, ix)?,
            method_ids_size: read_u4(bytes, ix)?,
            method_ids_off: read_u4(bytes, ix)?,
            class_defs_size: read_u4(bytes, ix)?,
            class_defs_off: read_u4(bytes, ix)?,
            data_size: read_u4(bytes, ix)?,
            data_off: read_u4(bytes, ix)?,
        };

        // Structural sanity: the checksum and signature values themselves are
        // opaque to us, but the size fields have to agree with the buffer.
        if header.file_size as usize != bytes.len() {
            return Err(DexError::ChecksumMismatch {
                detail: format!(
                    "file_size {} does not match buffer length {}",
                    header.file_size,
                    bytes.len()
                ),
            });
        }
        if header.header_size != HEADER_SIZE {
            return Err(DexError::ChecksumMismatch {
                detail: format!("header_size 0x{:x}, expected 0x70", header.header_size),
            });
        }
        if header.endian_tag != ENDIAN_CONSTANT {
            let detail = if header.endian_tag == REVERSE_ENDIAN_CONSTANT {
                "reverse-endian files are not supported".to_string()
            } else {
                format!("unrecognized endian_tag 0x{:08x}", header.endian_tag)
            };
            return Err(DexError::ChecksumMismatch { detail });
        }

        Ok(header)
    }
}

fn magic_supported(magic: &[u8; 8]) -> bool {
    if magic[0..4] != DEX_MAGIC_PREFIX || magic[7] != 0 {
        return false;
    }
    let version = magic[4..7]
        .iter()
        .copied()
        .try_fold(0u32, |acc, b| b.is_ascii_digit().then(|| acc * 10 + (b - b'0') as u32));
    matches!(version, Some(35..=41))
}

#[derive(Debug)]
pub struct TypeList(pub Vec<TypeId>);

impl TypeList {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<TypeList, DexError> {
        let mut v = vec![];
        let size = read_u4(bytes, ix)?;
        for _ in 0..size {
            v.push(read_u2(bytes, ix)? as TypeId);
        }
        Ok(TypeList(v))
    }
}

/// The proto_id_item, with the signature pre-rendered in JNI style.
#[derive(Debug)]
pub struct ProtoEntry {
    pub shorty_idx: StringId,
    pub return_type_idx: TypeId,
    pub parameters: Vec<TypeId>,
    /// `(<param descriptors>)<return descriptor>`
    pub signature: String,
}

/// The field_id_item, components resolved to display text.
#[derive(Debug)]
pub struct FieldEntry {
    pub owner: String,
    pub name: String,
    pub type_desc: String,
}

/// The method_id_item, components resolved to display text.
#[derive(Debug)]
pub struct MethodEntry {
    pub owner: String,
    pub name: String,
    pub signature: String,
}

impl MethodEntry {
    /// `owner.name(params)return` display form.
    pub fn display(&self) -> String {
        format!("{}.{}{}", self.owner, self.name, self.signature)
    }
}

/// Method body: register shape plus the raw instruction stream.
#[derive(Debug)]
pub struct CodeItem {
    pub registers_size: u16,
    pub args_in_size: u16,
    pub args_out_size: u16,
    pub instructions: Vec<u16>,
}

impl CodeItem {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<CodeItem, DexError> {
        let registers_size = read_u2(bytes, ix)?;
        let args_in_size = read_u2(bytes, ix)?;
        let args_out_size = read_u2(bytes, ix)?;
        let _tries_size = read_u2(bytes, ix)?;
        let _debug_info_off = read_u4(bytes, ix)?;

        let instructions_size = read_u4(bytes, ix)?;
        let mut instructions = Vec::with_capacity(instructions_size as usize);
        for _ in 0..instructions_size {
            instructions.push(read_u2(bytes, ix)?);
        }

        // try/handler data follows the instructions; nothing downstream
        // reads it, and code items are located by absolute offset anyway.

        Ok(CodeItem { registers_size, args_in_size, args_out_size, instructions })
    }
}

#[derive(Debug)]
pub struct EncodedMethod {
    pub method_idx: MethodId,
    pub access_flags: AccessFlags,
    pub code: Option<CodeItem>,
}

#[derive(Debug)]
pub struct ClassDataItem {
    pub direct_methods: Vec<EncodedMethod>,
    pub virtual_methods: Vec<EncodedMethod>,
}

impl ClassDataItem {
    pub fn read(bytes: &[u8], ix: &mut usize, faults: &mut FaultCounts) -> Result<ClassDataItem, DexError> {
        let static_field_size = read_uleb128(bytes, ix)?;
        let instance_field_size = read_uleb128(bytes, ix)?;
        let direct_method_size = read_uleb128(bytes, ix)?;
        let virtual_method_size = read_uleb128(bytes, ix)?;

        for size in [static_field_size, instance_field_size, direct_method_size, virtual_method_size] {
            if size > MAX_PLAUSIBLE_COUNT {
                return Err(DexError::truncated("class_data_item counts", *ix));
            }
        }

        // Fields carry no code; walk past them.
        for _ in 0..static_field_size + instance_field_size {
            let _field_idx_diff = read_uleb128(bytes, ix)?;
            let _access_flags = read_uleb128(bytes, ix)?;
        }

        let mut direct_methods = vec![];
        let mut virtual_methods = vec![];

        let mut offset = 0;
        for _ in 0..direct_method_size {
            offset += read_uleb128(bytes, ix)? as usize;
            direct_methods.push(Self::read_method(bytes, ix, offset, faults)?);
        }

        offset = 0;
        for _ in 0..virtual_method_size {
            offset += read_uleb128(bytes, ix)? as usize;
            virtual_methods.push(Self::read_method(bytes, ix, offset, faults)?);
        }

        Ok(ClassDataItem { direct_methods, virtual_methods })
    }

    fn read_method(
        bytes: &[u8],
        ix: &mut usize,
        method_idx: MethodId,
        faults: &mut FaultCounts,
    ) -> Result<EncodedMethod, DexError> {
        let access_flags = AccessFlags::from_bits_retain(read_uleb128(bytes, ix)?);
        let mut code_offset = read_uleb128(bytes, ix)? as usize;
        let code = if code_offset > 0 {
            match CodeItem::read(bytes, &mut code_offset) {
                Ok(ci) => Some(ci),
                Err(e) => {
                    // A code item cut off by the buffer end loses only this
                    // method; the rest of the class still decodes.
                    warn!("skipping code for method {}: {}", method_idx, e);
                    faults.record(Fault::TruncatedStream);
                    None
                }
            }
        } else {
            None
        };
        Ok(EncodedMethod { method_idx, access_flags, code })
    }
}

#[derive(Debug)]
pub struct ClassDefItem {
    pub class_idx: TypeId,
    pub access_flags: AccessFlags,
    pub superclass_idx: TypeId,
    pub interfaces: Vec<TypeId>,
    pub source_file_idx: StringId,
    pub class_data: Option<ClassDataItem>,
}

impl ClassDefItem {
    pub fn read(bytes: &[u8], ix: &mut usize, faults: &mut FaultCounts) -> Result<ClassDefItem, DexError> {
        let class_idx = read_u4(bytes, ix)? as TypeId;
        let access_flags = AccessFlags::from_bits_retain(read_u4(bytes, ix)?);
        let superclass_idx = read_u4(bytes, ix)? as TypeId;
        let mut interface_offset = read_u4(bytes, ix)? as usize;
        let interfaces = if interface_offset > 0 {
            TypeList::read(bytes, &mut interface_offset)?.0
        } else {
            vec![]
        };
        let source_file_idx = read_u4(bytes, ix)? as StringId;
        let _annotations_off = read_u4(bytes, ix)?;
        let mut class_data_offset = read_u4(bytes, ix)? as usize;
        let class_data = if class_data_offset > 0 {
            match ClassDataItem::read(bytes, &mut class_data_offset, faults) {
                Ok(cd) => Some(cd),
                Err(e) => {
                    error!("error reading class_data_item: {}", e);
                    faults.record(Fault::TruncatedStream);
                    None
                }
            }
        } else {
            None
        };
        let _static_values_off = read_u4(bytes, ix)?;

        Ok(ClassDefItem {
            class_idx,
            access_flags,
            superclass_idx,
            interfaces,
            source_file_idx,
            class_data,
        })
    }
}

/// One parsed DEX file. All tables are resolved while the file is read and
/// are immutable afterwards, so a `DexFile` can be shared read-only across
/// threads decoding different classes.
#[derive(Debug)]
pub struct DexFile {
    pub header: Header,
    pub strings: Vec<String>,
    /// Type descriptors, resolved through the string table.
    pub types: Vec<String>,
    pub protos: Vec<ProtoEntry>,
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<MethodEntry>,
    pub class_defs: Vec<ClassDefItem>,
    /// Faults recorded while decoding the tables themselves.
    pub table_faults: FaultCounts,
}

impl DexFile {
    fn read(bytes: &[u8], ix: &mut usize) -> Result<DexFile, DexError> {
        let header = Header::read(bytes, ix)?;
        let mut faults = FaultCounts::default();

        // Read the strings
        let mut strings = Vec::with_capacity(header.string_ids_size as usize);
        *ix = header.string_ids_off as usize;
        for _ in 0..header.string_ids_size {
            let mut string_off = read_u4(bytes, ix)? as usize;
            let (text, faulty) = read_mutf8(bytes, &mut string_off)?;
            if faulty {
                faults.record(Fault::StringDecodeError);
            }
            strings.push(text);
        }

        // Read the type_ids, resolving each descriptor through the strings
        let mut types = Vec::with_capacity(header.type_ids_size as usize);
        *ix = header.type_ids_off as usize;
        for _ in 0..header.type_ids_size {
            let string_idx = read_u4(bytes, ix)? as usize;
            types.push(resolve(&strings, string_idx, "string", &mut faults));
        }

        // Read the prototypes
        let mut protos = Vec::with_capacity(header.proto_ids_size as usize);
        *ix = header.proto_ids_off as usize;
        for _ in 0..header.proto_ids_size {
            let shorty_idx = read_u4(bytes, ix)? as StringId;
            let return_type_idx = read_u4(bytes, ix)? as TypeId;
            let mut parameter_offset = read_u4(bytes, ix)? as usize;
            let parameters = if parameter_offset == 0 {
                vec![]
            } else {
                TypeList::read(bytes, &mut parameter_offset)?.0
            };

            let mut signature = String::from("(");
            for &t in &parameters {
                signature.push_str(&resolve(&types, t, "type", &mut faults));
            }
            signature.push(')');
            signature.push_str(&resolve(&types, return_type_idx, "type", &mut faults));

            protos.push(ProtoEntry { shorty_idx, return_type_idx, parameters, signature });
        }

        // Read the field_ids
        let mut fields = Vec::with_capacity(header.field_ids_size as usize);
        *ix = header.field_ids_off as usize;
        for _ in 0..header.field_ids_size {
            let class_idx = read_u2(bytes, ix)? as TypeId;
            let type_idx = read_u2(bytes, ix)? as TypeId;
            let name_idx = read_u4(bytes, ix)? as StringId;
            fields.push(FieldEntry {
                owner: resolve(&types, class_idx, "type", &mut faults),
                name: resolve(&strings, name_idx, "string", &mut faults),
                type_desc: resolve(&types, type_idx, "type", &mut faults),
            });
        }

        // Read the method_ids
        let mut methods = Vec::with_capacity(header.method_ids_size as usize);
        *ix = header.method_ids_off as usize;
        for _ in 0..header.method_ids_size {
            let class_idx = read_u2(bytes, ix)? as TypeId;
            let proto_idx = read_u2(bytes, ix)? as ProtoId;
            let name_idx = read_u4(bytes, ix)? as StringId;
            let signature = match protos.get(proto_idx) {
                Some(p) => p.signature.clone(),
                None => {
                    warn!("method proto index {} out of range ({} protos)", proto_idx, protos.len());
                    faults.record(Fault::IndexOutOfRange);
                    format!("proto@{}", proto_idx)
                }
            };
            methods.push(MethodEntry {
                owner: resolve(&types, class_idx, "type", &mut faults),
                name: resolve(&strings, name_idx, "string", &mut faults),
                signature,
            });
        }

        // Read the class_defs
        let mut class_defs = Vec::with_capacity(header.class_defs_size as usize);
        *ix = header.class_defs_off as usize;
        for _ in 0..header.class_defs_size {
            class_defs.push(ClassDefItem::read(bytes, ix, &mut faults)?);
        }

        info!(
            "parsed DEX: {} strings, {} types, {} protos, {} fields, {} methods, {} classes",
            strings.len(),
            types.len(),
            protos.len(),
            fields.len(),
            methods.len(),
            class_defs.len()
        );

        Ok(DexFile { header, strings, types, protos, fields, methods, class_defs, table_faults: faults })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<DexFile, DexError> {
        let mut ix = 0;
        DexFile::read(bytes, &mut ix)
    }

    pub fn from_file(path: &Path) -> Result<DexFile, DexError> {
        let bytes = fs::read(path).map_err(|e| DexError::Io(e.to_string()))?;
        DexFile::from_bytes(&bytes)
    }

    /// Type descriptor for a type table index, if in range.
    pub fn type_desc(&self, idx: usize) -> Option<&str> {
        self.types.get(idx).map(String::as_str)
    }

    /// Synthesizes pseudo-code for every class, or only the classes whose
    /// descriptor appears in `filter`.
    pub fn to_pseudocode(&self, filter: Option<&HashSet<String>>) -> Decompilation {
        pseudocode::synthesize(self, filter)
    }
}

/// Resolves an index into a display-text table, degrading an out-of-range
/// index to an explicit `<table>@<idx>` marker.
fn resolve(table: &[String], idx: usize, table_name: &'static str, faults: &mut FaultCounts) -> String {
    match table.get(idx) {
        Some(s) => s.clone(),
        None => {
            warn!("{} index {} out of range ({} entries)", table_name, idx, table.len());
            faults.record(Fault::IndexOutOfRange);
            format!("{}@{}", table_name, idx)
        }
    }
}
