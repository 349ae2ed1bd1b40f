pub mod error;

pub(crate) mod dex_file;
pub(crate) mod instructions;
pub(crate) mod leb;
pub(crate) mod opcodes;

pub use dex_file::{
    AccessFlags, ClassDataItem, ClassDefItem, CodeItem, DexFile, EncodedMethod, FieldEntry,
    Header, MethodEntry, ProtoEntry, TypeList, NO_INDEX,
};
pub use error::{DexError, Fault};
pub use instructions::{
    decode_method, DecodedUnit, Format, Instruction, MethodDecode, Operands, PayloadKind,
};

use crate::dex::leb::{decode_sleb128, decode_uleb128, incomplete};

// Basic positional reads over a byte buffer. All of them fail with
// DexError::Truncated rather than reading past the end.
pub fn read_u1(bytes: &[u8], ix: &mut usize) -> Result<u8, DexError> {
    if bytes.len() < *ix + 1 {
        return Err(DexError::truncated("u1", *ix));
    }
    let result = bytes[*ix];
    *ix += 1;
    Ok(result)
}

pub fn read_u2(bytes: &[u8], ix: &mut usize) -> Result<u16, DexError> {
    if bytes.len() < *ix + 2 {
        return Err(DexError::truncated("u2", *ix));
    }
    let result = ((bytes[*ix + 1] as u16) << 8) | (bytes[*ix] as u16);
    *ix += 2;
    Ok(result)
}

pub fn read_u4(bytes: &[u8], ix: &mut usize) -> Result<u32, DexError> {
    if bytes.len() < *ix + 4 {
        return Err(DexError::truncated("u4", *ix));
    }
    let result = ((bytes[*ix + 3] as u32) << 24)
        | ((bytes[*ix + 2] as u32) << 16)
        | ((bytes[*ix + 1] as u32) << 8)
        | (bytes[*ix] as u32);
    *ix += 4;
    Ok(result)
}

pub fn read_u8(bytes: &[u8], ix: &mut usize) -> Result<u64, DexError> {
    if bytes.len() < *ix + 8 {
        return Err(DexError::truncated("u8", *ix));
    }
    let mut result: u64 = 0;
    for i in 0..8 {
        result |= (bytes[*ix + i] as u64) << (i * 8);
    }
    *ix += 8;
    Ok(result)
}

pub fn read_x(bytes: &[u8], ix: &mut usize, length: usize) -> Result<Vec<u8>, DexError> {
    if bytes.len() - *ix >= length {
        let mut v = Vec::with_capacity(length);
        v.extend_from_slice(&bytes[*ix..*ix + length]);
        *ix += length;
        Ok(v)
    } else {
        Err(DexError::truncated("byte span", *ix))
    }
}

pub fn read_uleb128(bytes: &[u8], ix: &mut usize) -> Result<u32, DexError> {
    if *ix >= bytes.len() {
        return Err(DexError::truncated("uleb128", *ix));
    }
    let (val, size) = decode_uleb128(&bytes[*ix..]);
    if incomplete(&bytes[*ix..], size) {
        return Err(DexError::truncated("uleb128", *ix));
    }
    *ix += size;
    Ok(val)
}

pub fn read_sleb128(bytes: &[u8], ix: &mut usize) -> Result<i32, DexError> {
    if *ix >= bytes.len() {
        return Err(DexError::truncated("sleb128", *ix));
    }
    let (val, size) = decode_sleb128(&bytes[*ix..]);
    if incomplete(&bytes[*ix..], size) {
        return Err(DexError::truncated("sleb128", *ix));
    }
    *ix += size;
    Ok(val)
}

/// Reads one `string_data_item`: a uleb128 UTF-16 length followed by MUTF-8
/// bytes up to a NUL terminator. Returns the decoded text and whether any
/// malformed sequence had to be replaced with U+FFFD. Malformed bytes never
/// abort the read: decoding resumes at the next byte.
pub fn read_mutf8(bytes: &[u8], ix: &mut usize) -> Result<(String, bool), DexError> {
    let utf16_len = read_uleb128(bytes, ix)? as usize;

    let start = *ix;
    loop {
        let u = read_u1(bytes, ix)?;
        if u == 0 {
            break;
        }
    }
    let body = &bytes[start..*ix - 1];

    // Fast path: cesu8 handles well-formed MUTF-8 (Java CESU-8) in one go.
    if let Ok(s) = cesu8::from_java_cesu8(body) {
        return Ok((s.into_owned(), false));
    }

    Ok((mutf8_with_replacement(body, utf16_len), true))
}

/// Byte-by-byte fallback: decode each MUTF-8 sequence into a UTF-16 unit,
/// substituting U+FFFD for a malformed sequence and resuming at the byte
/// after its lead byte. Unpaired surrogates are handled by the final
/// `from_utf16_lossy`.
fn mutf8_with_replacement(body: &[u8], utf16_len: usize) -> String {
    const REPLACEMENT: u16 = 0xFFFD;
    let mut units: Vec<u16> = Vec::with_capacity(utf16_len);
    let mut i = 0;

    while i < body.len() {
        let b = body[i];
        match b {
            0x01..=0x7f => {
                units.push(b as u16);
                i += 1;
            }
            0xc0..=0xdf => {
                if i + 1 < body.len() && body[i + 1] & 0xc0 == 0x80 {
                    units.push((((b & 0x1f) as u16) << 6) | (body[i + 1] & 0x3f) as u16);
                    i += 2;
                } else {
                    units.push(REPLACEMENT);
                    i += 1;
                }
            }
            0xe0..=0xef => {
                if i + 2 < body.len()
                    && body[i + 1] & 0xc0 == 0x80
                    && body[i + 2] & 0xc0 == 0x80
                {
                    units.push(
                        (((b & 0x0f) as u16) << 12)
                            | (((body[i + 1] & 0x3f) as u16) << 6)
                            | (body[i + 2] & 0x3f) as u16,
                    );
                    i += 3;
                } else {
                    units.push(REPLACEMENT);
                    i += 1;
                }
            }
            // 0x00 (must be encoded as c0 80), stray continuation bytes and
            // 4-byte UTF-8 lead bytes are all invalid in MUTF-8.
            _ => {
                units.push(REPLACEMENT);
                i += 1;
            }
        }
    }

    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_reads_are_little_endian() {
        let bytes = [0x78, 0x56, 0x34, 0x12, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut ix = 0;
        assert_eq!(read_u4(&bytes, &mut ix).unwrap(), 0x12345678);
        assert_eq!(read_u8(&bytes, &mut ix).unwrap(), 0xff);
        assert_eq!(ix, 12);
    }

    #[test]
    fn reads_past_the_end_fail() {
        let bytes = [0x01];
        let mut ix = 0;
        assert_eq!(read_u1(&bytes, &mut ix).unwrap(), 1);
        assert!(matches!(read_u1(&bytes, &mut ix), Err(DexError::Truncated { .. })));
        assert!(matches!(read_u2(&bytes, &mut 0), Err(DexError::Truncated { .. })));
        assert!(matches!(read_uleb128(&[0x80], &mut 0), Err(DexError::Truncated { .. })));
    }

    #[test]
    fn mutf8_plain_ascii() {
        // "abc": uleb len 3, bytes, NUL
        let bytes = [0x03, b'a', b'b', b'c', 0x00];
        let mut ix = 0;
        let (s, faulty) = read_mutf8(&bytes, &mut ix).unwrap();
        assert_eq!(s, "abc");
        assert!(!faulty);
        assert_eq!(ix, bytes.len());
    }

    #[test]
    fn mutf8_encoded_nul_character() {
        // U+0000 is encoded as c0 80 in MUTF-8
        let bytes = [0x03, b'a', 0xc0, 0x80, b'b', 0x00];
        let mut ix = 0;
        let (s, faulty) = read_mutf8(&bytes, &mut ix).unwrap();
        assert_eq!(s, "a\u{0}b");
        assert!(!faulty);
    }

    #[test]
    fn mutf8_bad_sequence_is_replaced_and_decoding_continues() {
        // 0xff is never a valid MUTF-8 lead byte
        let bytes = [0x05, b'a', 0xff, b'b', b'c', 0x00];
        let mut ix = 0;
        let (s, faulty) = read_mutf8(&bytes, &mut ix).unwrap();
        assert_eq!(s, "a\u{fffd}bc");
        assert!(faulty);
    }

    #[test]
    fn mutf8_truncated_multibyte_lead_is_replaced() {
        // e4 b8 would need one more continuation byte; the b8 alone is a
        // stray continuation and is replaced as well
        let bytes = [0x04, 0xe4, 0xb8, b'x', 0x00];
        let mut ix = 0;
        let (s, faulty) = read_mutf8(&bytes, &mut ix).unwrap();
        assert_eq!(s, "\u{fffd}\u{fffd}x");
        assert!(faulty);
    }

    #[test]
    fn mutf8_missing_terminator_is_truncated() {
        let bytes = [0x02, b'a', b'b'];
        let mut ix = 0;
        assert!(matches!(read_mutf8(&bytes, &mut ix), Err(DexError::Truncated { .. })));
    }
}
