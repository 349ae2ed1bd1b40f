use log::warn;

use crate::dex::opcodes;

/// Operand layout shapes of the Dalvik instruction set. The name encodes
/// code-unit count / register count / extra-field kind, matching the format
/// ids of the DEX documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Format10t,
    Format10x,
    Format11n,
    Format11x,
    Format12x,
    Format20t,
    Format21c,
    Format21ih,
    Format21lh,
    Format21s,
    Format21t,
    Format22b,
    Format22c,
    Format22s,
    Format22t,
    Format22x,
    Format23x,
    Format30t,
    Format31c,
    Format31i,
    Format31t,
    Format32x,
    Format35c,
    Format3rc,
    Format45cc,
    Format4rcc,
    Format51l,
}

impl Format {
    /// Instruction size in 16-bit code units.
    pub const fn size(&self) -> usize {
        match self {
            Format::Format10t
            | Format::Format10x
            | Format::Format11n
            | Format::Format11x
            | Format::Format12x => 1,

            Format::Format20t
            | Format::Format21c
            | Format::Format21ih
            | Format::Format21lh
            | Format::Format21s
            | Format::Format21t
            | Format::Format22b
            | Format::Format22c
            | Format::Format22s
            | Format::Format22t
            | Format::Format22x
            | Format::Format23x => 2,

            Format::Format30t
            | Format::Format31c
            | Format::Format31i
            | Format::Format31t
            | Format::Format32x
            | Format::Format35c
            | Format::Format3rc => 3,

            Format::Format45cc | Format::Format4rcc => 4,

            Format::Format51l => 5,
        }
    }
}

/// Decoded operand fields of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operands {
    None,
    Reg { a: u16 },
    RegPair { a: u16, b: u16 },
    RegTriple { a: u16, b: u16, c: u16 },
    RegLit { a: u16, lit: i64 },
    RegRegLit { a: u16, b: u16, lit: i32 },
    RegRef { a: u16, idx: u32 },
    RegRegRef { a: u16, b: u16, idx: u32 },
    Branch { offset: i32 },
    RegBranch { a: u16, offset: i32 },
    RegRegBranch { a: u16, b: u16, offset: i32 },
    RegList { regs: Vec<u16>, idx: u32 },
    RegRange { first: u16, count: u16, idx: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub format: Format,
    /// Offset of the instruction within the method, in code units.
    pub addr: usize,
    /// Consumed length in code units.
    pub size: usize,
    pub operands: Operands,
}

/// The three payload pseudo-instructions, recognized by opcode 0x00 with a
/// reserved ident byte (0x01, 0x02, 0x03).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    PackedSwitch,
    SparseSwitch,
    ArrayData,
}

impl PayloadKind {
    pub fn describe(&self) -> &'static str {
        match self {
            PayloadKind::PackedSwitch => "packed-switch table",
            PayloadKind::SparseSwitch => "sparse-switch table",
            PayloadKind::ArrayData => "array data",
        }
    }
}

/// Decode result for one position in the stream: either a fully decoded
/// instruction, or one of the tagged fallbacks the synthesizer renders as a
/// placeholder line. This is the only shape the synthesizer consumes, so
/// every fault path renders the same way every time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedUnit {
    Op(Instruction),
    Payload { kind: PayloadKind, addr: usize, units: usize },
    Unsupported { opcode: u8, addr: usize },
}

impl DecodedUnit {
    /// Consumed length in code units.
    pub fn size(&self) -> usize {
        match self {
            DecodedUnit::Op(i) => i.size,
            DecodedUnit::Payload { units, .. } => *units,
            DecodedUnit::Unsupported { .. } => 1,
        }
    }
}

/// Decoded instruction stream of one method. `truncated` is set when the
/// declared stream length did not line up with what the opcodes consume; the
/// units decoded up to that point are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecode {
    pub units: Vec<DecodedUnit>,
    pub truncated: bool,
}

// Field extraction helpers, one per packed field kind
#[inline]
fn a8(inst: u16) -> u8 {
    (inst >> 8) as u8
}
#[inline]
fn a4(inst: u16) -> u8 {
    ((inst >> 8) & 0x0f) as u8
}
#[inline]
fn b4(inst: u16) -> u8 {
    ((inst >> 12) & 0x0f) as u8
}
#[inline]
fn s16(x: u16) -> i16 {
    x as i16
}
#[inline]
fn s8(x: u8) -> i8 {
    x as i8
}
#[inline]
fn s4(x: u8) -> i8 {
    ((x as i8) << 4) >> 4
}
#[inline]
fn i32_at(code: &[u16], pc: usize) -> i32 {
    ((code[pc] as u32) | ((code[pc + 1] as u32) << 16)) as i32
}

/// Measures a payload pseudo-instruction from its header. Returns `None`
/// when even the header does not fit in the remaining stream.
fn payload_size(code: &[u16], pc: usize) -> Option<(PayloadKind, usize)> {
    match code[pc] {
        0x0100 => {
            // ident, size, first_key(2), size * target(2)
            if pc + 2 > code.len() {
                return None;
            }
            let size = code[pc + 1] as usize;
            Some((PayloadKind::PackedSwitch, 4 + size * 2))
        }
        0x0200 => {
            // ident, size, size * key(2), size * target(2)
            if pc + 2 > code.len() {
                return None;
            }
            let size = code[pc + 1] as usize;
            Some((PayloadKind::SparseSwitch, 2 + size * 4))
        }
        0x0300 => {
            // ident, element_width, count(2), then count * width bytes
            if pc + 4 > code.len() {
                return None;
            }
            let width = code[pc + 1] as usize;
            let count = ((code[pc + 3] as u32) << 16 | code[pc + 2] as u32) as usize;
            let bytes = width.checked_mul(count)?;
            Some((PayloadKind::ArrayData, 4 + bytes.div_ceil(2)))
        }
        _ => None,
    }
}

fn read_operands(format: Format, code: &[u16], pc: usize) -> Operands {
    let inst = code[pc];
    match format {
        Format::Format10x => Operands::None,
        Format::Format11x => Operands::Reg { a: a8(inst) as u16 },
        Format::Format11n => Operands::RegLit { a: a4(inst) as u16, lit: s4(b4(inst)) as i64 },
        Format::Format12x => Operands::RegPair { a: a4(inst) as u16, b: b4(inst) as u16 },
        Format::Format10t => Operands::Branch { offset: s8(a8(inst)) as i32 },
        Format::Format20t => Operands::Branch { offset: s16(code[pc + 1]) as i32 },
        Format::Format21c => Operands::RegRef { a: a8(inst) as u16, idx: code[pc + 1] as u32 },
        Format::Format21ih => Operands::RegLit {
            a: a8(inst) as u16,
            lit: ((s16(code[pc + 1]) as i32) << 16) as i64,
        },
        Format::Format21lh => Operands::RegLit {
            a: a8(inst) as u16,
            lit: (s16(code[pc + 1]) as i64) << 48,
        },
        Format::Format21s => Operands::RegLit { a: a8(inst) as u16, lit: s16(code[pc + 1]) as i64 },
        Format::Format21t => Operands::RegBranch {
            a: a8(inst) as u16,
            offset: s16(code[pc + 1]) as i32,
        },
        Format::Format22b => Operands::RegRegLit {
            a: a8(inst) as u16,
            b: code[pc + 1] & 0x00ff,
            lit: s8((code[pc + 1] >> 8) as u8) as i32,
        },
        Format::Format22c => Operands::RegRegRef {
            a: a4(inst) as u16,
            b: b4(inst) as u16,
            idx: code[pc + 1] as u32,
        },
        Format::Format22s => Operands::RegRegLit {
            a: a4(inst) as u16,
            b: b4(inst) as u16,
            lit: s16(code[pc + 1]) as i32,
        },
        Format::Format22t => Operands::RegRegBranch {
            a: a4(inst) as u16,
            b: b4(inst) as u16,
            offset: s16(code[pc + 1]) as i32,
        },
        Format::Format22x => Operands::RegPair { a: a8(inst) as u16, b: code[pc + 1] },
        Format::Format23x => Operands::RegTriple {
            a: a8(inst) as u16,
            b: code[pc + 1] & 0x00ff,
            c: code[pc + 1] >> 8,
        },
        Format::Format30t => Operands::Branch { offset: i32_at(code, pc + 1) },
        Format::Format31c => Operands::RegRef {
            a: a8(inst) as u16,
            idx: i32_at(code, pc + 1) as u32,
        },
        Format::Format31i => Operands::RegLit {
            a: a8(inst) as u16,
            lit: i32_at(code, pc + 1) as i64,
        },
        Format::Format31t => Operands::RegBranch {
            a: a8(inst) as u16,
            offset: i32_at(code, pc + 1),
        },
        Format::Format32x => Operands::RegPair { a: code[pc + 1], b: code[pc + 2] },
        Format::Format35c | Format::Format45cc => {
            // G|A | op, BBBB, F|E|D|C  (A = arg count, C..G = registers)
            let count = b4(inst) as usize;
            let g = a4(inst) as u16;
            let packed = code[pc + 2];
            let c = packed & 0x000f;
            let d = (packed >> 4) & 0x0f;
            let e = (packed >> 8) & 0x0f;
            let f = (packed >> 12) & 0x0f;
            let regs = [c, d, e, f, g].into_iter().take(count).collect();
            Operands::RegList { regs, idx: code[pc + 1] as u32 }
        }
        Format::Format3rc | Format::Format4rcc => Operands::RegRange {
            first: code[pc + 2],
            count: a8(inst) as u16,
            idx: code[pc + 1] as u32,
        },
        Format::Format51l => {
            let lit = (code[pc + 1] as u64)
                | ((code[pc + 2] as u64) << 16)
                | ((code[pc + 3] as u64) << 32)
                | ((code[pc + 4] as u64) << 48);
            Operands::RegLit { a: a8(inst) as u16, lit: lit as i64 }
        }
    }
}

/// Decodes one method's instruction stream. Never fails: unknown opcodes and
/// payload tables become tagged placeholder units, and a stream that ends
/// mid-instruction sets `truncated` and returns the units decoded so far.
/// On a clean decode the consumed code units sum to exactly `code.len()`.
pub fn decode_method(code: &[u16]) -> MethodDecode {
    let mut units: Vec<DecodedUnit> = Vec::new();
    let mut pc: usize = 0;

    while pc < code.len() {
        let inst = code[pc];
        let opv = (inst & 0x00ff) as u8;

        // Payload pseudo-instructions share the nop opcode byte with a
        // reserved ident; consume them as one opaque block. Any other high
        // byte on a nop decodes as a plain nop.
        if matches!(inst, 0x0100 | 0x0200 | 0x0300) {
            match payload_size(code, pc) {
                Some((kind, sz)) if pc + sz <= code.len() => {
                    units.push(DecodedUnit::Payload { kind, addr: pc, units: sz });
                    pc += sz;
                    continue;
                }
                Some((kind, sz)) => {
                    warn!(
                        "{} at code unit {} declares {} units, {} remain",
                        kind.describe(),
                        pc,
                        sz,
                        code.len() - pc
                    );
                    return MethodDecode { units, truncated: true };
                }
                None => {
                    warn!("payload header at code unit {} runs past the stream end", pc);
                    return MethodDecode { units, truncated: true };
                }
            }
        }

        let Some(op) = opcodes::lookup(opv) else {
            units.push(DecodedUnit::Unsupported { opcode: opv, addr: pc });
            pc += 1;
            continue;
        };

        let need = op.format.size();
        if pc + need > code.len() {
            warn!(
                "truncated {} at code unit {}: need {} units, have {}",
                op.name,
                pc,
                need,
                code.len() - pc
            );
            return MethodDecode { units, truncated: true };
        }

        units.push(DecodedUnit::Op(Instruction {
            opcode: opv,
            format: op.format,
            addr: pc,
            size: need,
            operands: read_operands(op.format, code, pc),
        }));
        pc += need;
    }

    MethodDecode { units, truncated: false }
}

impl MethodDecode {
    /// Total consumed length in code units.
    pub fn consumed(&self) -> usize {
        self.units.iter().map(DecodedUnit::size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumed_units_match_stream_length() {
        // const/4 v0, #1 | const/16 v1, #300 | add-int v2, v0, v1 | return v2
        let code: Vec<u16> = vec![0x1012, 0x0113, 0x012c, 0x0290, 0x0100, 0x020f];
        let decode = decode_method(&code);
        assert!(!decode.truncated);
        assert_eq!(decode.consumed(), code.len());
        assert_eq!(decode.units.len(), 4);
    }

    #[test]
    fn nibble_packed_operands() {
        // const/4 v0, #-3: 11n, A = 0, B = 0xd
        let decode = decode_method(&[0xd012]);
        let DecodedUnit::Op(inst) = &decode.units[0] else { panic!("expected op") };
        assert_eq!(inst.operands, Operands::RegLit { a: 0, lit: -3 });

        // add-int v2, v0, v1: 23x AA=2, BB=0, CC=1
        let decode = decode_method(&[0x0290, 0x0100]);
        let DecodedUnit::Op(inst) = &decode.units[0] else { panic!("expected op") };
        assert_eq!(inst.operands, Operands::RegTriple { a: 2, b: 0, c: 1 });
    }

    #[test]
    fn invoke_register_list_unpacks() {
        // invoke-virtual {v1, v2}, method@5: 35c with A=2, G ignored,
        // word0 = 0x206e, word1 = idx, word2 = F|E|D|C = 0x0021
        let decode = decode_method(&[0x206e, 0x0005, 0x0021]);
        let DecodedUnit::Op(inst) = &decode.units[0] else { panic!("expected op") };
        assert_eq!(inst.operands, Operands::RegList { regs: vec![1, 2], idx: 5 });
        assert_eq!(inst.size, 3);
    }

    #[test]
    fn wide_literal_spans_four_units() {
        // const-wide v0, #0x0004000300020001
        let decode = decode_method(&[0x0018, 0x0001, 0x0002, 0x0003, 0x0004]);
        let DecodedUnit::Op(inst) = &decode.units[0] else { panic!("expected op") };
        assert_eq!(inst.operands, Operands::RegLit { a: 0, lit: 0x0004_0003_0002_0001 });
    }

    #[test]
    fn unknown_opcode_consumes_one_unit_and_continues() {
        // 0x3e is unused; decoding must flag it and pick up the return-void after
        let decode = decode_method(&[0x003e, 0x000e]);
        assert!(!decode.truncated);
        assert_eq!(decode.units[0], DecodedUnit::Unsupported { opcode: 0x3e, addr: 0 });
        assert!(matches!(decode.units[1], DecodedUnit::Op(_)));
        assert_eq!(decode.consumed(), 2);
    }

    #[test]
    fn truncated_instruction_keeps_partial_list() {
        // const/16 needs two units but only one remains after the first op
        let decode = decode_method(&[0x000e, 0x0013]);
        assert!(decode.truncated);
        assert_eq!(decode.units.len(), 1);
    }

    #[test]
    fn packed_switch_payload_is_one_opaque_block() {
        // packed-switch v0, +3 | payload: ident, size=2, first_key=0, targets
        let code: Vec<u16> = vec![
            0x002b, 0x0003, 0x0000, // packed-switch v0, offset 3
            0x0100, 0x0002, 0x0000, 0x0000, // ident, size, first_key
            0x0005, 0x0000, 0x0007, 0x0000, // two targets
        ];
        let decode = decode_method(&code);
        assert!(!decode.truncated);
        assert_eq!(decode.units.len(), 2);
        assert_eq!(
            decode.units[1],
            DecodedUnit::Payload { kind: PayloadKind::PackedSwitch, addr: 3, units: 8 }
        );
        assert_eq!(decode.consumed(), code.len());
    }

    #[test]
    fn overrunning_payload_is_truncation() {
        // array-data payload claiming more bytes than the stream holds
        let code: Vec<u16> = vec![0x0300, 0x0004, 0xffff, 0x0000];
        let decode = decode_method(&code);
        assert!(decode.truncated);
        assert!(decode.units.is_empty());
    }
}
