//! Renders decoded instruction streams as pseudo-code statements, one line
//! per decoded unit, and assembles them into per-class text blocks.

use std::collections::HashSet;

use log::{debug, warn};

use crate::dex::dex_file::{AccessFlags, ClassDefItem, DexFile, EncodedMethod};
use crate::dex::error::Fault;
use crate::dex::instructions::{decode_method, DecodedUnit, Instruction, Operands};
use crate::dex::opcodes::{self, BinOp, CmpKind, Family, InvokeKind, Opcode};
use crate::types::{ClassOutput, Decompilation, FaultCounts, MethodBlock, Statement};

pub(crate) fn synthesize(dex: &DexFile, filter: Option<&HashSet<String>>) -> Decompilation {
    let mut faults = dex.table_faults;
    let mut classes = vec![];

    for class in &dex.class_defs {
        let descriptor = match dex.type_desc(class.class_idx) {
            Some(d) => d.to_string(),
            None => {
                warn!("class type index {} out of range", class.class_idx);
                faults.record(Fault::IndexOutOfRange);
                format!("type@{}", class.class_idx)
            }
        };

        if let Some(wanted) = filter {
            if !wanted.contains(&descriptor) {
                continue;
            }
        }

        let output = render_class(dex, class, descriptor);
        faults.absorb(&output.faults());
        classes.push(output);
    }

    Decompilation { classes, faults }
}

fn render_class(dex: &DexFile, class: &ClassDefItem, descriptor: String) -> ClassOutput {
    let mut methods = vec![];

    if let Some(class_data) = &class.class_data {
        for m in class_data.direct_methods.iter().chain(class_data.virtual_methods.iter()) {
            if m.code.is_none() {
                let why = if m.access_flags.contains(AccessFlags::NATIVE) {
                    "native"
                } else if m.access_flags.contains(AccessFlags::ABSTRACT) {
                    "abstract"
                } else {
                    "code-less"
                };
                debug!("skipping {} method {} in {}", why, m.method_idx, descriptor);
                continue;
            }
            methods.push(render_method(dex, m));
        }
    }

    ClassOutput { name: descriptor, methods }
}

fn render_method(dex: &DexFile, method: &EncodedMethod) -> MethodBlock {
    let mut faults = FaultCounts::default();

    let name = match dex.methods.get(method.method_idx) {
        Some(entry) => entry.display(),
        None => {
            warn!("method index {} out of range ({} methods)", method.method_idx, dex.methods.len());
            faults.record(Fault::IndexOutOfRange);
            format!("method@{}", method.method_idx)
        }
    };

    let mut statements = vec![];
    if let Some(code) = &method.code {
        let decode = decode_method(&code.instructions);
        for unit in &decode.units {
            statements.push(render_unit(dex, unit, &mut faults));
        }
        if decode.truncated {
            warn!(
                "{}: instruction stream truncated after {} of {} code units",
                name,
                decode.consumed(),
                code.instructions.len()
            );
            faults.record(Fault::TruncatedStream);
            statements.push(Statement {
                addr: decode.consumed() * 2,
                text: "// instruction stream truncated".to_string(),
            });
        }
    }

    MethodBlock { name, statements, faults }
}

fn render_unit(dex: &DexFile, unit: &DecodedUnit, faults: &mut FaultCounts) -> Statement {
    match unit {
        DecodedUnit::Unsupported { opcode, addr } => {
            faults.record(Fault::UnsupportedOpcode);
            Statement {
                addr: addr * 2,
                text: format!("// unknown opcode 0x{:02x} at 0x{:x}", opcode, addr * 2),
            }
        }
        DecodedUnit::Payload { kind, addr, units } => Statement {
            addr: addr * 2,
            text: format!("// {} ({} code units) at 0x{:x}", kind.describe(), units, addr * 2),
        },
        DecodedUnit::Op(inst) => Statement {
            addr: inst.addr * 2,
            text: render_instruction(dex, inst, faults),
        },
    }
}

fn render_instruction(dex: &DexFile, inst: &Instruction, faults: &mut FaultCounts) -> String {
    let Some(op) = opcodes::lookup(inst.opcode) else {
        // decode_method only emits Op for known opcodes; keep the fallback
        // on the same placeholder path as unknown bytes regardless.
        faults.record(Fault::UnsupportedOpcode);
        return format!("// unknown opcode 0x{:02x} at 0x{:x}", inst.opcode, inst.addr * 2);
    };

    let text = match (op.family, &inst.operands) {
        (Family::Nop, _) => "// nop".to_string(),

        (Family::Move, Operands::RegPair { a, b }) => format!("v{} = v{};", a, b),
        (Family::MoveResult, Operands::Reg { a }) => format!("v{} = result;", a),
        (Family::MoveException, Operands::Reg { a }) => format!("v{} = exception;", a),

        (Family::ReturnVoid, _) => "return;".to_string(),
        (Family::Return, Operands::Reg { a }) => format!("return v{};", a),

        (Family::Const, Operands::RegLit { a, lit }) => format!("v{} = {};", a, lit),
        (Family::ConstString, Operands::RegRef { a, idx }) => {
            format!("v{} = {};", a, string_display(dex, *idx, faults))
        }
        (Family::ConstClass, Operands::RegRef { a, idx }) => {
            format!("v{} = {}.class;", a, type_display(dex, *idx, faults))
        }

        (Family::MonitorEnter, Operands::Reg { a }) => format!("synchronized(v{}) {{", a),
        (Family::MonitorExit, _) => "}  // end synchronized".to_string(),

        (Family::CheckCast, Operands::RegRef { a, idx }) => {
            format!("v{} = ({}) v{};", a, type_display(dex, *idx, faults), a)
        }
        (Family::InstanceOf, Operands::RegRegRef { a, b, idx }) => {
            format!("v{} = (v{} instanceof {});", a, b, type_display(dex, *idx, faults))
        }
        (Family::ArrayLength, Operands::RegPair { a, b }) => format!("v{} = v{}.length;", a, b),

        (Family::NewInstance, Operands::RegRef { a, idx }) => {
            format!("v{} = new {};", a, type_display(dex, *idx, faults))
        }
        (Family::NewArray, Operands::RegRegRef { a, b, idx }) => {
            format!("v{} = new {}[v{}];", a, type_display(dex, *idx, faults), b)
        }
        (Family::FilledNewArray, Operands::RegList { regs, idx }) => {
            format!("new {}{{{}}};", type_display(dex, *idx, faults), reg_list(regs))
        }
        (Family::FilledNewArray, Operands::RegRange { first, count, idx }) => {
            format!("new {}{{{}}};", type_display(dex, *idx, faults), reg_range(*first, *count))
        }

        (Family::FillArrayData, Operands::RegBranch { a, offset }) => {
            format!("// fill array with data: v{}, payload at 0x{:x}", a, target_byte(inst, *offset))
        }
        (Family::Switch, Operands::RegBranch { a, offset }) => {
            format!("// {} v{}, table at 0x{:x}", op.name, a, target_byte(inst, *offset))
        }

        (Family::Throw, Operands::Reg { a }) => format!("throw v{};", a),

        (Family::Goto, Operands::Branch { offset }) => {
            format!("goto label_{};", target_label(inst, *offset))
        }
        (Family::If(cond), Operands::RegRegBranch { a, b, offset }) => {
            format!("if (v{} {} v{}) goto label_{};", a, cond.symbol(), b, target_label(inst, *offset))
        }
        (Family::IfZ(cond), Operands::RegBranch { a, offset }) => {
            format!("if (v{} {} 0) goto label_{};", a, cond.symbol(), target_label(inst, *offset))
        }

        (Family::Cmp(kind), Operands::RegTriple { a, b, c }) => match kind {
            CmpKind::LtBias => format!(
                "v{} = (v{} < v{}) ? -1 : ((v{} == v{}) ? 0 : 1);",
                a, b, c, b, c
            ),
            CmpKind::GtBias => format!(
                "v{} = (v{} > v{}) ? 1 : ((v{} == v{}) ? 0 : -1);",
                a, b, c, b, c
            ),
            CmpKind::Long => format!(
                "v{} = (v{} == v{}) ? 0 : ((v{} < v{}) ? -1 : 1);",
                a, b, c, b, c
            ),
        },

        (Family::ArrayGet, Operands::RegTriple { a, b, c }) => format!("v{} = v{}[v{}];", a, b, c),
        (Family::ArrayPut, Operands::RegTriple { a, b, c }) => format!("v{}[v{}] = v{};", b, c, a),

        (Family::InstanceGet, Operands::RegRegRef { a, b, idx }) => {
            let (_, name) = field_display(dex, *idx, faults);
            format!("v{} = v{}.{};", a, b, name)
        }
        (Family::InstancePut, Operands::RegRegRef { a, b, idx }) => {
            let (_, name) = field_display(dex, *idx, faults);
            format!("v{}.{} = v{};", b, name, a)
        }
        (Family::StaticGet, Operands::RegRef { a, idx }) => {
            let (owner, name) = field_display(dex, *idx, faults);
            format!("v{} = {}.{};", a, owner, name)
        }
        (Family::StaticPut, Operands::RegRef { a, idx }) => {
            let (owner, name) = field_display(dex, *idx, faults);
            format!("{}.{} = v{};", owner, name, a)
        }

        (Family::Invoke(kind), Operands::RegList { regs, idx }) => {
            render_invoke(dex, kind, regs.first().copied(), &reg_list(&regs[regs.len().min(1)..]), &reg_list(regs), *idx, faults)
        }
        (Family::Invoke(kind), Operands::RegRange { first, count, idx }) => {
            let this = (*count > 0).then_some(*first);
            let rest = if *count > 1 { reg_range(first.wrapping_add(1), count - 1) } else { String::new() };
            render_invoke(dex, kind, this, &rest, &reg_range(*first, *count), *idx, faults)
        }

        (Family::Unary(unary), Operands::RegPair { a, b }) => match unary {
            opcodes::UnaryOp::Neg => format!("v{} = -v{};", a, b),
            opcodes::UnaryOp::Not => format!("v{} = ~v{};", a, b),
            opcodes::UnaryOp::Cast(target) => format!("v{} = ({}) v{};", a, target, b),
        },

        (Family::Binary(bin), Operands::RegTriple { a, b, c }) => {
            format!("v{} = v{} {} v{};", a, b, bin.symbol(), c)
        }
        (Family::Binary2Addr(bin), Operands::RegPair { a, b }) => {
            format!("v{} {}= v{};", a, bin.symbol(), b)
        }
        (Family::BinaryLit(bin), Operands::RegRegLit { a, b, lit }) => match bin {
            BinOp::Rsub => format!("v{} = {} - v{};", a, lit, b),
            _ => format!("v{} = v{} {} {};", a, b, bin.symbol(), lit),
        },

        (Family::Opaque, _) => {
            return format!("// {} (opcode 0x{:02x}) at 0x{:x}", op.name, inst.opcode, inst.addr * 2);
        }

        // Format/family disagreement cannot come from decode_method; render
        // the raw mnemonic so the statement count still matches.
        _ => return format!("// {}", op.name),
    };

    annotate(text, op)
}

fn render_invoke(
    dex: &DexFile,
    kind: InvokeKind,
    this: Option<u16>,
    rest: &str,
    all: &str,
    idx: u32,
    faults: &mut FaultCounts,
) -> String {
    let (owner, name) = method_display(dex, idx, faults);
    match kind {
        InvokeKind::Static => format!("{}.{}({});", owner, name, all),
        InvokeKind::Super => format!("super.{}({});", name, rest),
        InvokeKind::Direct => format!("{}({});", name, rest),
        InvokeKind::Virtual | InvokeKind::Interface => match this {
            Some(receiver) => format!("v{}.{}({});", receiver, name, rest),
            None => format!("{}({});", name, rest),
        },
    }
}

/// Absolute branch target in code units (instruction address + signed
/// offset), converted to the byte offset used for label names.
fn target_byte(inst: &Instruction, offset: i32) -> i64 {
    (inst.addr as i64 + offset as i64) * 2
}

fn target_label(inst: &Instruction, offset: i32) -> i64 {
    target_byte(inst, offset)
}

fn reg_list(regs: &[u16]) -> String {
    let names: Vec<String> = regs.iter().map(|r| format!("v{}", r)).collect();
    names.join(", ")
}

fn reg_range(first: u16, count: u16) -> String {
    match count {
        0 => String::new(),
        1 => format!("v{}", first),
        _ => format!("v{} .. v{}", first, first as u32 + count as u32 - 1),
    }
}

fn annotate(text: String, op: &Opcode) -> String {
    if op.note.is_empty() {
        text
    } else {
        format!("{}  // {}", text, op.note)
    }
}

fn string_display(dex: &DexFile, idx: u32, faults: &mut FaultCounts) -> String {
    match dex.strings.get(idx as usize) {
        Some(s) => format!("\"{}\"", escape_string(s)),
        None => {
            warn!("string index {} out of range ({} strings)", idx, dex.strings.len());
            faults.record(Fault::IndexOutOfRange);
            format!("string@{}", idx)
        }
    }
}

fn type_display(dex: &DexFile, idx: u32, faults: &mut FaultCounts) -> String {
    match dex.type_desc(idx as usize) {
        Some(d) => d.to_string(),
        None => {
            warn!("type index {} out of range ({} types)", idx, dex.types.len());
            faults.record(Fault::IndexOutOfRange);
            format!("type@{}", idx)
        }
    }
}

fn field_display(dex: &DexFile, idx: u32, faults: &mut FaultCounts) -> (String, String) {
    match dex.fields.get(idx as usize) {
        Some(f) => (f.owner.clone(), f.name.clone()),
        None => {
            warn!("field index {} out of range ({} fields)", idx, dex.fields.len());
            faults.record(Fault::IndexOutOfRange);
            (format!("type@{}", idx), format!("field@{}", idx))
        }
    }
}

fn method_display(dex: &DexFile, idx: u32, faults: &mut FaultCounts) -> (String, String) {
    match dex.methods.get(idx as usize) {
        Some(m) => (m.owner.clone(), m.name.clone()),
        None => {
            warn!("method index {} out of range ({} methods)", idx, dex.methods.len());
            faults.record(Fault::IndexOutOfRange);
            (format!("type@{}", idx), format!("method@{}", idx))
        }
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || (0x7f..=0x9f).contains(&(c as u32)) => {
                out.push_str(&format!("\\u{:04x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_keeps_text_printable() {
        assert_eq!(escape_string("plain"), "plain");
        assert_eq!(escape_string("a\"b\\c"), "a\\\"b\\\\c");
        assert_eq!(escape_string("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_string("\u{1}"), "\\u0001");
        assert_eq!(escape_string("\u{fffd}ok"), "\u{fffd}ok");
    }

    #[test]
    fn register_range_rendering() {
        assert_eq!(reg_range(2, 0), "");
        assert_eq!(reg_range(2, 1), "v2");
        assert_eq!(reg_range(2, 3), "v2 .. v4");
        assert_eq!(reg_list(&[1, 2, 3]), "v1, v2, v3");
    }
}
