use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::dex::instructions::Format;

/// Comparison condition of the if-test families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl Cond {
    pub fn symbol(&self) -> &'static str {
        match self {
            Cond::Eq => "==",
            Cond::Ne => "!=",
            Cond::Lt => "<",
            Cond::Ge => ">=",
            Cond::Gt => ">",
            Cond::Le => "<=",
        }
    }
}

/// Bias of the three-valued compare instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpKind {
    LtBias,
    GtBias,
    Long,
}

/// Binary arithmetic operator, shared by the three-register, `/2addr` and
/// literal instruction families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Rsub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub | BinOp::Rsub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Ushr => ">>>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Cast(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Virtual,
    Super,
    Direct,
    Static,
    Interface,
}

/// Statement family an opcode renders as. This column is the boundary
/// between fully decoded instructions and opaque placeholders: moving an
/// opcode to `Family::Opaque` (or back) changes rendering only, never
/// stream consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Nop,
    Move,
    MoveResult,
    MoveException,
    ReturnVoid,
    Return,
    Const,
    ConstString,
    ConstClass,
    MonitorEnter,
    MonitorExit,
    CheckCast,
    InstanceOf,
    ArrayLength,
    NewInstance,
    NewArray,
    FilledNewArray,
    FillArrayData,
    Throw,
    Goto,
    Switch,
    Cmp(CmpKind),
    If(Cond),
    IfZ(Cond),
    ArrayGet,
    ArrayPut,
    InstanceGet,
    InstancePut,
    StaticGet,
    StaticPut,
    Invoke(InvokeKind),
    Unary(UnaryOp),
    Binary(BinOp),
    Binary2Addr(BinOp),
    BinaryLit(BinOp),
    /// Structurally decoded (stream consumption is exact) but rendered as an
    /// annotated placeholder.
    Opaque,
}

/// One row of the instruction set table.
pub struct Opcode {
    pub value: u8,
    pub name: &'static str,
    pub format: Format,
    pub family: Family,
    /// Trailing annotation carried into the rendered statement, e.g. `wide`.
    pub note: &'static str,
}

impl Opcode {
    fn new(value: u8, name: &'static str, format: Format, family: Family) -> Self {
        Opcode { value, name, format, family, note: "" }
    }

    fn note(mut self, note: &'static str) -> Self {
        self.note = note;
        self
    }
}

use self::BinOp::*;
use self::CmpKind::*;
use self::Cond::*;
use self::Family as F;
use self::InvokeKind::*;
use crate::dex::instructions::Format as Fm;
use self::UnaryOp::*;

static OPCODES: Lazy<Vec<Opcode>> = Lazy::new(|| {
    vec![
        Opcode::new(0x00, "nop", Fm::Format10x, F::Nop),
        // Moves
        Opcode::new(0x01, "move", Fm::Format12x, F::Move),
        Opcode::new(0x02, "move/from16", Fm::Format22x, F::Move),
        Opcode::new(0x03, "move/16", Fm::Format32x, F::Move),
        Opcode::new(0x04, "move-wide", Fm::Format12x, F::Move).note("wide"),
        Opcode::new(0x05, "move-wide/from16", Fm::Format22x, F::Move).note("wide"),
        Opcode::new(0x06, "move-wide/16", Fm::Format32x, F::Move).note("wide"),
        Opcode::new(0x07, "move-object", Fm::Format12x, F::Move).note("object"),
        Opcode::new(0x08, "move-object/from16", Fm::Format22x, F::Move).note("object"),
        Opcode::new(0x09, "move-object/16", Fm::Format32x, F::Move).note("object"),
        Opcode::new(0x0a, "move-result", Fm::Format11x, F::MoveResult),
        Opcode::new(0x0b, "move-result-wide", Fm::Format11x, F::MoveResult).note("wide"),
        Opcode::new(0x0c, "move-result-object", Fm::Format11x, F::MoveResult).note("object"),
        Opcode::new(0x0d, "move-exception", Fm::Format11x, F::MoveException),
        // Returns
        Opcode::new(0x0e, "return-void", Fm::Format10x, F::ReturnVoid),
        Opcode::new(0x0f, "return", Fm::Format11x, F::Return),
        Opcode::new(0x10, "return-wide", Fm::Format11x, F::Return).note("wide"),
        Opcode::new(0x11, "return-object", Fm::Format11x, F::Return).note("object"),
        // Constants
        Opcode::new(0x12, "const/4", Fm::Format11n, F::Const),
        Opcode::new(0x13, "const/16", Fm::Format21s, F::Const),
        Opcode::new(0x14, "const", Fm::Format31i, F::Const),
        Opcode::new(0x15, "const/high16", Fm::Format21ih, F::Const),
        Opcode::new(0x16, "const-wide/16", Fm::Format21s, F::Const).note("wide"),
        Opcode::new(0x17, "const-wide/32", Fm::Format31i, F::Const).note("wide"),
        Opcode::new(0x18, "const-wide", Fm::Format51l, F::Const).note("wide"),
        Opcode::new(0x19, "const-wide/high16", Fm::Format21lh, F::Const).note("wide"),
        Opcode::new(0x1a, "const-string", Fm::Format21c, F::ConstString),
        Opcode::new(0x1b, "const-string/jumbo", Fm::Format31c, F::ConstString),
        Opcode::new(0x1c, "const-class", Fm::Format21c, F::ConstClass),
        // Monitors
        Opcode::new(0x1d, "monitor-enter", Fm::Format11x, F::MonitorEnter),
        Opcode::new(0x1e, "monitor-exit", Fm::Format11x, F::MonitorExit),
        // Type checks and allocation
        Opcode::new(0x1f, "check-cast", Fm::Format21c, F::CheckCast),
        Opcode::new(0x20, "instance-of", Fm::Format22c, F::InstanceOf),
        Opcode::new(0x21, "array-length", Fm::Format12x, F::ArrayLength),
        Opcode::new(0x22, "new-instance", Fm::Format21c, F::NewInstance),
        Opcode::new(0x23, "new-array", Fm::Format22c, F::NewArray),
        Opcode::new(0x24, "filled-new-array", Fm::Format35c, F::FilledNewArray),
        Opcode::new(0x25, "filled-new-array/range", Fm::Format3rc, F::FilledNewArray).note("range"),
        Opcode::new(0x26, "fill-array-data", Fm::Format31t, F::FillArrayData),
        Opcode::new(0x27, "throw", Fm::Format11x, F::Throw),
        // Branches
        Opcode::new(0x28, "goto", Fm::Format10t, F::Goto),
        Opcode::new(0x29, "goto/16", Fm::Format20t, F::Goto),
        Opcode::new(0x2a, "goto/32", Fm::Format30t, F::Goto),
        Opcode::new(0x2b, "packed-switch", Fm::Format31t, F::Switch),
        Opcode::new(0x2c, "sparse-switch", Fm::Format31t, F::Switch),
        // Compares
        Opcode::new(0x2d, "cmpl-float", Fm::Format23x, F::Cmp(LtBias)),
        Opcode::new(0x2e, "cmpg-float", Fm::Format23x, F::Cmp(GtBias)),
        Opcode::new(0x2f, "cmpl-double", Fm::Format23x, F::Cmp(LtBias)).note("double"),
        Opcode::new(0x30, "cmpg-double", Fm::Format23x, F::Cmp(GtBias)).note("double"),
        Opcode::new(0x31, "cmp-long", Fm::Format23x, F::Cmp(Long)).note("long"),
        // If tests
        Opcode::new(0x32, "if-eq", Fm::Format22t, F::If(Eq)),
        Opcode::new(0x33, "if-ne", Fm::Format22t, F::If(Ne)),
        Opcode::new(0x34, "if-lt", Fm::Format22t, F::If(Lt)),
        Opcode::new(0x35, "if-ge", Fm::Format22t, F::If(Ge)),
        Opcode::new(0x36, "if-gt", Fm::Format22t, F::If(Gt)),
        Opcode::new(0x37, "if-le", Fm::Format22t, F::If(Le)),
        Opcode::new(0x38, "if-eqz", Fm::Format21t, F::IfZ(Eq)),
        Opcode::new(0x39, "if-nez", Fm::Format21t, F::IfZ(Ne)),
        Opcode::new(0x3a, "if-ltz", Fm::Format21t, F::IfZ(Lt)),
        Opcode::new(0x3b, "if-gez", Fm::Format21t, F::IfZ(Ge)),
        Opcode::new(0x3c, "if-gtz", Fm::Format21t, F::IfZ(Gt)),
        Opcode::new(0x3d, "if-lez", Fm::Format21t, F::IfZ(Le)),
        // 0x3e..0x43 are unused
        // Array access
        Opcode::new(0x44, "aget", Fm::Format23x, F::ArrayGet),
        Opcode::new(0x45, "aget-wide", Fm::Format23x, F::ArrayGet).note("wide"),
        Opcode::new(0x46, "aget-object", Fm::Format23x, F::ArrayGet).note("object"),
        Opcode::new(0x47, "aget-boolean", Fm::Format23x, F::ArrayGet).note("boolean"),
        Opcode::new(0x48, "aget-byte", Fm::Format23x, F::ArrayGet).note("byte"),
        Opcode::new(0x49, "aget-char", Fm::Format23x, F::ArrayGet).note("char"),
        Opcode::new(0x4a, "aget-short", Fm::Format23x, F::ArrayGet).note("short"),
        Opcode::new(0x4b, "aput", Fm::Format23x, F::ArrayPut),
        Opcode::new(0x4c, "aput-wide", Fm::Format23x, F::ArrayPut).note("wide"),
        Opcode::new(0x4d, "aput-object", Fm::Format23x, F::ArrayPut).note("object"),
        Opcode::new(0x4e, "aput-boolean", Fm::Format23x, F::ArrayPut).note("boolean"),
        Opcode::new(0x4f, "aput-byte", Fm::Format23x, F::ArrayPut).note("byte"),
        Opcode::new(0x50, "aput-char", Fm::Format23x, F::ArrayPut).note("char"),
        Opcode::new(0x51, "aput-short", Fm::Format23x, F::ArrayPut).note("short"),
        // Instance fields
        Opcode::new(0x52, "iget", Fm::Format22c, F::InstanceGet),
        Opcode::new(0x53, "iget-wide", Fm::Format22c, F::InstanceGet).note("wide"),
        Opcode::new(0x54, "iget-object", Fm::Format22c, F::InstanceGet).note("object"),
        Opcode::new(0x55, "iget-boolean", Fm::Format22c, F::InstanceGet).note("boolean"),
        Opcode::new(0x56, "iget-byte", Fm::Format22c, F::InstanceGet).note("byte"),
        Opcode::new(0x57, "iget-char", Fm::Format22c, F::InstanceGet).note("char"),
        Opcode::new(0x58, "iget-short", Fm::Format22c, F::InstanceGet).note("short"),
        Opcode::new(0x59, "iput", Fm::Format22c, F::InstancePut),
        Opcode::new(0x5a, "iput-wide", Fm::Format22c, F::InstancePut).note("wide"),
        Opcode::new(0x5b, "iput-object", Fm::Format22c, F::InstancePut).note("object"),
        Opcode::new(0x5c, "iput-boolean", Fm::Format22c, F::InstancePut).note("boolean"),
        Opcode::new(0x5d, "iput-byte", Fm::Format22c, F::InstancePut).note("byte"),
        Opcode::new(0x5e, "iput-char", Fm::Format22c, F::InstancePut).note("char"),
        Opcode::new(0x5f, "iput-short", Fm::Format22c, F::InstancePut).note("short"),
        // Static fields
        Opcode::new(0x60, "sget", Fm::Format21c, F::StaticGet).note("static"),
        Opcode::new(0x61, "sget-wide", Fm::Format21c, F::StaticGet).note("static wide"),
        Opcode::new(0x62, "sget-object", Fm::Format21c, F::StaticGet).note("static object"),
        Opcode::new(0x63, "sget-boolean", Fm::Format21c, F::StaticGet).note("static boolean"),
        Opcode::new(0x64, "sget-byte", Fm::Format21c, F::StaticGet).note("static byte"),
        Opcode::new(0x65, "sget-char", Fm::Format21c, F::StaticGet).note("static char"),
        Opcode::new(0x66, "sget-short", Fm::Format21c, F::StaticGet).note("static short"),
        Opcode::new(0x67, "sput", Fm::Format21c, F::StaticPut).note("static"),
        Opcode::new(0x68, "sput-wide", Fm::Format21c, F::StaticPut).note("static wide"),
        Opcode::new(0x69, "sput-object", Fm::Format21c, F::StaticPut).note("static object"),
        Opcode::new(0x6a, "sput-boolean", Fm::Format21c, F::StaticPut).note("static boolean"),
        Opcode::new(0x6b, "sput-byte", Fm::Format21c, F::StaticPut).note("static byte"),
        Opcode::new(0x6c, "sput-char", Fm::Format21c, F::StaticPut).note("static char"),
        Opcode::new(0x6d, "sput-short", Fm::Format21c, F::StaticPut).note("static short"),
        // Invokes
        Opcode::new(0x6e, "invoke-virtual", Fm::Format35c, F::Invoke(Virtual)),
        Opcode::new(0x6f, "invoke-super", Fm::Format35c, F::Invoke(Super)),
        Opcode::new(0x70, "invoke-direct", Fm::Format35c, F::Invoke(Direct)),
        Opcode::new(0x71, "invoke-static", Fm::Format35c, F::Invoke(Static)),
        Opcode::new(0x72, "invoke-interface", Fm::Format35c, F::Invoke(Interface)).note("interface"),
        // 0x73 is unused
        Opcode::new(0x74, "invoke-virtual/range", Fm::Format3rc, F::Invoke(Virtual)).note("range"),
        Opcode::new(0x75, "invoke-super/range", Fm::Format3rc, F::Invoke(Super)).note("range"),
        Opcode::new(0x76, "invoke-direct/range", Fm::Format3rc, F::Invoke(Direct)).note("range"),
        Opcode::new(0x77, "invoke-static/range", Fm::Format3rc, F::Invoke(Static)).note("range"),
        Opcode::new(0x78, "invoke-interface/range", Fm::Format3rc, F::Invoke(Interface)).note("interface, range"),
        // 0x79..0x7a are unused
        // Unary ops
        Opcode::new(0x7b, "neg-int", Fm::Format12x, F::Unary(Neg)),
        Opcode::new(0x7c, "not-int", Fm::Format12x, F::Unary(Not)),
        Opcode::new(0x7d, "neg-long", Fm::Format12x, F::Unary(Neg)).note("long"),
        Opcode::new(0x7e, "not-long", Fm::Format12x, F::Unary(Not)).note("long"),
        Opcode::new(0x7f, "neg-float", Fm::Format12x, F::Unary(Neg)).note("float"),
        Opcode::new(0x80, "neg-double", Fm::Format12x, F::Unary(Neg)).note("double"),
        Opcode::new(0x81, "int-to-long", Fm::Format12x, F::Unary(Cast("long"))),
        Opcode::new(0x82, "int-to-float", Fm::Format12x, F::Unary(Cast("float"))),
        Opcode::new(0x83, "int-to-double", Fm::Format12x, F::Unary(Cast("double"))),
        Opcode::new(0x84, "long-to-int", Fm::Format12x, F::Unary(Cast("int"))),
        Opcode::new(0x85, "long-to-float", Fm::Format12x, F::Unary(Cast("float"))),
        Opcode::new(0x86, "long-to-double", Fm::Format12x, F::Unary(Cast("double"))),
        Opcode::new(0x87, "float-to-int", Fm::Format12x, F::Unary(Cast("int"))),
        Opcode::new(0x88, "float-to-long", Fm::Format12x, F::Unary(Cast("long"))),
        Opcode::new(0x89, "float-to-double", Fm::Format12x, F::Unary(Cast("double"))),
        Opcode::new(0x8a, "double-to-int", Fm::Format12x, F::Unary(Cast("int"))),
        Opcode::new(0x8b, "double-to-long", Fm::Format12x, F::Unary(Cast("long"))),
        Opcode::new(0x8c, "double-to-float", Fm::Format12x, F::Unary(Cast("float"))),
        Opcode::new(0x8d, "int-to-byte", Fm::Format12x, F::Unary(Cast("byte"))),
        Opcode::new(0x8e, "int-to-char", Fm::Format12x, F::Unary(Cast("char"))),
        Opcode::new(0x8f, "int-to-short", Fm::Format12x, F::Unary(Cast("short"))),
        // Three-register arithmetic
        Opcode::new(0x90, "add-int", Fm::Format23x, F::Binary(Add)),
        Opcode::new(0x91, "sub-int", Fm::Format23x, F::Binary(Sub)),
        Opcode::new(0x92, "mul-int", Fm::Format23x, F::Binary(Mul)),
        Opcode::new(0x93, "div-int", Fm::Format23x, F::Binary(Div)),
        Opcode::new(0x94, "rem-int", Fm::Format23x, F::Binary(Rem)),
        Opcode::new(0x95, "and-int", Fm::Format23x, F::Binary(And)),
        Opcode::new(0x96, "or-int", Fm::Format23x, F::Binary(Or)),
        Opcode::new(0x97, "xor-int", Fm::Format23x, F::Binary(Xor)),
        Opcode::new(0x98, "shl-int", Fm::Format23x, F::Binary(Shl)),
        Opcode::new(0x99, "shr-int", Fm::Format23x, F::Binary(Shr)),
        Opcode::new(0x9a, "ushr-int", Fm::Format23x, F::Binary(Ushr)),
        Opcode::new(0x9b, "add-long", Fm::Format23x, F::Binary(Add)).note("long"),
        Opcode::new(0x9c, "sub-long", Fm::Format23x, F::Binary(Sub)).note("long"),
        Opcode::new(0x9d, "mul-long", Fm::Format23x, F::Binary(Mul)).note("long"),
        Opcode::new(0x9e, "div-long", Fm::Format23x, F::Binary(Div)).note("long"),
        Opcode::new(0x9f, "rem-long", Fm::Format23x, F::Binary(Rem)).note("long"),
        Opcode::new(0xa0, "and-long", Fm::Format23x, F::Binary(And)).note("long"),
        Opcode::new(0xa1, "or-long", Fm::Format23x, F::Binary(Or)).note("long"),
        Opcode::new(0xa2, "xor-long", Fm::Format23x, F::Binary(Xor)).note("long"),
        Opcode::new(0xa3, "shl-long", Fm::Format23x, F::Binary(Shl)).note("long"),
        Opcode::new(0xa4, "shr-long", Fm::Format23x, F::Binary(Shr)).note("long"),
        Opcode::new(0xa5, "ushr-long", Fm::Format23x, F::Binary(Ushr)).note("long"),
        Opcode::new(0xa6, "add-float", Fm::Format23x, F::Binary(Add)).note("float"),
        Opcode::new(0xa7, "sub-float", Fm::Format23x, F::Binary(Sub)).note("float"),
        Opcode::new(0xa8, "mul-float", Fm::Format23x, F::Binary(Mul)).note("float"),
        Opcode::new(0xa9, "div-float", Fm::Format23x, F::Binary(Div)).note("float"),
        Opcode::new(0xaa, "rem-float", Fm::Format23x, F::Binary(Rem)).note("float"),
        Opcode::new(0xab, "add-double", Fm::Format23x, F::Binary(Add)).note("double"),
        Opcode::new(0xac, "sub-double", Fm::Format23x, F::Binary(Sub)).note("double"),
        Opcode::new(0xad, "mul-double", Fm::Format23x, F::Binary(Mul)).note("double"),
        Opcode::new(0xae, "div-double", Fm::Format23x, F::Binary(Div)).note("double"),
        Opcode::new(0xaf, "rem-double", Fm::Format23x, F::Binary(Rem)).note("double"),
        // Two-register arithmetic
        Opcode::new(0xb0, "add-int/2addr", Fm::Format12x, F::Binary2Addr(Add)),
        Opcode::new(0xb1, "sub-int/2addr", Fm::Format12x, F::Binary2Addr(Sub)),
        Opcode::new(0xb2, "mul-int/2addr", Fm::Format12x, F::Binary2Addr(Mul)),
        Opcode::new(0xb3, "div-int/2addr", Fm::Format12x, F::Binary2Addr(Div)),
        Opcode::new(0xb4, "rem-int/2addr", Fm::Format12x, F::Binary2Addr(Rem)),
        Opcode::new(0xb5, "and-int/2addr", Fm::Format12x, F::Binary2Addr(And)),
        Opcode::new(0xb6, "or-int/2addr", Fm::Format12x, F::Binary2Addr(Or)),
        Opcode::new(0xb7, "xor-int/2addr", Fm::Format12x, F::Binary2Addr(Xor)),
        Opcode::new(0xb8, "shl-int/2addr", Fm::Format12x, F::Binary2Addr(Shl)),
        Opcode::new(0xb9, "shr-int/2addr", Fm::Format12x, F::Binary2Addr(Shr)),
        Opcode::new(0xba, "ushr-int/2addr", Fm::Format12x, F::Binary2Addr(Ushr)),
        Opcode::new(0xbb, "add-long/2addr", Fm::Format12x, F::Binary2Addr(Add)).note("long"),
        Opcode::new(0xbc, "sub-long/2addr", Fm::Format12x, F::Binary2Addr(Sub)).note("long"),
        Opcode::new(0xbd, "mul-long/2addr", Fm::Format12x, F::Binary2Addr(Mul)).note("long"),
        Opcode::new(0xbe, "div-long/2addr", Fm::Format12x, F::Binary2Addr(Div)).note("long"),
        Opcode::new(0xbf, "rem-long/2addr", Fm::Format12x, F::Binary2Addr(Rem)).note("long"),
        Opcode::new(0xc0, "and-long/2addr", Fm::Format12x, F::Binary2Addr(And)).note("long"),
        Opcode::new(0xc1, "or-long/2addr", Fm::Format12x, F::Binary2Addr(Or)).note("long"),
        Opcode::new(0xc2, "xor-long/2addr", Fm::Format12x, F::Binary2Addr(Xor)).note("long"),
        Opcode::new(0xc3, "shl-long/2addr", Fm::Format12x, F::Binary2Addr(Shl)).note("long"),
        Opcode::new(0xc4, "shr-long/2addr", Fm::Format12x, F::Binary2Addr(Shr)).note("long"),
        Opcode::new(0xc5, "ushr-long/2addr", Fm::Format12x, F::Binary2Addr(Ushr)).note("long"),
        Opcode::new(0xc6, "add-float/2addr", Fm::Format12x, F::Binary2Addr(Add)).note("float"),
        Opcode::new(0xc7, "sub-float/2addr", Fm::Format12x, F::Binary2Addr(Sub)).note("float"),
        Opcode::new(0xc8, "mul-float/2addr", Fm::Format12x, F::Binary2Addr(Mul)).note("float"),
        Opcode::new(0xc9, "div-float/2addr", Fm::Format12x, F::Binary2Addr(Div)).note("float"),
        Opcode::new(0xca, "rem-float/2addr", Fm::Format12x, F::Binary2Addr(Rem)).note("float"),
        Opcode::new(0xcb, "add-double/2addr", Fm::Format12x, F::Binary2Addr(Add)).note("double"),
        Opcode::new(0xcc, "sub-double/2addr", Fm::Format12x, F::Binary2Addr(Sub)).note("double"),
        Opcode::new(0xcd, "mul-double/2addr", Fm::Format12x, F::Binary2Addr(Mul)).note("double"),
        Opcode::new(0xce, "div-double/2addr", Fm::Format12x, F::Binary2Addr(Div)).note("double"),
        Opcode::new(0xcf, "rem-double/2addr", Fm::Format12x, F::Binary2Addr(Rem)).note("double"),
        // Literal arithmetic
        Opcode::new(0xd0, "add-int/lit16", Fm::Format22s, F::BinaryLit(Add)),
        Opcode::new(0xd1, "rsub-int", Fm::Format22s, F::BinaryLit(Rsub)),
        Opcode::new(0xd2, "mul-int/lit16", Fm::Format22s, F::BinaryLit(Mul)),
        Opcode::new(0xd3, "div-int/lit16", Fm::Format22s, F::BinaryLit(Div)),
        Opcode::new(0xd4, "rem-int/lit16", Fm::Format22s, F::BinaryLit(Rem)),
        Opcode::new(0xd5, "and-int/lit16", Fm::Format22s, F::BinaryLit(And)),
        Opcode::new(0xd6, "or-int/lit16", Fm::Format22s, F::BinaryLit(Or)),
        Opcode::new(0xd7, "xor-int/lit16", Fm::Format22s, F::BinaryLit(Xor)),
        Opcode::new(0xd8, "add-int/lit8", Fm::Format22b, F::BinaryLit(Add)),
        Opcode::new(0xd9, "rsub-int/lit8", Fm::Format22b, F::BinaryLit(Rsub)),
        Opcode::new(0xda, "mul-int/lit8", Fm::Format22b, F::BinaryLit(Mul)),
        Opcode::new(0xdb, "div-int/lit8", Fm::Format22b, F::BinaryLit(Div)),
        Opcode::new(0xdc, "rem-int/lit8", Fm::Format22b, F::BinaryLit(Rem)),
        Opcode::new(0xdd, "and-int/lit8", Fm::Format22b, F::BinaryLit(And)),
        Opcode::new(0xde, "or-int/lit8", Fm::Format22b, F::BinaryLit(Or)),
        Opcode::new(0xdf, "xor-int/lit8", Fm::Format22b, F::BinaryLit(Xor)),
        Opcode::new(0xe0, "shl-int/lit8", Fm::Format22b, F::BinaryLit(Shl)),
        Opcode::new(0xe1, "shr-int/lit8", Fm::Format22b, F::BinaryLit(Shr)),
        Opcode::new(0xe2, "ushr-int/lit8", Fm::Format22b, F::BinaryLit(Ushr)),
        // 0xe3..0xf9 are unused
        // DEX 038/039 method handle families, consumed exactly but rendered opaque
        Opcode::new(0xfa, "invoke-polymorphic", Fm::Format45cc, F::Opaque),
        Opcode::new(0xfb, "invoke-polymorphic/range", Fm::Format4rcc, F::Opaque),
        Opcode::new(0xfc, "invoke-custom", Fm::Format35c, F::Opaque),
        Opcode::new(0xfd, "invoke-custom/range", Fm::Format3rc, F::Opaque),
        Opcode::new(0xfe, "const-method-handle", Fm::Format21c, F::Opaque),
        Opcode::new(0xff, "const-method-type", Fm::Format21c, F::Opaque),
    ]
});

static OPCODE_MAP: Lazy<HashMap<u8, &'static Opcode>> = Lazy::new(|| {
    let mut map: HashMap<u8, &'static Opcode> = HashMap::new();
    for op in OPCODES.iter() {
        map.insert(op.value, op);
    }
    map
});

pub(crate) fn lookup(value: u8) -> Option<&'static Opcode> {
    OPCODE_MAP.get(&value).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_no_duplicate_values() {
        assert_eq!(OPCODES.len(), OPCODE_MAP.len());
    }

    #[test]
    fn known_rows_resolve() {
        let add = lookup(0x90).unwrap();
        assert_eq!(add.name, "add-int");
        assert_eq!(add.format, Format::Format23x);
        assert_eq!(add.family, Family::Binary(BinOp::Add));

        assert!(lookup(0x3e).is_none());
        assert!(lookup(0x73).is_none());
        assert!(lookup(0xe3).is_none());
    }

    #[test]
    fn opaque_families_still_have_exact_formats() {
        let poly = lookup(0xfa).unwrap();
        assert_eq!(poly.family, Family::Opaque);
        assert_eq!(poly.format.size(), 4);
    }
}
