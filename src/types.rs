use serde::Serialize;

use crate::dex::Fault;

/// Per-scope tally of the recoverable faults, kept alongside the output so
/// callers that want strict validation can reject files or methods that
/// needed degradation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaultCounts {
    pub string_decode: u32,
    pub index_out_of_range: u32,
    pub unsupported_opcode: u32,
    pub truncated_stream: u32,
}

impl FaultCounts {
    pub fn record(&mut self, fault: Fault) {
        match fault {
            Fault::StringDecodeError => self.string_decode += 1,
            Fault::IndexOutOfRange => self.index_out_of_range += 1,
            Fault::UnsupportedOpcode => self.unsupported_opcode += 1,
            Fault::TruncatedStream => self.truncated_stream += 1,
        }
    }

    pub fn absorb(&mut self, other: &FaultCounts) {
        self.string_decode += other.string_decode;
        self.index_out_of_range += other.index_out_of_range;
        self.unsupported_opcode += other.unsupported_opcode;
        self.truncated_stream += other.truncated_stream;
    }

    pub fn total(&self) -> u32 {
        self.string_decode + self.index_out_of_range + self.unsupported_opcode + self.truncated_stream
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

/// One line of pseudo-code, tagged with the byte offset of the instruction
/// it was synthesized from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub addr: usize,
    pub text: String,
}

/// The rendered statements of one method, in instruction order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodBlock {
    /// Display form `owner.name(params)return`.
    pub name: String,
    pub statements: Vec<Statement>,
    pub faults: FaultCounts,
}

/// One class worth of output: the descriptor plus its method blocks in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassOutput {
    pub name: String,
    pub methods: Vec<MethodBlock>,
}

impl ClassOutput {
    /// Renders the literal text block:
    ///
    /// ```text
    /// Class: <descriptor>
    /// {
    ///   <statement>
    ///   ...
    /// }
    /// ```
    ///
    /// Method blocks are separated by a single blank line.
    pub fn text(&self) -> String {
        let mut out = format!("Class: {}\n{{\n", self.name);
        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for statement in &method.statements {
                out.push_str("  ");
                out.push_str(&statement.text);
                out.push('\n');
            }
        }
        out.push_str("}\n");
        out
    }

    /// Faults across all method blocks of this class.
    pub fn faults(&self) -> FaultCounts {
        let mut total = FaultCounts::default();
        for m in &self.methods {
            total.absorb(&m.faults);
        }
        total
    }
}

/// Everything produced from one DEX buffer: class blocks in class_defs
/// order, plus the file-level fault tally (table faults and all per-method
/// faults combined).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decompilation {
    pub classes: Vec<ClassOutput>,
    pub faults: FaultCounts,
}
