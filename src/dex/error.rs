use thiserror::Error;

/// Faults that abort processing of the whole file. Everything softer is a
/// [`Fault`] and surfaces inline in the output instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DexError {
    #[error("invalid DEX magic {found:02x?}")]
    BadMagic { found: [u8; 8] },

    #[error("header sanity check failed: {detail}")]
    ChecksumMismatch { detail: String },

    #[error("unexpected end of buffer reading {what} at offset {offset}")]
    Truncated { what: &'static str, offset: usize },

    #[error("io error: {0}")]
    Io(String),
}

impl DexError {
    pub(crate) fn truncated(what: &'static str, offset: usize) -> Self {
        DexError::Truncated { what, offset }
    }
}

/// Recoverable faults, contained to one string, table entry, instruction or
/// method. They are counted on the enclosing [`FaultCounts`] and rendered as
/// markers or `//` annotations, never raised to the caller.
///
/// [`FaultCounts`]: crate::types::FaultCounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// A malformed MUTF-8 sequence was replaced with U+FFFD.
    StringDecodeError,
    /// An index pointed past the end of its table; the reference rendered as
    /// an explicit unknown marker such as `type@7`.
    IndexOutOfRange,
    /// An opcode byte with no table entry; one code unit consumed, one
    /// placeholder statement emitted.
    UnsupportedOpcode,
    /// A method's instruction stream ended mid-instruction; the statements
    /// decoded so far are kept.
    TruncatedStream,
}
