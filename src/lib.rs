//! # dexview
//!
//! A library for reading Android DEX files and rendering each class as a
//! block of readable pseudo-code.
//!
//! Parsing is strict about file structure (bad magic or inconsistent header
//! sizes reject the whole file) and lenient about content: malformed
//! strings, dangling table indices, unknown opcodes and truncated method
//! bodies degrade to inline markers and are tallied in
//! [`types::FaultCounts`] instead of failing the call.
//!
//! ```no_run
//! use std::path::Path;
//! use dexview::dex::DexFile;
//!
//! let dex = DexFile::from_file(Path::new("classes.dex")).unwrap();
//! let out = dex.to_pseudocode(None);
//! for class in &out.classes {
//!     println!("{}", class.text());
//! }
//! ```

pub mod dex;
mod pseudocode;
mod tests;
pub mod types;

use std::collections::HashSet;

use crate::dex::{DexError, DexFile};
use crate::types::Decompilation;

/// Parses one DEX buffer and synthesizes pseudo-code for every class.
pub fn decompile(bytes: &[u8]) -> Result<Decompilation, DexError> {
    Ok(DexFile::from_bytes(bytes)?.to_pseudocode(None))
}

/// Like [`decompile`], but only synthesizes the classes whose descriptor is
/// in `filter`.
pub fn decompile_filtered(bytes: &[u8], filter: &HashSet<String>) -> Result<Decompilation, DexError> {
    Ok(DexFile::from_bytes(bytes)?.to_pseudocode(Some(filter)))
}
