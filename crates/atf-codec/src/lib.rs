//! Convert CDLI (ASCII ATF) and ORACC (Unicode ATF) transliterations at the
//! word and line level.
//!
//! # How it works
//! 1. [`WordCodec`] scans a word once, recognising determinative groups
//!    (`{d}`), quantities (`1/2(disz)`) and sign runs.
//! 2. Sign runs are rewritten by greedy longest match against the shared
//!    [`MappingTable`](atf_mapping::MappingTable); index digits use its
//!    numeral sub-table.
//! 3. [`LineCodec`] applies the word codec to each whitespace-separated word,
//!    optionally copying a leading line label.
//! 4. [`clean_line`] strips editorial markup to produce a comparison form,
//!    which [`validate`] uses to score converted files against gold files.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//!
//! use atf_codec::{LineCodec, WordCodec};
//! use atf_mapping::MappingTable;
//! use atf_types::Direction;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = Arc::new(MappingTable::builtin()?);
//! let words = WordCodec::new(table);
//! assert_eq!(words.convert("lu2-{d}nin-szubur", Direction::CdliToOracc)?, "lu₂-{d}nin-šubur");
//!
//! let lines = LineCodec::new(words);
//! let line = lines.convert_line("o.1 qi₂-bi-ma", Direction::OraccToCdli, true)?;
//! assert_eq!(line, "o.1 qi2-bi-ma");
//! # Ok(()) }
//! ```
//!
//! For a runnable demo, see `cargo run -p atf-codec --example convert -- [--reverse] <word>...`.

mod line;
mod validate;
mod word;

pub use line::{ConvertedLines, LineCodec, LineError, LossyLine, clean_line, clean_word};
pub use validate::{ExtraLine, Mismatch, ValidationReport, validate};
pub use word::{
    CodecOptions, DeterminativeStyle, MalformedKind, MalformedWordError, Transliterator,
    WordCodec,
};
