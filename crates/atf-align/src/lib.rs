//! Audit CDLI/ORACC word pairs: are both forms the same word, or did the
//! positional join pair up different words?
//!
//! The codec is the oracle. Each form is converted into the other notation
//! and compared with its partner by normalised edit-distance similarity
//! ([`similarity`]). [`SimilarityClassifier`] turns the two scores into a
//! [`Label`](atf_types::Label); [`CleaningFilter`] adds a garbage-token
//! pre-check and keeps every pair not labelled `likely_misaligned`.
//!
//! For corpus-scale runs, [`PairReader`] streams pairs out of the word-level
//! CSV and [`BatchRunner`] classifies them chunk by chunk on the rayon pool,
//! preserving input order and honouring a [`CancelToken`] between chunks.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//!
//! use atf_align::{CleaningFilter, FilterConfig};
//! use atf_codec::WordCodec;
//! use atf_mapping::MappingTable;
//! use atf_types::{Label, WordPair};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = WordCodec::new(Arc::new(MappingTable::builtin()?));
//! let filter = CleaningFilter::new(codec, FilterConfig::default());
//! let outcome = filter.filter([
//!     WordPair::new("P1", "1", "lu2-{d}nin-szubur", "lu₂-{d}nin-šubur"),
//!     WordPair::new("P1", "2", "dumu", "dumu]-er-s,e-tim"),
//! ]);
//! assert_eq!(outcome.kept.len(), 1);
//! assert_eq!(outcome.counts.label(Label::LikelyMisaligned), 1);
//! # Ok(()) }
//! ```

mod batch;
mod classify;
mod corpus;
mod filter;
mod similarity;

pub use batch::{BatchConfig, BatchError, BatchRunner, BatchSummary, CancelToken, DEFAULT_CHUNK_SIZE};
pub use classify::{Classification, SimilarityClassifier, label_for};
pub use corpus::{
    COL_CDLI, COL_ID_TEXT, COL_ID_WORD, COL_ORACC, CorpusError, KEPT_HEADER, KeptWriter,
    PairReader, RowError,
};
pub use filter::{
    CleaningFilter, DEFAULT_GARBAGE_TOKENS, FilterConfig, FilterCounts, FilterOutcome, KeepMask,
    KeptPair, Verdict,
};
pub use similarity::{edit_distance, similarity};
