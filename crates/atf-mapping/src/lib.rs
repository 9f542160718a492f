//! Load the CDLI/ORACC reference sign table and answer longest-match lookups.
//!
//! The table is a small delimited file: one `(cdli, oracc)` pair per row, a
//! header row whose content is ignored, `#` comment lines, and RFC-4180
//! quoting so that CDLI tokens such as `s,` survive the comma delimiter.
//! A copy ships with the crate and is available through
//! [`MappingTable::builtin`].
//!
//! Loading splits the rows in two:
//! - **sign maps** ([`SignMap`]), one per [`Direction`], consulted
//!   longest-key-first so `sz` wins over any shorter key at the same position;
//! - the **numeral sub-table** ([`NumeralTable`]) built from rows whose CDLI
//!   token is a single ASCII digit, used only for sign indices (`du10` ↔
//!   `du₁₀`).
//!
//! The table is immutable once built; wrap it in an `Arc` and share it across
//! threads.
//!
//! # Example
//! ```
//! use atf_mapping::MappingTable;
//! use atf_types::Direction;
//!
//! # fn main() -> Result<(), atf_mapping::MappingError> {
//! let table = MappingTable::builtin()?;
//! let signs = table.signs(Direction::CdliToOracc);
//! assert_eq!(signs.longest_match("szu"), Some((2, "š")));
//! assert_eq!(table.numerals().to_subscript('3'), Some('₃'));
//! # Ok(()) }
//! ```

mod row;

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use atf_types::{Direction, MappingEntry, Notation};
use thiserror::Error;
use tracing::{debug, info};

pub use row::{parse_csv_row, quote_csv_cell};

const BUILTIN_TABLE: &str = include_str!("../data/atf_conventions.csv");

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read mapping table: {0}")]
    Io(#[from] io::Error),
    #[error("malformed reference data at row {row}: {reason}")]
    MalformedReferenceData { row: usize, reason: MalformedReason },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("missing {0} token")]
    MissingToken(Notation),
    #[error("duplicate {notation} key {key:?}")]
    DuplicateKey { notation: Notation, key: String },
    #[error("numeral {digit:?} must map to a single character, got {value:?}")]
    BadNumeral { digit: String, value: String },
    #[error("row is not valid utf-8")]
    InvalidUtf8,
}

fn malformed(row: usize, reason: MalformedReason) -> MappingError {
    MappingError::MalformedReferenceData { row, reason }
}

/// Lookup for one direction, keyed by source token.
#[derive(Debug, Clone, Default)]
pub struct SignMap {
    lookup: HashMap<String, String>,
    keys_by_len: Vec<String>,
    max_key_chars: usize,
}

impl SignMap {
    fn new(lookup: HashMap<String, String>) -> Self {
        let mut keys_by_len: Vec<String> = lookup.keys().cloned().collect();
        keys_by_len.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        let max_key_chars = keys_by_len
            .first()
            .map(|k| k.chars().count())
            .unwrap_or(0);
        Self {
            lookup,
            keys_by_len,
            max_key_chars,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Keys ordered by character count, longest first (ties alphabetical).
    pub fn keys_by_length_desc(&self) -> impl Iterator<Item = &str> + '_ {
        self.keys_by_len.iter().map(String::as_str)
    }

    /// Longest key that is a prefix of `input`, as `(bytes consumed, replacement)`.
    pub fn longest_match(&self, input: &str) -> Option<(usize, &str)> {
        let mut end = input
            .char_indices()
            .nth(self.max_key_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(input.len());
        while end > 0 {
            if let Some(value) = self.lookup.get(&input[..end]) {
                return Some((end, value.as_str()));
            }
            end = input[..end]
                .char_indices()
                .next_back()
                .map(|(idx, _)| idx)
                .unwrap_or(0);
        }
        None
    }
}

/// ASCII index digit ↔ subscript digit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumeralTable {
    subscripts: [Option<char>; 10],
}

impl NumeralTable {
    pub fn to_subscript(&self, digit: char) -> Option<char> {
        let idx = digit.to_digit(10)? as usize;
        self.subscripts[idx]
    }

    pub fn to_digit(&self, subscript: char) -> Option<char> {
        let idx = self.subscripts.iter().position(|s| *s == Some(subscript))?;
        char::from_digit(idx as u32, 10)
    }

    pub fn is_subscript(&self, c: char) -> bool {
        self.subscripts.contains(&Some(c))
    }

    /// Number of digits with a subscript form.
    pub fn len(&self) -> usize {
        self.subscripts.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable reference table: sign maps for both directions plus numerals.
#[derive(Debug, Clone)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
    forward: SignMap,
    reverse: SignMap,
    numerals: NumeralTable,
}

impl MappingTable {
    /// Parse the table bundled with this crate.
    pub fn builtin() -> Result<Self, MappingError> {
        let table = Self::from_reader(BUILTIN_TABLE.as_bytes(), b',')?;
        debug!("loaded {} builtin mapping entries", table.len());
        Ok(table)
    }

    /// Load a table from disk. Files ending in `.tsv` are tab-delimited.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };
        let file = File::open(path)?;
        let table = Self::from_reader(BufReader::new(file), delimiter)?;
        info!(
            "loaded {} mapping entries ({} numerals) from {}",
            table.len(),
            table.numerals.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse a table from any buffered source. Row numbers in errors are
    /// 1-based physical line numbers.
    pub fn from_reader<R: BufRead>(reader: R, delimiter: u8) -> Result<Self, MappingError> {
        let mut rows = Vec::new();
        let mut seen_header = false;
        for (lineno, line) in reader.split(b'\n').enumerate() {
            let row = lineno + 1;
            let bytes = line?;
            let text =
                std::str::from_utf8(&bytes).map_err(|_| malformed(row, MalformedReason::InvalidUtf8))?;
            let text = text.trim_end_matches('\r');
            if text.trim().is_empty() || text.starts_with('#') {
                continue;
            }
            if !seen_header {
                seen_header = true;
                continue;
            }
            let fields = parse_csv_row(text, delimiter)
                .map_err(|_| malformed(row, MalformedReason::InvalidUtf8))?;
            let mut fields = fields.into_iter();
            let cdli = fields.next().unwrap_or_default();
            let oracc = fields.next().unwrap_or_default();
            rows.push((row, MappingEntry::new(cdli, oracc)));
        }
        Self::build(rows)
    }

    /// Build from in-memory entries; positions (1-based) stand in for rows.
    pub fn from_entries(
        entries: impl IntoIterator<Item = MappingEntry>,
    ) -> Result<Self, MappingError> {
        let rows = entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| (idx + 1, entry))
            .collect();
        Self::build(rows)
    }

    fn build(rows: Vec<(usize, MappingEntry)>) -> Result<Self, MappingError> {
        let mut forward = HashMap::new();
        let mut reverse = HashMap::new();
        let mut seen_cdli = HashSet::new();
        let mut seen_oracc = HashSet::new();
        let mut numerals: Vec<(usize, char)> = Vec::new();
        let mut entries = Vec::with_capacity(rows.len());

        for (row, entry) in rows {
            if entry.cdli.trim().is_empty() {
                return Err(malformed(row, MalformedReason::MissingToken(Notation::Cdli)));
            }
            if entry.oracc.trim().is_empty() {
                return Err(malformed(row, MalformedReason::MissingToken(Notation::Oracc)));
            }
            if !seen_cdli.insert(entry.cdli.clone()) {
                return Err(malformed(
                    row,
                    MalformedReason::DuplicateKey {
                        notation: Notation::Cdli,
                        key: entry.cdli,
                    },
                ));
            }
            if !seen_oracc.insert(entry.oracc.clone()) {
                return Err(malformed(
                    row,
                    MalformedReason::DuplicateKey {
                        notation: Notation::Oracc,
                        key: entry.oracc,
                    },
                ));
            }

            if let Some(digit) = single_ascii_digit(&entry.cdli) {
                let mut chars = entry.oracc.chars();
                match (chars.next(), chars.next()) {
                    (Some(sub), None) => numerals.push((digit, sub)),
                    _ => {
                        return Err(malformed(
                            row,
                            MalformedReason::BadNumeral {
                                digit: entry.cdli,
                                value: entry.oracc,
                            },
                        ));
                    }
                }
            } else {
                forward.insert(entry.cdli.clone(), entry.oracc.clone());
                reverse.insert(entry.oracc.clone(), entry.cdli.clone());
            }
            entries.push(entry);
        }

        let subscripts = array_init::array_init(|digit| {
            numerals
                .iter()
                .find(|(d, _)| *d == digit)
                .map(|(_, sub)| *sub)
        });

        Ok(Self {
            entries,
            forward: SignMap::new(forward),
            reverse: SignMap::new(reverse),
            numerals: NumeralTable { subscripts },
        })
    }

    /// Sign map whose keys are written in `direction`'s source notation.
    pub fn signs(&self, direction: Direction) -> &SignMap {
        match direction {
            Direction::CdliToOracc => &self.forward,
            Direction::OraccToCdli => &self.reverse,
        }
    }

    pub fn numerals(&self) -> &NumeralTable {
        &self.numerals
    }

    /// CDLI sign keys, longest first. Numerals live in [`Self::numerals`].
    pub fn forward_keys_by_length_desc(&self) -> impl Iterator<Item = &str> + '_ {
        self.forward.keys_by_length_desc()
    }

    /// ORACC sign keys, longest first.
    pub fn reverse_keys_by_length_desc(&self) -> impl Iterator<Item = &str> + '_ {
        self.reverse.keys_by_length_desc()
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn single_ascii_digit(token: &str) -> Option<usize> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_digit(10).map(|d| d as usize),
        _ => None,
    }
}
