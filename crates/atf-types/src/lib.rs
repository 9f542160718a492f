//! Shared types for converting cuneiform transliterations between the CDLI and
//! ORACC flavours of ATF, and for auditing word pairs drawn from both corpora.
//!
//! CDLI ("canonical" ATF) is ASCII-only: `sz`, `s,`, `t,`, `h`, `j`, plain
//! index digits (`du10`) and `...` for gaps. ORACC writes the same readings
//! with Unicode: `š`, `ṣ`, `ṭ`, `ḫ`, `ŋ`, subscript indices (`du₁₀`) and `…`.
//!
//! Use [`Direction`] to pick a conversion, [`MappingEntry`] for rows of the
//! reference table, [`WordPair`] for one aligned corpus row, and
//! [`Thresholds`] / [`Label`] for alignment-quality classification.
//!
//! ```rust
//! use atf_types::{Direction, Label, Notation, Thresholds};
//!
//! let dir = Direction::from_name("cdli-to-oracc").unwrap();
//! assert_eq!(dir.target(), Notation::Oracc);
//! assert_eq!(dir.reverse(), Direction::OraccToCdli);
//! assert!(Thresholds::default().validate().is_ok());
//! assert!(Label::ConversionIssue.is_kept());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two transliteration conventions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Notation {
    /// ASCII ATF as used by CDLI.
    Cdli,
    /// Unicode ATF as used by ORACC.
    Oracc,
}

impl Notation {
    /// Parse a notation name (`cdli`/`ascii`, `oracc`/`unicode`), case-insensitive.
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cdli" | "ascii" => Some(Notation::Cdli),
            "oracc" | "unicode" => Some(Notation::Oracc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Notation::Cdli => "cdli",
            Notation::Oracc => "oracc",
        }
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion direction between the two notations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    CdliToOracc,
    OraccToCdli,
}

impl Direction {
    /// Parse `cdli-to-oracc`, `cdli2oracc`, `c2o` (and the mirrored forms).
    pub fn from_name(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase().replace('_', "-");
        match lowered.as_str() {
            "cdli-to-oracc" | "cdli2oracc" | "c2o" => Some(Direction::CdliToOracc),
            "oracc-to-cdli" | "oracc2cdli" | "o2c" => Some(Direction::OraccToCdli),
            _ => None,
        }
    }

    pub fn source(self) -> Notation {
        match self {
            Direction::CdliToOracc => Notation::Cdli,
            Direction::OraccToCdli => Notation::Oracc,
        }
    }

    pub fn target(self) -> Notation {
        self.reverse().source()
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::CdliToOracc => Direction::OraccToCdli,
            Direction::OraccToCdli => Direction::CdliToOracc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::CdliToOracc => "cdli-to-oracc",
            Direction::OraccToCdli => "oracc-to-cdli",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the reference mapping table.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MappingEntry {
    pub cdli: String,
    pub oracc: String,
}

impl MappingEntry {
    pub fn new(cdli: impl Into<String>, oracc: impl Into<String>) -> Self {
        Self {
            cdli: cdli.into(),
            oracc: oracc.into(),
        }
    }

    /// Token looked up when converting in `direction`.
    pub fn key(&self, direction: Direction) -> &str {
        self.token(direction.source())
    }

    /// Token emitted when converting in `direction`.
    pub fn value(&self, direction: Direction) -> &str {
        self.token(direction.target())
    }

    pub fn token(&self, notation: Notation) -> &str {
        match notation {
            Notation::Cdli => &self.cdli,
            Notation::Oracc => &self.oracc,
        }
    }
}

/// One aligned row of the word-level corpus.
///
/// Rows come from joining the CDLI line transliterations with the ORACC
/// lemmatised forms by position, so a pair is only a *claim* that both forms
/// are the same word.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WordPair {
    pub id_text: String,
    pub id_word: String,
    pub cdli: String,
    pub oracc: String,
}

impl WordPair {
    pub fn new(
        id_text: impl Into<String>,
        id_word: impl Into<String>,
        cdli: impl Into<String>,
        oracc: impl Into<String>,
    ) -> Self {
        Self {
            id_text: id_text.into(),
            id_word: id_word.into(),
            cdli: cdli.into(),
            oracc: oracc.into(),
        }
    }

    /// Form written in `notation`.
    pub fn form(&self, notation: Notation) -> &str {
        match notation {
            Notation::Cdli => &self.cdli,
            Notation::Oracc => &self.oracc,
        }
    }
}

/// Alignment-quality bucket for a word pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Exact,
    High,
    ConversionIssue,
    LikelyMisaligned,
}

impl Label {
    pub const ALL: [Label; 4] = [
        Label::Exact,
        Label::High,
        Label::ConversionIssue,
        Label::LikelyMisaligned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Exact => "exact",
            Label::High => "high",
            Label::ConversionIssue => "conversion_issue",
            Label::LikelyMisaligned => "likely_misaligned",
        }
    }

    /// Whether the cleaning filter keeps pairs carrying this label.
    pub fn is_kept(self) -> bool {
        !matches!(self, Label::LikelyMisaligned)
    }

    /// Position in [`Label::ALL`], handy for fixed-size counters.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Similarity cut-offs used by the classifier.
///
/// Comparisons against `high` and `likely_misaligned` use `>=` / `<`, so a
/// score sitting exactly on a threshold lands in the better bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub exact: f64,
    pub high: f64,
    pub likely_misaligned: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            exact: 1.0,
            high: 0.95,
            likely_misaligned: 0.30,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("exact threshold must be 1.0, got {0}")]
    Exact(f64),
    #[error("thresholds must satisfy 0 < likely_misaligned < high < exact (got {likely_misaligned} / {high})")]
    Order { likely_misaligned: f64, high: f64 },
}

impl Thresholds {
    /// Build validated thresholds with `exact = 1.0`.
    pub fn new(high: f64, likely_misaligned: f64) -> Result<Self, ThresholdError> {
        let thresholds = Self {
            exact: 1.0,
            high,
            likely_misaligned,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.exact != 1.0 {
            return Err(ThresholdError::Exact(self.exact));
        }
        let ordered = 0.0 < self.likely_misaligned
            && self.likely_misaligned < self.high
            && self.high < self.exact;
        if !ordered {
            return Err(ThresholdError::Order {
                likely_misaligned: self.likely_misaligned,
                high: self.high,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_names_round_trip() {
        for dir in [Direction::CdliToOracc, Direction::OraccToCdli] {
            assert_eq!(Direction::from_name(dir.as_str()), Some(dir));
        }
        assert_eq!(Direction::from_name("C2O"), Some(Direction::CdliToOracc));
        assert_eq!(Direction::from_name("oracc_to_cdli"), Some(Direction::OraccToCdli));
        assert_eq!(Direction::from_name("sideways"), None);
    }

    #[test]
    fn entry_key_follows_direction() {
        let entry = MappingEntry::new("sz", "š");
        assert_eq!(entry.key(Direction::CdliToOracc), "sz");
        assert_eq!(entry.value(Direction::CdliToOracc), "š");
        assert_eq!(entry.key(Direction::OraccToCdli), "š");
    }

    #[test]
    fn thresholds_reject_bad_order() {
        assert!(Thresholds::new(0.95, 0.30).is_ok());
        assert!(Thresholds::new(0.30, 0.95).is_err());
        assert!(Thresholds::new(1.0, 0.30).is_err());
        assert!(Thresholds::new(0.95, 0.0).is_err());
        let bad_exact = Thresholds {
            exact: 0.99,
            ..Thresholds::default()
        };
        assert_eq!(bad_exact.validate(), Err(ThresholdError::Exact(0.99)));
    }

    #[test]
    fn labels_serialize_snake_case() {
        let json = serde_json::to_string(&Label::LikelyMisaligned).unwrap();
        assert_eq!(json, "\"likely_misaligned\"");
        assert!(!Label::LikelyMisaligned.is_kept());
        assert_eq!(Label::ALL[Label::High.index()], Label::High);
    }
}
