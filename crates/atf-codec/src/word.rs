use std::sync::Arc;

use atf_mapping::MappingTable;
use atf_types::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CDLI_ELLIPSIS: &str = "...";
const ORACC_ELLIPSIS: &str = "…";
const MARKER: char = '⁼';

/// How determinatives are written when the target is ORACC.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminativeStyle {
    /// `{d}`, `{ki}`: the brace style of ORACC `form` fields.
    #[default]
    Braces,
    /// `d⁼`, `⁼ki`, `⁼x`: the marker style of cleaned ORACC text.
    Marker,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CodecOptions {
    /// Rewrite `...` ↔ `…`.
    pub normalize_ellipsis: bool,
    pub determinatives: DeterminativeStyle,
    /// Drop CDLI logogram underscores when converting to ORACC.
    pub strip_underscores: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            normalize_ellipsis: true,
            determinatives: DeterminativeStyle::Braces,
            strip_underscores: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum MalformedKind {
    #[error("unterminated determinative")]
    UnterminatedDeterminative,
    #[error("nested determinative")]
    NestedDeterminative,
    #[error("closing brace without determinative")]
    StrayClosingBrace,
    #[error("empty determinative")]
    EmptyDeterminative,
    #[error("unterminated unit classifier")]
    UnterminatedClassifier,
    #[error("nested unit classifier")]
    NestedClassifier,
    #[error("empty unit classifier")]
    EmptyClassifier,
}

/// A single word whose bracket structure cannot be converted.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("malformed word {word:?}: {kind}")]
pub struct MalformedWordError {
    pub word: String,
    pub kind: MalformedKind,
}

/// Anything that can convert one word between notations.
///
/// [`WordCodec`] is the real implementation; the classifier only needs this
/// seam, which keeps it testable with instrumented stand-ins.
pub trait Transliterator {
    fn transliterate(&self, word: &str, direction: Direction) -> Result<String, MalformedWordError>;
}

impl<T: Transliterator + ?Sized> Transliterator for &T {
    fn transliterate(&self, word: &str, direction: Direction) -> Result<String, MalformedWordError> {
        (**self).transliterate(word, direction)
    }
}

impl<T: Transliterator + ?Sized> Transliterator for Arc<T> {
    fn transliterate(&self, word: &str, direction: Direction) -> Result<String, MalformedWordError> {
        (**self).transliterate(word, direction)
    }
}

/// Converts single words using a shared [`MappingTable`].
///
/// A word is scanned once, left to right. Determinative groups (`{…}`) and
/// quantities (`1/2(disz)`) are recognised first; everything else is a sign
/// run rewritten by greedy longest match. Index digits after a sign become
/// subscripts (`du10` → `du₁₀`) and back. Characters with no table entry,
/// including editorial marks `# [ ] ! ? < >`, pass through unchanged.
#[derive(Clone, Debug)]
pub struct WordCodec {
    table: Arc<MappingTable>,
    options: CodecOptions,
}

impl WordCodec {
    pub fn new(table: Arc<MappingTable>) -> Self {
        Self::with_options(table, CodecOptions::default())
    }

    pub fn with_options(table: Arc<MappingTable>, options: CodecOptions) -> Self {
        Self { table, options }
    }

    pub fn table(&self) -> &Arc<MappingTable> {
        &self.table
    }

    pub fn options(&self) -> CodecOptions {
        self.options
    }

    /// Convert one word. Surrounding whitespace is trimmed; empty input gives `""`.
    pub fn convert(&self, word: &str, direction: Direction) -> Result<String, MalformedWordError> {
        let word = word.trim();
        if word.is_empty() {
            return Ok(String::new());
        }
        let stripped;
        let word = if self.options.strip_underscores
            && direction == Direction::CdliToOracc
            && word.contains('_')
        {
            stripped = word.replace('_', "");
            stripped.as_str()
        } else {
            word
        };

        let mut out = String::with_capacity(word.len() + 8);
        self.rewrite_word(word, direction, &mut out)
            .map_err(|kind| MalformedWordError {
                word: word.to_string(),
                kind,
            })?;
        Ok(out)
    }

    /// Like [`Self::convert`], mapping an absent word to `""`.
    pub fn convert_optional(
        &self,
        word: Option<&str>,
        direction: Direction,
    ) -> Result<String, MalformedWordError> {
        match word {
            Some(word) => self.convert(word, direction),
            None => Ok(String::new()),
        }
    }

    fn rewrite_word(
        &self,
        word: &str,
        direction: Direction,
        out: &mut String,
    ) -> Result<(), MalformedKind> {
        let mut rest = word;
        let mut after_sign = false;
        while let Some(c) = rest.chars().next() {
            match c {
                '{' => {
                    let (content, tail) = split_group(rest, '{', '}').map_err(|err| match err {
                        GroupError::Unterminated => MalformedKind::UnterminatedDeterminative,
                        GroupError::Nested => MalformedKind::NestedDeterminative,
                        GroupError::Empty => MalformedKind::EmptyDeterminative,
                    })?;
                    self.write_determinative(content, direction, out);
                    rest = tail;
                    after_sign = false;
                }
                '}' => return Err(MalformedKind::StrayClosingBrace),
                d if d.is_ascii_digit() && !after_sign => {
                    rest = self.write_quantity(rest, direction, out)?;
                    after_sign = false;
                }
                _ => {
                    let consumed = self.rewrite_step(rest, direction, &mut after_sign, out);
                    rest = &rest[consumed..];
                }
            }
        }
        Ok(())
    }

    /// Count passes through; a following `(…)` classifier is rewritten.
    fn write_quantity<'w>(
        &self,
        input: &'w str,
        direction: Direction,
        out: &mut String,
    ) -> Result<&'w str, MalformedKind> {
        let count_len = input
            .find(|c: char| !(c.is_ascii_digit() || c == '/'))
            .unwrap_or(input.len());
        out.push_str(&input[..count_len]);
        let rest = &input[count_len..];
        if !rest.starts_with('(') {
            return Ok(rest);
        }
        let (content, tail) = split_group(rest, '(', ')').map_err(|err| match err {
            GroupError::Unterminated => MalformedKind::UnterminatedClassifier,
            GroupError::Nested => MalformedKind::NestedClassifier,
            GroupError::Empty => MalformedKind::EmptyClassifier,
        })?;
        out.push('(');
        self.rewrite_signs(content, direction, out);
        out.push(')');
        Ok(tail)
    }

    fn write_determinative(&self, content: &str, direction: Direction, out: &mut String) {
        let mut inner = String::with_capacity(content.len() + 4);
        self.rewrite_signs(content, direction, &mut inner);
        let marker = direction == Direction::CdliToOracc
            && self.options.determinatives == DeterminativeStyle::Marker;
        if !marker {
            out.push('{');
            out.push_str(&inner);
            out.push('}');
        } else if inner == "d" {
            out.push('d');
            out.push(MARKER);
        } else {
            out.push(MARKER);
            out.push_str(&inner);
        }
    }

    /// Rewrite a plain sign sequence (no groups, no quantities).
    pub(crate) fn rewrite_signs(&self, text: &str, direction: Direction, out: &mut String) {
        let mut rest = text;
        let mut after_sign = false;
        while !rest.is_empty() {
            let consumed = self.rewrite_step(rest, direction, &mut after_sign, out);
            rest = &rest[consumed..];
        }
    }

    /// Rewrite one token at the start of `input`; returns the bytes consumed.
    fn rewrite_step(
        &self,
        input: &str,
        direction: Direction,
        after_sign: &mut bool,
        out: &mut String,
    ) -> usize {
        let numerals = self.table.numerals();

        if self.options.normalize_ellipsis {
            let (from, to) = match direction {
                Direction::CdliToOracc => (CDLI_ELLIPSIS, ORACC_ELLIPSIS),
                Direction::OraccToCdli => (ORACC_ELLIPSIS, CDLI_ELLIPSIS),
            };
            if input.starts_with(from) {
                out.push_str(to);
                *after_sign = false;
                return from.len();
            }
        }

        let Some(c) = input.chars().next() else {
            return 0;
        };

        match direction {
            Direction::CdliToOracc if c.is_ascii_digit() && *after_sign => {
                let run = input
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(input.len());
                for digit in input[..run].chars() {
                    out.push(numerals.to_subscript(digit).unwrap_or(digit));
                }
                return run;
            }
            Direction::OraccToCdli => {
                if let Some(digit) = numerals.to_digit(c) {
                    out.push(digit);
                    *after_sign = true;
                    return c.len_utf8();
                }
            }
            _ => {}
        }

        if let Some((consumed, value)) = self.table.signs(direction).longest_match(input) {
            out.push_str(value);
            *after_sign = true;
            return consumed;
        }

        out.push(c);
        *after_sign = is_sign_char(c);
        c.len_utf8()
    }
}

impl Transliterator for WordCodec {
    fn transliterate(&self, word: &str, direction: Direction) -> Result<String, MalformedWordError> {
        self.convert(word, direction)
    }
}

/// Characters after which a digit run is a sign index rather than a count.
fn is_sign_char(c: char) -> bool {
    c.is_alphabetic() || c == ',' || c == '\''
}

enum GroupError {
    Unterminated,
    Nested,
    Empty,
}

/// Split `open content close tail` at the start of `input`.
fn split_group(input: &str, open: char, close: char) -> Result<(&str, &str), GroupError> {
    let body = &input[open.len_utf8()..];
    for (idx, c) in body.char_indices() {
        if c == open {
            return Err(GroupError::Nested);
        }
        if c == close {
            if idx == 0 {
                return Err(GroupError::Empty);
            }
            return Ok((&body[..idx], &body[idx + close.len_utf8()..]));
        }
    }
    Err(GroupError::Unterminated)
}
