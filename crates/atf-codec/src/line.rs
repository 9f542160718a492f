use atf_types::Direction;
use thiserror::Error;

use crate::word::{MalformedWordError, WordCodec};

const STRIPPED_MARKS: [char; 8] = ['#', '[', ']', '!', '?', '<', '>', '_'];

/// A line that could not be converted because one of its words is malformed.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{}cannot convert word {:?}", line_prefix(.line), .source.word)]
pub struct LineError {
    /// 1-based position in the input stream, when known.
    pub line: Option<usize>,
    #[source]
    pub source: MalformedWordError,
}

fn line_prefix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!("line {n}: "),
        None => String::new(),
    }
}

/// Output of [`LineCodec::convert_line_lossy`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LossyLine {
    pub text: String,
    /// Words copied through unconverted, in line order.
    pub skipped: Vec<MalformedWordError>,
}

fn push_word(out: &mut String, word: &str) {
    if word.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(word);
}

/// Applies a [`WordCodec`] to whitespace-separated words of a line.
#[derive(Clone, Debug)]
pub struct LineCodec {
    words: WordCodec,
}

impl LineCodec {
    pub fn new(words: WordCodec) -> Self {
        Self { words }
    }

    pub fn word_codec(&self) -> &WordCodec {
        &self.words
    }

    /// Convert every word of `line`. With `has_label`, the first token is
    /// copied verbatim. Words are rejoined with single spaces.
    pub fn convert_line(
        &self,
        line: &str,
        direction: Direction,
        has_label: bool,
    ) -> Result<String, LineError> {
        let mut tokens = line.split_whitespace();
        let mut out = String::with_capacity(line.len() + 8);
        if has_label && let Some(label) = tokens.next() {
            out.push_str(label);
        }
        for token in tokens {
            let word = self
                .words
                .convert(token, direction)
                .map_err(|source| LineError { line: None, source })?;
            push_word(&mut out, &word);
        }
        Ok(out)
    }

    /// Like [`Self::convert_line`], but a malformed word is copied through
    /// unchanged while the rest of the line is still converted.
    pub fn convert_line_lossy(&self, line: &str, direction: Direction, has_label: bool) -> LossyLine {
        let mut tokens = line.split_whitespace();
        let mut lossy = LossyLine {
            text: String::with_capacity(line.len() + 8),
            skipped: Vec::new(),
        };
        if has_label && let Some(label) = tokens.next() {
            lossy.text.push_str(label);
        }
        for token in tokens {
            match self.words.convert(token, direction) {
                Ok(word) => push_word(&mut lossy.text, &word),
                Err(err) => {
                    push_word(&mut lossy.text, token);
                    lossy.skipped.push(err);
                }
            }
        }
        lossy
    }

    /// Lazily convert a stream of lines. Each line is independent, so the
    /// sequence can be restarted by cloning it before iteration.
    pub fn convert_lines<I>(
        &self,
        lines: I,
        direction: Direction,
        has_label: bool,
    ) -> ConvertedLines<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        ConvertedLines {
            codec: self.clone(),
            lines: lines.into_iter(),
            direction,
            has_label,
            lineno: 0,
        }
    }
}

/// Iterator returned by [`LineCodec::convert_lines`].
#[derive(Clone, Debug)]
pub struct ConvertedLines<I> {
    codec: LineCodec,
    lines: I,
    direction: Direction,
    has_label: bool,
    lineno: usize,
}

impl<I> Iterator for ConvertedLines<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Result<String, LineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        self.lineno += 1;
        let lineno = self.lineno;
        Some(
            self.codec
                .convert_line(line.as_ref(), self.direction, self.has_label)
                .map_err(|err| LineError {
                    line: Some(lineno),
                    ..err
                }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.lines.size_hint()
    }
}

/// Strip editorial and damage markup from one word and write determinatives
/// in marker form (`{d}` → `d⁼`, `{ki}` → `⁼ki`, `{x}` → `⁼x`).
pub fn clean_word(word: &str) -> String {
    let bare: String = word
        .trim()
        .chars()
        .filter(|c| !STRIPPED_MARKS.contains(c))
        .collect();
    if !bare.contains(['{', '}']) {
        return bare;
    }
    bare.replace("{d}", "d⁼")
        .replace("{ki}", "⁼ki")
        .replace('{', "⁼")
        .replace('}', "")
}

/// Canonical comparison form of a line. Never fails; words left empty by
/// cleaning are dropped.
pub fn clean_line(line: &str, has_label: bool) -> String {
    let mut tokens = line.split_whitespace();
    let mut out = String::with_capacity(line.len());
    if has_label && let Some(label) = tokens.next() {
        out.push_str(label);
    }
    for token in tokens {
        push_word(&mut out, &clean_word(token));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use atf_mapping::MappingTable;

    use super::*;
    use crate::word::MalformedKind;

    fn codec() -> LineCodec {
        LineCodec::new(WordCodec::new(Arc::new(MappingTable::builtin().unwrap())))
    }

    #[test]
    fn label_is_copied_verbatim() {
        let line = "P359065:obverse.1.3  qi₂-bi-ma\tšu ";
        assert_eq!(
            codec()
                .convert_line(line, Direction::OraccToCdli, true)
                .unwrap(),
            "P359065:obverse.1.3 qi2-bi-ma szu"
        );
    }

    #[test]
    fn without_label_every_token_is_a_word() {
        assert_eq!(
            codec()
                .convert_line("sza3 gu4 ...", Direction::CdliToOracc, false)
                .unwrap(),
            "ša₃ gu₄ …"
        );
    }

    #[test]
    fn label_only_and_blank_lines() {
        let codec = codec();
        assert_eq!(
            codec.convert_line("o.1", Direction::CdliToOracc, true).unwrap(),
            "o.1"
        );
        assert_eq!(
            codec.convert_line("   ", Direction::CdliToOracc, true).unwrap(),
            ""
        );
    }

    #[test]
    fn malformed_word_fails_the_line() {
        let err = codec()
            .convert_line("o.2 lugal {d-utu", Direction::CdliToOracc, true)
            .unwrap_err();
        assert_eq!(err.line, None);
        assert_eq!(err.source.word, "{d-utu");
        assert_eq!(err.source.kind, MalformedKind::UnterminatedDeterminative);
    }

    #[test]
    fn lossy_conversion_keeps_the_rest_of_the_line() {
        let lossy = codec().convert_line_lossy("o.2 szu {d-utu gu4", Direction::CdliToOracc, true);
        assert_eq!(lossy.text, "o.2 šu {d-utu gu₄");
        assert_eq!(lossy.skipped.len(), 1);
        assert_eq!(lossy.skipped[0].word, "{d-utu");

        let clean = codec().convert_line_lossy("o.3 gu4", Direction::CdliToOracc, true);
        assert_eq!(clean.text, "o.3 gu₄");
        assert!(clean.skipped.is_empty());
    }

    #[test]
    fn line_error_names_the_cause_once() {
        use std::error::Error as _;

        let err = codec()
            .convert_line("o.2 {d-utu", Direction::CdliToOracc, true)
            .unwrap_err();
        let shown = err.to_string();
        assert!(!shown.contains("unterminated"), "{shown}");
        let cause = err.source().unwrap().to_string();
        assert!(cause.contains("unterminated determinative"), "{cause}");
    }

    #[test]
    fn converted_lines_report_position_and_continue() {
        let input = vec!["o.1 szu", "o.2 1(disz", "o.3 gu4"];
        let lines = codec().convert_lines(input, Direction::CdliToOracc, true);
        let replay = lines.clone();
        let results: Vec<_> = lines.collect();
        assert_eq!(results[0].as_deref(), Ok("o.1 šu"));
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.line, Some(2));
        assert_eq!(err.to_string(), "line 2: cannot convert word \"1(disz\"");
        assert_eq!(results[2].as_deref(), Ok("o.3 gu₄"));
        assert_eq!(replay.count(), 3);
    }

    #[test]
    fn clean_strips_markup() {
        assert_eq!(clean_word("[szu]-ni#"), "szu-ni");
        assert_eq!(clean_word("_lugal_-e!?"), "lugal-e");
        assert_eq!(clean_word("{d}en-lil2"), "d⁼en-lil2");
        assert_eq!(clean_word("nibru{ki}"), "nibru⁼ki");
        assert_eq!(clean_word("{gesz}tukul"), "⁼gesztukul");
        assert_eq!(clean_word("{d"), "⁼d");
        assert_eq!(clean_word("[...]"), "...");
    }

    #[test]
    fn clean_line_keeps_label_and_drops_empty_words() {
        assert_eq!(
            clean_line("o.1 [x] # <szu>  {d}utu", true),
            "o.1 x szu d⁼utu"
        );
        assert_eq!(clean_line("o.1 [] #", true), "o.1");
        assert_eq!(clean_line("[a]", false), "a");
    }
}
