use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use atf_mapping::{parse_csv_row, quote_csv_cell};
use atf_types::WordPair;
use thiserror::Error;

use crate::filter::KeptPair;

pub const COL_ID_TEXT: &str = "id_text";
pub const COL_ID_WORD: &str = "id_word";
pub const COL_CDLI: &str = "tr_cdli";
pub const COL_ORACC: &str = "tr_oracc";

/// A corpus row that cannot become a [`WordPair`]; the row is skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: empty {column} cell")]
pub struct RowError {
    pub line: usize,
    pub column: &'static str,
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read corpus: {0}")]
    Io(#[from] io::Error),
    #[error("corpus has no header row")]
    MissingHeader,
    #[error("corpus header lacks required column {0:?}")]
    MissingColumn(&'static str),
    #[error("line {0} is not valid utf-8")]
    InvalidUtf8(usize),
    #[error(transparent)]
    Row(#[from] RowError),
}

impl CorpusError {
    /// Row-level problems skip one row; everything else ends the stream.
    pub fn is_row_level(&self) -> bool {
        matches!(self, CorpusError::Row(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    id_text: usize,
    id_word: usize,
    cdli: usize,
    oracc: usize,
}

impl Columns {
    fn locate(header: &[String]) -> Result<Self, CorpusError> {
        let find = |name: &'static str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(CorpusError::MissingColumn(name))
        };
        Ok(Self {
            id_text: find(COL_ID_TEXT)?,
            id_word: find(COL_ID_WORD)?,
            cdli: find(COL_CDLI)?,
            oracc: find(COL_ORACC)?,
        })
    }
}

/// Streams [`WordPair`]s out of a word-level CSV export.
///
/// Columns are located by header name, so extra columns and any column order
/// are fine. Each record must fit on one physical line.
pub struct PairReader<R> {
    reader: R,
    delimiter: u8,
    columns: Columns,
    line: usize,
    buf: Vec<u8>,
}

impl PairReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };
        Self::new(BufReader::new(File::open(path)?), delimiter)
    }
}

impl<R: BufRead> PairReader<R> {
    /// Read the header row and locate the required columns.
    pub fn new(reader: R, delimiter: u8) -> Result<Self, CorpusError> {
        let mut this = Self {
            reader,
            delimiter,
            columns: Columns {
                id_text: 0,
                id_word: 0,
                cdli: 0,
                oracc: 0,
            },
            line: 0,
            buf: Vec::new(),
        };
        let header = this.next_fields()?.ok_or(CorpusError::MissingHeader)?;
        this.columns = Columns::locate(&header)?;
        Ok(this)
    }

    /// 1-based number of the last physical line read.
    pub fn line(&self) -> usize {
        self.line
    }

    fn next_fields(&mut self) -> Result<Option<Vec<String>>, CorpusError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = std::str::from_utf8(&self.buf)
                .map_err(|_| CorpusError::InvalidUtf8(self.line))?
                .trim_end_matches(['\r', '\n']);
            if text.trim().is_empty() {
                continue;
            }
            let fields = parse_csv_row(text, self.delimiter)
                .map_err(|_| CorpusError::InvalidUtf8(self.line))?;
            return Ok(Some(fields));
        }
    }

    fn build(&self, fields: &[String]) -> Result<WordPair, RowError> {
        let cell = |idx: usize, column: &'static str| {
            fields
                .get(idx)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(RowError {
                    line: self.line,
                    column,
                })
        };
        Ok(WordPair {
            id_text: cell(self.columns.id_text, COL_ID_TEXT)?,
            id_word: cell(self.columns.id_word, COL_ID_WORD)?,
            cdli: cell(self.columns.cdli, COL_CDLI)?,
            oracc: cell(self.columns.oracc, COL_ORACC)?,
        })
    }
}

impl<R: BufRead> Iterator for PairReader<R> {
    type Item = Result<WordPair, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_fields() {
            Ok(Some(fields)) => Some(self.build(&fields).map_err(CorpusError::from)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

pub const KEPT_HEADER: [&str; 7] = [
    COL_ID_TEXT,
    COL_ID_WORD,
    COL_CDLI,
    COL_ORACC,
    "label",
    "sim_cdli_to_oracc",
    "sim_oracc_to_cdli",
];

/// Writes kept pairs as CSV with their label and similarities.
pub struct KeptWriter<W: Write> {
    out: W,
    line: String,
}

impl<W: Write> KeptWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{}", KEPT_HEADER.join(","))?;
        Ok(Self {
            out,
            line: String::new(),
        })
    }

    pub fn write(&mut self, kept: &KeptPair) -> io::Result<()> {
        let c = &kept.classification;
        let sim_ba = c.sim_ba.map(|s| format!("{s:.6}")).unwrap_or_default();
        let cells = [
            kept.pair.id_text.as_str(),
            kept.pair.id_word.as_str(),
            kept.pair.cdli.as_str(),
            kept.pair.oracc.as_str(),
            c.label.as_str(),
        ];
        self.line.clear();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                self.line.push(',');
            }
            quote_csv_cell(&mut self.line, cell);
        }
        self.line.push_str(&format!(",{:.6},{sim_ba}\n", c.sim_ab));
        self.out.write_all(self.line.as_bytes())
    }

    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
