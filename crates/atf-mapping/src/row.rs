use std::string::FromUtf8Error;

use csv_core::{ReadFieldResult, ReaderBuilder, WriteResult, Writer};

/// Split one delimited row into its fields, honouring double-quote quoting.
///
/// ```
/// # use atf_mapping::parse_csv_row;
/// let fields = parse_csv_row("\"s,\",ṣ", b',').unwrap();
/// assert_eq!(fields, vec!["s,", "ṣ"]);
/// ```
pub fn parse_csv_row(row: &str, delimiter: u8) -> Result<Vec<String>, FromUtf8Error> {
    let mut fields = Vec::new();
    let mut rdr = ReaderBuilder::new().delimiter(delimiter).build();
    let mut input = row.trim_end_matches(['\r', '\n']).as_bytes();
    let mut field = Vec::new();
    let mut output = [0u8; 1024];
    loop {
        let (result, nin, nout) = rdr.read_field(input, &mut output);
        input = &input[nin..];
        field.extend_from_slice(&output[..nout]);
        match result {
            // Empty input on the next call signals end of row.
            ReadFieldResult::InputEmpty | ReadFieldResult::OutputFull => continue,
            ReadFieldResult::Field { record_end } => {
                fields.push(String::from_utf8(std::mem::take(&mut field))?);
                if record_end {
                    break;
                }
            }
            ReadFieldResult::End => break,
        }
    }
    Ok(fields)
}

/// Append `data` to `out` as one CSV cell, quoting it when needed.
pub fn quote_csv_cell(out: &mut String, data: &str) {
    let mut writer = Writer::new();
    let mut input = data.as_bytes();
    let mut buf = Vec::new();
    let mut output = [0u8; 1024];
    loop {
        let (result, nin, nout) = writer.field(input, &mut output);
        buf.extend_from_slice(&output[..nout]);
        input = &input[nin..];
        if result == WriteResult::InputEmpty {
            break;
        }
    }
    let (_, nout) = writer.finish(&mut output);
    buf.extend_from_slice(&output[..nout]);
    // The writer only adds ASCII quotes around valid UTF-8 input.
    out.push_str(&String::from_utf8_lossy(&buf));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_and_quoted_fields() {
        assert_eq!(parse_csv_row("sz,š", b',').unwrap(), vec!["sz", "š"]);
        assert_eq!(
            parse_csv_row("\"t,\",ṭ,extra\r\n", b',').unwrap(),
            vec!["t,", "ṭ", "extra"]
        );
        assert_eq!(parse_csv_row("a\tb", b'\t').unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn trailing_delimiter_yields_empty_field() {
        assert_eq!(parse_csv_row("sz,", b',').unwrap(), vec!["sz", ""]);
    }

    #[test]
    fn empty_row_has_no_fields() {
        assert!(parse_csv_row("", b',').unwrap().is_empty());
    }

    #[test]
    fn quotes_cells_with_commas() {
        let mut out = String::new();
        quote_csv_cell(&mut out, "s,e");
        out.push(',');
        quote_csv_cell(&mut out, "šu");
        assert_eq!(out, "\"s,e\",šu");
        assert_eq!(parse_csv_row(&out, b',').unwrap(), vec!["s,e", "šu"]);
    }
}
