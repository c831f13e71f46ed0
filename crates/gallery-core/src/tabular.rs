//! Tabular text parsing: header row → field names, one map per data row.
//!
//! A thin layer over the `csv` crate that reports problems per row instead of
//! failing the whole parse, so callers can keep whatever rows are usable.
//! Blank lines are skipped; rows that are not valid UTF-8 are skipped with an
//! error. Rows shorter or longer than the header are kept (missing cells
//! absent, extra cells dropped) and each yields an error.

use std::collections::HashMap;

/// One parsed data row, keyed by header field name.
pub type Row = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the offending row, when known.
    pub line: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Field names from the header row, in column order.
    pub fields: Vec<String>,
    pub data: Vec<Row>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// True when the header declares `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

/// Parse `raw` with its first line as the header.
///
/// Input is bytes so that a row with invalid UTF-8 is reported on its own
/// instead of being decoded lossily.
pub fn parse(raw: impl AsRef<[u8]>) -> ParseResult {
    let raw = raw.as_ref();
    let raw = raw.strip_prefix(b"\xef\xbb\xbf".as_slice()).unwrap_or(raw);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw);

    let mut result = ParseResult::default();

    let header = reader
        .byte_headers()
        .map_err(|e| e.to_string())
        .and_then(|h| csv::StringRecord::from_byte_record(h.clone()).map_err(|e| e.to_string()));
    match header {
        Ok(headers) => {
            result.fields = headers.iter().map(str::to_string).collect();
        }
        Err(message) => {
            result.errors.push(ParseError {
                message,
                line: Some(1),
            });
            return result;
        }
    }

    let expected = result.fields.len();
    for record in reader.byte_records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line());
                result.errors.push(ParseError {
                    message: e.to_string(),
                    line,
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line());
        let record = match csv::StringRecord::from_byte_record(record) {
            Ok(r) => r,
            Err(e) => {
                result.errors.push(ParseError {
                    message: format!("Invalid UTF-8 in row: {}", e.utf8_error()),
                    line,
                });
                continue;
            }
        };

        if record.len() < expected {
            result.errors.push(ParseError {
                message: format!(
                    "Too few fields: expected {} fields but parsed {}",
                    expected,
                    record.len()
                ),
                line,
            });
        } else if record.len() > expected {
            result.errors.push(ParseError {
                message: format!(
                    "Too many fields: expected {} fields but parsed {}",
                    expected,
                    record.len()
                ),
                line,
            });
        }

        let mut row = Row::with_capacity(expected);
        for (name, value) in result.fields.iter().zip(record.iter()) {
            // First column wins on duplicate header names.
            row.entry(name.clone()).or_insert_with(|| value.to_string());
        }
        result.data.push(row);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_defines_fields() {
        let r = parse("id,url,title\n1,a.mp4,A\n2,b.mp4,B\n");
        assert_eq!(r.fields, vec!["id", "url", "title"]);
        assert_eq!(r.data.len(), 2);
        assert_eq!(r.data[1]["title"], "B");
        assert!(r.errors.is_empty());
    }

    #[test]
    fn test_blank_lines_skipped() {
        let r = parse("id,url,title\n\n1,a.mp4,A\n\n\n2,b.mp4,B\n\n");
        assert_eq!(r.data.len(), 2);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn test_short_row_kept_with_error() {
        let r = parse("id,url,title\n1,a.mp4\n");
        assert_eq!(r.data.len(), 1);
        assert!(!r.data[0].contains_key("title"));
        assert_eq!(r.errors.len(), 1);
        assert!(r.errors[0].message.starts_with("Too few fields"));
        assert_eq!(r.errors[0].line, Some(2));
    }

    #[test]
    fn test_long_row_drops_extra_cells() {
        let r = parse("id,url,title\n1,a.mp4,A,extra\n");
        assert_eq!(r.data[0].len(), 3);
        assert!(r.errors[0].message.starts_with("Too many fields"));
    }

    #[test]
    fn test_quoted_cells() {
        let r = parse("id,url,title\n1,a.mp4,\"Hello, world\"\n");
        assert_eq!(r.data[0]["title"], "Hello, world");
    }

    #[test]
    fn test_bom_and_empty_input() {
        let r = parse("\u{feff}id,url,title\n1,a,b\n");
        assert!(r.has_field("id"));

        let empty = parse("");
        assert!(empty.data.is_empty());
    }

    #[test]
    fn test_invalid_utf8_row_reported_and_skipped() {
        let r = parse(b"id,url,title\n1,a.mp4,\xff\xfeBad\n2,b.mp4,Ok\n");
        assert_eq!(r.data.len(), 1);
        assert_eq!(r.data[0]["title"], "Ok");
        assert_eq!(r.errors.len(), 1);
        assert!(r.errors[0].message.starts_with("Invalid UTF-8 in row"));
        assert_eq!(r.errors[0].line, Some(2));
    }

    #[test]
    fn test_invalid_utf8_header_stops_parse() {
        let r = parse(b"id,\xffurl,title\n1,a.mp4,A\n");
        assert!(r.fields.is_empty());
        assert!(r.data.is_empty());
        assert_eq!(r.errors[0].line, Some(1));
    }
}
