//! Spreadsheet export parsing.
//!
//! Turns uploaded bytes into text (with encoding auto-detection) and the text
//! into [`RawRow`]s. The split is deliberately flat: commas inside quoted
//! cells are not supported, and rows of the wrong width are dropped.

use crate::error::{CsvError, CsvResult};
use crate::models::RawRow;

/// Cell separator.
pub const DELIMITER: char = ',';

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let text = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "utf-16le" | "utf-16be" | "utf-16" => {
            let codec = if encoding.eq_ignore_ascii_case("utf-16be") {
                encoding_rs::UTF_16BE
            } else {
                encoding_rs::UTF_16LE
            };
            let (text, _, had_errors) = codec.decode(bytes);
            if had_errors {
                return Err(CsvError::Encoding {
                    encoding: encoding.to_string(),
                    message: "malformed UTF-16 sequence".to_string(),
                });
            }
            text.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    Ok(strip_bom(&text).to_string())
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Decode uploaded bytes.
///
/// Valid UTF-8 is taken as is. Detection only runs for anything else.
pub fn decode(bytes: &[u8]) -> CsvResult<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(strip_bom(text).to_string());
    }
    let encoding = detect_encoding(bytes);
    decode_content(bytes, &encoding)
}

/// Parse export text into rows.
///
/// The first line is a header and is always discarded. Every other line is
/// split on [`DELIMITER`], cells are trimmed, and only rows with exactly
/// [`crate::models::COLUMN_COUNT`] cells are kept.
///
/// # Example
/// ```ignore
/// use bulkpost::parse;
///
/// let text = "header\ne1,pub1,true,hello,http://x,,2024-01-01,topic,alert,,,,,,,";
/// let rows = parse(text);
///
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].cell(0), "e1");
/// ```
pub fn parse(text: &str) -> Vec<RawRow> {
    text.split('\n')
        .skip(1)
        .filter_map(|line| {
            let cells = line
                .split(DELIMITER)
                .map(|cell| cell.trim().to_string())
                .collect();
            RawRow::from_cells(cells)
        })
        .collect()
}

/// Decode and parse in one step.
pub fn parse_bytes(bytes: &[u8]) -> CsvResult<Vec<RawRow>> {
    Ok(parse(&decode(bytes)?))
}
