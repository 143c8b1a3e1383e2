//! Dataset input: delimited file loading with encoding detection
//!
//! Real-world CSV exports are frequently not UTF-8. The loader sniffs a BOM
//! first, then tries strict UTF-8, and finally falls back to Windows-1252,
//! which decodes any byte sequence and covers the Latin-1 family of exports.

use crate::frame::DataFrame;
use crate::Result;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::path::Path;
use tracing::debug;

/// Decode raw file bytes into text.
fn decode_bytes(bytes: &[u8]) -> (String, &'static Encoding) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _, _) = encoding.decode(&bytes[bom_len..]);
        return (text.into_owned(), encoding);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), UTF_8);
    }
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    (text.into_owned(), WINDOWS_1252)
}

/// Load a delimited tabular file into a [`DataFrame`].
///
/// # Errors
/// Returns an error if the file cannot be read or parsed as CSV.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let bytes = std::fs::read(path.as_ref())?;
    let (text, encoding) = decode_bytes(&bytes);
    debug!(
        path = %path.as_ref().display(),
        encoding = encoding.name(),
        bytes = bytes.len(),
        "decoded dataset file"
    );
    DataFrame::from_csv_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_plain_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "name,age\nana,31\nbo,28\n").unwrap();
        let frame = load_csv(file.path()).unwrap();
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.column_names(), vec!["name", "age"]);
    }

    #[test]
    fn decodes_windows_1252_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // "café" with 0xE9 (Latin-1 é), invalid as UTF-8.
        file.write_all(b"word\ncaf\xe9\n").unwrap();
        let frame = load_csv(file.path()).unwrap();
        assert_eq!(frame.num_rows(), 1);
        let cell = frame.cell(0, 0).unwrap();
        assert_eq!(cell.to_string(), "café");
    }

    #[test]
    fn strips_utf8_bom() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xef\xbb\xbfx,y\n1,2\n").unwrap();
        let frame = load_csv(file.path()).unwrap();
        assert_eq!(frame.column_names(), vec!["x", "y"]);
    }

    #[test]
    fn missing_file_errors() {
        assert!(load_csv("/definitely/not/here.csv").is_err());
    }
}
