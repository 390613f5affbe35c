//! CSV parsing for the prompt library.

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::session::PromptRow;

/// Errors that can occur while loading a prompt library file.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid CSV.
    #[error("{0}")]
    Csv(#[from] csv::Error),
}

impl LibraryError {
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

/// Parse CSV with a header row into prompt rows.
///
/// Empty lines are skipped. A line with separators but no content, such as
/// `,`, is still a row. Ragged rows are accepted: missing trailing
/// cells are simply absent from the row, extra cells without a header are
/// dropped.
pub fn parse_prompt_csv<R: Read>(reader: R) -> Result<Vec<PromptRow>, LibraryError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        let row = PromptRow::from_pairs(
            headers
                .iter()
                .zip(record.iter())
                .filter(|(header, _)| !header.is_empty()),
        );
        rows.push(row);
    }

    Ok(rows)
}

/// Parse CSV text.
pub fn parse_prompt_csv_str(text: &str) -> Result<Vec<PromptRow>, LibraryError> {
    parse_prompt_csv(text.as_bytes())
}

/// Read and parse a CSV file.
pub fn load_prompt_csv(path: &Path) -> Result<Vec<PromptRow>, LibraryError> {
    let file = std::fs::File::open(path).map_err(|e| LibraryError::io_error(path, e))?;
    parse_prompt_csv(file)
}

/// Load the bundled prompt library, if there is a usable one.
///
/// A missing, unreadable, blank, malformed or row-less file yields `None`;
/// none of these are reported to the user.
pub fn load_bundled_csv(path: &Path) -> Option<Vec<PromptRow>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no bundled prompt library");
            return None;
        }
    };

    if text.trim().is_empty() {
        return None;
    }

    match parse_prompt_csv_str(&text) {
        Ok(rows) if !rows.is_empty() => Some(rows),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "bundled prompt library unreadable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_basic() {
        let rows = parse_prompt_csv_str("prompt,completion\nWhy?,Because\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prompt(), "Why?");
        assert_eq!(rows[0].completion(), "Because");
    }

    #[test]
    fn test_parse_keeps_extra_columns() {
        let rows = parse_prompt_csv_str("prompt,completion,tag\na,b,c\n").unwrap();
        assert_eq!(rows[0].get("tag"), Some("c"));
    }

    #[test]
    fn test_parse_quoted_fields() {
        let rows =
            parse_prompt_csv_str("prompt,completion\n\"Hello, world\",\"line one\nline two\"\n")
                .unwrap();
        assert_eq!(rows[0].prompt(), "Hello, world");
        assert_eq!(rows[0].completion(), "line one\nline two");
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let rows = parse_prompt_csv_str("prompt,completion\na,b\n\n\"\"\nc,d\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].prompt(), "c");
    }

    #[test]
    fn test_parse_keeps_separator_only_rows() {
        let rows = parse_prompt_csv_str("prompt,completion\na,b\n,\nc,d\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].prompt(), "");
        assert_eq!(rows[1].completion(), "");
    }

    #[test]
    fn test_parse_keeps_whitespace_only_rows() {
        let rows = parse_prompt_csv_str("prompt,completion\na,b\n  ,\nc,d\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].prompt(), "  ");
        assert_eq!(rows[2].prompt(), "c");
    }

    #[test]
    fn test_parse_ragged_rows() {
        let rows = parse_prompt_csv_str("prompt,completion\nonly prompt\na,b,extra\n").unwrap();
        assert_eq!(rows[0].prompt(), "only prompt");
        assert_eq!(rows[0].get("completion"), None);
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn test_parse_invalid_utf8_is_error() {
        let bytes: &[u8] = b"prompt,completion\n\xff\xfe,x\n";
        let err = parse_prompt_csv(bytes).unwrap_err();
        assert!(matches!(err, LibraryError::Csv(_)));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = load_prompt_csv(Path::new("/nonexistent/prompts.csv")).unwrap_err();
        assert!(matches!(err, LibraryError::IoError { .. }));
    }

    #[test]
    fn test_load_bundled_missing_is_none() {
        assert!(load_bundled_csv(Path::new("/nonexistent/prompts.csv")).is_none());
    }

    #[test]
    fn test_load_bundled_blank_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prompts.csv");
        std::fs::write(&path, "  \n").unwrap();
        assert!(load_bundled_csv(&path).is_none());
    }

    #[test]
    fn test_load_bundled_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prompts.csv");
        std::fs::write(&path, "prompt,completion\nq,a\n").unwrap();

        let rows = load_bundled_csv(&path).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
