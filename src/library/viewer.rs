//! Searching and tabulating the prompt library.

use std::fmt;

use serde::Serialize;

use crate::session::PromptRow;

/// Most rows shown in the library table at once.
pub const MAX_DISPLAY_ROWS: usize = 500;
/// Longest cell text shown in the library table.
pub const MAX_CELL_CHARS: usize = 500;
/// Rows shown in the preview after a load.
pub const PREVIEW_ROWS: usize = 5;
/// Longest cell text shown in the preview.
pub const PREVIEW_CELL_CHARS: usize = 200;

/// Result of filtering the library with a search string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFilter<'a> {
    /// Matching rows, in library order, capped at [`MAX_DISPLAY_ROWS`].
    pub rows: Vec<&'a PromptRow>,
    /// Number of matching rows before the cap.
    pub matched: usize,
    /// Number of rows in the library.
    pub total: usize,
}

impl PromptFilter<'_> {
    /// Number of rows actually displayed.
    pub fn displayed(&self) -> usize {
        self.rows.len()
    }

    /// Count line shown next to the search box, e.g. `"3 / 120 rows"`.
    pub fn count_text(&self) -> String {
        format!("{} / {} rows", self.matched, self.total)
    }
}

/// Case-insensitive substring search over the `prompt` and `completion`
/// columns. An empty query matches every row.
pub fn filter_prompts<'a>(rows: &'a [PromptRow], query: &str) -> PromptFilter<'a> {
    let needle = query.to_lowercase();
    let mut matched = 0;
    let mut shown = Vec::new();

    for row in rows.iter().filter(|row| row_matches(row, &needle)) {
        matched += 1;
        if shown.len() < MAX_DISPLAY_ROWS {
            shown.push(row);
        }
    }

    PromptFilter {
        rows: shown,
        matched,
        total: rows.len(),
    }
}

fn row_matches(row: &PromptRow, needle: &str) -> bool {
    needle.is_empty()
        || row.prompt().to_lowercase().contains(needle)
        || row.completion().to_lowercase().contains(needle)
}

/// First `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// One displayed row of the library table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptTableRow {
    pub prompt: String,
    pub completion: String,
}

impl PromptTableRow {
    pub fn from_row(row: &PromptRow) -> Self {
        Self {
            prompt: truncate_chars(row.prompt(), MAX_CELL_CHARS).to_string(),
            completion: truncate_chars(row.completion(), MAX_CELL_CHARS).to_string(),
        }
    }
}

/// The first few rows of a freshly loaded library, all columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewTable {
    /// Column names of the first row.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PreviewTable {
    /// Build the preview, or `None` for an empty library.
    pub fn from_rows(rows: &[PromptRow]) -> Option<Self> {
        let first = rows.first()?;
        let columns: Vec<String> = first.column_names().map(str::to_string).collect();

        let rows = rows
            .iter()
            .take(PREVIEW_ROWS)
            .map(|row| {
                columns
                    .iter()
                    .map(|c| truncate_chars(row.get(c).unwrap_or(""), PREVIEW_CELL_CHARS).to_string())
                    .collect()
            })
            .collect();

        Some(Self { columns, rows })
    }
}

/// Status line of the prompt library panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryStatus {
    /// A user-selected file was loaded.
    Loaded(usize),
    /// Rows were found in the saved session.
    Restored(usize),
    /// The bundled library was loaded at startup.
    AutoLoaded(usize),
    /// Nothing loaded.
    Empty,
    Cleared,
    /// The selected file could not be parsed; the library is unchanged.
    ParseError(String),
}

impl LibraryStatus {
    /// Status for the library found in a saved session.
    pub fn for_saved(rows: &[PromptRow]) -> Self {
        if rows.is_empty() {
            LibraryStatus::Empty
        } else {
            LibraryStatus::Restored(rows.len())
        }
    }
}

impl fmt::Display for LibraryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryStatus::Loaded(n) => write!(f, "Loaded {} rows.", n),
            LibraryStatus::Restored(n) => write!(f, "Loaded {} rows from previous session.", n),
            LibraryStatus::AutoLoaded(n) => write!(f, "Auto-loaded {} rows from bundled CSV.", n),
            LibraryStatus::Empty => f.write_str("No CSV loaded."),
            LibraryStatus::Cleared => f.write_str("Cleared."),
            LibraryStatus::ParseError(message) => write!(f, "Parse error: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(prompt: &str, completion: &str) -> PromptRow {
        PromptRow::from_pairs([("prompt", prompt), ("completion", completion)])
    }

    #[test]
    fn test_empty_query_returns_all() {
        let rows = vec![row("a", "b"), row("c", "d")];
        let filter = filter_prompts(&rows, "");
        assert_eq!(filter.displayed(), 2);
        assert_eq!(filter.matched, 2);
        assert_eq!(filter.total, 2);
    }

    #[test]
    fn test_matches_completion_case_insensitive() {
        let rows = vec![row("Why?", "Because")];
        let filter = filter_prompts(&rows, "because");
        assert_eq!(filter.displayed(), 1);
        assert_eq!(filter.count_text(), "1 / 1 rows");
    }

    #[test]
    fn test_matches_prompt_substring() {
        let rows = vec![row("What is my DELTA?", ""), row("other", "thing")];
        let filter = filter_prompts(&rows, "delta");
        assert_eq!(filter.displayed(), 1);
        assert_eq!(filter.rows[0].prompt(), "What is my DELTA?");
    }

    #[test]
    fn test_no_match() {
        let rows = vec![row("Why?", "Because")];
        let filter = filter_prompts(&rows, "zebra");
        assert_eq!(filter.displayed(), 0);
        assert_eq!(filter.count_text(), "0 / 1 rows");
    }

    #[test]
    fn test_other_columns_not_searched() {
        let rows = vec![row("a", "b").with_column("tag", "needle")];
        assert_eq!(filter_prompts(&rows, "needle").displayed(), 0);
    }

    #[test]
    fn test_preserves_input_order() {
        let rows = vec![row("z match", ""), row("a match", ""), row("m match", "")];
        let filter = filter_prompts(&rows, "match");
        let prompts: Vec<_> = filter.rows.iter().map(|r| r.prompt()).collect();
        assert_eq!(prompts, vec!["z match", "a match", "m match"]);
    }

    #[test]
    fn test_display_cap() {
        let rows: Vec<_> = (0..750).map(|i| row(&format!("p{}", i), "c")).collect();
        let filter = filter_prompts(&rows, "");
        assert_eq!(filter.displayed(), MAX_DISPLAY_ROWS);
        assert_eq!(filter.matched, 750);
        assert_eq!(filter.count_text(), "750 / 750 rows");
        assert_eq!(filter.rows[499].prompt(), "p499");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_table_row_truncates_cells() {
        let long = "x".repeat(800);
        let table_row = PromptTableRow::from_row(&row(&long, "short"));
        assert_eq!(table_row.prompt.len(), MAX_CELL_CHARS);
        assert_eq!(table_row.completion, "short");
    }

    #[test]
    fn test_preview_table() {
        let rows: Vec<_> = (0..8)
            .map(|i| row(&format!("p{}", i), &"c".repeat(300)))
            .collect();
        let preview = PreviewTable::from_rows(&rows).unwrap();

        assert_eq!(preview.columns, vec!["completion", "prompt"]);
        assert_eq!(preview.rows.len(), PREVIEW_ROWS);
        assert_eq!(preview.rows[0][0].len(), PREVIEW_CELL_CHARS);
        assert_eq!(preview.rows[4][1], "p4");
    }

    #[test]
    fn test_preview_empty() {
        assert!(PreviewTable::from_rows(&[]).is_none());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(LibraryStatus::Loaded(3).to_string(), "Loaded 3 rows.");
        assert_eq!(
            LibraryStatus::Restored(2).to_string(),
            "Loaded 2 rows from previous session."
        );
        assert_eq!(
            LibraryStatus::AutoLoaded(7).to_string(),
            "Auto-loaded 7 rows from bundled CSV."
        );
        assert_eq!(LibraryStatus::Empty.to_string(), "No CSV loaded.");
        assert_eq!(LibraryStatus::Cleared.to_string(), "Cleared.");
        assert_eq!(
            LibraryStatus::ParseError("bad quote".into()).to_string(),
            "Parse error: bad quote"
        );
    }

    #[test]
    fn test_status_for_saved() {
        assert_eq!(LibraryStatus::for_saved(&[]), LibraryStatus::Empty);
        assert_eq!(
            LibraryStatus::for_saved(&[row("a", "b")]),
            LibraryStatus::Restored(1)
        );
    }
}
