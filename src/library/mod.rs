//! The CSV-backed prompt/completion library.
//!
//! Rows are parsed from a user-selected CSV file (or a bundled one), stored in
//! the session, and browsed through a case-insensitive search.

mod parse;
mod viewer;

pub use parse::{
    load_bundled_csv, load_prompt_csv, parse_prompt_csv, parse_prompt_csv_str, LibraryError,
};
pub use viewer::{
    filter_prompts, truncate_chars, LibraryStatus, PreviewTable, PromptFilter, PromptTableRow,
    MAX_CELL_CHARS, MAX_DISPLAY_ROWS, PREVIEW_CELL_CHARS, PREVIEW_ROWS,
};
