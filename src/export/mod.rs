//! Export module for turning a session into downloadable documents.
//!
//! All formatters are pure functions of the session state and an explicit
//! export timestamp, so the same inputs always produce the same document.

mod json;
mod markdown;
mod transcript;

pub use json::format_json;
pub use markdown::format_markdown;
pub use transcript::{format_transcript, SUMMARY_KEYS};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::session::{SessionState, StoreError};

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown export format: {value} (expected markdown, json or transcript)")]
    UnknownFormat { value: String },

    #[error("failed to encode session: {0}")]
    Store(#[from] StoreError),

    #[error("failed to serialize JSON export: {0}")]
    Json(#[from] serde_json::Error),
}

/// The document kinds a session can be exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Answers grouped by stage, plus the prompt logs.
    Markdown,
    /// The flat session mapping, verbatim.
    Json,
    /// Prompt logs plus a short summary of key answers.
    Transcript,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [
        ExportFormat::Markdown,
        ExportFormat::Json,
        ExportFormat::Transcript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Json => "json",
            ExportFormat::Transcript => "transcript",
        }
    }

    /// Download file name.
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "what_is_my_delta_session.md",
            ExportFormat::Json => "what_is_my_delta_session.json",
            ExportFormat::Transcript => "Transcript.md",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Markdown | ExportFormat::Transcript => "text/markdown; charset=utf-8",
            ExportFormat::Json => "application/json; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            "transcript" => Ok(ExportFormat::Transcript),
            _ => Err(ExportError::UnknownFormat {
                value: s.to_string(),
            }),
        }
    }
}

/// A fully rendered export, ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub format: ExportFormat,
    pub file_name: &'static str,
    pub content: String,
}

/// Render `state` in the requested format.
pub fn export(
    state: &SessionState,
    format: ExportFormat,
    exported_at: DateTime<Utc>,
) -> Result<ExportDocument, ExportError> {
    let content = match format {
        ExportFormat::Markdown => format_markdown(state, exported_at),
        ExportFormat::Json => format_json(state)?,
        ExportFormat::Transcript => format_transcript(state, exported_at),
    };

    tracing::debug!(format = %format, bytes = content.len(), "export rendered");

    Ok(ExportDocument {
        format,
        file_name: format.file_name(),
        content,
    })
}

/// The `_Exported: ..._` line shared by the Markdown documents.
fn exported_line(exported_at: DateTime<Utc>) -> String {
    format!(
        "_Exported: {}_",
        exported_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Human-readable form of a prompt entry timestamp (epoch milliseconds).
pub fn format_entry_time(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => timestamp_ms.to_string(),
    }
}
