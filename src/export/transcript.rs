//! Transcript export: prompt logs followed by a compact answer summary.

use chrono::{DateTime, Utc};

use super::{exported_line, format_entry_time};
use crate::session::{PromptMode, SessionState};

/// Answers summarized at the end of every transcript, in this order.
pub const SUMMARY_KEYS: [&str; 5] = [
    "problem.challenge",
    "problem.problem_statement",
    "root.root_causes",
    "experiment.small_experiment",
    "action.steps",
];

/// Format the prompt logs and key answers as a Markdown transcript.
///
/// Empty logs are left out entirely. The summary heading is always present;
/// summary keys with blank or missing values are skipped.
pub fn format_transcript(state: &SessionState, exported_at: DateTime<Utc>) -> String {
    let mut lines: Vec<String> = vec![
        "# What is my Delta — Transcript".to_string(),
        exported_line(exported_at),
        String::new(),
    ];

    for mode in PromptMode::ALL {
        let log = state.log(mode);
        if log.is_empty() {
            continue;
        }
        lines.push(format!("## {}", mode.heading()));
        for entry in log {
            lines.push(format!(
                "- **{}** — {}",
                format_entry_time(entry.timestamp),
                entry.text
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Summary".to_string());
    for key in SUMMARY_KEYS {
        if let Some(value) = state.answer(key) {
            lines.push(format!("- **{}**: {}", key.replacen('.', " → ", 1), value));
        }
    }

    lines.join("\n")
}
