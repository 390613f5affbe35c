//! Markdown export of the full session.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{exported_line, format_entry_time};
use crate::session::{is_reserved_namespace, split_answer_key, PromptMode, SessionState};
use crate::steps::{find_step, step_position, step_title};

/// Format a session as a Markdown document.
///
/// Answers are grouped by stage. Every stage that has at least one key in the
/// session gets a heading, even when all of its values are blank: the heading
/// records that the stage was touched. Within a stage only non-blank fields
/// are listed.
pub fn format_markdown(state: &SessionState, exported_at: DateTime<Utc>) -> String {
    let mut lines: Vec<String> = vec![
        "# What is my Delta?".to_string(),
        exported_line(exported_at),
        String::new(),
    ];

    for (stage_id, fields) in group_answers(state) {
        lines.push(format!("## {}", step_title(stage_id)));
        for (field_key, value) in fields {
            if value.trim().is_empty() {
                continue;
            }
            lines.push(format!("**{}**", field_key.replace('_', " ")));
            lines.push(String::new());
            lines.push(value.to_string());
            lines.push(String::new());
        }
        lines.push(String::new());
    }

    let has_prompts = PromptMode::ALL.iter().any(|m| !state.log(*m).is_empty());
    if has_prompts {
        lines.push("## Prompts".to_string());
        for mode in PromptMode::ALL {
            let log = state.log(mode);
            if log.is_empty() {
                continue;
            }
            lines.push(format!("### {}", mode.heading()));
            for entry in log {
                lines.push(format!(
                    "- {}: {}",
                    format_entry_time(entry.timestamp),
                    entry.text
                ));
            }
        }
    }

    lines.join("\n")
}

type Group<'a> = (&'a str, Vec<(&'a str, &'a str)>);

/// Answers grouped by stage id, in questionnaire order.
///
/// Known stages and fields come first in registry order; unknown ones follow
/// alphabetically.
fn group_answers(state: &SessionState) -> Vec<Group<'_>> {
    let mut groups: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for (key, value) in &state.answers {
        if is_reserved_namespace(key) {
            continue;
        }
        let (stage_id, field_key) = split_answer_key(key);
        groups
            .entry(stage_id)
            .or_default()
            .push((field_key, value.as_str()));
    }

    let mut groups: Vec<Group<'_>> = groups.into_iter().collect();
    groups.sort_by_key(|(stage_id, _)| step_position(stage_id).unwrap_or(usize::MAX));

    for (stage_id, fields) in &mut groups {
        if let Some(step) = find_step(stage_id) {
            fields.sort_by_key(|(field_key, _)| {
                step.field_position(field_key).unwrap_or(usize::MAX)
            });
        }
    }

    groups
}
