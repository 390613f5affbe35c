//! JSON export: the flat session mapping, pretty-printed.

use crate::session::SessionState;

use super::ExportError;

/// Serialize the session exactly as it is persisted.
pub fn format_json(state: &SessionState) -> Result<String, ExportError> {
    let map = state.to_flat_map()?;
    Ok(serde_json::to_string_pretty(&map)?)
}
