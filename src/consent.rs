//! Consent and data-use preferences.
//!
//! Kept under their own storage key, independent of the session, so a session
//! reset leaves them untouched.

use serde::{Deserialize, Serialize};

use crate::session::{Storage, StoreError};

/// Storage key of the consent document.
pub const CONSENT_STORAGE_KEY: &str = "delta_consent";

/// Status line shown with the consent controls.
pub const CONSENT_STATUS: &str = "Preferences are saved locally and can be changed anytime.";

/// The three data-use opt-ins. All default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPreferences {
    /// Use answers for personal insights.
    #[serde(default)]
    pub personal: bool,
    /// Share anonymized answers.
    #[serde(default)]
    pub share: bool,
    /// Receive email follow-ups.
    #[serde(default)]
    pub email: bool,
}

impl ConsentPreferences {
    /// Load saved preferences. Missing or unreadable data means all off.
    pub fn load(storage: &dyn Storage) -> Result<Self, StoreError> {
        let Some(raw) = storage.get_item(CONSENT_STORAGE_KEY)? else {
            return Ok(Self::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "ignoring unreadable consent preferences");
            Self::default()
        }))
    }

    pub fn save(&self, storage: &dyn Storage) -> Result<(), StoreError> {
        let json = serde_json::to_string(self)
            .map_err(|e| StoreError::serialize_error(CONSENT_STORAGE_KEY, e))?;
        storage.set_item(CONSENT_STORAGE_KEY, &json)?;
        tracing::debug!(prefs = ?self, "consent preferences saved");
        Ok(())
    }

    /// Apply the flags that are `Some`, leaving the others unchanged.
    pub fn update(&mut self, personal: Option<bool>, share: Option<bool>, email: Option<bool>) {
        if let Some(v) = personal {
            self.personal = v;
        }
        if let Some(v) = share {
            self.share = v;
        }
        if let Some(v) = email {
            self.email = v;
        }
    }
}

/// Format the preferences for display.
pub fn format_consent(prefs: &ConsentPreferences) -> String {
    let mark = |on: bool| if on { "yes" } else { "no" };
    [
        format!("  personal = {}", mark(prefs.personal)),
        format!("  share    = {}", mark(prefs.share)),
        format!("  email    = {}", mark(prefs.email)),
        String::new(),
        CONSENT_STATUS.to_string(),
    ]
    .join("\n")
}
