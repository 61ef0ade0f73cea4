//! Consent record and cache keys

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Language used when the invocation carries no locale hint
pub const DEFAULT_LANGUAGE: &str = "en";

/// Durable consent state for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Discord user ID, primary key
    pub user_id: u64,
    /// Whether the user accepted the Terms of Service
    pub accepted: bool,
    /// Short language code, e.g. `fr`
    pub language: String,
    /// When the user was first seen
    pub created_at: DateTime<Utc>,
}

impl ConsentRecord {
    /// Record for a user seen for the first time
    #[must_use]
    pub fn first_seen(user_id: u64, locale: Option<&str>) -> Self {
        Self {
            user_id,
            accepted: false,
            language: language_from_locale(locale),
            created_at: Utc::now(),
        }
    }
}

/// Derive a short language code from a locale hint.
///
/// `"en-US"` and `"pt_BR"` map to `"en"` and `"pt"`. Missing or blank hints
/// map to [`DEFAULT_LANGUAGE`].
#[must_use]
pub fn language_from_locale(locale: Option<&str>) -> String {
    locale
        .and_then(|raw| raw.split(['-', '_']).next())
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map_or_else(|| DEFAULT_LANGUAGE.to_string(), str::to_ascii_lowercase)
}

/// Cache key marking a known acceptor
#[must_use]
pub fn tos_key(user_id: u64) -> String {
    format!("user:{user_id}:tos")
}

/// Cache key suppressing duplicate cooldown notices
#[must_use]
pub fn cooldown_key(user_id: u64, command_name: &str) -> String {
    format!("cooldown:{user_id}:{command_name}")
}
