//! Cookie consent and UI language.

use crate::storage::keys;
use chrono::{DateTime, Utc};
use sorteohub_core::environment::{Clock, KeyValueStore};
use std::sync::Arc;

/// Languages the UI ships
pub const SUPPORTED_LANGUAGES: &[&str] = &["es", "en"];

/// Language used when nothing (valid) is stored
pub const DEFAULT_LANGUAGE: &str = "es";

/// Consent state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookieConsent {
    /// The banner has not been answered
    Unanswered,
    /// Accepted at the given time
    Accepted(Option<DateTime<Utc>>),
    /// Rejected at the given time
    Rejected(Option<DateTime<Utc>>),
}

/// Typed access to preference keys
#[derive(Clone)]
pub struct Preferences {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl Preferences {
    /// Wrap a store
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Current consent answer
    #[must_use]
    pub fn cookie_consent(&self) -> CookieConsent {
        let date = self
            .storage
            .get(keys::COOKIE_CONSENT_DATE)
            .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
            .map(|d| d.with_timezone(&Utc));

        match self.storage.get(keys::COOKIE_CONSENT).as_deref() {
            Some("true" | "accepted") => CookieConsent::Accepted(date),
            Some("false" | "rejected") => CookieConsent::Rejected(date),
            _ => CookieConsent::Unanswered,
        }
    }

    /// Record the user's answer with the current time
    pub fn record_cookie_consent(&self, accepted: bool) {
        let now = self.clock.now();
        self.storage
            .set(keys::COOKIE_CONSENT, if accepted { "true" } else { "false" });
        self.storage
            .set(keys::COOKIE_CONSENT_DATE, &now.to_rfc3339());
        tracing::debug!(accepted, "Cookie consent recorded");
    }

    /// Stored language, or [`DEFAULT_LANGUAGE`]
    #[must_use]
    pub fn language(&self) -> String {
        self.storage
            .get(keys::LANGUAGE)
            .filter(|lang| SUPPORTED_LANGUAGES.contains(&lang.as_str()))
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }

    /// Store the selected language
    ///
    /// Returns `false` (and stores nothing) for unsupported languages.
    pub fn set_language(&self, language: &str) -> bool {
        let language = language.trim().to_lowercase();
        if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            return false;
        }
        self.storage.set(keys::LANGUAGE, &language);
        true
    }
}
