//! Scrubbing of upstream error text.
//!
//! Every error string that leaves the engine, whether in an outcome or a log
//! line, goes through an [`ErrorSanitizer`] first.

use regex::Regex;
use std::sync::OnceLock;

/// Maximum length of a sanitized message, in characters.
pub const MAX_ERROR_LEN: usize = 500;

/// Strips credentials and personal data from error text.
pub trait ErrorSanitizer: Send + Sync {
    /// Returns a message safe to show to users and write to logs.
    fn sanitize(&self, raw: &str, context: &str) -> String;
}

/// Regex-based sanitizer covering bearer headers, API keys and e-mail addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSanitizer;

fn redactions() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)bearer\s+[A-Za-z0-9._~+/=-]+", "Bearer [REDACTED]"),
            (r"\b(?:secret|ntn)_[A-Za-z0-9]{8,}\b", "[REDACTED_TOKEN]"),
            (
                r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
                "[REDACTED_EMAIL]",
            ),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

impl ErrorSanitizer for DefaultSanitizer {
    fn sanitize(&self, raw: &str, context: &str) -> String {
        let raw = raw.trim();
        let mut cleaned = if raw.is_empty() {
            "unknown error".to_string()
        } else {
            raw.to_string()
        };

        for (re, replacement) in redactions() {
            cleaned = re.replace_all(&cleaned, *replacement).into_owned();
        }

        let message = if context.is_empty() {
            cleaned
        } else {
            format!("{context}: {cleaned}")
        };

        if message.chars().count() > MAX_ERROR_LEN {
            let mut truncated: String = message.chars().take(MAX_ERROR_LEN).collect();
            truncated.push('…');
            truncated
        } else {
            message
        }
    }
}
