//! Redaction of API tokens from log output and error messages.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static SCRUBBER: LazyLock<SecretScrubber> = LazyLock::new(SecretScrubber::new);

/// Scrub `message` with the shared scrubber.
pub fn scrub(message: &str) -> String {
    SCRUBBER.scrub_message(message)
}

/// Redacts credentials from text that may reach logs or error messages,
/// such as backend error bodies echoing request headers.
#[derive(Clone)]
pub struct SecretScrubber {
    apikey_header_pattern: Regex,
    token_pattern: Regex,
    bearer_pattern: Regex,
    password_pattern: Regex,
}

impl SecretScrubber {
    /// Create a new secret scrubber
    pub fn new() -> Self {
        Self {
            // Match the `apikey` request header as echoed by proxies and the backend
            apikey_header_pattern: Regex::new(r"(?i)\bapikey\s*:\s*[A-Za-z0-9\-_\.]{8,}")
                .expect("apikey pattern is valid"),
            // Match generic tokens
            token_pattern: Regex::new(
                r#"(?i)["']?(?:api_key|api_token|apitoken|token|secret)["']?\s*[:=]\s*["']?([a-zA-Z0-9\-_\.]{8,})["']?"#,
            )
            .expect("token pattern is valid"),
            // Match Bearer tokens in Authorization headers
            bearer_pattern: Regex::new(r"Bearer\s+[a-zA-Z0-9\-_\.]+").expect("bearer pattern is valid"),
            // Match password fields
            password_pattern: Regex::new(r#"["']?password["']?\s*[:=]\s*["']?([^"'\s,}]+)["']?"#)
                .expect("password pattern is valid"),
        }
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        let mut scrubbed = self
            .apikey_header_pattern
            .replace_all(message, "apikey: [REDACTED]")
            .to_string();
        scrubbed = self
            .bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]")
            .to_string();
        scrubbed = self
            .token_pattern
            .replace_all(&scrubbed, |caps: &regex::Captures| {
                let full_match = &caps[0];
                if let Some(colon_pos) = full_match.find(':') {
                    format!("{}:[REDACTED]", &full_match[..colon_pos])
                } else if let Some(eq_pos) = full_match.find('=') {
                    format!("{}=[REDACTED]", &full_match[..eq_pos])
                } else {
                    "[REDACTED]".to_string()
                }
            })
            .to_string();
        scrubbed = self
            .password_pattern
            .replace_all(&scrubbed, "password=[REDACTED]")
            .to_string();
        scrubbed
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
