//! Credentials handling infrastructure
//!
//! Tokens are read from the environment at resolution time and are never
//! stored. The only retained derivative is a fingerprint: a truncated
//! SHA-256 digest used to detect credential rotation.

use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a fingerprint.
const FINGERPRINT_BYTES: usize = 16;

/// Non-reversible identifier of a credential.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of `token`.
    pub fn of(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        Self(hex::encode(&hasher.finalize()[..FINGERPRINT_BYTES]))
    }
}

// Fingerprints stay out of logs and debug output.
impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Fingerprint([REDACTED])")
    }
}

/// Read a credential from `env_var`, treating blank values as absent.
pub fn read_token(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_distinct() {
        assert_eq!(Fingerprint::of("token-a"), Fingerprint::of("token-a"));
        assert_ne!(Fingerprint::of("token-a"), Fingerprint::of("token-b"));
    }

    #[test]
    fn test_fingerprint_does_not_contain_token() {
        let fp = Fingerprint::of("plain-secret");
        assert!(!fp.0.contains("plain-secret"));
        assert_eq!(fp.0.len(), FINGERPRINT_BYTES * 2);
        assert_eq!(format!("{fp:?}"), "Fingerprint([REDACTED])");
    }

    #[test]
    fn test_read_token_blank_is_absent() {
        temp_env::with_vars(
            [
                ("BOARDGATE_TEST_TOKEN_BLANK", Some("   ")),
                ("BOARDGATE_TEST_TOKEN_SET", Some(" abc ")),
                ("BOARDGATE_TEST_TOKEN_UNSET", None),
            ],
            || {
                assert_eq!(read_token("BOARDGATE_TEST_TOKEN_BLANK"), None);
                assert_eq!(read_token("BOARDGATE_TEST_TOKEN_SET").as_deref(), Some("abc"));
                assert_eq!(read_token("BOARDGATE_TEST_TOKEN_UNSET"), None);
            },
        );
    }
}
