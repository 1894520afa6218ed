//! Idempotency key policy.

/// Controls whether mutating requests get an `Idempotency-Key` automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyPolicy {
    /// Generate a key when the caller did not supply one.
    pub auto_generate: bool,

    /// Optional prefix; generated keys take the form `<prefix>-<uuid>`.
    pub key_prefix: Option<String>,
}

impl Default for IdempotencyPolicy {
    fn default() -> Self {
        Self {
            auto_generate: true,
            key_prefix: None,
        }
    }
}

impl IdempotencyPolicy {
    /// A policy that never generates keys.
    pub fn manual() -> Self {
        Self {
            auto_generate: false,
            key_prefix: None,
        }
    }

    /// Set the key prefix. Empty prefixes are ignored.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.key_prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }
}
