//! Idempotency keys.
//!
//! Resource-creating requests carry an `Idempotency-Key` header so the server
//! can de-duplicate retries. Keys are 36-character UUIDs, optionally
//! prefixed with `<prefix>-`.

use http::Method;
use uuid::Uuid;

use crate::config::IdempotencyPolicy;

/// Decides and produces idempotency keys for outgoing requests.
#[derive(Debug, Clone, Default)]
pub struct IdempotencyKeyManager {
    policy: IdempotencyPolicy,
}

impl IdempotencyKeyManager {
    /// Create a manager for `policy`.
    pub fn new(policy: IdempotencyPolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &IdempotencyPolicy {
        &self.policy
    }

    /// Key to send given the caller's `existing` value.
    ///
    /// A non-empty `existing` key is returned unchanged. Otherwise a fresh key
    /// is generated when auto-generation is on; `None` means the request goes
    /// without the header.
    ///
    /// # Examples
    ///
    /// ```
    /// use integrations_mail::config::IdempotencyPolicy;
    /// use integrations_mail::resilience::IdempotencyKeyManager;
    ///
    /// let manager = IdempotencyKeyManager::new(IdempotencyPolicy::default());
    /// assert_eq!(manager.ensure_key("existing").as_deref(), Some("existing"));
    /// assert_eq!(manager.ensure_key("").map(|k| k.len()), Some(36));
    ///
    /// let manual = IdempotencyKeyManager::new(IdempotencyPolicy::manual());
    /// assert_eq!(manual.ensure_key(""), None);
    /// ```
    pub fn ensure_key(&self, existing: &str) -> Option<String> {
        if !existing.is_empty() {
            return Some(existing.to_string());
        }
        if self.policy.auto_generate {
            Some(self.generate())
        } else {
            None
        }
    }

    /// Generate a key using the policy's prefix.
    pub fn generate(&self) -> String {
        generate_key(self.policy.key_prefix.as_deref())
    }

    /// Whether the call path should inject a key into this request.
    ///
    /// Only POST requests without a key get one, and only when
    /// auto-generation is enabled.
    pub fn should_inject(&self, method: &Method, existing: &str) -> bool {
        *method == Method::POST && existing.is_empty() && self.policy.auto_generate
    }

    /// Start a key sequence for related operations rooted at `base`.
    pub fn key_builder(&self, base: impl Into<String>) -> KeyBuilder {
        KeyBuilder::new(base)
    }
}

/// Generate a random key, prefixed with `<prefix>-` when `prefix` is non-empty.
pub fn generate_key(prefix: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match prefix {
        Some(p) if !p.is_empty() => format!("{}-{}", p, id),
        _ => id.to_string(),
    }
}

/// Infinite sequence of keys derived from a base key.
///
/// The first key is the base itself, so a logical operation and its retries
/// share one key. Each later key is `<base>-<8 hex chars>`, one per sibling
/// operation.
///
/// # Examples
///
/// ```
/// use integrations_mail::resilience::KeyBuilder;
///
/// let mut keys = KeyBuilder::new("batch-7");
/// assert_eq!(keys.next().as_deref(), Some("batch-7"));
///
/// let second = keys.next().unwrap();
/// assert!(second.starts_with("batch-7-"));
/// assert_eq!(second.len(), "batch-7-".len() + 8);
/// ```
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    base: String,
    issued: u64,
}

impl KeyBuilder {
    /// Start a sequence at `base`.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            issued: 0,
        }
    }

    /// The base key.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Number of keys handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

impl Iterator for KeyBuilder {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.issued += 1;
        if self.issued == 1 {
            return Some(self.base.clone());
        }
        let suffix = Uuid::new_v4().simple().to_string();
        Some(format!("{}-{}", self.base, &suffix[..8]))
    }
}
