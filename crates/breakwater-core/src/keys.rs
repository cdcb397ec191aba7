//! Store-key derivation for named breakers.
//!
//! Every breaker is identified by a caller-supplied name. The name is
//! normalized to an identifier-safe slug and prefixed with a constant
//! namespace. The slug *is* the identity: two names that normalize to
//! the same slug share one breaker state in the store.

use lazy_static::lazy_static;
use regex::Regex;

/// Namespace prefix for every key this crate derives.
const NAMESPACE: &str = "breakwater";

lazy_static! {
    /// Runs of characters that cannot appear in a slug.
    static ref NON_SLUG: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Normalize a breaker name into a stable slug.
///
/// Lowercases, collapses every run of non-alphanumeric characters to a
/// single `-`, and trims leading/trailing dashes. Total function: any
/// input maps to some slug, including the empty one.
fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    NON_SLUG
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// The four store keys backing one named breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerKeys {
    root: String,
}

impl BreakerKeys {
    /// Derive the key set for `name`.
    pub fn new(name: &str) -> Self {
        Self {
            root: format!("{}:{}", NAMESPACE, slugify(name)),
        }
    }

    /// Key holding the persisted circuit state (`CLOSED` / `OPENED`).
    pub fn current_state(&self) -> String {
        format!("{}:current_state", self.root)
    }

    /// Key holding the rolling-window request counter.
    pub fn request_count(&self) -> String {
        format!("{}:request_count", self.root)
    }

    /// Key holding the rolling-window error counter.
    pub fn error_count(&self) -> String {
        format!("{}:error_count", self.root)
    }

    /// Key holding the open-state cooldown marker.
    pub fn open_marker(&self) -> String {
        format!("{}:open_state_ttl", self.root)
    }
}
