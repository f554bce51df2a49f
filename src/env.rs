//! Read-only environment lookups.
//!
//! Both `${NAME}` interpolation and field overriding read variables through
//! [`Environment`], so a load can run against the process environment or a
//! fixed map.

use std::collections::{BTreeMap, HashMap};

/// Source of environment variables.
pub trait Environment: Send + Sync {
    /// Look up a variable. Returns `None` when it is unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl Environment for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}
