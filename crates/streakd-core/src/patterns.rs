//! Compiled-pattern cache for evasion rules.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::evasion::{generate_variants, VARIANT_KINDS};

/// Caches compiled evasion rules by name.
///
/// Rule names follow the `{word}_{kind}` convention, so a pattern can be
/// regenerated from the name alone. Compile failures are cached as
/// absent: a malformed rule never crashes detection and is not retried
/// on every message.
#[derive(Clone, Default)]
pub struct PatternCache {
    inner: Arc<RwLock<HashMap<String, Option<Regex>>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled matcher for `rule_name`.
    ///
    /// `None` means the name does not resolve to a generated variant or
    /// its pattern failed to compile; that rule simply never matches.
    pub fn compiled(&self, rule_name: &str) -> Option<Regex> {
        if let Some(cached) = self.inner.read().get(rule_name) {
            return cached.clone();
        }

        let compiled = Self::compile(rule_name);
        if compiled.is_none() {
            debug!(rule = rule_name, "rule did not resolve to a pattern, cached as absent");
        }
        self.inner
            .write()
            .insert(rule_name.to_string(), compiled.clone());
        compiled
    }

    fn compile(rule_name: &str) -> Option<Regex> {
        // Longest suffix first so `{word}_translit_spaced` resolves to
        // `{word}` rather than `{word}_translit`.
        let base = VARIANT_KINDS
            .iter()
            .find_map(|kind| rule_name.strip_suffix(&format!("_{kind}")))?;
        if base.is_empty() {
            return None;
        }
        let spec = generate_variants(base)
            .into_iter()
            .find(|v| v.name == rule_name)?;
        RegexBuilder::new(&spec.pattern)
            .case_insensitive(true)
            .build()
            .ok()
    }

    /// Drops every cached entry. Used by tests and bulk trigger reloads.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
