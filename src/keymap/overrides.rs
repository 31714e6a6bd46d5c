//! Temporary handler overrides for overlays
//!
//! An overlay such as the fuzzy finder borrows `<up>`, `<down>` and
//! `<enter>` while it is open by pushing handlers on top of the existing
//! bindings. The manager remembers one record per successful push so
//! closing the overlay can pop exactly what was pushed, no matter how many
//! times the same key was overridden.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::handler::Handler;
use super::mode::Mode;
use super::registry::Keymaps;
use super::trie::TrieNode;

#[derive(Debug, Default)]
pub struct OverrideManager {
    records: Mutex<Vec<Weak<TrieNode>>>,
}

impl OverrideManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `handler` over the existing binding `token` in each of `modes`.
    ///
    /// Modes where `token` isn't a complete binding are skipped. Returns the
    /// number of layers pushed; 0 means there was nothing to override.
    pub fn push(
        &self,
        keymaps: &Keymaps,
        modes: &[Mode],
        token: &str,
        description: &str,
        handler: &Handler,
    ) -> usize {
        let mut pushed = Vec::new();
        for &mode in modes {
            let Some(node) = keymaps
                .find(mode, token)
                .filter(|node| node.is_complete_binding())
            else {
                tracing::debug!(%mode, token, "invalid override target, not a binding");
                continue;
            };
            if node.push_handler(handler.clone(), description) {
                pushed.push(Arc::downgrade(&node));
            } else {
                tracing::debug!(%mode, token, "override handler already active");
            }
        }

        let count = pushed.len();
        if count > 0 {
            tracing::debug!(token, count, "pushed override");
            self.records.lock().extend(pushed);
        }
        count
    }

    /// Pop one layer per recorded push and forget the records.
    ///
    /// Returns the number of layers actually popped. Bases are never popped.
    pub fn revert_all(&self) -> usize {
        let records = std::mem::take(&mut *self.records.lock());
        let popped = records
            .iter()
            .rev()
            .filter_map(Weak::upgrade)
            .filter(|node| node.pop_handler())
            .count();
        if popped > 0 {
            tracing::debug!(popped, "reverted overrides");
        }
        popped
    }

    /// Number of pushes not yet reverted
    pub fn active(&self) -> usize {
        self.records.lock().len()
    }
}

/// Guard that runs a revert when dropped, on every exit path
#[must_use = "the overrides are reverted as soon as the scope is dropped"]
pub struct OverrideScope<'a> {
    revert: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> OverrideScope<'a> {
    pub fn new(revert: impl FnOnce() + 'a) -> Self {
        Self {
            revert: Some(Box::new(revert)),
        }
    }
}

impl Drop for OverrideScope<'_> {
    fn drop(&mut self) {
        if let Some(revert) = self.revert.take() {
            revert();
        }
    }
}
