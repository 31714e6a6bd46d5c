//! Owner of the per-mode tries

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::KeymapError;

use super::handler::Handler;
use super::mode::Mode;
use super::trie::{BindingInfo, Trie, TrieNode};

/// Exactly one trie per mode, created on first use
#[derive(Debug, Default)]
pub struct Keymaps {
    tries: RwLock<HashMap<Mode, Arc<Trie>>>,
}

impl Keymaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// The trie for `mode`, creating it if needed
    pub fn trie(&self, mode: Mode) -> Arc<Trie> {
        if let Some(trie) = self.tries.read().get(&mode) {
            return Arc::clone(trie);
        }
        Arc::clone(
            self.tries
                .write()
                .entry(mode)
                .or_insert_with(|| Arc::new(Trie::new(mode))),
        )
    }

    /// Register `token` in every mode of `modes`
    pub fn register(
        &self,
        modes: &[Mode],
        token: &str,
        description: &str,
        handler: &Handler,
        hidden: bool,
    ) -> Result<Vec<Arc<TrieNode>>, KeymapError> {
        if token.is_empty() {
            return Err(KeymapError::EmptySequence);
        }
        let mut nodes = Vec::with_capacity(modes.len());
        for &mode in modes {
            let node = self
                .trie(mode)
                .insert(token, description, handler.clone(), hidden)?;
            tracing::debug!(%mode, token, description, depth = node.handler_depth(), "registered binding");
            nodes.push(node);
        }
        Ok(nodes)
    }

    pub fn find(&self, mode: Mode, token: &str) -> Option<Arc<TrieNode>> {
        let trie = self.tries.read().get(&mode).cloned()?;
        trie.find(token)
    }

    /// Remove `token` from `mode`; returns whether a binding was removed
    pub fn unregister(&self, mode: Mode, token: &str) -> bool {
        let Some(trie) = self.tries.read().get(&mode).cloned() else {
            return false;
        };
        let removed = trie.delete(token);
        if removed {
            tracing::debug!(%mode, token, "unregistered binding");
        }
        removed
    }

    /// Visible bindings for `mode`
    pub fn list(&self, mode: Mode) -> Vec<BindingInfo> {
        self.list_all(mode)
            .into_iter()
            .filter(|info| !info.hidden)
            .collect()
    }

    /// All bindings for `mode`, hidden ones included
    pub fn list_all(&self, mode: Mode) -> Vec<BindingInfo> {
        self.tries
            .read()
            .get(&mode)
            .cloned()
            .map(|trie| trie.bindings())
            .unwrap_or_default()
    }
}
