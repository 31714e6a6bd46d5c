//! Per-mode prefix tree of bindings
//!
//! The trie is keyed on the characters of the concatenated token string,
//! so `"<leader>bc"` is a path of ten nodes. Only the last node of a
//! registered sequence is a complete binding; every node on the way is a
//! prefix that keeps the chord accumulating.
//!
//! Nodes are shared through `Arc` so the resolver, the override records and
//! the execution history can hold on to a node without holding a lock on
//! the trie.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::KeymapError;

use super::handler::{Handler, HandlerStack};
use super::mode::Mode;

/// Read-only snapshot of one complete binding, used for listings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingInfo {
    pub mode: Mode,
    pub token: String,
    pub description: String,
    pub hidden: bool,
    /// Handler layers including the base
    pub depth: usize,
}

#[derive(Debug)]
struct BindingSlot {
    token: String,
    hidden: bool,
    handlers: HandlerStack,
}

/// A node in a binding trie
pub struct TrieNode {
    children: RwLock<HashMap<char, Arc<TrieNode>>>,
    binding: RwLock<Option<BindingSlot>>,
}

impl TrieNode {
    fn new() -> Self {
        Self {
            children: RwLock::new(HashMap::new()),
            binding: RwLock::new(None),
        }
    }

    /// Whether this node ends a registered sequence
    pub fn is_complete_binding(&self) -> bool {
        self.binding.read().is_some()
    }

    /// The full token string of the binding ending here
    pub fn canonical_token(&self) -> Option<String> {
        self.binding.read().as_ref().map(|slot| slot.token.clone())
    }

    /// Description of the active handler layer
    pub fn description(&self) -> Option<String> {
        self.binding
            .read()
            .as_ref()
            .map(|slot| slot.handlers.active().description.clone())
    }

    pub fn is_hidden(&self) -> bool {
        self.binding.read().as_ref().is_some_and(|slot| slot.hidden)
    }

    /// Clone of the active handler, so it can be called without holding the lock
    pub fn active_handler(&self) -> Option<Handler> {
        self.binding
            .read()
            .as_ref()
            .map(|slot| slot.handlers.active().handler.clone())
    }

    /// Number of handler layers, 0 for prefix-only nodes
    pub fn handler_depth(&self) -> usize {
        self.binding
            .read()
            .as_ref()
            .map_or(0, |slot| slot.handlers.depth())
    }

    pub fn has_children(&self) -> bool {
        !self.children.read().is_empty()
    }

    pub fn child(&self, c: char) -> Option<Arc<TrieNode>> {
        self.children.read().get(&c).cloned()
    }

    /// Push an override layer. False if this isn't a complete binding or
    /// `handler` is already active.
    pub fn push_handler(&self, handler: Handler, description: impl Into<String>) -> bool {
        match self.binding.write().as_mut() {
            Some(slot) => slot.handlers.push(handler, description),
            None => false,
        }
    }

    /// Pop the top override layer. False when only the base is left.
    pub fn pop_handler(&self) -> bool {
        match self.binding.write().as_mut() {
            Some(slot) => slot.handlers.pop().is_some(),
            None => false,
        }
    }

    pub fn info(&self, mode: Mode) -> Option<BindingInfo> {
        self.binding.read().as_ref().map(|slot| BindingInfo {
            mode,
            token: slot.token.clone(),
            description: slot.handlers.active().description.clone(),
            hidden: slot.hidden,
            depth: slot.handlers.depth(),
        })
    }
}

impl fmt::Debug for TrieNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieNode")
            .field("token", &self.canonical_token())
            .field("depth", &self.handler_depth())
            .field("children", &self.children.read().len())
            .finish()
    }
}

/// Binding trie for a single mode
#[derive(Debug)]
pub struct Trie {
    mode: Mode,
    root: Arc<TrieNode>,
}

impl Trie {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            root: Arc::new(TrieNode::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Insert or extend the path for `token` and attach `handler`.
    ///
    /// A new binding gets `handler` as its base. Registering the handler
    /// that is already active does nothing; a different handler is pushed
    /// as a new layer on top.
    ///
    /// `hidden` only applies when the binding is created. Later layers keep
    /// the node's visibility, and its token is the same path by construction.
    pub fn insert(
        &self,
        token: &str,
        description: impl Into<String>,
        handler: Handler,
        hidden: bool,
    ) -> Result<Arc<TrieNode>, KeymapError> {
        if token.is_empty() {
            return Err(KeymapError::EmptySequence);
        }

        let mut node = Arc::clone(&self.root);
        for c in token.chars() {
            let next = Arc::clone(
                node.children
                    .write()
                    .entry(c)
                    .or_insert_with(|| Arc::new(TrieNode::new())),
            );
            node = next;
        }

        {
            let mut binding = node.binding.write();
            match binding.as_mut() {
                Some(slot) => {
                    slot.handlers.push(handler, description);
                }
                None => {
                    *binding = Some(BindingSlot {
                        token: token.to_string(),
                        hidden,
                        handlers: HandlerStack::new(handler, description),
                    });
                }
            }
        }

        Ok(node)
    }

    /// Exact walk. `find("")` is the root, which is never complete.
    pub fn find(&self, token: &str) -> Option<Arc<TrieNode>> {
        let mut node = Arc::clone(&self.root);
        for c in token.chars() {
            let next = node.child(c)?;
            node = next;
        }
        Some(node)
    }

    /// Remove the binding at `token` and prune branches left empty
    pub fn delete(&self, token: &str) -> bool {
        let chars: Vec<char> = token.chars().collect();
        if chars.is_empty() {
            return false;
        }
        Self::delete_at(&self.root, &chars)
    }

    fn delete_at(node: &TrieNode, rest: &[char]) -> bool {
        let Some((first, tail)) = rest.split_first() else {
            return node.binding.write().take().is_some();
        };
        let Some(child) = node.child(*first) else {
            return false;
        };

        let removed = Self::delete_at(&child, tail);
        if removed && !child.is_complete_binding() && !child.has_children() {
            node.children.write().remove(first);
        }
        removed
    }

    /// Every complete binding, sorted by token
    pub fn bindings(&self) -> Vec<BindingInfo> {
        let mut out = Vec::new();
        self.collect(&self.root, &mut out);
        out.sort_by(|a, b| a.token.cmp(&b.token));
        out
    }

    fn collect(&self, node: &TrieNode, out: &mut Vec<BindingInfo>) {
        if let Some(info) = node.info(self.mode) {
            out.push(info);
        }
        let children: Vec<Arc<TrieNode>> = node.children.read().values().cloned().collect();
        for child in children {
            self.collect(&child, out);
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.root.has_children()
    }
}
