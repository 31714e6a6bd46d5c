//! Binding handlers and the per-binding override stack

use std::fmt;
use std::sync::Arc;

/// What a handler returns: optionally a synthetic token string to re-feed
pub type HandlerResult = anyhow::Result<Option<String>>;

type HandlerFn = dyn Fn(&str) -> HandlerResult + Send + Sync;

/// Opaque action invoked when a binding completes.
///
/// Receives the concatenated token string that matched. Two handlers are
/// the same handler only if they share the same allocation, which is what
/// registration and override de-duplication compare.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> HandlerResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Handler that does nothing
    pub fn noop() -> Self {
        Self::new(|_| Ok(None))
    }

    /// Macro handler: always expands to `tokens`
    pub fn expand(tokens: impl Into<String>) -> Self {
        let tokens = tokens.into();
        Self::new(move |_| Ok(Some(tokens.clone())))
    }

    #[inline]
    pub fn call(&self, input: &str) -> HandlerResult {
        (self.0)(input)
    }

    /// Pointer identity
    #[inline]
    pub fn same(&self, other: &Handler) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Arc::as_ptr(&self.0))
    }
}

/// One layer of a handler stack
#[derive(Clone, Debug)]
pub struct HandlerEntry {
    pub handler: Handler,
    pub description: String,
}

/// Base handler plus temporary override layers; the top layer is active.
///
/// The base lives outside the override vector, so popping can never leave a
/// complete binding without a handler.
#[derive(Clone, Debug)]
pub struct HandlerStack {
    base: HandlerEntry,
    overrides: Vec<HandlerEntry>,
}

impl HandlerStack {
    pub fn new(handler: Handler, description: impl Into<String>) -> Self {
        Self {
            base: HandlerEntry {
                handler,
                description: description.into(),
            },
            overrides: Vec::new(),
        }
    }

    /// Push a layer. Returns false (and does nothing) when `handler` is
    /// already the active one.
    pub fn push(&mut self, handler: Handler, description: impl Into<String>) -> bool {
        if self.active().handler.same(&handler) {
            return false;
        }
        self.overrides.push(HandlerEntry {
            handler,
            description: description.into(),
        });
        true
    }

    /// Pop the top override. The base is never popped.
    pub fn pop(&mut self) -> Option<HandlerEntry> {
        self.overrides.pop()
    }

    pub fn active(&self) -> &HandlerEntry {
        self.overrides.last().unwrap_or(&self.base)
    }

    pub fn base(&self) -> &HandlerEntry {
        &self.base
    }

    /// Number of layers including the base (always at least 1)
    pub fn depth(&self) -> usize {
        1 + self.overrides.len()
    }

    pub fn is_overridden(&self) -> bool {
        !self.overrides.is_empty()
    }
}
