//! Turning a key string into handler calls
//!
//! Resolution looks the concatenated keys up in the mode's trie. A complete
//! binding runs its active handler; a handler may return a synthetic token
//! string, which is fed back through the same trie as if it had been typed.
//! Expansion runs off an explicit work list so a binding that expands to
//! itself is cut off at `max_recursion_depth` instead of overflowing the
//! stack.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::error::ResolveError;
use crate::events::{emit, EngineEvent, EventSender};

use super::mode::Mode;
use super::registry::Keymaps;
use super::token::split_tokens;
use super::trie::{BindingInfo, TrieNode};

/// Outcome of feeding keys to the engine
#[derive(Clone, Debug)]
pub enum Resolution {
    /// A complete binding ran
    Matched(Arc<TrieNode>),
    /// The keys are a prefix of at least one binding
    Incomplete,
    /// Nothing starts with these keys; they were dropped
    NoMatch,
    /// The cancel key dropped the pending keys
    Cancelled,
    /// A later key replaced this deferred attempt before it ran
    Superseded,
}

impl Resolution {
    pub fn is_matched(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }

    /// Token of the matched binding
    pub fn token(&self) -> Option<String> {
        match self {
            Resolution::Matched(node) => node.canonical_token(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct Executed {
    mode: Mode,
    node: Arc<TrieNode>,
}

/// Pending synthetic input at one nesting level
struct Frame {
    tokens: VecDeque<String>,
    depth: usize,
}

pub struct Resolver {
    keymaps: Arc<Keymaps>,
    history: Mutex<VecDeque<Executed>>,
    max_depth: usize,
    history_len: usize,
    repeat_token: String,
    events: Option<EventSender>,
}

impl Resolver {
    pub fn new(keymaps: Arc<Keymaps>, config: &EngineConfig, events: Option<EventSender>) -> Self {
        Self {
            keymaps,
            history: Mutex::new(VecDeque::new()),
            max_depth: config.max_recursion_depth,
            history_len: config.history_len.max(1),
            repeat_token: config.repeat_token.clone(),
            events,
        }
    }

    pub fn keymaps(&self) -> &Arc<Keymaps> {
        &self.keymaps
    }

    /// Resolve `input` (a concatenated token string) in `mode`
    pub fn resolve(&self, mode: Mode, input: &str) -> Result<Resolution, ResolveError> {
        let Some(node) = self.keymaps.find(mode, input) else {
            tracing::debug!(%mode, input, "no binding");
            return Ok(Resolution::NoMatch);
        };
        if !node.is_complete_binding() {
            tracing::debug!(%mode, input, "prefix, waiting for more keys");
            return Ok(Resolution::Incomplete);
        }

        self.run_chain(mode, &node, input, true)?;
        Ok(Resolution::Matched(node))
    }

    /// Re-run the most recently executed binding without recording it again
    pub fn repeat_last(&self) -> Result<Option<Arc<TrieNode>>, ResolveError> {
        let last = self.history.lock().back().cloned();
        let Some(Executed { mode, node }) = last else {
            return Ok(None);
        };
        let Some(token) = node.canonical_token() else {
            // Unregistered since it ran
            return Ok(None);
        };
        self.run_chain(mode, &node, &token, false)?;
        Ok(Some(node))
    }

    pub fn last_executed(&self) -> Option<Arc<TrieNode>> {
        self.history.lock().back().map(|e| Arc::clone(&e.node))
    }

    /// Recently executed bindings, oldest first
    pub fn history(&self) -> Vec<BindingInfo> {
        let entries: Vec<Executed> = self.history.lock().iter().cloned().collect();
        entries
            .into_iter()
            .filter_map(|e| e.node.info(e.mode))
            .collect()
    }

    fn run_chain(
        &self,
        mode: Mode,
        node: &Arc<TrieNode>,
        input: &str,
        record: bool,
    ) -> Result<(), ResolveError> {
        let Some(output) = self.invoke(mode, node, input, record)? else {
            return Ok(());
        };

        let mut work = VecDeque::new();
        work.push_front(Frame {
            tokens: split_tokens(&output).into(),
            depth: 1,
        });

        while let Some(mut frame) = work.pop_front() {
            if frame.tokens.is_empty() {
                continue;
            }
            if frame.depth > self.max_depth {
                let token = node.canonical_token().unwrap_or_else(|| input.to_string());
                tracing::warn!(
                    %mode,
                    %token,
                    depth = frame.depth,
                    "macro expansion exceeded recursion limit, aborting chain"
                );
                emit(
                    self.events.as_ref(),
                    EngineEvent::RecursionLimit {
                        mode,
                        token,
                        depth: frame.depth,
                    },
                );
                return Ok(());
            }

            let Some((count, matched)) = self.longest_match(mode, &frame.tokens) else {
                if let Some(skipped) = frame.tokens.pop_front() {
                    tracing::debug!(%mode, token = %skipped, "synthetic key has no binding, skipping");
                }
                work.push_front(frame);
                continue;
            };

            let consumed: String = frame.tokens.drain(..count).collect();
            let depth = frame.depth;
            work.push_front(frame);

            // Only the binding that started the chain counts as executed
            if let Some(nested) = self.invoke(mode, &matched, &consumed, false)? {
                work.push_front(Frame {
                    tokens: split_tokens(&nested).into(),
                    depth: depth + 1,
                });
            }
        }

        Ok(())
    }

    /// Longest run of leading tokens that names a complete binding
    fn longest_match(
        &self,
        mode: Mode,
        tokens: &VecDeque<String>,
    ) -> Option<(usize, Arc<TrieNode>)> {
        let mut buf = String::new();
        let mut best = None;
        for (i, token) in tokens.iter().enumerate() {
            buf.push_str(token);
            match self.keymaps.find(mode, &buf) {
                Some(node) if node.is_complete_binding() => best = Some((i + 1, node)),
                Some(_) => {}
                None => break,
            }
        }
        best
    }

    /// Call the node's active handler with no locks held
    fn invoke(
        &self,
        mode: Mode,
        node: &Arc<TrieNode>,
        input: &str,
        record: bool,
    ) -> Result<Option<String>, ResolveError> {
        let Some(handler) = node.active_handler() else {
            return Ok(None);
        };
        let token = node.canonical_token().unwrap_or_else(|| input.to_string());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.call(input)));
        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                tracing::warn!(%mode, %token, "handler failed: {:#}", source);
                emit(
                    self.events.as_ref(),
                    EngineEvent::HandlerFailed {
                        mode,
                        token: token.clone(),
                        message: format!("{:#}", source),
                    },
                );
                return Err(ResolveError::Handler { token, source });
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(%mode, %token, "handler panicked: {}", message);
                emit(
                    self.events.as_ref(),
                    EngineEvent::HandlerFailed {
                        mode,
                        token: token.clone(),
                        message: message.clone(),
                    },
                );
                return Err(ResolveError::HandlerPanicked { token, message });
            }
        };

        let output = output.filter(|s| !s.is_empty());
        let is_repeat = output.as_deref() == Some(self.repeat_token.as_str());
        if record && token != self.repeat_token && !is_repeat {
            self.record(mode, node);
        }

        let description = node.description().unwrap_or_default();
        tracing::debug!(%mode, %token, %description, expands_to = ?output, "executed binding");
        emit(
            self.events.as_ref(),
            EngineEvent::BindingExecuted {
                mode,
                token,
                description,
            },
        );

        Ok(output.filter(|_| !is_repeat))
    }

    fn record(&self, mode: Mode, node: &Arc<TrieNode>) {
        let mut history = self.history.lock();
        if history.len() == self.history_len {
            history.pop_front();
        }
        history.push_back(Executed {
            mode,
            node: Arc::clone(node),
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Handler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>, output: Option<&'static str>) -> Handler {
        let counter = Arc::clone(counter);
        Handler::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(output.map(str::to_string))
        })
    }

    fn resolver() -> Resolver {
        Resolver::new(Arc::new(Keymaps::new()), &EngineConfig::default(), None)
    }

    #[test]
    fn test_resolve_outcomes() {
        let r = resolver();
        r.keymaps()
            .register(&[Mode::Command], "gg", "top", &Handler::noop(), false)
            .unwrap();
        assert!(matches!(r.resolve(Mode::Command, "g"), Ok(Resolution::Incomplete)));
        assert!(matches!(r.resolve(Mode::Command, "gx"), Ok(Resolution::NoMatch)));
        let res = r.resolve(Mode::Command, "gg").unwrap();
        assert_eq!(res.token().as_deref(), Some("gg"));
    }

    #[test]
    fn test_expansion_runs_target() {
        let r = resolver();
        let hits = Arc::new(AtomicUsize::new(0));
        r.keymaps()
            .register(&[Mode::Command], "dd", "delete line", &counting(&hits, None), false)
            .unwrap();
        r.keymaps()
            .register(&[Mode::Command], "<leader>d", "delete twice", &Handler::expand("dddd"), false)
            .unwrap();

        r.resolve(Mode::Command, "<leader>d").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_expansion_prefers_longest_match() {
        let r = resolver();
        let short = Arc::new(AtomicUsize::new(0));
        let long = Arc::new(AtomicUsize::new(0));
        r.keymaps()
            .register(&[Mode::Command], "g", "short", &counting(&short, None), false)
            .unwrap();
        r.keymaps()
            .register(&[Mode::Command], "gg", "long", &counting(&long, None), false)
            .unwrap();
        r.keymaps()
            .register(&[Mode::Command], "<c-t>", "macro", &Handler::expand("ggg"), false)
            .unwrap();

        r.resolve(Mode::Command, "<c-t>").unwrap();
        assert_eq!(long.load(Ordering::SeqCst), 1);
        assert_eq!(short.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_self_expansion_terminates() {
        let r = resolver();
        let hits = Arc::new(AtomicUsize::new(0));
        r.keymaps()
            .register(&[Mode::Command], "x", "loop", &counting(&hits, Some("x")), false)
            .unwrap();

        assert!(r.resolve(Mode::Command, "x").unwrap().is_matched());
        // top level plus one call per allowed nesting level
        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_handler_error_reported() {
        let r = resolver();
        r.keymaps()
            .register(
                &[Mode::Command],
                "q",
                "fail",
                &Handler::new(|_| Err(anyhow::anyhow!("boom"))),
                false,
            )
            .unwrap();
        let err = r.resolve(Mode::Command, "q").unwrap_err();
        assert_eq!(err.token(), "q");
        assert!(matches!(err, ResolveError::Handler { .. }));
    }

    #[test]
    fn test_handler_panic_caught() {
        let r = resolver();
        r.keymaps()
            .register(&[Mode::Command], "p", "panic", &Handler::new(|_| panic!("oops")), false)
            .unwrap();
        match r.resolve(Mode::Command, "p") {
            Err(ResolveError::HandlerPanicked { message, .. }) => assert_eq!(message, "oops"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_repeat_sentinel_not_recorded() {
        let r = resolver();
        let hits = Arc::new(AtomicUsize::new(0));
        r.keymaps()
            .register(&[Mode::Command], "x", "delete char", &counting(&hits, None), false)
            .unwrap();
        r.keymaps()
            .register(&[Mode::Command], ".", "repeat", &Handler::noop(), false)
            .unwrap();

        r.resolve(Mode::Command, "x").unwrap();
        r.resolve(Mode::Command, ".").unwrap();
        let last = r.last_executed().unwrap();
        assert_eq!(last.canonical_token().as_deref(), Some("x"));

        r.repeat_last().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(r.history().len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let config = EngineConfig {
            history_len: 2,
            ..EngineConfig::default()
        };
        let r = Resolver::new(Arc::new(Keymaps::new()), &config, None);
        for token in ["a", "b", "c"] {
            r.keymaps()
                .register(&[Mode::Command], token, token, &Handler::noop(), false)
                .unwrap();
            r.resolve(Mode::Command, token).unwrap();
        }
        let tokens: Vec<String> = r.history().into_iter().map(|b| b.token).collect();
        assert_eq!(tokens, vec!["b", "c"]);
    }
}
