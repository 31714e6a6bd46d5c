//! The chord engine
//!
//! [`ChordEngine`] is what a host editor talks to. It turns keystrokes into
//! tokens, accumulates them into a pending chord, and decides per key
//! whether to resolve right away or to wait for the leader timeout:
//!
//! ```text
//! Keystroke → TokenTable → PendingSequence ─┬─ inline ───────────┬→ Resolver → handler
//!                                           └─ Debouncer (delay) ┘
//! ```
//!
//! Only a command-mode chord that starts with `<leader>` waits. Everything
//! else resolves on the calling thread and cancels any waiting attempt.
//! A key that arrives while a deferred attempt is already running its
//! handler waits for it, so keys are always resolved in arrival order.

mod handle;
mod scheduler;

pub use handle::{ResolutionHandle, ResolveResult};
pub use scheduler::{Debouncer, Job, Ticket};

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::config::EngineConfig;
use crate::error::{KeymapError, ResolveError};
use crate::events::{emit, EngineEvent, EventSender};
use crate::keymap::{
    ActionTable, BindingInfo, BindingTarget, Handler, Keymaps, Keystroke, MacroBinding, Mode,
    OverrideManager, OverrideScope, PendingSequence, Resolution, Resolver, TokenTable, TrieNode,
    LEADER,
};

/// State shared with deferred resolution jobs
struct Shared {
    config: EngineConfig,
    tokens: TokenTable,
    keymaps: Arc<Keymaps>,
    resolver: Resolver,
    overrides: OverrideManager,
    pending: Mutex<PendingSequence>,
    /// Held from snapshot to consume so keys resolve in arrival order.
    /// Reentrant because handlers may feed keys themselves.
    resolving: ReentrantMutex<()>,
    events: Option<EventSender>,
}

impl Shared {
    fn emit(&self, event: EngineEvent) {
        emit(self.events.as_ref(), event);
    }

    /// Resolve whatever is pending now, then drop exactly the keys looked at.
    ///
    /// A deferred attempt passes its ticket; if a later key replaced it while
    /// it waited for an earlier resolution to finish, it gives up.
    fn resolve_pending(&self, mode: Mode, ticket: Option<&Ticket>) -> ResolveResult {
        let _resolving = self.resolving.lock();
        if ticket.is_some_and(|ticket| !ticket.is_current()) {
            return Ok(Resolution::Superseded);
        }

        let snapshot = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                return Ok(Resolution::Superseded);
            }
            pending.snapshot()
        };

        let result = self.resolver.resolve(mode, &snapshot.joined);

        match &result {
            Ok(Resolution::Incomplete) => {
                self.emit(EngineEvent::KeysPending {
                    mode,
                    keys: snapshot.joined.clone(),
                });
            }
            Ok(Resolution::NoMatch) => {
                self.pending.lock().consume(&snapshot);
                self.emit(EngineEvent::NoMatch {
                    mode,
                    keys: snapshot.joined.clone(),
                });
            }
            _ => {
                self.pending.lock().consume(&snapshot);
            }
        }

        result
    }
}

pub struct ChordEngine {
    shared: Arc<Shared>,
    debouncer: Debouncer,
}

impl ChordEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::build(config, None)
    }

    /// Engine that publishes [`EngineEvent`]s to `events`
    pub fn with_events(config: EngineConfig, events: EventSender) -> Self {
        Self::build(config, Some(events))
    }

    fn build(config: EngineConfig, events: Option<EventSender>) -> Self {
        let keymaps = Arc::new(Keymaps::new());
        let resolver = Resolver::new(Arc::clone(&keymaps), &config, events.clone());
        let tokens = TokenTable::with_leader(config.leader_key);
        tracing::debug!(
            leader = ?config.leader_key,
            delay_ms = config.leader_delay_ms,
            tokens = tokens.len(),
            "chord engine started"
        );

        Self {
            shared: Arc::new(Shared {
                config,
                tokens,
                keymaps,
                resolver,
                overrides: OverrideManager::new(),
                pending: Mutex::new(PendingSequence::new()),
                resolving: ReentrantMutex::new(()),
                events,
            }),
            debouncer: Debouncer::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn token_table(&self) -> &TokenTable {
        &self.shared.tokens
    }

    /// Feed one physical key
    pub fn resolve(&self, mode: Mode, keystroke: Keystroke) -> ResolutionHandle {
        match self.shared.tokens.token(&keystroke) {
            Some(token) => {
                let token = token.to_string();
                self.resolve_token(mode, &token)
            }
            None => {
                tracing::debug!(%mode, %keystroke, "keystroke has no token, ignoring");
                ResolutionHandle::ready(Ok(Resolution::NoMatch))
            }
        }
    }

    /// Feed one token, as produced by the token table
    pub fn resolve_token(&self, mode: Mode, token: &str) -> ResolutionHandle {
        let shared = &self.shared;
        let defer = {
            let mut pending = shared.pending.lock();
            if token == shared.config.cancel_token && !pending.is_empty() {
                let keys = pending.joined().to_string();
                pending.clear();
                drop(pending);
                self.debouncer.cancel();
                tracing::debug!(%mode, %keys, "pending keys cancelled");
                shared.emit(EngineEvent::Cancelled { mode, keys });
                return ResolutionHandle::ready(Ok(Resolution::Cancelled));
            }
            pending.push(mode, token);
            tracing::debug!(%mode, token, pending = pending.joined(), "key");
            mode == Mode::Command && pending.starts_with(LEADER)
        };

        if !defer {
            self.debouncer.cancel();
            return ResolutionHandle::ready(shared.resolve_pending(mode, None));
        }

        let keys = shared.pending.lock().joined().to_string();
        shared.emit(EngineEvent::KeysPending { mode, keys });

        let (tx, handle) = ResolutionHandle::deferred();
        let job_shared = Arc::clone(shared);
        self.debouncer
            .schedule_with(shared.config.leader_delay(), move |ticket| -> Job {
                Box::new(move || {
                    let _ = tx.send(job_shared.resolve_pending(mode, Some(&ticket)));
                })
            });
        handle
    }

    /// Bind `tokens` in every mode of `modes`
    pub fn register_binding(
        &self,
        modes: &[Mode],
        tokens: &str,
        description: &str,
        handler: Handler,
        hidden: bool,
    ) -> Result<(), KeymapError> {
        self.shared.tokens.parse_keys(tokens)?;
        self.shared
            .keymaps
            .register(modes, tokens, description, &handler, hidden)?;
        Ok(())
    }

    pub fn unregister(&self, mode: Mode, tokens: &str) -> bool {
        self.shared.keymaps.unregister(mode, tokens)
    }

    pub fn find(&self, mode: Mode, tokens: &str) -> Option<Arc<TrieNode>> {
        self.shared.keymaps.find(mode, tokens)
    }

    /// Visible bindings of `mode`, sorted by token
    pub fn bindings(&self, mode: Mode) -> Vec<BindingInfo> {
        self.shared.keymaps.list(mode)
    }

    /// Every binding of `mode`, hidden ones included
    pub fn all_bindings(&self, mode: Mode) -> Vec<BindingInfo> {
        self.shared.keymaps.list_all(mode)
    }

    /// Temporarily replace the handler of an existing binding.
    ///
    /// Returns the number of modes overridden; 0 means `token` isn't a
    /// complete binding in any of `modes`.
    pub fn push_override(
        &self,
        modes: &[Mode],
        token: &str,
        description: &str,
        handler: Handler,
    ) -> usize {
        self.shared
            .overrides
            .push(&self.shared.keymaps, modes, token, description, &handler)
    }

    /// Undo every override pushed so far and drop pending keys
    pub fn revert_all(&self) -> usize {
        let count = self.shared.overrides.revert_all();
        self.cancel();
        tracing::debug!(count, "overrides reverted");
        self.shared.emit(EngineEvent::OverridesReverted { count });
        count
    }

    /// Guard that calls [`revert_all`](Self::revert_all) when dropped
    pub fn override_scope(&self) -> OverrideScope<'_> {
        OverrideScope::new(move || {
            self.revert_all();
        })
    }

    pub fn last_executed(&self) -> Option<Arc<TrieNode>> {
        self.shared.resolver.last_executed()
    }

    pub fn history(&self) -> Vec<BindingInfo> {
        self.shared.resolver.history()
    }

    /// Run the last executed binding again
    pub fn repeat_last(&self) -> Result<Option<Arc<TrieNode>>, ResolveError> {
        self.shared.resolver.repeat_last()
    }

    /// Drop pending keys and any waiting leader timeout
    pub fn cancel(&self) {
        self.shared.pending.lock().clear();
        self.debouncer.cancel();
    }

    pub fn pending_keys(&self) -> Vec<String> {
        self.shared.pending.lock().tokens()
    }

    /// Register keymap file bindings, resolving `action:` names in `actions`.
    ///
    /// Returns the number of bindings registered. Entries naming an unknown
    /// action or with invalid keys are skipped with a warning.
    pub fn install_keymap(&self, bindings: &[MacroBinding], actions: &ActionTable) -> usize {
        let mut installed = 0;
        for binding in bindings {
            let handler = match &binding.target {
                BindingTarget::Expand(expansion) => Handler::expand(expansion.clone()),
                BindingTarget::Action(name) => match actions.get(name) {
                    Some(handler) => handler.clone(),
                    None => {
                        tracing::warn!(
                            "Skipping binding {} ({}): unknown action {}",
                            binding.keys,
                            binding.mode,
                            name
                        );
                        continue;
                    }
                },
                BindingTarget::Unbound => {
                    self.unregister(binding.mode, &binding.keys);
                    continue;
                }
            };

            match self.register_binding(
                &[binding.mode],
                &binding.keys,
                &binding.description,
                handler,
                binding.hidden,
            ) {
                Ok(()) => installed += 1,
                Err(e) => tracing::warn!("Skipping binding {}: {}", binding.keys, e),
            }
        }
        tracing::info!("Installed {} of {} keymap bindings", installed, bindings.len());
        installed
    }
}

impl Default for ChordEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
