//! Keys typed since the last reset

use super::mode::Mode;

/// The concatenated keys a resolution attempt looked at.
///
/// Carries the epoch it was taken in, so consuming it after the sequence
/// was reset (cancel, overlay teardown) is a no-op.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChordSnapshot {
    pub joined: String,
    pub len: usize,
    pub epoch: u64,
}

/// In-flight chord
#[derive(Debug, Default)]
pub struct PendingSequence {
    keys: Vec<(Mode, String)>,
    joined: Option<String>,
    epoch: u64,
}

impl PendingSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mode: Mode, token: impl Into<String>) {
        self.keys.push((mode, token.into()));
        self.joined = None;
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.joined = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether the first key typed was `token`
    pub fn starts_with(&self, token: &str) -> bool {
        self.keys.first().is_some_and(|(_, first)| first == token)
    }

    /// Concatenation of all tokens, computed once per change
    pub fn joined(&mut self) -> &str {
        let keys = &self.keys;
        self.joined
            .get_or_insert_with(|| keys.iter().map(|(_, token)| token.as_str()).collect())
    }

    pub fn tokens(&self) -> Vec<String> {
        self.keys.iter().map(|(_, token)| token.clone()).collect()
    }

    pub fn snapshot(&mut self) -> ChordSnapshot {
        ChordSnapshot {
            joined: self.joined().to_string(),
            len: self.keys.len(),
            epoch: self.epoch,
        }
    }

    /// Drop the keys covered by `snapshot`, leaving anything typed after it.
    ///
    /// Returns false if the sequence was reset since the snapshot was taken.
    pub fn consume(&mut self, snapshot: &ChordSnapshot) -> bool {
        if snapshot.epoch != self.epoch {
            return false;
        }
        let n = snapshot.len.min(self.keys.len());
        self.keys.drain(..n);
        self.joined = None;
        self.epoch = self.epoch.wrapping_add(1);
        true
    }
}
