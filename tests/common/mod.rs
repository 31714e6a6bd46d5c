//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use chordmap::{ChordEngine, EngineConfig, Handler};

/// Leader timeout used by tests: long enough that keys fed back to back
/// land inside it, short enough to keep the suite fast
pub const TEST_DELAY_MS: u64 = 80;

/// Generous upper bound for waiting on a deferred resolution
pub const WAIT: Duration = Duration::from_secs(5);

/// Config with the short test leader delay
pub fn test_config() -> EngineConfig {
    EngineConfig {
        leader_delay_ms: TEST_DELAY_MS,
        ..EngineConfig::default()
    }
}

/// Engine with the short test leader delay
pub fn test_engine() -> ChordEngine {
    ChordEngine::new(test_config())
}

/// Shared log of handler invocations
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that records `name` and returns nothing
    pub fn handler(&self, name: &str) -> Handler {
        self.expanding(name, None)
    }

    /// Handler that records `name` and returns `output`
    pub fn expanding(&self, name: &str, output: Option<&str>) -> Handler {
        let log = Arc::clone(&self.0);
        let name = name.to_string();
        let output = output.map(str::to_string);
        Handler::new(move |_| {
            log.lock().push(name.clone());
            Ok(output.clone())
        })
    }

    /// Record a call from a hand-written handler
    pub fn record(&self, name: &str) {
        self.0.lock().push(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.lock().iter().filter(|call| *call == name).count()
    }
}
