//! Warning sink for recoverable compilation failures.
//!
//! The compiler never decides how a warning is displayed. It hands every
//! recovered failure to a [`Reporter`], which the caller supplies.

use crate::error::Error;
use log::warn;
use std::sync::Mutex;

/// Single-argument event sink.
pub trait Reporter: Send + Sync {
    /// Record one warning event.
    fn report(&self, event: Error);
}

/// Forwards every event to the `log` facade at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, event: Error) {
        warn!("Warning: {}", event);
    }
}

/// Keeps events in memory, in the order they were reported.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<Error>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered messages of all events reported so far
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Apply `f` to the recorded events
    pub fn with_events<T>(&self, f: impl FnOnce(&[Error]) -> T) -> T {
        f(&self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Error>> {
        // A panicking reporter thread leaves the vector intact.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: Error) {
        self.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_keeps_order() {
        let reporter = MemoryReporter::new();
        reporter.report(Error::route("/a", "first"));
        reporter.report(Error::route("/b", "second"));

        assert_eq!(reporter.len(), 2);
        let messages = reporter.messages();
        assert!(messages[0].contains("/a"));
        assert!(messages[1].contains("/b"));
    }

    #[test]
    fn test_with_events() {
        let reporter = MemoryReporter::new();
        assert!(reporter.is_empty());
        reporter.report(Error::InvalidSchemaUsage("nope".to_string()));

        let kinds = reporter.with_events(|events| {
            events
                .iter()
                .filter(|e| matches!(e, Error::InvalidSchemaUsage(_)))
                .count()
        });
        assert_eq!(kinds, 1);
    }
}
