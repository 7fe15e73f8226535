//! Generation tokens and widget instance keys
//!
//! A `Generation` is captured before every suspension point. When the
//! continuation resumes it only applies its effect if the token is still
//! current; a reset or deactivation advances the counter and thereby turns
//! every in-flight continuation into a no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of a generation counter
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Shared, monotonically advancing generation counter
#[derive(Clone, Debug, Default)]
pub struct GenerationCounter {
    inner: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current generation
    pub fn current(&self) -> Generation {
        Generation(self.inner.load(Ordering::SeqCst))
    }

    /// Invalidate all outstanding tokens and return the new generation
    pub fn advance(&self) -> Generation {
        Generation(self.inner.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Check whether a captured token is still current
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current() == generation
    }
}

/// Key that forces the embedded widget to fully remount when bumped
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetInstanceKey(pub u64);

impl WidgetInstanceKey {
    pub fn next(self) -> Self {
        WidgetInstanceKey(self.0 + 1)
    }
}

impl std::fmt::Display for WidgetInstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "widget-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_invalidates_previous_token() {
        let counter = GenerationCounter::new();
        let token = counter.current();
        assert!(counter.is_current(token));

        let next = counter.advance();
        assert!(!counter.is_current(token));
        assert!(counter.is_current(next));
        assert!(next > token);
    }

    #[test]
    fn test_clones_share_counter() {
        let counter = GenerationCounter::new();
        let clone = counter.clone();
        let token = counter.current();
        clone.advance();
        assert!(!counter.is_current(token));
    }

    #[test]
    fn test_instance_key_increments() {
        let key = WidgetInstanceKey::default();
        assert_eq!(key.next(), WidgetInstanceKey(1));
        assert!(key.next() > key);
        assert_eq!(key.next().to_string(), "widget-1");
    }
}
