//! Error channel aggregation
//!
//! Each producer (readiness gate, session provider, response lifecycle) owns
//! exactly one slot and only ever writes that slot. The slots are reduced to a
//! single presented error by fixed priority: script, then session, then
//! integration.

use parking_lot::RwLock;
use std::sync::Arc;

/// Independent error slots, in presentation priority order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSlot {
    /// Widget runtime failed to load or register
    Script,
    /// Credential exchange or workflow configuration failed
    Session,
    /// In-conversation runtime error
    Integration,
}

impl ErrorSlot {
    /// All slots, highest priority first
    pub const PRIORITY: [ErrorSlot; 3] = [ErrorSlot::Script, ErrorSlot::Session, ErrorSlot::Integration];
}

impl std::fmt::Display for ErrorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSlot::Script => write!(f, "script"),
            ErrorSlot::Session => write!(f, "session"),
            ErrorSlot::Integration => write!(f, "integration"),
        }
    }
}

/// The error presented to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresentedError {
    pub slot: ErrorSlot,
    pub message: String,
    pub retryable: bool,
}

/// All error slots plus the retryable flag
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorState {
    pub script: Option<String>,
    pub session: Option<String>,
    pub integration: Option<String>,
    pub retryable: bool,
}

impl ErrorState {
    /// Create an empty error state
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a single slot
    pub fn slot(&self, slot: ErrorSlot) -> Option<&str> {
        match slot {
            ErrorSlot::Script => self.script.as_deref(),
            ErrorSlot::Session => self.session.as_deref(),
            ErrorSlot::Integration => self.integration.as_deref(),
        }
    }

    fn slot_mut(&mut self, slot: ErrorSlot) -> &mut Option<String> {
        match slot {
            ErrorSlot::Script => &mut self.script,
            ErrorSlot::Session => &mut self.session,
            ErrorSlot::Integration => &mut self.integration,
        }
    }

    /// Write a single slot, leaving the others untouched
    pub fn set(&mut self, slot: ErrorSlot, message: Option<String>) {
        *self.slot_mut(slot) = message;
    }

    /// Highest-priority non-empty slot
    pub fn presented(&self) -> Option<PresentedError> {
        ErrorSlot::PRIORITY.iter().find_map(|&slot| {
            self.slot(slot).map(|message| PresentedError {
                slot,
                message: message.to_string(),
                retryable: self.retryable,
            })
        })
    }

    /// Check if any slot holds an error
    pub fn has_error(&self) -> bool {
        self.presented().is_some()
    }
}

/// Shared handle to the error state
///
/// Cloning the channel shares the underlying state, the same way the
/// orchestrator shares it with each producer.
#[derive(Clone, Debug, Default)]
pub struct ErrorChannel {
    inner: Arc<RwLock<ErrorState>>,
}

impl ErrorChannel {
    /// Create a channel with every slot empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one slot into the state without touching the others
    pub fn set_error(&self, slot: ErrorSlot, message: Option<String>) {
        self.inner.write().set(slot, message);
    }

    /// Set a slot together with the retryable flag
    pub fn fail(&self, slot: ErrorSlot, message: impl Into<String>, retryable: bool) {
        let mut state = self.inner.write();
        state.set(slot, Some(message.into()));
        state.retryable = retryable;
    }

    /// Clear the given slots
    pub fn clear(&self, slots: &[ErrorSlot]) {
        let mut state = self.inner.write();
        for &slot in slots {
            state.set(slot, None);
        }
    }

    /// Highest-priority error, if any
    pub fn presented_error(&self) -> Option<PresentedError> {
        self.inner.read().presented()
    }

    /// Whether the presented error may be retried
    pub fn is_retryable(&self) -> bool {
        self.inner.read().retryable
    }

    /// Clear every slot and the retryable flag at once
    pub fn reset(&self) {
        *self.inner.write() = ErrorState::new();
    }

    /// Copy of the current state (no lock held after return)
    pub fn snapshot(&self) -> ErrorState {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state_presents_nothing() {
        let channel = ErrorChannel::new();
        assert!(channel.presented_error().is_none());
        assert!(!channel.is_retryable());
    }

    #[test]
    fn test_priority_order() {
        let channel = ErrorChannel::new();
        channel.set_error(ErrorSlot::Integration, Some("integration".into()));
        assert_eq!(
            channel.presented_error().map(|e| e.message),
            Some("integration".to_string())
        );

        channel.set_error(ErrorSlot::Session, Some("session".into()));
        assert_eq!(
            channel.presented_error().map(|e| e.slot),
            Some(ErrorSlot::Session)
        );

        channel.set_error(ErrorSlot::Script, Some("script".into()));
        assert_eq!(
            channel.presented_error().map(|e| e.message),
            Some("script".to_string())
        );

        channel.set_error(ErrorSlot::Script, None);
        assert_eq!(
            channel.presented_error().map(|e| e.message),
            Some("session".to_string())
        );
    }

    #[test]
    fn test_partial_update_keeps_other_slots() {
        let channel = ErrorChannel::new();
        channel.set_error(ErrorSlot::Script, Some("a".into()));
        channel.set_error(ErrorSlot::Session, Some("b".into()));
        channel.clear(&[ErrorSlot::Session, ErrorSlot::Integration]);

        let state = channel.snapshot();
        assert_eq!(state.script.as_deref(), Some("a"));
        assert!(state.session.is_none());
    }

    #[test]
    fn test_every_sequence_presents_highest_priority() {
        // Walk all 27 combinations of (none, first, second) per slot
        let values = [None, Some("x"), Some("y")];
        for script in values {
            for session in values {
                for integration in values {
                    let channel = ErrorChannel::new();
                    channel.set_error(ErrorSlot::Integration, integration.map(String::from));
                    channel.set_error(ErrorSlot::Session, session.map(String::from));
                    channel.set_error(ErrorSlot::Script, script.map(String::from));

                    let expected = script.or(session).or(integration).map(String::from);
                    assert_eq!(channel.presented_error().map(|e| e.message), expected);
                }
            }
        }
    }

    #[test]
    fn test_fail_sets_retryable() {
        let channel = ErrorChannel::new();
        channel.fail(ErrorSlot::Session, "down", true);
        let presented = channel.presented_error().unwrap();
        assert!(presented.retryable);
        assert!(channel.is_retryable());
    }

    #[test]
    fn test_reset_clears_everything() {
        let channel = ErrorChannel::new();
        channel.fail(ErrorSlot::Script, "a", true);
        channel.set_error(ErrorSlot::Integration, Some("c".into()));
        channel.reset();
        assert_eq!(channel.snapshot(), ErrorState::default());
    }

    #[test]
    fn test_clones_share_state() {
        let channel = ErrorChannel::new();
        let producer = channel.clone();
        producer.set_error(ErrorSlot::Session, Some("shared".into()));
        assert_eq!(channel.snapshot().session.as_deref(), Some("shared"));
    }
}
