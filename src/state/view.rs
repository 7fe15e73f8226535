//! The three mutually exclusive surfaces the host can present

use super::errors::{ErrorSlot, ErrorState};

/// What the host should render in place of the widget container
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceView {
    /// Widget is mounted and interactive
    Interactive,
    /// Session is still being established
    Loading,
    /// A blocking error is shown as an overlay
    Blocked {
        slot: ErrorSlot,
        message: String,
        /// Offer a retry control on the overlay
        retryable: bool,
    },
}

impl SurfaceView {
    /// Reduce error state and the initializing flag to a single surface
    pub fn resolve(errors: &ErrorState, initializing: bool) -> Self {
        match errors.presented() {
            Some(presented) => SurfaceView::Blocked {
                slot: presented.slot,
                message: presented.message,
                retryable: presented.retryable,
            },
            None if initializing => SurfaceView::Loading,
            None => SurfaceView::Interactive,
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, SurfaceView::Interactive)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SurfaceView::Loading)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, SurfaceView::Blocked { .. })
    }

    /// Message shown on the overlay, if blocked
    pub fn message(&self) -> Option<&str> {
        match self {
            SurfaceView::Blocked { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_while_initializing() {
        let errors = ErrorState::new();
        assert_eq!(SurfaceView::resolve(&errors, true), SurfaceView::Loading);
        assert_eq!(SurfaceView::resolve(&errors, false), SurfaceView::Interactive);
    }

    #[test]
    fn test_error_wins_over_loading() {
        let mut errors = ErrorState::new();
        errors.set(ErrorSlot::Session, Some("nope".into()));

        let view = SurfaceView::resolve(&errors, true);
        assert!(view.is_blocked());
        assert_eq!(view.message(), Some("nope"));
        assert_eq!(
            view,
            SurfaceView::Blocked {
                slot: ErrorSlot::Session,
                message: "nope".into(),
                retryable: false,
            }
        );
    }
}
