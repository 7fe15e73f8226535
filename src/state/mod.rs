//! Shared state owned by the session orchestrator
//!
//! - `errors`: the error channel aggregator
//! - `generation`: generation tokens and the widget instance key
//! - `view`: reduction of state into the presented surface

pub mod errors;
pub mod generation;
pub mod view;

pub use errors::{ErrorChannel, ErrorSlot, ErrorState, PresentedError};
pub use generation::{Generation, GenerationCounter, WidgetInstanceKey};
pub use view::SurfaceView;
