//! Readiness gate for the widget runtime script
//!
//! Waits for the runtime to register itself, bounded by a grace period. The
//! first terminal outcome of an activation wins: a loaded signal, a load error
//! signal, or the timeout. Deactivation aborts the watcher and advances the
//! activation generation so nothing fires afterwards.

use crate::state::{ErrorChannel, ErrorSlot, GenerationCounter};
use crate::widget::signal::{Signal, Subscription};
use crate::widget::ChatWidget;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Default grace period before the runtime is declared unavailable
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_millis(5000);

/// Message used when the grace period expires
pub const RUNTIME_UNAVAILABLE: &str = "runtime unavailable; verify the script URL is reachable";

/// Signals emitted by the host while loading the runtime script
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptSignal {
    /// The runtime finished loading and registered itself
    Loaded,
    /// The script failed to load
    LoadFailed { detail: Option<String> },
}

/// Readiness of the widget runtime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadinessState {
    #[default]
    Pending,
    Ready,
    Error,
}

impl ReadinessState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessState::Ready)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ReadinessState::Pending)
    }
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadinessState::Pending => write!(f, "Pending"),
            ReadinessState::Ready => write!(f, "Ready"),
            ReadinessState::Error => write!(f, "Error"),
        }
    }
}

enum Outcome {
    Loaded,
    Failed(String),
}

pub struct ReadinessGate {
    widget: Arc<dyn ChatWidget>,
    signals: Signal<ScriptSignal>,
    errors: ErrorChannel,
    timeout: Duration,
    state: Arc<RwLock<ReadinessState>>,
    activation: GenerationCounter,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl ReadinessGate {
    pub fn new(
        widget: Arc<dyn ChatWidget>,
        signals: Signal<ScriptSignal>,
        errors: ErrorChannel,
        timeout: Duration,
    ) -> Self {
        Self {
            widget,
            signals,
            errors,
            timeout,
            state: Arc::new(RwLock::new(ReadinessState::Pending)),
            activation: GenerationCounter::new(),
            watcher: Mutex::new(None),
        }
    }

    /// Current readiness
    pub fn state(&self) -> ReadinessState {
        *self.state.read()
    }

    /// Start (or restart) watching for the runtime.
    ///
    /// Must be called from within a tokio runtime. Ready is sticky: once
    /// reached it is never left. An errored gate returns to pending and
    /// re-arms its listeners and timer.
    pub fn activate(&self) {
        self.deactivate();
        let generation = self.activation.advance();

        if self.widget.is_registered() {
            self.mark_ready();
            return;
        }

        {
            let mut state = self.state.write();
            if state.is_ready() {
                return;
            }
            *state = ReadinessState::Pending;
        }

        // Subscribe before spawning so no signal emitted after activation is missed
        let subscription = self.signals.subscribe();
        let state = Arc::clone(&self.state);
        let errors = self.errors.clone();
        let activation = self.activation.clone();
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                outcome = next_outcome(subscription) => outcome,
                _ = tokio::time::sleep(timeout) => Outcome::Failed(RUNTIME_UNAVAILABLE.to_string()),
            };

            if !activation.is_current(generation) {
                debug!("Discarding readiness outcome from a stale activation");
                return;
            }

            let mut state = state.write();
            if !state.is_pending() {
                return;
            }

            match outcome {
                Outcome::Loaded => {
                    *state = ReadinessState::Ready;
                    errors.set_error(ErrorSlot::Script, None);
                    info!("Widget runtime loaded");
                }
                Outcome::Failed(message) => {
                    *state = ReadinessState::Error;
                    error!("Widget runtime unavailable: {}", message);
                    errors.fail(ErrorSlot::Script, message, false);
                }
            }
        });

        *self.watcher.lock() = Some(task);
    }

    /// Stop watching; pending callbacks will never fire
    pub fn deactivate(&self) {
        self.activation.advance();
        if let Some(task) = self.watcher.lock().take() {
            task.abort();
        }
    }

    fn mark_ready(&self) {
        *self.state.write() = ReadinessState::Ready;
        self.errors.set_error(ErrorSlot::Script, None);
        debug!("Widget runtime already registered");
    }
}

impl Drop for ReadinessGate {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn next_outcome(mut subscription: Subscription<ScriptSignal>) -> Outcome {
    match subscription.recv().await {
        Some(ScriptSignal::Loaded) => Outcome::Loaded,
        Some(ScriptSignal::LoadFailed { detail }) => Outcome::Failed(format!(
            "Error: {}",
            detail.unwrap_or_else(|| "unknown error".to_string())
        )),
        // Host dropped its emitter; only the timer can settle this activation
        None => std::future::pending().await,
    }
}
