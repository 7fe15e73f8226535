//! Fact dispatch registry
//!
//! The assistant records durable facts through a client tool. The widget may
//! replay the same invocation, so each fact id is forwarded at most once per
//! conversation thread.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Action forwarded to the host for each newly recorded fact
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FactAction {
    #[serde(rename_all = "camelCase")]
    Save { fact_id: String, fact_text: String },
}

impl FactAction {
    pub fn fact_id(&self) -> &str {
        match self {
            FactAction::Save { fact_id, .. } => fact_id,
        }
    }

    pub fn fact_text(&self) -> &str {
        match self {
            FactAction::Save { fact_text, .. } => fact_text,
        }
    }
}

/// Outcome of a dispatch attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FactDispatch {
    /// Forwarded to the host
    Forwarded,
    /// Already forwarded in this thread
    Duplicate,
    /// Empty id, nothing to record
    Skipped,
}

/// Collapse whitespace runs to single spaces and trim both ends
pub fn normalize_fact_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

type FactSink = Box<dyn Fn(FactAction) + Send + Sync>;

pub struct FactRegistry {
    seen: Mutex<HashSet<String>>,
    sink: FactSink,
}

impl FactRegistry {
    /// Create a registry that forwards new facts to `sink`
    ///
    /// The sink must not block; its outcome is never reported back.
    pub fn new(sink: impl Fn(FactAction) + Send + Sync + 'static) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            sink: Box::new(sink),
        }
    }

    /// Forward a fact unless its id is empty or already dispatched
    pub fn dispatch(&self, id: &str, text: &str) -> FactDispatch {
        if id.is_empty() {
            return FactDispatch::Skipped;
        }

        if !self.seen.lock().insert(id.to_string()) {
            debug!("Fact {} already recorded in this thread", id);
            return FactDispatch::Duplicate;
        }

        (self.sink)(FactAction::Save {
            fact_id: id.to_string(),
            fact_text: normalize_fact_text(text),
        });
        FactDispatch::Forwarded
    }

    /// Forget all dispatched ids
    pub fn clear(&self) {
        self.seen.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.lock().contains(id)
    }
}
