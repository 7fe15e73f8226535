//! Integration layer: configuration and the session orchestrator
//!
//! The orchestrator is the single object a host application holds. It owns
//! the widget-facing callbacks and reports outward through `BridgeEvents`.

pub mod config;
pub mod orchestrator;

pub use config::{BridgeConfig, VoiceConfig};
pub use orchestrator::{
    BridgeEvent, BridgeEvents, ColorScheme, OrchestratorBuilder, SessionOrchestrator,
    RECORD_FACT_TOOL, SWITCH_THEME_TOOL,
};
