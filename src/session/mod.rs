//! Session credential procurement
//!
//! - `provider`: the credential resolver handed to the widget
//! - `http`: request/response types and the HTTP session backend
//! - `envelope`: error detail extraction from failed responses

pub mod envelope;
pub mod http;
pub mod provider;

pub use envelope::extract_error_detail;
pub use http::{HttpSessionBackend, SessionBackend, SessionRequest, SessionResponse};
pub use provider::{is_workflow_configured, SessionProvider, SessionSettings};
