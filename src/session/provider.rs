//! Session provider: exchanges the workflow configuration for a client secret
//!
//! The widget calls `acquire` on first mount (no current secret) and again
//! whenever it wants to refresh silently. Every failure is written into the
//! session slot of the error channel before it is returned, and the provider
//! never retries on its own.

use crate::session::envelope::extract_error_detail;
use crate::session::http::{SessionBackend, SessionRequest};
use crate::state::{ErrorChannel, ErrorSlot, Generation, GenerationCounter};
use crate::{BridgeError, Result};
use secrecy::SecretString;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shown when no workflow id is configured
pub const WORKFLOW_NOT_CONFIGURED: &str =
    "Set CHATBRIDGE_WORKFLOW_ID (or workflow_id in the config file) to a real workflow id.";

/// Shown when a successful response carries no credential
pub const MISSING_CLIENT_SECRET: &str = "Missing client secret in response";

/// Fallback when the endpoint gives no usable detail at all
pub const SESSION_START_FAILED: &str = "Unable to start chat session.";

const PLACEHOLDER_PREFIX: &str = "wf_replace";

/// Check that a workflow id is present and not the template placeholder
pub fn is_workflow_configured(workflow_id: Option<&str>) -> bool {
    match workflow_id.map(str::trim) {
        Some(id) => !id.is_empty() && !id.starts_with(PLACEHOLDER_PREFIX),
        None => false,
    }
}

/// Inputs the provider sends with each session request
#[derive(Clone, Debug, Default)]
pub struct SessionSettings {
    pub workflow_id: Option<String>,
    pub attachments_enabled: bool,
}

impl SessionSettings {
    pub fn new(workflow_id: Option<String>, attachments_enabled: bool) -> Self {
        Self {
            workflow_id,
            attachments_enabled,
        }
    }

    /// The trimmed workflow id, if it is usable
    pub fn configured_workflow(&self) -> Option<&str> {
        let id = self.workflow_id.as_deref()?;
        is_workflow_configured(Some(id)).then(|| id.trim())
    }
}

/// Clears the initializing flag when the first acquisition settles,
/// whichever way it settles (including the future being dropped).
struct InitializingGuard<'a> {
    flag: &'a AtomicBool,
    mount: &'a GenerationCounter,
    generation: Generation,
}

impl<'a> InitializingGuard<'a> {
    fn engage(flag: &'a AtomicBool, mount: &'a GenerationCounter, generation: Generation) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self {
            flag,
            mount,
            generation,
        }
    }
}

impl Drop for InitializingGuard<'_> {
    fn drop(&mut self) {
        if self.mount.is_current(self.generation) {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}

pub struct SessionProvider {
    settings: SessionSettings,
    backend: Arc<dyn SessionBackend>,
    errors: ErrorChannel,
    initializing: Arc<AtomicBool>,
    mount: GenerationCounter,
}

impl SessionProvider {
    /// Create a provider.
    ///
    /// `initializing` and `mount` are shared with the orchestrator: the flag
    /// drives the loading surface and the counter invalidates continuations
    /// of requests issued before a reset.
    pub fn new(
        settings: SessionSettings,
        backend: Arc<dyn SessionBackend>,
        errors: ErrorChannel,
        initializing: Arc<AtomicBool>,
        mount: GenerationCounter,
    ) -> Self {
        Self {
            settings,
            backend,
            errors,
            initializing,
            mount,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Whether the first credential acquisition is still in flight
    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::SeqCst)
    }

    /// Obtain a client secret for the widget
    pub async fn acquire(&self, current: Option<&SecretString>) -> Result<SecretString> {
        let generation = self.mount.current();

        let Some(workflow_id) = self.settings.configured_workflow() else {
            error!("Session requested without a configured workflow id");
            if self.mount.is_current(generation) {
                self.errors
                    .fail(ErrorSlot::Session, WORKFLOW_NOT_CONFIGURED, false);
                self.initializing.store(false, Ordering::SeqCst);
            }
            return Err(BridgeError::Configuration(WORKFLOW_NOT_CONFIGURED.to_string()));
        };

        let _guard = current
            .is_none()
            .then(|| InitializingGuard::engage(&self.initializing, &self.mount, generation));

        if self.mount.is_current(generation) {
            self.errors
                .clear(&[ErrorSlot::Session, ErrorSlot::Integration]);
        }

        let result = self.request_secret(workflow_id).await;

        if !self.mount.is_current(generation) {
            debug!("Session response arrived after a reset; leaving state untouched");
            return result;
        }

        match result {
            Ok(secret) => {
                self.errors
                    .clear(&[ErrorSlot::Session, ErrorSlot::Integration]);
                info!("Session established");
                Ok(secret)
            }
            Err(e) => {
                error!("Failed to create session: {}", e);
                self.errors.fail(ErrorSlot::Session, e.to_string(), false);
                Err(e)
            }
        }
    }

    async fn request_secret(&self, workflow_id: &str) -> Result<SecretString> {
        let request = SessionRequest::new(workflow_id, self.settings.attachments_enabled);

        let response = self
            .backend
            .create_session(&request)
            .await
            .map_err(into_session_error)?;

        let payload = decode_body(&response.body);

        if !response.is_success() {
            let fallback = if response.status_text.is_empty() {
                SESSION_START_FAILED
            } else {
                response.status_text.as_str()
            };
            let detail = extract_error_detail(&payload, fallback);
            warn!(
                "Create session request failed: status={} detail={}",
                response.status, detail
            );
            return Err(BridgeError::Session(detail));
        }

        let Some(secret) = payload.get("client_secret").and_then(Value::as_str) else {
            return Err(BridgeError::Session(MISSING_CLIENT_SECRET.to_string()));
        };

        if let Some(expires_after) = payload.get("expires_after") {
            debug!("Client secret expires after {}", expires_after);
        }

        Ok(SecretString::from(secret.to_string()))
    }
}

/// Decode the body as JSON, substituting an empty object when it is not
fn decode_body(body: &str) -> Value {
    if body.is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(body).unwrap_or_else(|e| {
        warn!("Failed to parse create-session response: {}", e);
        Value::Object(Default::default())
    })
}

fn into_session_error(e: BridgeError) -> BridgeError {
    match e {
        BridgeError::Session(_) => e,
        other => BridgeError::Session(other.to_string()),
    }
}
