//! HTTP transport for the session-creation endpoint

use crate::{BridgeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Workflow reference in the session request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowRef {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileUpload {
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatkitConfiguration {
    pub file_upload: FileUpload,
}

/// Body posted to the session-creation endpoint
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRequest {
    pub workflow: WorkflowRef,
    pub chatkit_configuration: ChatkitConfiguration,
}

impl SessionRequest {
    pub fn new(workflow_id: impl Into<String>, attachments_enabled: bool) -> Self {
        Self {
            workflow: WorkflowRef {
                id: workflow_id.into(),
            },
            chatkit_configuration: ChatkitConfiguration {
                file_upload: FileUpload {
                    enabled: attachments_enabled,
                },
            },
        }
    }
}

/// Raw response from the session endpoint
///
/// The body is kept as text; decoding and status interpretation belong to the
/// session provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl SessionResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Collaborator that exchanges a session request for a raw response
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> Result<SessionResponse>;
}

/// Session backend that POSTs JSON to an HTTP endpoint
pub struct HttpSessionBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSessionBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn create_session(&self, request: &SessionRequest) -> Result<SessionResponse> {
        debug!("Requesting session from {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| BridgeError::Session(format!("Session request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::Session(format!("Failed to read session response: {}", e)))?;

        Ok(SessionResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}
