use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::intent::Capability;
use crate::response::ServiceResponse;
use crate::status::StatusSnapshot;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Client for the automation backend's `/api/v1` routes.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a chat message to the endpoint bound to `capability`.
    ///
    /// The backend reports its own failures in the body (`success: false`), so
    /// the body is decoded whatever the HTTP status. Only transport errors and
    /// non-JSON bodies are returned as `Err`.
    pub async fn dispatch(&self, capability: Capability, message: &str) -> Result<ServiceResponse> {
        let url = format!("{}/{}", self.base_url, capability.endpoint());
        tracing::debug!(capability = capability.as_str(), %url, "dispatching chat message");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, %url, "backend answered with an error status");
        }

        let body = response.text().await?;
        let payload: Value = serde_json::from_str(&body)?;
        Ok(ServiceResponse::from_value(&payload))
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        let url = format!("{}/status", self.base_url);
        let response = self.client.get(&url).send().await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Like [`ApiClient::status`], but an unreachable service yields an empty snapshot.
    pub async fn refresh_status(&self) -> StatusSnapshot {
        match self.status().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "service status check failed");
                StatusSnapshot::default()
            }
        }
    }
}
