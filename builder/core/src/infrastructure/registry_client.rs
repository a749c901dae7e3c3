// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

//! Agent Registry HTTP Client
//!
//! reqwest adapter for [`AgentRegistryApi`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Call the backend and the on-chain relay over JSON/HTTP
//! - **Integration:** Registration coordinator → HTTP → agent backend / relay
//!
//! Every non-2xx response becomes a [`RemoteError::Status`]; callers never see
//! a raw status code. The message is taken from the body's `error` field when
//! the service sent one, otherwise it reads `API error: <status>`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::domain::builder_config::ApiConfig;
use crate::domain::registration::RegistrationResult;
use crate::domain::registry_api::{
    AgentRegistryApi, CreateAgentRequest, CreateAgentResponse, RemoteError,
    SignedRegistrationPayload,
};

pub struct HttpRegistryClient {
    /// Origin of the API, without the `/api` prefix
    base_url: String,

    client: Client,

    /// Optional bearer token
    api_key: Option<String>,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Per-request timeout. Without one a request waits as long as the
    /// service takes.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, RemoteError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(self)
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, RemoteError> {
        let mut client = Self::new(config.base_url.clone());
        if let Some(key) = config.resolved_api_key() {
            client = client.with_api_key(key);
        }
        if let Some(timeout) = config.request_timeout() {
            client = client.with_timeout(timeout)?;
        }
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {}", key)),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, RemoteError> {
        let response = self.authorize(req).send().await.map_err(transport_error)?;
        decode_response(response).await
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Transport("request timed out".to_string())
    } else {
        RemoteError::Transport(e.to_string())
    }
}

async fn decode_response(response: Response) -> Result<Value, RemoteError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("API error: {}", status.as_u16()));
        debug!(status = status.as_u16(), %message, "Registry request rejected");
        return Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| RemoteError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl AgentRegistryApi for HttpRegistryClient {
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<CreateAgentResponse, RemoteError> {
        let req = self.client.post(self.endpoint("agents/create")).json(request);
        let body = self.send(req).await?;
        serde_json::from_value(body).map_err(|e| RemoteError::MalformedResponse(e.to_string()))
    }

    async fn register_agent(&self, agent_id: &str) -> Result<RegistrationResult, RemoteError> {
        let req = self
            .client
            .post(self.endpoint(&format!("agents/{}/register", agent_id)));
        Ok(RegistrationResult::from_value(self.send(req).await?))
    }

    async fn register_signed(
        &self,
        payload: &SignedRegistrationPayload,
    ) -> Result<RegistrationResult, RemoteError> {
        let req = self
            .client
            .post(self.endpoint("starknet/register-agent"))
            .json(payload);
        Ok(RegistrationResult::from_value(self.send(req).await?))
    }
}
