// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::types::{SessionRequestBody, StoreApiResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the store client. The manager maps these onto the
/// operation taxonomy; they never reach callers directly.
#[derive(Error, Debug)]
pub enum StoreApiError {
    /// The store answered with a non-success status.
    #[error("store request failed with status {0}")]
    Status(u16),

    /// The request never completed (DNS, TLS, connect, timeout).
    #[error("store transport error: {0}")]
    Transport(String),

    /// The response body was not the expected shape.
    #[error("store response malformed: {0}")]
    Malformed(String),
}

/// Thin interface over the two remote operations the protocol needs.
#[async_trait]
pub trait SessionStoreApi: Send + Sync {
    /// Publish a signed share record, keyed remotely by `body.key`.
    /// Any 2xx status is success; the response body is ignored.
    async fn set(&self, body: &SessionRequestBody) -> Result<(), StoreApiError>;

    /// Fetch the share record stored under a public key.
    async fn get(&self, public_key_hex: &str) -> Result<StoreApiResponse, StoreApiError>;
}

/// `reqwest`-backed store client.
pub struct HttpSessionStore {
    client: Client,
    base_url: String,
}

impl HttpSessionStore {
    pub fn new(base_url: &str) -> Result<Self, StoreApiError> {
        reqwest::Url::parse(base_url)
            .map_err(|e| StoreApiError::Transport(format!("invalid base url: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SessionStoreApi for HttpSessionStore {
    async fn set(&self, body: &SessionRequestBody) -> Result<(), StoreApiError> {
        let url = format!("{}/store/set", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreApiError::Status(response.status().as_u16()));
        }

        Ok(())
    }

    async fn get(&self, public_key_hex: &str) -> Result<StoreApiResponse, StoreApiError> {
        let url = format!("{}/store/get", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", public_key_hex)])
            .send()
            .await
            .map_err(|e| StoreApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreApiError::Status(response.status().as_u16()));
        }

        response
            .json::<StoreApiResponse>()
            .await
            .map_err(|e| StoreApiError::Malformed(e.to_string()))
    }
}
