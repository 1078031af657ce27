// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP fallback channel: one-shot authenticated request per event,
//! always available. Grounded on
//! `crates/mux/src/upstream/client.rs`'s `reqwest::Client` usage pattern
//! (shared client, per-request timeout, bearer-style credential header).

use std::time::Duration;

use beacon_common::CREDENTIAL_HEADER;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::queue::PendingEvent;
use crate::transport::to_wire_payload;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

pub struct HttpChannel {
    client: reqwest::Client,
    ingest_url: String,
    api_key: String,
}

impl HttpChannel {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::FatalConfig(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            ingest_url: format!("{}/ingest", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn send_one(&self, event: &PendingEvent) -> Result<(), AgentError> {
        let payload = to_wire_payload(event);
        let response = self
            .client
            .post(&self.ingest_url)
            .header(CREDENTIAL_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AgentError::Transient(format!("ingest request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body_text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(AgentError::Credential(body_text)),
            429 => Err(AgentError::Policy { retry_after_secs: retry_after }),
            400 | 413 => Err(AgentError::Schema(body_text)),
            _ => Err(AgentError::Transient(format!("server returned {status}: {body_text}"))),
        }
    }

    /// Connectivity probe for `beacon-agent test-connection`.
    pub async fn probe(&self, health_url: &str) -> Result<(), AgentError> {
        let response = self
            .client
            .get(health_url)
            .send()
            .await
            .map_err(|e| AgentError::Transient(format!("health probe failed: {e}")))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AgentError::Transient(format!("health probe returned {}", response.status())))
        }
    }
}
