// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-device agent client: the optional fast path.
//!
//! When the agent is running on the device, the toolkit prefers it over
//! shell-based transport. Two channels: a small HTTP API over an
//! adb-forwarded port (JSON requests, per-device token header) and a raw
//! TCP channel for bulk file bytes with an integrity trailer.

mod http;
mod tcp;

pub use tcp::TransferReceipt;

use crate::bridge::Bridge;
use crate::subprocess::SHELL_TIMEOUT;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default agent HTTP port on the device.
pub const DEFAULT_AGENT_PORT: u16 = 8000;
/// Default agent TCP bulk-transfer port on the device.
pub const DEFAULT_TCP_PORT: u16 = 8001;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent connect failed: {0}")]
    Connect(String),
    #[error("agent I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("agent protocol error: {0}")]
    Protocol(String),
    #[error("agent rejected request: {0}")]
    Rejected(String),
    #[error("integrity check failed for {path}: digest mismatch")]
    DigestMismatch { path: String },
}

/// Client for one device's agent, reached through forwarded local ports.
#[derive(Debug, Clone)]
pub struct AgentClient {
    host: String,
    http_port: u16,
    tcp_port: u16,
    token: String,
    timeout: Duration,
}

impl AgentClient {
    pub fn new(http_port: u16, tcp_port: u16, token: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            http_port,
            tcp_port,
            token: token.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Forward local ports to the agent via the bridge, then verify with a
    /// ping. Returns the connected client.
    pub async fn connect<B: Bridge>(
        bridge: &B,
        serial: &str,
        token: impl Into<String>,
        local_http: u16,
        local_tcp: u16,
    ) -> Result<Self, AgentError> {
        let http_spec = format!("tcp:{}", local_http);
        let tcp_spec = format!("tcp:{}", local_tcp);
        let agent_http = format!("tcp:{}", DEFAULT_AGENT_PORT);
        let agent_tcp = format!("tcp:{}", DEFAULT_TCP_PORT);

        for (local, remote) in [(&http_spec, &agent_http), (&tcp_spec, &agent_tcp)] {
            bridge
                .run(Some(serial), &["forward", local, remote], SHELL_TIMEOUT)
                .await
                .map_err(|e| AgentError::Connect(e.to_string()))?;
        }

        let client = Self::new(local_http, local_tcp, token);
        client.ping().await?;
        tracing::info!(serial, local_http, local_tcp, "agent connected");
        Ok(client)
    }

    /// Remove the port forwards. Best-effort.
    pub async fn disconnect<B: Bridge>(&self, bridge: &B, serial: &str) {
        for port in [self.http_port, self.tcp_port] {
            let spec = format!("tcp:{}", port);
            let _ = bridge
                .run(
                    Some(serial),
                    &["forward", "--remove", &spec],
                    SHELL_TIMEOUT,
                )
                .await;
        }
    }

    fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    fn tcp_addr(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }

    // -- HTTP channel ------------------------------------------------------

    pub async fn ping(&self) -> Result<Value, AgentError> {
        self.get("/api/ping").await
    }

    pub async fn device_info(&self) -> Result<Value, AgentError> {
        self.get("/api/device/info").await
    }

    pub async fn export_contacts(&self) -> Result<Value, AgentError> {
        self.get("/api/contacts/export").await
    }

    pub async fn export_sms(&self) -> Result<Value, AgentError> {
        self.get("/api/sms/export").await
    }

    pub async fn file_hash(&self, path: &str) -> Result<Value, AgentError> {
        self.post("/api/files/hash", &serde_json::json!({ "path": path }))
            .await
    }

    pub async fn get(&self, path: &str) -> Result<Value, AgentError> {
        let body = http::get(&self.http_addr(), path, &self.token, self.timeout).await?;
        parse_json(&body)
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, AgentError> {
        let text = body.to_string();
        let response =
            http::post(&self.http_addr(), path, &text, &self.token, self.timeout).await?;
        parse_json(&response)
    }

    // -- TCP channel -------------------------------------------------------

    /// Push a local file over the bulk channel.
    pub async fn tcp_push(&self, local: &Path, remote: &str) -> Result<TransferReceipt, AgentError> {
        tcp::push(&self.tcp_addr(), &self.token, local, remote, self.timeout).await
    }

    /// Pull a remote file over the bulk channel.
    pub async fn tcp_pull(&self, remote: &str, local: &Path) -> Result<TransferReceipt, AgentError> {
        tcp::pull(&self.tcp_addr(), &self.token, remote, local, self.timeout).await
    }
}

fn parse_json(body: &str) -> Result<Value, AgentError> {
    serde_json::from_str(body).map_err(|e| AgentError::Protocol(format!("bad JSON body: {}", e)))
}
