// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 client for the agent's JSON API.
//!
//! The agent speaks plain HTTP on a loopback-forwarded port; a full HTTP
//! stack buys nothing here. Requests carry the per-device token in the
//! `X-Agent-Token` header and responses are Content-Length framed.

use super::AgentError;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

pub async fn get(
    addr: &str,
    path: &str,
    token: &str,
    timeout: Duration,
) -> Result<String, AgentError> {
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nX-Agent-Token: {}\r\nConnection: close\r\n\r\n",
        path, token
    );
    timed_request(addr, &request, timeout).await
}

pub async fn post(
    addr: &str,
    path: &str,
    body: &str,
    token: &str,
    timeout: Duration,
) -> Result<String, AgentError> {
    let request = format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nX-Agent-Token: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path,
        token,
        body.len(),
        body
    );
    timed_request(addr, &request, timeout).await
}

async fn timed_request(addr: &str, request: &str, timeout: Duration) -> Result<String, AgentError> {
    tokio::time::timeout(timeout, send_request(addr, request))
        .await
        .map_err(|_| AgentError::Protocol("HTTP request timed out".into()))?
}

async fn send_request(addr: &str, request: &str) -> Result<String, AgentError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| AgentError::Connect(format!("TCP connect failed: {}", e)))?;
    stream.write_all(request.as_bytes()).await?;

    let mut reader = BufReader::new(&mut stream);
    read_response(&mut reader).await
}

/// Read a Content-Length framed response, returning the body.
async fn read_response<R>(reader: &mut R) -> Result<String, AgentError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut status_line = String::new();
    reader.read_line(&mut status_line).await?;
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| AgentError::Protocol(format!("bad status line: {}", status_line.trim())))?;

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 || line == "\r\n" || line == "\n" {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    let body = String::from_utf8_lossy(&body).into_owned();

    if status >= 400 {
        return Err(AgentError::Rejected(format!("HTTP {}: {}", status, body)));
    }
    Ok(body)
}
