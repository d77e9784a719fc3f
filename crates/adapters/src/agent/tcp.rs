// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bulk file transfer over the agent's raw TCP channel.
//!
//! Wire format: a 512-byte zero-padded ASCII JSON header
//! `{op, path, size?, token}`, then `size` raw payload bytes, then a
//! 32-byte SHA-256 digest of the payload. No framing between payload and
//! digest. The digest trailer is always verified; a mismatch fails the
//! transfer.

use super::AgentError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Fixed header size on the wire.
pub const TCP_HEADER_SIZE: usize = 512;
/// Socket buffer / chunk size for payload streaming.
pub const TCP_BUFFER_SIZE: usize = 256 * 1024;

#[derive(Debug, Serialize)]
struct RequestHeader<'a> {
    op: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponseHeader {
    #[serde(default)]
    status: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    error: String,
}

/// Outcome of a completed bulk transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the transferred payload
    pub sha256: String,
}

async fn connect(addr: &str, timeout: Duration) -> Result<TcpStream, AgentError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| AgentError::Connect("TCP connect timed out".into()))?
        .map_err(|e| AgentError::Connect(e.to_string()))?;
    // Bulk stream; latency from batching hurts the digest trailer exchange
    stream.set_nodelay(true)?;
    Ok(stream)
}

fn encode_header(header: &RequestHeader<'_>) -> Result<Vec<u8>, AgentError> {
    let json = serde_json::to_string(header)
        .map_err(|e| AgentError::Protocol(format!("header encode: {}", e)))?;
    if json.len() > TCP_HEADER_SIZE {
        return Err(AgentError::Protocol("header exceeds 512 bytes".into()));
    }
    let mut bytes = json.into_bytes();
    bytes.resize(TCP_HEADER_SIZE, 0);
    Ok(bytes)
}

async fn read_header(stream: &mut TcpStream) -> Result<ResponseHeader, AgentError> {
    let mut buf = [0u8; TCP_HEADER_SIZE];
    stream.read_exact(&mut buf).await?;
    let text = String::from_utf8_lossy(&buf);
    let trimmed = text.trim_end_matches('\0');
    serde_json::from_str(trimmed)
        .map_err(|e| AgentError::Protocol(format!("bad response header: {}", e)))
}

/// Push a local file; the stream carries the bytes plus a digest trailer.
pub async fn push(
    addr: &str,
    token: &str,
    local: &Path,
    remote: &str,
    timeout: Duration,
) -> Result<TransferReceipt, AgentError> {
    let mut file = File::open(local).await?;
    let size = file.metadata().await?.len();

    let mut stream = connect(addr, timeout).await?;
    let header = encode_header(&RequestHeader {
        op: "push",
        path: remote,
        size: Some(size),
        token,
    })?;
    stream.write_all(&header).await?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; TCP_BUFFER_SIZE];
    let mut sent = 0u64;
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
        stream.write_all(&buf[..read]).await?;
        sent += read as u64;
    }
    let digest = hasher.finalize();
    stream.write_all(&digest).await?;

    let response = read_header(&mut stream).await?;
    if response.status == "error" {
        return Err(AgentError::Rejected(response.error));
    }
    Ok(TransferReceipt {
        bytes: sent,
        sha256: format!("{:x}", digest),
    })
}

/// Pull a remote file; verifies the server's digest trailer.
pub async fn pull(
    addr: &str,
    token: &str,
    remote: &str,
    local: &Path,
    timeout: Duration,
) -> Result<TransferReceipt, AgentError> {
    let mut stream = connect(addr, timeout).await?;
    let header = encode_header(&RequestHeader {
        op: "pull",
        path: remote,
        size: None,
        token,
    })?;
    stream.write_all(&header).await?;

    let response = read_header(&mut stream).await?;
    if response.status == "error" {
        return Err(AgentError::Rejected(response.error));
    }

    if let Some(parent) = local.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = File::create(local).await?;
    let mut hasher = Sha256::new();
    let mut remaining = response.size;
    let mut buf = vec![0u8; TCP_BUFFER_SIZE];
    while remaining > 0 {
        let want = remaining.min(TCP_BUFFER_SIZE as u64) as usize;
        let read = stream.read(&mut buf[..want]).await?;
        if read == 0 {
            return Err(AgentError::Protocol("payload ended early".into()));
        }
        hasher.update(&buf[..read]);
        file.write_all(&buf[..read]).await?;
        remaining -= read as u64;
    }
    file.flush().await?;

    let mut trailer = [0u8; 32];
    stream.read_exact(&mut trailer).await?;
    let local_digest = hasher.finalize();
    if local_digest.as_slice() != trailer {
        return Err(AgentError::DigestMismatch {
            path: remote.to_string(),
        });
    }

    Ok(TransferReceipt {
        bytes: response.size,
        sha256: format!("{:x}", local_digest),
    })
}

#[cfg(test)]
#[path = "tcp_tests.rs"]
mod tests;
