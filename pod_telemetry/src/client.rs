//! The TCP connection to the ground station.
//!
//! Outbound messages are newline-terminated. Inbound messages carry an
//! 8-byte ASCII decimal length header followed by exactly that many
//! payload bytes.

use std::io::{Read, Write};
use std::net::TcpStream;

use thiserror::Error;
use tracing::{debug, info};

/// Length of the inbound ASCII header.
const HEADER_LEN: usize = 8;

/// Upper bound on one inbound payload.
const MAX_PAYLOAD_LEN: usize = 1024;

/// Errors on the ground link.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Initial connect failed.
    #[error("failed to connect to ground station at {addr}: {reason}")]
    Connect {
        /// Endpoint that refused us.
        addr: String,
        /// OS-level reason.
        reason: String,
    },

    /// Send direction failed.
    #[error("send to ground station failed: {0}")]
    Send(String),

    /// Receive direction failed.
    #[error("receive from ground station failed: {0}")]
    Receive(String),

    /// Nothing arrived within the configured read timeout; the link is
    /// still up.
    #[error("no ground message within the read timeout")]
    ReceiveTimeout,

    /// The length header was not ASCII decimal or announced an oversized
    /// payload.
    #[error("malformed length header: {0}")]
    BadHeader(String),
}

/// One connected ground-station client.
///
/// Sender and receiver run on different threads; each holds its own clone
/// of the underlying stream.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
}

impl Client {
    /// Connect to the configured ground endpoint.
    pub fn connect(server_ip: &str, server_port: u16) -> Result<Self, TelemetryError> {
        let addr = format!("{server_ip}:{server_port}");
        info!(target: "telemetry", %addr, "connecting to ground station");
        let stream = TcpStream::connect(&addr).map_err(|e| TelemetryError::Connect {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;
        info!(target: "telemetry", %addr, "connected to ground station");
        Ok(Self { stream })
    }

    /// Clone the connection for a second thread.
    pub fn try_clone(&self) -> Result<Self, TelemetryError> {
        let stream = self
            .stream
            .try_clone()
            .map_err(|e| TelemetryError::Send(e.to_string()))?;
        Ok(Self { stream })
    }

    /// Bound how long `receive` may block, so the loop can notice a
    /// shutdown request.
    pub fn set_read_timeout(
        &self,
        timeout: Option<std::time::Duration>,
    ) -> Result<(), TelemetryError> {
        self.stream
            .set_read_timeout(timeout)
            .map_err(|e| TelemetryError::Receive(e.to_string()))
    }

    /// Send one newline-terminated message.
    pub fn send_line(&mut self, payload: &str) -> Result<(), TelemetryError> {
        debug!(target: "telemetry", bytes = payload.len(), "sending message");
        self.stream
            .write_all(payload.as_bytes())
            .and_then(|()| self.stream.write_all(b"\n"))
            .and_then(|()| self.stream.flush())
            .map_err(|e| TelemetryError::Send(e.to_string()))
    }

    /// Receive one length-prefixed message.
    pub fn receive(&mut self) -> Result<String, TelemetryError> {
        let mut header = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header).map_err(|e| {
            match e.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                    TelemetryError::ReceiveTimeout
                }
                _ => TelemetryError::Receive(e.to_string()),
            }
        })?;

        let header_text = std::str::from_utf8(&header)
            .map_err(|_| TelemetryError::BadHeader(format!("{header:?}")))?;
        let payload_len: usize = header_text
            .trim_matches(['\0', ' '])
            .parse()
            .map_err(|_| TelemetryError::BadHeader(header_text.to_string()))?;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(TelemetryError::BadHeader(format!(
                "payload length {payload_len} exceeds {MAX_PAYLOAD_LEN}"
            )));
        }

        let mut payload = vec![0u8; payload_len];
        self.stream
            .read_exact(&mut payload)
            .map_err(|e| TelemetryError::Receive(e.to_string()))?;

        String::from_utf8(payload).map_err(|e| TelemetryError::Receive(e.to_string()))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
