//! Per-target failure types.

use std::{io, time::Duration};
use thiserror::Error;

/// Failures contained to a single target; the batch always continues.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The address could not be resolved or the TCP connect failed.
    #[error("dial failed: {0}")]
    Dial(#[source] io::Error),

    /// The host part cannot be used as a TLS server name.
    #[error("invalid TLS server name {host:?}")]
    ServerName {
        /// The host part of the address.
        host: String,
    },

    /// The TLS handshake failed, including certificate rejection.
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    /// Dial plus handshake did not finish within the per-target timeout.
    #[error("TLS handshake timed out after {timeout:?}")]
    Timeout {
        /// The configured per-target timeout.
        timeout: Duration,
    },

    /// The peer completed the handshake without presenting a certificate.
    #[error("peer presented no certificate")]
    NoCertificate,

    /// The leaf certificate could not be decoded.
    #[error("failed to decode leaf certificate: {message}")]
    Certificate {
        /// Decoder error message.
        message: String,
    },

    /// The record could not be serialized.
    #[error("failed to serialize inventory record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The record could not be appended to the output sink.
    #[error("failed to write inventory record: {0}")]
    Output(#[source] io::Error),
}

impl TargetError {
    /// Stable classification written to the log sink
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Dial(_) | Self::ServerName { .. } => "dial-error",
            Self::Handshake(_) | Self::Timeout { .. } => "handshake-error",
            Self::NoCertificate | Self::Certificate { .. } => "extraction-error",
            Self::Serialize(_) | Self::Output(_) => "output-error",
        }
    }
}
