// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the forwarding pipeline.
//!
//! Batch-level failures ([`DispatchError`]) reject the whole notification before any
//! delivery starts. Line-level failures ([`DeliveryError`]) stay local to the line that
//! produced them.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use reqwest::StatusCode;
use thiserror::Error;

use crate::notification::BatchReference;

/// The compressed batch could not be turned into records.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decompress batch: {0}")]
    Decompress(#[source] io::Error),

    #[error("batch is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("batch has no `Records` array")]
    MissingRecords,
}

/// The object store refused or failed to return the batch.
#[derive(Debug, Error)]
#[error("failed to fetch {location}: {message}")]
pub struct FetchError {
    pub location: BatchReference,
    pub message: String,
}

impl FetchError {
    pub fn new(location: &BatchReference, message: impl Into<String>) -> Self {
        FetchError {
            location: location.clone(),
            message: message.into(),
        }
    }
}

/// Transport failures, reduced to the handful of kinds the retry loop cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionReset,
    HostUnreachable,
    TimedOut,
    SocketTimeout,
    ConnectionRefused,
    NameResolution,
    Other,
}

impl TransportErrorKind {
    /// Everything except [`TransportErrorKind::Other`] is on the retry allow-list.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        !matches!(self, TransportErrorKind::Other)
    }

    #[must_use]
    pub fn from_io_error_kind(kind: io::ErrorKind) -> Option<Self> {
        match kind {
            io::ErrorKind::ConnectionReset => Some(TransportErrorKind::ConnectionReset),
            io::ErrorKind::ConnectionRefused => Some(TransportErrorKind::ConnectionRefused),
            io::ErrorKind::HostUnreachable => Some(TransportErrorKind::HostUnreachable),
            io::ErrorKind::TimedOut => Some(TransportErrorKind::SocketTimeout),
            _ => None,
        }
    }

    /// Walks the error chain of a failed request looking for a known cause.
    #[must_use]
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return TransportErrorKind::TimedOut;
        }

        let mut cause = err.source();
        while let Some(inner) = cause {
            // hyper-util reports resolver failures as a `ConnectError` whose message
            // starts with "dns error"; the wrapped io::Error carries no useful kind.
            if inner.to_string().starts_with("dns error") {
                return TransportErrorKind::NameResolution;
            }
            if let Some(io_err) = inner.downcast_ref::<io::Error>() {
                if let Some(kind) = Self::from_io_error_kind(io_err.kind()) {
                    return kind;
                }
            }
            // A peer hanging up mid-exchange surfaces as a hyper error with no io cause.
            if let Some(hyper_err) = inner.downcast_ref::<hyper::Error>() {
                if hyper_err.is_incomplete_message() || hyper_err.is_canceled() {
                    return TransportErrorKind::ConnectionReset;
                }
            }
            cause = inner.source();
        }

        TransportErrorKind::Other
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::ConnectionReset => "connection reset",
            TransportErrorKind::HostUnreachable => "host unreachable",
            TransportErrorKind::TimedOut => "request timed out",
            TransportErrorKind::SocketTimeout => "socket timed out",
            TransportErrorKind::ConnectionRefused => "connection refused",
            TransportErrorKind::NameResolution => "name resolution failed",
            TransportErrorKind::Other => "transport error",
        };
        f.write_str(name)
    }
}

/// Outcome of a single failed HTTP attempt.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("{kind}: {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// Any status >= 500, whatever the actual code.
    #[error("ingestion endpoint returned {status}")]
    Server { status: StatusCode, body: String },
}

impl AttemptError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Transport { kind, .. } => kind.is_retryable(),
            AttemptError::Server { .. } => true,
        }
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        let kind = TransportErrorKind::classify(&err);
        // The request URL carries the ingestion key in its query.
        AttemptError::Transport {
            kind,
            message: error_chain(&err.without_url()),
        }
    }
}

/// Joins an error and all of its causes, outermost first.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        cause = inner.source();
    }
    message
}

/// Failure to deliver one log line.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("missing LogDNA ingestion key")]
    MissingCredential,

    #[error("failed to serialize log line: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("delivery failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: AttemptError,
    },

    #[error("delivery failed: {0}")]
    Terminal(#[source] AttemptError),

    /// The delivery task ended without reporting (panicked or was cancelled).
    #[error("delivery task did not complete: {0}")]
    Interrupted(String),
}

/// Failure that rejects a whole notification before any line is delivered.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("notification has no records")]
    EmptyNotification,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
