//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Transport layer error types.
//!
//! Every failure the transport can raise falls into one of five
//! categories (see [`ErrorCategory`]):
//!
//! - **Illegal state**: an operation was invoked before `connect()` or out
//!   of the expected call-protocol phase.
//! - **Configuration**: an incompatible option combination was requested
//!   (chunked + Digest, compression without chunked, Digest on one-way).
//! - **Network**: connect, TLS, read/write or timeout failures.
//! - **Protocol**: malformed HTTP or JSON-RPC envelopes, correlation
//!   mismatches, uninterpretable HTTP status codes.
//! - **Authentication**: a repeated 401 after a retry, or a challenge
//!   scheme the negotiator does not support.
//!
//! A well-formed JSON-RPC `error` object from the remote method is *not*
//! a transport error; it is decoded into
//! [`CallOutcome::Fault`](crate::protocol::CallOutcome) and handed to the
//! caller as a normal result variant.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the JSON-RPC HTTP transport.
///
/// All errors leave the transport in a defined state: the session is
/// discarded or returned to the pool and the call-protocol phase is reset,
/// so the next call may reconnect.
///
/// # Examples
///
/// ```rust
/// use jsonrpc_transport::transport::{ErrorCategory, TransportError};
///
/// let error = TransportError::NotConnected;
/// assert_eq!(error.category(), ErrorCategory::IllegalState);
/// assert!(!error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// An operation requiring a connected transport was invoked while
    /// disconnected. Call `connect()` first.
    #[error("transport is not connected")]
    NotConnected,

    /// A call-protocol method was invoked out of phase, for example
    /// `send_request()` without a preceding `begin_request()`.
    #[error("illegal transport state: {reason}")]
    IllegalState {
        /// Description of the phase violation
        reason: String,
    },

    /// An incompatible combination of transport options was requested.
    ///
    /// Raised eagerly at configuration time, before any network I/O.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration conflict
        reason: String,
    },

    /// The requested operation is not supported by this transport, for
    /// example Digest authentication on a one-way message.
    #[error("not supported: {reason}")]
    NotSupported {
        /// Description of the unsupported operation
        reason: String,
    },

    /// The endpoint URI could not be parsed or uses an unknown scheme.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// The endpoint string as given to `connect()`
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// Failed to establish a connection to the remote endpoint.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// The host:port that failed to connect
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The TLS handshake or peer certificate validation failed.
    #[error("TLS failure: {reason}")]
    Tls {
        /// Description of the TLS failure
        reason: String,
    },

    /// Failed to read from the session.
    #[error("read failed: {source}")]
    ReadFailed {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to write to the session.
    #[error("write failed: {source}")]
    WriteFailed {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The HTTP exchange exceeded the configured timeout.
    ///
    /// The session is discarded; the next call reconnects.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The timeout that was exceeded
        duration: Duration,
    },

    /// An unexpected I/O error occurred.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The peer sent malformed HTTP or a malformed JSON-RPC envelope, or
    /// the response correlation id did not match the request.
    #[error("protocol violation: {reason}")]
    Protocol {
        /// Description of the violation
        reason: String,
    },

    /// The server answered with an HTTP status the transport cannot
    /// interpret as a JSON-RPC response.
    #[error("unexpected HTTP status {status}: {reason}")]
    UnexpectedStatus {
        /// The HTTP status code
        status: u16,
        /// The HTTP reason phrase
        reason: String,
    },

    /// Authentication with the configured credentials failed, typically a
    /// second 401 after the single challenge retry.
    #[error("authentication failed: {reason}")]
    AuthenticationFailed {
        /// Description of the failure
        reason: String,
    },

    /// The server requested an authentication scheme the credential
    /// negotiator does not support.
    #[error("unsupported authentication scheme: {scheme}")]
    UnsupportedChallenge {
        /// The scheme token from the `WWW-Authenticate` header
        scheme: String,
    },
}

/// Coarse classification of a [`TransportError`].
///
/// Callers that do not care about the precise variant can match on the
/// category to decide between "fix the calling code" (illegal state,
/// configuration), "retry later" (network) and "fix the deployment"
/// (protocol, authentication).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Operation invoked before `connect()` or out of phase
    IllegalState,
    /// Incompatible option combination
    Configuration,
    /// Connect, TLS, I/O or timeout failure
    Network,
    /// Malformed HTTP or JSON-RPC traffic
    Protocol,
    /// Credentials rejected or challenge unsupported
    Authentication,
}

impl TransportError {
    /// Returns the [`ErrorCategory`] of this error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonrpc_transport::transport::{ErrorCategory, TransportError};
    ///
    /// let error = TransportError::InvalidConfiguration {
    ///     reason: "compression requires chunked transfer encoding".to_string(),
    /// };
    /// assert_eq!(error.category(), ErrorCategory::Configuration);
    /// ```
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotConnected | Self::IllegalState { .. } => ErrorCategory::IllegalState,

            Self::InvalidConfiguration { .. }
            | Self::NotSupported { .. }
            | Self::InvalidEndpoint { .. } => ErrorCategory::Configuration,

            Self::ConnectionFailed { .. }
            | Self::Tls { .. }
            | Self::ReadFailed { .. }
            | Self::WriteFailed { .. }
            | Self::Timeout { .. }
            | Self::Io { .. } => ErrorCategory::Network,

            Self::Protocol { .. } | Self::UnexpectedStatus { .. } => ErrorCategory::Protocol,

            Self::AuthenticationFailed { .. } | Self::UnsupportedChallenge { .. } => {
                ErrorCategory::Authentication
            }
        }
    }

    /// Returns `true` if retrying the call on the same transport may
    /// succeed without any code or configuration change.
    ///
    /// Network failures are transient by nature; everything else requires
    /// intervention (reconnect order, option changes, credentials).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonrpc_transport::transport::TransportError;
    /// use std::time::Duration;
    ///
    /// let timeout = TransportError::Timeout {
    ///     duration: Duration::from_secs(30),
    /// };
    /// assert!(timeout.is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,

            Self::ReadFailed { source } | Self::WriteFailed { source } | Self::Io { source } => {
                matches!(
                    source.kind(),
                    io::ErrorKind::Interrupted
                        | io::ErrorKind::WouldBlock
                        | io::ErrorKind::TimedOut
                        | io::ErrorKind::ConnectionReset
                )
            }

            _ => false,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        Self::Io { source: error }
    }
}
