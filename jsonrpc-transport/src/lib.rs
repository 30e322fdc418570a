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

#![doc = include_str!("../../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # JSON-RPC Transport
//!
//! A client-side JSON-RPC 2.0 transport over HTTP and HTTPS:
//!
//! - **Four-phase call protocol**: begin a request, stream parameters,
//!   send, read the correlated response
//! - **One-way messages**: notifications without a response
//! - **Session pooling**: persistent connections keyed by endpoint,
//!   reused across calls and transports
//! - **Cookie handling**: a domain/path/expiry-aware store shared
//!   between transports
//! - **HTTP authentication**: preemptive Basic, challenge-driven Digest,
//!   or whichever the server asks for
//! - **Content encoding**: chunked requests and gzip in both directions
//! - **Proxies**: `CONNECT` tunneling for HTTPS, absolute-URI
//!   forwarding for plain HTTP
//!
//! ## Architecture
//!
//! - **[`transport`]**: the [`RpcTransport`] trait, the
//!   [`HttpTransport`] implementation and the [`TransportError`]
//!   taxonomy
//! - **[`protocol`]**: streaming request [`Serializer`] and response
//!   [`Deserializer`] for the JSON-RPC 2.0 envelope
//! - **[`session`]**: wire-level HTTP/1.1 sessions and the
//!   [`SessionPool`] that reuses them
//! - **[`cookie`]**: the [`CookieStore`]
//! - **[`endpoint`]**: [`Endpoint`] URIs and [`ProxyConfig`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jsonrpc_transport::{HttpTransport, RpcTransport, SessionPool};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), jsonrpc_transport::TransportError> {
//! let pool = Arc::new(SessionPool::new());
//! let mut transport = HttpTransport::new(pool);
//! transport.connect("http://127.0.0.1:8080/jsonrpc")?;
//!
//! // Request/reply
//! let serializer = transport.begin_request("calculator", "Calculator", "add")?;
//! serializer.write_param("a", &2)?;
//! serializer.write_param("b", &3)?;
//! let deserializer = transport.send_request().await?;
//! let sum: i64 = deserializer.result_as()?.expect("remote fault");
//! transport.end_request().await?;
//! assert_eq!(sum, 5);
//!
//! // One-way
//! let serializer = transport.begin_message("logger", "Logger", "log")?;
//! serializer.write_param("line", "done")?;
//! transport.send_message().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors and remote faults
//!
//! [`TransportError`] covers everything that prevents a call from
//! completing: configuration conflicts, connection and TLS failures,
//! timeouts, malformed responses, failed authentication. A JSON-RPC
//! `error` member in an otherwise well-formed response is *not* a
//! transport error; it surfaces as a
//! [`CallOutcome::Fault`](protocol::CallOutcome::Fault) on the
//! deserializer, for the caller to map to its application error type.
//!
//! ## Features
//!
//! - **`tls`** (default): HTTPS endpoints via `rustls` with the
//!   system's native root certificates
//!
//! ## Safety
//!
//! 100% safe Rust with `#![deny(unsafe_code)]`. All I/O runs on the
//! Tokio async runtime.

pub mod cookie;
pub mod endpoint;
pub mod protocol;
pub mod session;
pub mod transport;

pub use cookie::CookieStore;
pub use endpoint::{Endpoint, ProxyConfig};
pub use protocol::{CallOutcome, Deserializer, RemoteFault, Serializer};
pub use session::SessionPool;
pub use transport::{
    AuthMode, ErrorCategory, HttpTransport, MessageKind, RpcTransport, TransportError,
};
