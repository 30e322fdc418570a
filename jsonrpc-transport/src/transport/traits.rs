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

use crate::endpoint::Endpoint;
use crate::protocol::{Deserializer, Serializer};
use crate::transport::TransportError;

/// Whether a call expects a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Notification: no response payload is expected
    OneWay,
    /// Request: a correlated response is expected
    RequestReply,
}

/// Per-call bookkeeping: created by `begin_message`/`begin_request`,
/// destroyed by `end_request`. Exactly one context may be in flight per
/// transport instance; concurrent calls require distinct transports.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Identifier of the remote object the call addresses
    pub object_id: String,
    /// Identifier of the remote object's type
    pub type_id: String,
    /// The JSON-RPC method name
    pub message_name: String,
    /// One-way or request/reply
    pub kind: MessageKind,
    /// The correlation id; `None` for one-way messages
    pub id: Option<u64>,
}

/// Client-side RPC transport capability set.
///
/// Callers, typically generated RPC stubs, depend only on this trait.
/// The four-phase call protocol for request/reply is:
///
/// 1. [`begin_request`](RpcTransport::begin_request) returns a
///    [`Serializer`] positioned to accept parameters;
/// 2. the caller streams named parameters into the serializer;
/// 3. [`send_request`](RpcTransport::send_request) performs the HTTP
///    exchange and returns a [`Deserializer`] bound to the decoded
///    response;
/// 4. [`end_request`](RpcTransport::end_request) releases per-call
///    resources; idempotent.
///
/// One-way messages use `begin_message`/`send_message` and need no
/// `end_request` (calling it anyway is harmless).
///
/// Calls on one transport are strictly sequential: `begin_request` for
/// call N+1 must not run before `end_request` of call N.
#[async_trait::async_trait]
pub trait RpcTransport: Send {
    /// Returns the endpoint this transport is connected to, if any.
    fn endpoint(&self) -> Option<&Endpoint>;

    /// Parses and stores the endpoint, transitioning to connected.
    ///
    /// The network connection itself is established lazily on the first
    /// send.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidEndpoint`] for an unparseable
    /// URI, or [`TransportError::IllegalState`] if already connected.
    fn connect(&mut self, endpoint: &str) -> Result<(), TransportError>;

    /// Tears down any held session and returns to disconnected.
    fn disconnect(&mut self);

    /// Returns `true` while an endpoint is set.
    fn connected(&self) -> bool;

    /// Begins a one-way message, returning the parameter serializer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotSupported`] when Digest or Any
    /// authentication is configured (there is no response to inspect
    /// for a challenge), [`TransportError::NotConnected`] while
    /// disconnected, or [`TransportError::IllegalState`] while another
    /// call is in flight.
    fn begin_message(
        &mut self,
        object_id: &str,
        type_id: &str,
        message_name: &str,
    ) -> Result<&mut Serializer, TransportError>;

    /// Sends the one-way message and drains the HTTP exchange.
    ///
    /// No JSON-RPC response body is read or decoded.
    async fn send_message(&mut self) -> Result<(), TransportError>;

    /// Begins a request/reply call, returning the parameter serializer.
    ///
    /// # Errors
    ///
    /// Same state requirements as
    /// [`begin_message`](RpcTransport::begin_message), minus the
    /// authentication restriction.
    fn begin_request(
        &mut self,
        object_id: &str,
        type_id: &str,
        message_name: &str,
    ) -> Result<&mut Serializer, TransportError>;

    /// Performs the HTTP exchange and returns the deserializer bound to
    /// the decoded response envelope.
    async fn send_request(&mut self) -> Result<&Deserializer, TransportError>;

    /// Releases per-call resources. Idempotent: calling it again after
    /// a completed call is a no-op.
    async fn end_request(&mut self) -> Result<(), TransportError>;
}
