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

//! Streaming JSON-RPC request envelope writer.

use crate::protocol::JSONRPC_VERSION;
use crate::transport::TransportError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SerializerState {
    Idle,
    Params,
    Finished,
}

/// Write-oriented, streaming encoder for an outgoing request envelope.
///
/// The transport positions the serializer at the params object with
/// `begin`; the caller then streams named parameters with
/// [`write_param`](Serializer::write_param), each appended directly to
/// the body buffer so large parameter sets are not built up in an
/// intermediate value tree. `finish` closes the envelope and yields the
/// complete body.
///
/// Parameter names must be unique per request; the serializer does not
/// deduplicate.
///
/// # Examples
///
/// ```rust
/// use jsonrpc_transport::protocol::Serializer;
///
/// let mut serializer = Serializer::new();
/// serializer.begin("add", Some(1)).unwrap();
/// serializer.write_param("a", &2).unwrap();
/// serializer.write_param("b", &3).unwrap();
/// let body = serializer.finish().unwrap();
/// assert_eq!(
///     String::from_utf8(body).unwrap(),
///     r#"{"jsonrpc":"2.0","method":"add","params":{"a":2,"b":3},"id":1}"#
/// );
/// ```
#[derive(Debug)]
pub struct Serializer {
    buffer: Vec<u8>,
    state: SerializerState,
    params_written: usize,
    id: Option<u64>,
}

impl Serializer {
    /// Creates an idle serializer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: SerializerState::Idle,
            params_written: 0,
            id: None,
        }
    }

    /// Opens a new envelope for `method`.
    ///
    /// `id` is the correlation id for request/reply calls; `None` emits a
    /// notification envelope without an `id` member.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::IllegalState`] if a previous envelope
    /// was begun but never finished.
    pub fn begin(&mut self, method: &str, id: Option<u64>) -> Result<(), TransportError> {
        if self.state == SerializerState::Params {
            return Err(TransportError::IllegalState {
                reason: "serializer already holds an unfinished envelope".to_string(),
            });
        }
        self.buffer.clear();
        self.params_written = 0;
        self.id = id;

        self.buffer
            .extend_from_slice(format!("{{\"jsonrpc\":\"{JSONRPC_VERSION}\",\"method\":").as_bytes());
        serde_json::to_writer(&mut self.buffer, method).map_err(|e| TransportError::Protocol {
            reason: format!("failed to encode method name: {e}"),
        })?;
        self.buffer.extend_from_slice(b",\"params\":{");
        self.state = SerializerState::Params;
        Ok(())
    }

    /// Appends one named parameter to the params object.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::IllegalState`] when called outside
    /// `begin`/`finish`, or [`TransportError::Protocol`] if the value
    /// cannot be encoded as JSON.
    pub fn write_param<T>(&mut self, name: &str, value: &T) -> Result<(), TransportError>
    where
        T: Serialize + ?Sized,
    {
        if self.state != SerializerState::Params {
            return Err(TransportError::IllegalState {
                reason: "write_param called outside an open envelope".to_string(),
            });
        }
        if self.params_written > 0 {
            self.buffer.push(b',');
        }
        serde_json::to_writer(&mut self.buffer, name).map_err(|e| TransportError::Protocol {
            reason: format!("failed to encode parameter name {name:?}: {e}"),
        })?;
        self.buffer.push(b':');
        serde_json::to_writer(&mut self.buffer, value).map_err(|e| TransportError::Protocol {
            reason: format!("failed to encode parameter {name:?}: {e}"),
        })?;
        self.params_written += 1;
        Ok(())
    }

    /// Closes the envelope and returns the complete body.
    ///
    /// The serializer returns to idle and may be reused for the next
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::IllegalState`] if no envelope is open.
    pub fn finish(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.state != SerializerState::Params {
            return Err(TransportError::IllegalState {
                reason: "finish called without an open envelope".to_string(),
            });
        }
        self.buffer.push(b'}');
        if let Some(id) = self.id {
            self.buffer
                .extend_from_slice(format!(",\"id\":{id}").as_bytes());
        }
        self.buffer.push(b'}');
        self.state = SerializerState::Finished;
        Ok(std::mem::take(&mut self.buffer))
    }

    /// Discards any partially written envelope and returns to idle.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.params_written = 0;
        self.id = None;
        self.state = SerializerState::Idle;
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}
