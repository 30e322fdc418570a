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

//! JSON-RPC response envelope reader.

use crate::protocol::envelope::ResponseEnvelope;
use crate::protocol::{CallOutcome, RemoteFault, JSONRPC_VERSION};
use crate::transport::TransportError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decoder for an incoming response envelope.
///
/// Bound to one response body by the transport; distinguishes a `result`
/// envelope from an `error` envelope and validates the protocol version
/// and correlation id. The session layer has already normalized the body
/// (chunked framing removed, gzip decoded) before the deserializer sees
/// it.
///
/// # Examples
///
/// ```rust
/// use jsonrpc_transport::protocol::Deserializer;
///
/// let body = br#"{"jsonrpc":"2.0","result":5,"id":3}"#;
/// let deserializer = Deserializer::parse(body, 3).unwrap();
/// let sum: i64 = deserializer.result_as().unwrap().unwrap();
/// assert_eq!(sum, 5);
/// ```
#[derive(Debug)]
pub struct Deserializer {
    outcome: CallOutcome,
}

impl Deserializer {
    /// Parses a response body, validating version and correlation.
    ///
    /// An `error` envelope is allowed to carry a `null` id (the server
    /// may fail before it has read the request id); a `result` envelope
    /// must echo `expected_id` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Protocol`] for malformed JSON, an
    /// unexpected protocol version, an envelope carrying both or neither
    /// of `result`/`error`, or a mismatched correlation id.
    pub fn parse(body: &[u8], expected_id: u64) -> Result<Self, TransportError> {
        let envelope: ResponseEnvelope =
            serde_json::from_slice(body).map_err(|e| TransportError::Protocol {
                reason: format!("malformed JSON-RPC response: {e}"),
            })?;

        if let Some(version) = &envelope.jsonrpc {
            if version != JSONRPC_VERSION {
                return Err(TransportError::Protocol {
                    reason: format!("unexpected JSON-RPC version {version:?}"),
                });
            }
        }

        let outcome = match (envelope.result, envelope.error) {
            (Some(_), Some(_)) => {
                return Err(TransportError::Protocol {
                    reason: "response carries both result and error".to_string(),
                });
            }
            (None, None) => {
                return Err(TransportError::Protocol {
                    reason: "response carries neither result nor error".to_string(),
                });
            }
            (Some(result), None) => {
                Self::check_id(&envelope.id, expected_id, false)?;
                CallOutcome::Success(result)
            }
            (None, Some(fault)) => {
                Self::check_id(&envelope.id, expected_id, true)?;
                CallOutcome::Fault(fault)
            }
        };

        Ok(Self { outcome })
    }

    fn check_id(id: &Option<Value>, expected: u64, null_ok: bool) -> Result<(), TransportError> {
        match id {
            Some(Value::Number(n)) if n.as_u64() == Some(expected) => Ok(()),
            Some(Value::Null) | None if null_ok => Ok(()),
            other => Err(TransportError::Protocol {
                reason: format!("correlation id mismatch: expected {expected}, got {other:?}"),
            }),
        }
    }

    /// Returns the decoded outcome.
    pub fn outcome(&self) -> &CallOutcome {
        &self.outcome
    }

    /// Consumes the deserializer, yielding the outcome.
    pub fn into_outcome(self) -> CallOutcome {
        self.outcome
    }

    /// Decodes the result into a typed value.
    ///
    /// Shorthand for [`CallOutcome::decode`]; the inner `Result` carries
    /// the remote fault when the method failed.
    pub fn result_as<T: DeserializeOwned>(
        &self,
    ) -> Result<Result<T, RemoteFault>, TransportError> {
        self.outcome.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_envelope() {
        let body = br#"{"jsonrpc":"2.0","result":{"ok":true},"id":9}"#;
        let deserializer = Deserializer::parse(body, 9).unwrap();
        assert_eq!(deserializer.outcome().value(), Some(&json!({"ok": true})));
    }

    #[test]
    fn test_error_envelope_is_fault_not_error() {
        let body = br#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":4}"#;
        let deserializer = Deserializer::parse(body, 4).unwrap();
        let fault = deserializer.outcome().fault().unwrap();
        assert_eq!(fault.code, -32601);
        assert_eq!(fault.message, "Method not found");
    }

    #[test]
    fn test_error_envelope_with_null_id() {
        let body = br#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"Parse error"},"id":null}"#;
        let deserializer = Deserializer::parse(body, 11).unwrap();
        assert!(deserializer.outcome().is_fault());
    }

    #[test]
    fn test_result_with_null_id_is_mismatch() {
        let body = br#"{"jsonrpc":"2.0","result":1,"id":null}"#;
        let error = Deserializer::parse(body, 11).unwrap_err();
        assert!(error.to_string().contains("correlation id mismatch"));
    }

    #[test]
    fn test_correlation_mismatch() {
        let body = br#"{"jsonrpc":"2.0","result":1,"id":5}"#;
        let error = Deserializer::parse(body, 6).unwrap_err();
        assert!(error.to_string().contains("expected 6"));
    }

    #[test]
    fn test_wrong_version() {
        let body = br#"{"jsonrpc":"1.0","result":1,"id":1}"#;
        assert!(Deserializer::parse(body, 1).is_err());
    }

    #[test]
    fn test_both_result_and_error() {
        let body = br#"{"jsonrpc":"2.0","result":1,"error":{"code":1,"message":"x"},"id":1}"#;
        assert!(Deserializer::parse(body, 1).is_err());
    }

    #[test]
    fn test_neither_result_nor_error() {
        let body = br#"{"jsonrpc":"2.0","id":1}"#;
        assert!(Deserializer::parse(body, 1).is_err());
    }

    #[test]
    fn test_malformed_json() {
        let body = b"not json at all";
        assert!(Deserializer::parse(body, 1).is_err());
    }

    #[test]
    fn test_round_trip_scalars() {
        use crate::protocol::Serializer;

        let mut serializer = Serializer::new();
        serializer.begin("sum", Some(21)).unwrap();
        serializer.write_param("a", &1.5f64).unwrap();
        serializer.write_param("b", &-3i64).unwrap();
        serializer.write_param("s", "text").unwrap();
        serializer.write_param("flag", &true).unwrap();
        let request = serializer.finish().unwrap();

        // Echo the params back as the result, the way a loopback server
        // would, and verify every scalar and the id survive unchanged.
        let parsed: serde_json::Value = serde_json::from_slice(&request).unwrap();
        assert_eq!(parsed["id"], json!(21));
        let reply = json!({
            "jsonrpc": "2.0",
            "result": parsed["params"].clone(),
            "id": parsed["id"].clone(),
        });
        let deserializer =
            Deserializer::parse(serde_json::to_vec(&reply).unwrap().as_slice(), 21).unwrap();
        let value = deserializer.outcome().value().unwrap();
        assert_eq!(value["a"], json!(1.5));
        assert_eq!(value["b"], json!(-3));
        assert_eq!(value["s"], json!("text"));
        assert_eq!(value["flag"], json!(true));
    }
}
