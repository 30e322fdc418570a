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

//! JSON-RPC 2.0 envelope types.

use crate::transport::TransportError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// The protocol version sent in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// A well-formed JSON-RPC `error` object returned by the remote method.
///
/// A `RemoteFault` is the RPC-level failure result of a call, not a
/// transport error: the request was transmitted and answered, the remote
/// method simply reported an error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteFault {
    /// The JSON-RPC error code
    pub code: i64,
    /// Human-readable error message
    pub message: String,
    /// Optional additional error data
    #[serde(default)]
    pub data: Option<Value>,
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote fault {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RemoteFault {}

/// The decoded outcome of a request/reply call.
///
/// `Success` carries the remote method's `result` value; `Fault` carries
/// a decoded JSON-RPC `error` object. Both are normal, non-exceptional
/// outcomes: a caller can distinguish "the call failed to transmit"
/// (a [`TransportError`]) from "the remote method returned an error"
/// (a `Fault`).
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The remote method returned a result value
    Success(Value),
    /// The remote method returned a JSON-RPC error object
    Fault(RemoteFault),
}

impl CallOutcome {
    /// Returns `true` if the remote method reported a fault.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    /// Returns the raw result value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Fault(_) => None,
        }
    }

    /// Returns the remote fault, if any.
    pub fn fault(&self) -> Option<&RemoteFault> {
        match self {
            Self::Fault(fault) => Some(fault),
            Self::Success(_) => None,
        }
    }

    /// Decodes the result value into a typed value.
    ///
    /// The outer `Result` reports decoding failures (a
    /// [`TransportError::Protocol`]); the inner one carries the remote
    /// fault when the method failed.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Result<T, RemoteFault>, TransportError> {
        match self {
            Self::Success(value) => serde_json::from_value(value.clone())
                .map(Ok)
                .map_err(|e| TransportError::Protocol {
                    reason: format!("failed to decode result value: {e}"),
                }),
            Self::Fault(fault) => Ok(Err(fault.clone())),
        }
    }
}

/// Raw shape of an incoming response envelope.
///
/// `result` and `error` are mutually exclusive in a valid envelope; the
/// deserializer enforces that after parsing.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseEnvelope {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RemoteFault>,
    #[serde(default)]
    pub id: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_decode_success() {
        let outcome = CallOutcome::Success(json!({"sum": 42}));
        assert!(!outcome.is_fault());

        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Sum {
            sum: i32,
        }
        let decoded: Sum = outcome.decode().unwrap().unwrap();
        assert_eq!(decoded, Sum { sum: 42 });
    }

    #[test]
    fn test_outcome_decode_fault() {
        let outcome = CallOutcome::Fault(RemoteFault {
            code: -32601,
            message: "Method not found".to_string(),
            data: None,
        });
        assert!(outcome.is_fault());
        let fault = outcome.decode::<i32>().unwrap().unwrap_err();
        assert_eq!(fault.code, -32601);
    }

    #[test]
    fn test_outcome_decode_type_mismatch_is_protocol_error() {
        let outcome = CallOutcome::Success(json!("not a number"));
        let error = outcome.decode::<i32>().unwrap_err();
        assert!(error.to_string().contains("decode"));
    }

    #[test]
    fn test_fault_display() {
        let fault = RemoteFault {
            code: -32700,
            message: "Parse error".to_string(),
            data: Some(json!({"line": 1})),
        };
        assert_eq!(fault.to_string(), "remote fault -32700: Parse error");
    }
}
