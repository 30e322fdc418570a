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

//! JSON-RPC 2.0 envelope encoding and decoding.
//!
//! This layer has no knowledge of HTTP. The [`Serializer`] streams an
//! outgoing request envelope (method, params-by-name, correlation id)
//! into a byte buffer; the [`Deserializer`] decodes an incoming response
//! envelope into a [`CallOutcome`]: either the remote method's result
//! value or a [`RemoteFault`].
//!
//! Parameters are always passed by name through an object. Passing by
//! position (array) is not supported, and neither are batched requests.

mod deserializer;
mod envelope;
mod serializer;

pub use deserializer::Deserializer;
pub use envelope::{CallOutcome, RemoteFault, JSONRPC_VERSION};
pub use serializer::Serializer;
