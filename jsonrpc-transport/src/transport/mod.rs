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

//! Transport trait, the HTTP implementation and the error taxonomy.

mod auth;
mod error;
mod http;
mod traits;

pub use auth::AuthMode;
pub use error::{ErrorCategory, TransportError};
pub use http::{HttpTransport, CONTENT_TYPE};
pub use traits::{MessageKind, RequestContext, RpcTransport};
