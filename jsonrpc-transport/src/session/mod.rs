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

//! Persistent HTTP client sessions and the pool that reuses them.
//!
//! An [`HttpSession`] is one live connection (TCP or TLS) bound to an
//! endpoint key; the [`SessionPool`] maps (scheme, host, port, proxy)
//! keys to idle reusable sessions, respecting the keep-alive timeout.

mod pool;
mod session;

pub use pool::SessionPool;
pub(crate) use session::{HttpResponse, HttpSession};
