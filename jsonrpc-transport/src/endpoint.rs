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

//! Endpoint and proxy configuration types.
//!
//! An [`Endpoint`] is the parsed URI of a remote JSON-RPC server. It is
//! immutable once a call is in flight; changing endpoints requires
//! `disconnect()` followed by a fresh `connect()`.

use crate::transport::TransportError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::fmt;
use url::Url;

/// A parsed `http`/`https` URI identifying a remote JSON-RPC server.
///
/// # Examples
///
/// ```rust
/// use jsonrpc_transport::Endpoint;
///
/// let endpoint = Endpoint::parse("https://rpc.example.com/api/v2").unwrap();
/// assert_eq!(endpoint.scheme(), "https");
/// assert_eq!(endpoint.host(), "rpc.example.com");
/// assert_eq!(endpoint.port(), 443);
/// assert_eq!(endpoint.request_path(), "/api/v2");
/// assert!(endpoint.is_secure());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parses an endpoint URI.
    ///
    /// Only `http` and `https` schemes are accepted and the URI must carry
    /// a host.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidEndpoint`] if the URI does not
    /// parse or uses an unsupported scheme.
    pub fn parse(endpoint: &str) -> Result<Self, TransportError> {
        let url = Url::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(TransportError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    reason: format!("unsupported scheme {other:?}, expected http or https"),
                });
            }
        }

        if url.host_str().is_none() {
            return Err(TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self { url })
    }

    /// Returns the URI scheme, `"http"` or `"https"`.
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Returns the host name.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Returns the port, defaulted by scheme (80/443) when absent.
    pub fn port(&self) -> u16 {
        self.url
            .port_or_known_default()
            .unwrap_or(if self.is_secure() { 443 } else { 80 })
    }

    /// Returns the path component, `/` when empty.
    pub fn path(&self) -> &str {
        let path = self.url.path();
        if path.is_empty() { "/" } else { path }
    }

    /// Returns the request target for the HTTP request line: the path
    /// plus the query string, if any.
    pub fn request_path(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.path(), query),
            None => self.path().to_string(),
        }
    }

    /// Returns the `host:port` pair used to open the connection.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }

    /// Returns the `Host` header value: the port is omitted when it is
    /// the scheme default.
    pub fn host_header(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }

    /// Returns `true` for `https` endpoints.
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Proxy configuration, applied when a session is created.
///
/// Plain `http` traffic is forwarded through the proxy with an
/// absolute-URI request line; `https` traffic is tunneled with `CONNECT`.
/// Optional credentials are sent as `Proxy-Authorization: Basic`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProxyConfig {
    /// Proxy host name
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Optional proxy username
    pub username: Option<String>,
    /// Optional proxy password
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Creates a proxy configuration without credentials.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    /// Attaches Basic credentials for the proxy itself.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Returns the `host:port` pair of the proxy.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the `Proxy-Authorization` header value, or `None` when no
    /// credentials are configured.
    ///
    /// Sent on the `CONNECT` request when tunneling and on every
    /// forwarded request for plain `http` endpoints.
    pub fn basic_authorization(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                let token = BASE64.encode(format!("{username}:{password}"));
                Some(format!("Basic {token}"))
            }
            _ => None,
        }
    }
}
