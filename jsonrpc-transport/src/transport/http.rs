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

//! The HTTP(S) transport implementation.

use crate::cookie::CookieStore;
use crate::endpoint::{Endpoint, ProxyConfig};
use crate::protocol::{Deserializer, Serializer};
use crate::session::{HttpResponse, HttpSession, SessionPool};
use crate::transport::auth::{AuthMode, Challenge, Credentials, DigestChallenge};
use crate::transport::traits::{MessageKind, RequestContext, RpcTransport};
use crate::transport::TransportError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// MIME type of JSON-RPC request bodies.
pub const CONTENT_TYPE: &str = "application/json-rpc";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(8);

/// Call lifecycle state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No endpoint set
    Disconnected,
    /// Endpoint set, no call in flight
    Connected,
    /// Between `begin_*` and `send_*`: parameters are being serialized
    Sending,
    /// Between `send_request` and `end_request`: the response is held
    AwaitingResponse,
}

/// JSON-RPC 2.0 client transport over HTTP(S).
///
/// One instance carries at most one call at a time; concurrent calls to
/// the same endpoint use separate transports sharing a [`SessionPool`]
/// (and, optionally, a [`CookieStore`]).
///
/// Configuration defaults follow common deployments: chunked transfer
/// encoding on, compression off, keep-alive on with an 8 second idle
/// timeout, a 60 second network timeout and no authentication.
///
/// Incompatible settings are rejected at the setter, not at send time:
/// compression requires chunked transfer encoding, while the
/// challenge-driven authentication modes ([`AuthMode::Digest`] and
/// [`AuthMode::Any`]) require it disabled, because answering a challenge
/// means resending the identical body with content-length framing.
///
/// # Examples
///
/// ```rust,no_run
/// use jsonrpc_transport::{HttpTransport, RpcTransport, SessionPool};
/// use std::sync::Arc;
///
/// # async fn call() -> Result<(), jsonrpc_transport::TransportError> {
/// let pool = Arc::new(SessionPool::new());
/// let mut transport = HttpTransport::new(pool);
/// transport.connect("http://127.0.0.1:8080/jsonrpc")?;
///
/// let serializer = transport.begin_request("calculator", "Calculator", "add")?;
/// serializer.write_param("a", &2)?;
/// serializer.write_param("b", &3)?;
/// let deserializer = transport.send_request().await?;
/// let sum = deserializer.result_as::<i64>()?.expect("remote fault");
/// transport.end_request().await?;
/// # let _ = sum;
/// # Ok(())
/// # }
/// ```
pub struct HttpTransport {
    pool: Arc<SessionPool>,
    cookies: Arc<Mutex<CookieStore>>,
    endpoint: Option<Endpoint>,
    proxy: Option<ProxyConfig>,
    credentials: Credentials,
    auth_mode: AuthMode,
    user_agent: String,
    timeout: Duration,
    keep_alive: bool,
    keep_alive_timeout: Duration,
    chunked: bool,
    compression: bool,
    phase: Phase,
    serializer: Serializer,
    deserializer: Option<Deserializer>,
    context: Option<RequestContext>,
    session: Option<HttpSession>,
    session_reusable: bool,
    next_id: u64,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("phase", &self.phase)
            .field("auth_mode", &self.auth_mode)
            .field("chunked", &self.chunked)
            .field("compression", &self.compression)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a disconnected transport with its own cookie store.
    pub fn new(pool: Arc<SessionPool>) -> Self {
        Self::with_cookie_store(pool, Arc::new(Mutex::new(CookieStore::new())))
    }

    /// Creates a disconnected transport sharing `cookies` with other
    /// transports, so a session cookie obtained by one call is presented
    /// by all of them.
    pub fn with_cookie_store(pool: Arc<SessionPool>, cookies: Arc<Mutex<CookieStore>>) -> Self {
        Self {
            pool,
            cookies,
            endpoint: None,
            proxy: None,
            credentials: Credentials::default(),
            auth_mode: AuthMode::None,
            user_agent: String::new(),
            timeout: DEFAULT_TIMEOUT,
            keep_alive: true,
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            chunked: true,
            compression: false,
            phase: Phase::Disconnected,
            serializer: Serializer::new(),
            deserializer: None,
            context: None,
            session: None,
            session_reusable: false,
            next_id: 0,
        }
    }

    /// Handle to the cookie store this transport reads and updates.
    pub fn cookie_store(&self) -> Arc<Mutex<CookieStore>> {
        self.cookies.clone()
    }

    /// The network timeout applied to connecting, sending and reading.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the network timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] while disconnected.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.require_connected()?;
        self.timeout = timeout;
        Ok(())
    }

    /// Whether connections are kept open and pooled between calls.
    pub fn is_keep_alive_enabled(&self) -> bool {
        self.keep_alive
    }

    /// Enables or disables connection keep-alive.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] while disconnected.
    pub fn enable_keep_alive(&mut self, enable: bool) -> Result<(), TransportError> {
        self.require_connected()?;
        self.keep_alive = enable;
        Ok(())
    }

    /// How long an idle pooled connection remains usable.
    pub fn keep_alive_timeout(&self) -> Duration {
        self.keep_alive_timeout
    }

    /// Sets the idle limit for pooled connections.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] while disconnected.
    pub fn set_keep_alive_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.require_connected()?;
        self.keep_alive_timeout = timeout;
        Ok(())
    }

    /// Whether requests are sent with chunked transfer encoding.
    pub fn is_chunked_transfer_encoding_enabled(&self) -> bool {
        self.chunked
    }

    /// Enables or disables chunked transfer encoding for requests.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfiguration`] when enabling
    /// while a challenge-driven authentication mode is set, or when
    /// disabling while compression is enabled.
    pub fn enable_chunked_transfer_encoding(&mut self, enable: bool) -> Result<(), TransportError> {
        if enable && self.auth_mode.is_challenge_driven() {
            return Err(TransportError::InvalidConfiguration {
                reason: "chunked transfer encoding cannot be combined with Digest or Any \
                         authentication"
                    .to_string(),
            });
        }
        if !enable && self.compression {
            return Err(TransportError::InvalidConfiguration {
                reason: "compression requires chunked transfer encoding".to_string(),
            });
        }
        self.chunked = enable;
        Ok(())
    }

    /// Whether request bodies are gzip-compressed.
    pub fn is_compression_enabled(&self) -> bool {
        self.compression
    }

    /// Enables or disables gzip compression of request bodies. Responses
    /// with a gzip `Content-Encoding` are always decoded, regardless of
    /// this setting.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfiguration`] when enabling
    /// while chunked transfer encoding is disabled.
    pub fn enable_compression(&mut self, enable: bool) -> Result<(), TransportError> {
        if enable && !self.chunked {
            return Err(TransportError::InvalidConfiguration {
                reason: "compression requires chunked transfer encoding".to_string(),
            });
        }
        self.compression = enable;
        Ok(())
    }

    /// The configured authentication mode.
    pub fn authentication(&self) -> AuthMode {
        self.auth_mode
    }

    /// Sets the authentication mode.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfiguration`] when setting
    /// [`AuthMode::Digest`] or [`AuthMode::Any`] while chunked transfer
    /// encoding is enabled.
    pub fn set_authentication(&mut self, mode: AuthMode) -> Result<(), TransportError> {
        if mode.is_challenge_driven() && self.chunked {
            return Err(TransportError::InvalidConfiguration {
                reason: "Digest or Any authentication requires chunked transfer encoding to be \
                         disabled"
                    .to_string(),
            });
        }
        self.auth_mode = mode;
        Ok(())
    }

    /// The configured username.
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Sets the username presented to the server.
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.credentials.username = username.into();
    }

    /// The configured password.
    pub fn password(&self) -> &str {
        &self.credentials.password
    }

    /// Sets the password presented to the server.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.credentials.password = password.into();
    }

    /// The `User-Agent` header value; empty means none is sent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Sets the `User-Agent` header value.
    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) {
        self.user_agent = user_agent.into();
    }

    /// The configured HTTP proxy, if any.
    pub fn proxy_config(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    /// Routes subsequent connections through `proxy` (`CONNECT`
    /// tunneling for `https` endpoints, absolute-URI forwarding for
    /// plain `http`).
    pub fn set_proxy_config(&mut self, proxy: Option<ProxyConfig>) {
        self.proxy = proxy;
    }

    fn require_connected(&self) -> Result<(), TransportError> {
        if self.phase == Phase::Disconnected {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }

    /// Shared entry for `begin_message` and `begin_request`.
    fn begin_call(
        &mut self,
        object_id: &str,
        type_id: &str,
        message_name: &str,
        kind: MessageKind,
    ) -> Result<&mut Serializer, TransportError> {
        match self.phase {
            Phase::Disconnected => return Err(TransportError::NotConnected),
            Phase::Sending | Phase::AwaitingResponse => {
                return Err(TransportError::IllegalState {
                    reason: "a call is already in flight; finish it with end_request first"
                        .to_string(),
                });
            }
            Phase::Connected => {}
        }
        if kind == MessageKind::OneWay && self.auth_mode.is_challenge_driven() {
            return Err(TransportError::NotSupported {
                reason: "one-way messages cannot be combined with Digest or Any authentication"
                    .to_string(),
            });
        }

        let id = match kind {
            MessageKind::RequestReply => {
                self.next_id += 1;
                Some(self.next_id)
            }
            MessageKind::OneWay => None,
        };
        self.serializer.reset();
        self.serializer.begin(message_name, id)?;
        self.deserializer = None;
        self.context = Some(RequestContext {
            object_id: object_id.to_string(),
            type_id: type_id.to_string(),
            message_name: message_name.to_string(),
            kind,
            id,
        });
        self.phase = Phase::Sending;
        debug!(object_id, type_id, method = message_name, ?id, "call begun");
        Ok(&mut self.serializer)
    }

    /// Discards all per-call state after a failed exchange. The held
    /// connection is dropped, not pooled: its protocol state is unknown.
    fn abort_call(&mut self) {
        self.session = None;
        self.session_reusable = false;
        self.serializer.reset();
        self.deserializer = None;
        self.context = None;
        if self.phase != Phase::Disconnected {
            self.phase = Phase::Connected;
        }
    }

    /// Composes the request head for one attempt.
    ///
    /// `proxy_authorization` is set only on plain-`http` exchanges
    /// forwarded through an authenticated proxy; tunneled (`https`)
    /// exchanges authenticate on the `CONNECT` instead.
    fn compose_head(
        &self,
        endpoint: &Endpoint,
        target: &str,
        body_len: usize,
        authorization: Option<&str>,
        proxy_authorization: Option<&str>,
    ) -> String {
        let mut head = format!("POST {target} HTTP/1.1\r\n");
        head.push_str(&format!("Host: {}\r\n", endpoint.host_header()));
        head.push_str(&format!("Content-Type: {CONTENT_TYPE}\r\n"));
        if !self.user_agent.is_empty() {
            head.push_str(&format!("User-Agent: {}\r\n", self.user_agent));
        }
        if let Some(cookies) = self.cookies.lock().header_for(endpoint) {
            head.push_str(&format!("Cookie: {cookies}\r\n"));
        }
        if let Some(proxy_authorization) = proxy_authorization {
            head.push_str(&format!("Proxy-Authorization: {proxy_authorization}\r\n"));
        }
        if let Some(authorization) = authorization {
            head.push_str(&format!("Authorization: {authorization}\r\n"));
        }
        if self.compression {
            head.push_str("Content-Encoding: gzip\r\nAccept-Encoding: gzip\r\n");
        }
        if self.chunked {
            head.push_str("Transfer-Encoding: chunked\r\n");
        } else {
            head.push_str(&format!("Content-Length: {body_len}\r\n"));
        }
        if !self.keep_alive {
            head.push_str("Connection: Close\r\n");
        }
        head.push_str("\r\n");
        head
    }

    /// Stores any `Set-Cookie` headers of `response` in the cookie store.
    fn absorb_cookies(&self, response: &HttpResponse, endpoint: &Endpoint) {
        let set_cookies = response.set_cookie_headers();
        if !set_cookies.is_empty() {
            self.cookies.lock().update(&set_cookies, endpoint);
        }
    }

    /// Builds the `Authorization` header answering a 401 challenge.
    ///
    /// A server may offer several challenges across multiple
    /// `WWW-Authenticate` headers; every one is inspected, Digest is
    /// preferred over Basic, and unsupported schemes only fail the call
    /// when no supported alternative was offered.
    fn answer_challenge(
        &self,
        response: &HttpResponse,
        target: &str,
    ) -> Result<String, TransportError> {
        let mut basic_offered = false;
        let mut digest: Option<DigestChallenge> = None;
        let mut unsupported: Option<String> = None;
        let mut seen = false;
        for header in response.headers.get_all("WWW-Authenticate") {
            seen = true;
            match Challenge::parse(header)? {
                Challenge::Basic => basic_offered = true,
                Challenge::Digest(challenge) => {
                    digest.get_or_insert(challenge);
                }
                Challenge::Other(scheme) => {
                    unsupported.get_or_insert(scheme);
                }
            }
        }
        if !seen {
            return Err(TransportError::AuthenticationFailed {
                reason: "401 response carried no WWW-Authenticate challenge".to_string(),
            });
        }

        if let Some(digest) = digest {
            return Ok(digest.respond(&self.credentials, "POST", target));
        }
        if basic_offered {
            if self.auth_mode == AuthMode::Digest {
                return Err(TransportError::UnsupportedChallenge {
                    scheme: "Basic".to_string(),
                });
            }
            return Ok(self.credentials.basic_header());
        }
        Err(TransportError::UnsupportedChallenge {
            scheme: unsupported.unwrap_or_default(),
        })
    }

    /// Performs the HTTP exchange for the serialized body: acquires a
    /// session, sends, reads, negotiates at most one authentication
    /// retry, and on a 2xx response parks the session in `self.session`
    /// for `end_request` to release.
    async fn perform_exchange(&mut self) -> Result<HttpResponse, TransportError> {
        let endpoint = self.endpoint.clone().ok_or(TransportError::NotConnected)?;
        let body = self.serializer.finish()?;
        let body = if self.compression {
            gzip(&body).await?
        } else {
            body
        };

        let mut session = self
            .pool
            .acquire(
                &endpoint,
                self.proxy.as_ref(),
                self.timeout,
                self.keep_alive_timeout,
            )
            .await?;
        let target = request_target(&endpoint, &session);
        let proxy_auth = if session.uses_absolute_uri() {
            self.proxy.as_ref().and_then(ProxyConfig::basic_authorization)
        } else {
            None
        };

        let preemptive = match self.auth_mode {
            AuthMode::Basic => Some(self.credentials.basic_header()),
            _ => None,
        };
        let head = self.compose_head(
            &endpoint,
            &target,
            body.len(),
            preemptive.as_deref(),
            proxy_auth.as_deref(),
        );
        session.send(&head, &body, self.chunked, self.timeout).await?;
        let mut response = session.read_response(self.timeout).await?;
        self.absorb_cookies(&response, &endpoint);

        if response.status == 401 && self.auth_mode.is_challenge_driven() {
            debug!(endpoint = %endpoint, "401 received, answering challenge");
            let authorization = self.answer_challenge(&response, &target)?;
            if response.wants_close() {
                session.close().await;
                session = self
                    .pool
                    .acquire(
                        &endpoint,
                        self.proxy.as_ref(),
                        self.timeout,
                        self.keep_alive_timeout,
                    )
                    .await?;
            }
            // Exactly one retry, with the identical body.
            let head = self.compose_head(
                &endpoint,
                &target,
                body.len(),
                Some(&authorization),
                proxy_auth.as_deref(),
            );
            session.send(&head, &body, self.chunked, self.timeout).await?;
            response = session.read_response(self.timeout).await?;
            self.absorb_cookies(&response, &endpoint);
            if response.status == 401 {
                return Err(TransportError::AuthenticationFailed {
                    reason: "server rejected the negotiated credentials".to_string(),
                });
            }
        }

        match response.status {
            200..=299 => {
                self.session_reusable = self.keep_alive && !response.wants_close();
                self.session = Some(session);
                Ok(response)
            }
            401 => Err(TransportError::AuthenticationFailed {
                reason: match self.auth_mode {
                    AuthMode::None => "server requires authentication".to_string(),
                    _ => "server rejected the supplied credentials".to_string(),
                },
            }),
            status => Err(TransportError::UnexpectedStatus {
                status,
                reason: response.reason,
            }),
        }
    }

    fn in_flight_kind(&self) -> Result<MessageKind, TransportError> {
        if self.phase != Phase::Sending {
            return Err(TransportError::IllegalState {
                reason: "no call is being serialized; call begin_message or begin_request first"
                    .to_string(),
            });
        }
        self.context
            .as_ref()
            .map(|context| context.kind)
            .ok_or_else(|| TransportError::IllegalState {
                reason: "no call context is in flight".to_string(),
            })
    }
}

/// The request-line target: origin-form normally, absolute-form when
/// forwarding plain http through a proxy. Also used as the Digest `uri`.
fn request_target(endpoint: &Endpoint, session: &HttpSession) -> String {
    if session.uses_absolute_uri() {
        format!("http://{}{}", endpoint.host_header(), endpoint.request_path())
    } else {
        endpoint.request_path()
    }
}

async fn gzip(body: &[u8]) -> Result<Vec<u8>, TransportError> {
    let mut encoder = async_compression::tokio::write::GzipEncoder::new(Vec::new());
    let write = async {
        encoder.write_all(body).await?;
        encoder.shutdown().await
    };
    write.await.map_err(|e| TransportError::Protocol {
        reason: format!("failed to compress request body: {e}"),
    })?;
    Ok(encoder.into_inner())
}

#[async_trait::async_trait]
impl RpcTransport for HttpTransport {
    fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    fn connect(&mut self, endpoint: &str) -> Result<(), TransportError> {
        if self.phase != Phase::Disconnected {
            return Err(TransportError::IllegalState {
                reason: "transport is already connected".to_string(),
            });
        }
        self.endpoint = Some(Endpoint::parse(endpoint)?);
        self.phase = Phase::Connected;
        debug!(endpoint, "transport connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        self.abort_call();
        self.endpoint = None;
        self.phase = Phase::Disconnected;
        debug!("transport disconnected");
    }

    fn connected(&self) -> bool {
        self.phase != Phase::Disconnected
    }

    fn begin_message(
        &mut self,
        object_id: &str,
        type_id: &str,
        message_name: &str,
    ) -> Result<&mut Serializer, TransportError> {
        self.begin_call(object_id, type_id, message_name, MessageKind::OneWay)
    }

    async fn send_message(&mut self) -> Result<(), TransportError> {
        if self.in_flight_kind()? != MessageKind::OneWay {
            return Err(TransportError::IllegalState {
                reason: "send_message called for a request/reply call".to_string(),
            });
        }

        match self.perform_exchange().await {
            Ok(_response) => {
                // One-way: the HTTP exchange is drained but no JSON-RPC
                // response is expected, so the call completes here.
                if let Some(session) = self.session.take() {
                    self.pool.release(session, self.session_reusable).await;
                }
                self.context = None;
                self.phase = Phase::Connected;
                Ok(())
            }
            Err(e) => {
                self.abort_call();
                Err(e)
            }
        }
    }

    fn begin_request(
        &mut self,
        object_id: &str,
        type_id: &str,
        message_name: &str,
    ) -> Result<&mut Serializer, TransportError> {
        self.begin_call(object_id, type_id, message_name, MessageKind::RequestReply)
    }

    async fn send_request(&mut self) -> Result<&Deserializer, TransportError> {
        if self.in_flight_kind()? != MessageKind::RequestReply {
            return Err(TransportError::IllegalState {
                reason: "send_request called for a one-way message".to_string(),
            });
        }
        let expected_id = self
            .context
            .as_ref()
            .and_then(|context| context.id)
            .ok_or_else(|| TransportError::IllegalState {
                reason: "request context carries no correlation id".to_string(),
            })?;

        let response = match self.perform_exchange().await {
            Ok(response) => response,
            Err(e) => {
                self.abort_call();
                return Err(e);
            }
        };
        match Deserializer::parse(&response.body, expected_id) {
            Ok(deserializer) => {
                self.phase = Phase::AwaitingResponse;
                Ok(self.deserializer.insert(deserializer))
            }
            Err(e) => {
                self.abort_call();
                Err(e)
            }
        }
    }

    async fn end_request(&mut self) -> Result<(), TransportError> {
        match self.phase {
            Phase::Disconnected => Err(TransportError::NotConnected),
            // Idempotent: nothing in flight is fine.
            Phase::Connected => Ok(()),
            // The call was begun but never sent; drop the half-built
            // envelope.
            Phase::Sending => {
                self.abort_call();
                Ok(())
            }
            Phase::AwaitingResponse => {
                if let Some(session) = self.session.take() {
                    self.pool.release(session, self.session_reusable).await;
                }
                self.deserializer = None;
                self.context = None;
                self.phase = Phase::Connected;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpTransport {
        HttpTransport::new(Arc::new(SessionPool::new()))
    }

    fn connected() -> HttpTransport {
        let mut transport = transport();
        transport.connect("http://127.0.0.1:9/jsonrpc").unwrap();
        transport
    }

    #[test]
    fn test_defaults() {
        let transport = transport();
        assert!(!transport.connected());
        assert!(transport.is_chunked_transfer_encoding_enabled());
        assert!(!transport.is_compression_enabled());
        assert!(transport.is_keep_alive_enabled());
        assert_eq!(transport.timeout(), Duration::from_secs(60));
        assert_eq!(transport.keep_alive_timeout(), Duration::from_secs(8));
        assert_eq!(transport.authentication(), AuthMode::None);
    }

    #[test]
    fn test_connect_and_disconnect() {
        let mut transport = transport();
        transport.connect("http://example.com/jsonrpc").unwrap();
        assert!(transport.connected());
        assert_eq!(
            transport.endpoint().unwrap().to_string(),
            "http://example.com/jsonrpc"
        );

        let error = transport.connect("http://example.com/other").unwrap_err();
        assert!(matches!(error, TransportError::IllegalState { .. }));

        transport.disconnect();
        assert!(!transport.connected());
        assert!(transport.endpoint().is_none());
        transport.connect("http://example.com/other").unwrap();
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut transport = transport();
        let error = transport.connect("ftp://example.com/jsonrpc").unwrap_err();
        assert!(matches!(error, TransportError::InvalidEndpoint { .. }));
        assert!(!transport.connected());
    }

    #[test]
    fn test_begin_request_requires_connect() {
        let mut transport = transport();
        let error = transport.begin_request("o", "t", "m").unwrap_err();
        assert!(matches!(error, TransportError::NotConnected));
    }

    #[test]
    fn test_timeout_setters_require_connect() {
        let mut transport = transport();
        assert!(matches!(
            transport.set_timeout(Duration::from_secs(5)),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.enable_keep_alive(false),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.set_keep_alive_timeout(Duration::from_secs(1)),
            Err(TransportError::NotConnected)
        ));

        transport.connect("http://example.com/jsonrpc").unwrap();
        transport.set_timeout(Duration::from_secs(5)).unwrap();
        transport.enable_keep_alive(false).unwrap();
        transport.set_keep_alive_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(5));
        assert!(!transport.is_keep_alive_enabled());
        assert_eq!(transport.keep_alive_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_compression_requires_chunked() {
        let mut transport = transport();
        transport.enable_chunked_transfer_encoding(false).unwrap();
        let error = transport.enable_compression(true).unwrap_err();
        assert!(matches!(error, TransportError::InvalidConfiguration { .. }));

        transport.enable_chunked_transfer_encoding(true).unwrap();
        transport.enable_compression(true).unwrap();
        // And the reverse direction: chunked cannot be dropped while
        // compression stays on.
        let error = transport.enable_chunked_transfer_encoding(false).unwrap_err();
        assert!(matches!(error, TransportError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_digest_requires_unchunked() {
        let mut transport = transport();
        let error = transport.set_authentication(AuthMode::Digest).unwrap_err();
        assert!(matches!(error, TransportError::InvalidConfiguration { .. }));

        transport.enable_chunked_transfer_encoding(false).unwrap();
        transport.set_authentication(AuthMode::Digest).unwrap();

        let error = transport.enable_chunked_transfer_encoding(true).unwrap_err();
        assert!(matches!(error, TransportError::InvalidConfiguration { .. }));

        transport.set_authentication(AuthMode::Basic).unwrap();
        transport.enable_chunked_transfer_encoding(true).unwrap();
    }

    #[test]
    fn test_one_way_incompatible_with_digest() {
        let mut transport = connected();
        transport.enable_chunked_transfer_encoding(false).unwrap();
        transport.set_authentication(AuthMode::Any).unwrap();
        let error = transport.begin_message("o", "t", "notify").unwrap_err();
        assert!(matches!(error, TransportError::NotSupported { .. }));
    }

    #[test]
    fn test_begin_while_in_flight_fails() {
        let mut transport = connected();
        transport.begin_request("o", "t", "first").unwrap();
        let error = transport.begin_request("o", "t", "second").unwrap_err();
        assert!(matches!(error, TransportError::IllegalState { .. }));
    }

    #[test]
    fn test_correlation_ids_increment() {
        let mut transport = connected();
        let body = {
            let serializer = transport.begin_request("o", "t", "m").unwrap();
            String::from_utf8(serializer.finish().unwrap()).unwrap()
        };
        assert!(body.contains("\"id\":1"));

        // Abandon the call, then begin the next one.
        futures_block(transport.end_request()).unwrap();
        let body = {
            let serializer = transport.begin_request("o", "t", "m").unwrap();
            String::from_utf8(serializer.finish().unwrap()).unwrap()
        };
        assert!(body.contains("\"id\":2"));
    }

    #[tokio::test]
    async fn test_end_request_is_idempotent_when_no_call_in_flight() {
        let mut transport = connected();
        transport.end_request().await.unwrap();
        transport.end_request().await.unwrap();

        transport.disconnect();
        let error = transport.end_request().await.unwrap_err();
        assert!(matches!(error, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_send_without_begin_fails() {
        let mut transport = connected();
        let error = transport.send_request().await.unwrap_err();
        assert!(matches!(error, TransportError::IllegalState { .. }));
        let error = transport.send_message().await.unwrap_err();
        assert!(matches!(error, TransportError::IllegalState { .. }));
    }

    #[tokio::test]
    async fn test_send_message_rejects_request_reply_call() {
        let mut transport = connected();
        transport.begin_request("o", "t", "m").unwrap();
        let error = transport.send_message().await.unwrap_err();
        assert!(matches!(error, TransportError::IllegalState { .. }));
    }

    /// Runs a small future to completion on the current thread; enough
    /// for the non-networked paths exercised here.
    fn futures_block<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }
}
