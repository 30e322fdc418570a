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

//! A single HTTP/1.1 client session.
//!
//! The session owns the raw connection and speaks wire-level HTTP:
//! request writing (content-length or chunked framing), status line and
//! header parsing, body reading (content-length, chunked or
//! read-to-close) and transparent gzip response decoding. It knows
//! nothing about JSON-RPC; the transport layer composes the request head
//! and interprets the response.

use crate::endpoint::{Endpoint, ProxyConfig};
use crate::transport::TransportError;
use async_compression::tokio::bufread::GzipDecoder;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream, ReadBuf,
};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};

/// Pool key of a session: everything that makes two connections
/// interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SessionKey {
    pub secure: bool,
    pub host: String,
    pub port: u16,
    pub proxy: Option<ProxyConfig>,
}

impl SessionKey {
    pub fn new(endpoint: &Endpoint, proxy: Option<&ProxyConfig>) -> Self {
        Self {
            secure: endpoint.is_secure(),
            host: endpoint.host().to_ascii_lowercase(),
            port: endpoint.port(),
            proxy: proxy.cloned(),
        }
    }
}

/// The underlying connection, plain or TLS-wrapped.
enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(feature = "tls")]
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Ordered, case-insensitive response header collection.
#[derive(Debug, Default)]
pub(crate) struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn push(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }

    /// First value of `name`, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of `name`, in received order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A fully read HTTP response: status, headers and the normalized body
/// (dechunked and gunzipped).
#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns `true` when the server asked for the connection to be
    /// closed after this exchange.
    pub fn wants_close(&self) -> bool {
        self.headers
            .get("Connection")
            .map(|v| v.to_ascii_lowercase().contains("close"))
            .unwrap_or(false)
    }

    /// The `Set-Cookie` header values of this response.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.headers
            .get_all("Set-Cookie")
            .map(str::to_string)
            .collect()
    }
}

/// One live HTTP/1.1 connection bound to a [`SessionKey`].
pub(crate) struct HttpSession {
    stream: BufStream<Stream>,
    key: SessionKey,
    /// Plain http through a proxy uses an absolute-URI request line.
    absolute_uri: bool,
    last_used: Instant,
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl HttpSession {
    /// Dials a new connection for `endpoint`, tunneling or forwarding
    /// through `proxy` when configured, and completing the TLS handshake
    /// for `https` endpoints. Every network step is bounded by `timeout`.
    pub async fn open(
        endpoint: &Endpoint,
        proxy: Option<&ProxyConfig>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let key = SessionKey::new(endpoint, proxy);
        let dial_address = match proxy {
            Some(proxy) => proxy.address(),
            None => endpoint.address(),
        };

        debug!(address = %dial_address, secure = key.secure, "opening HTTP session");
        let tcp = timed(timeout, async {
            TcpStream::connect(&dial_address)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    address: dial_address.clone(),
                    source: e,
                })
        })
        .await?;

        let mut stream = BufStream::new(Stream::Plain(tcp));

        if endpoint.is_secure() {
            if let Some(proxy) = proxy {
                timed(timeout, establish_tunnel(&mut stream, endpoint, proxy)).await?;
            }
            let stream = tls_handshake(stream, endpoint, timeout).await?;
            return Ok(Self {
                stream,
                key,
                absolute_uri: false,
                last_used: Instant::now(),
            });
        }

        Ok(Self {
            stream,
            key,
            absolute_uri: proxy.is_some(),
            last_used: Instant::now(),
        })
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// `true` when the request line must carry an absolute URI (plain
    /// http forwarded through a proxy).
    pub fn uses_absolute_uri(&self) -> bool {
        self.absolute_uri
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Writes one complete request: head, then the body with either
    /// content-length framing (the head already carries the header) or
    /// chunked framing.
    pub async fn send(
        &mut self,
        head: &str,
        body: &[u8],
        chunked: bool,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        trace!(bytes = body.len(), chunked, "writing HTTP request");
        timed(timeout, async {
            let write = async {
                self.stream.write_all(head.as_bytes()).await?;
                if chunked {
                    if !body.is_empty() {
                        self.stream
                            .write_all(format!("{:x}\r\n", body.len()).as_bytes())
                            .await?;
                        self.stream.write_all(body).await?;
                        self.stream.write_all(b"\r\n").await?;
                    }
                    self.stream.write_all(b"0\r\n\r\n").await?;
                } else {
                    self.stream.write_all(body).await?;
                }
                self.stream.flush().await
            };
            write
                .await
                .map_err(|e| TransportError::WriteFailed { source: e })
        })
        .await
    }

    /// Reads one complete response: status line (skipping any interim
    /// `100 Continue`), headers and body. Chunked framing is removed and
    /// a gzip `Content-Encoding` is decoded transparently, whether or
    /// not the request asked for compression.
    pub async fn read_response(&mut self, timeout: Duration) -> Result<HttpResponse, TransportError> {
        timed(timeout, async {
            loop {
                let (status, reason) = self.read_status_line().await?;
                let headers = self.read_headers().await?;
                if status == 100 {
                    continue;
                }

                let mut body = if status == 204 || status == 304 {
                    // Bodiless by definition, whatever the headers say.
                    Vec::new()
                } else if headers
                    .get("Transfer-Encoding")
                    .map(|v| v.to_ascii_lowercase().contains("chunked"))
                    .unwrap_or(false)
                {
                    self.read_chunked_body().await?
                } else if let Some(length) = headers.get("Content-Length") {
                    let length: usize =
                        length
                            .trim()
                            .parse()
                            .map_err(|_| TransportError::Protocol {
                                reason: format!("invalid Content-Length {length:?}"),
                            })?;
                    let mut body = vec![0u8; length];
                    self.stream
                        .read_exact(&mut body)
                        .await
                        .map_err(|e| TransportError::ReadFailed { source: e })?;
                    body
                } else {
                    // No framing information: the body runs to
                    // connection close.
                    let mut body = Vec::new();
                    self.stream
                        .read_to_end(&mut body)
                        .await
                        .map_err(|e| TransportError::ReadFailed { source: e })?;
                    body
                };

                if let Some(encoding) = headers.get("Content-Encoding") {
                    if encoding.eq_ignore_ascii_case("gzip") {
                        body = gunzip(&body).await?;
                    } else if !encoding.eq_ignore_ascii_case("identity") {
                        return Err(TransportError::Protocol {
                            reason: format!("unsupported Content-Encoding {encoding:?}"),
                        });
                    }
                }

                trace!(status, bytes = body.len(), "read HTTP response");
                return Ok(HttpResponse {
                    status,
                    reason,
                    headers,
                    body,
                });
            }
        })
        .await
    }

    async fn read_line(&mut self) -> Result<String, TransportError> {
        let mut line = String::new();
        let read = self
            .stream
            .read_line(&mut line)
            .await
            .map_err(|e| TransportError::ReadFailed { source: e })?;
        if read == 0 {
            return Err(TransportError::ReadFailed {
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-response",
                ),
            });
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    async fn read_status_line(&mut self) -> Result<(u16, String), TransportError> {
        let line = self.read_line().await?;
        let mut parts = line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/1.") {
            return Err(TransportError::Protocol {
                reason: format!("malformed status line {line:?}"),
            });
        }
        let status: u16 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| TransportError::Protocol {
                reason: format!("malformed status line {line:?}"),
            })?;
        let reason = parts.next().unwrap_or_default().to_string();
        Ok((status, reason))
    }

    async fn read_headers(&mut self) -> Result<Headers, TransportError> {
        let mut headers = Headers::default();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                return Ok(headers);
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    headers.push(name.trim().to_string(), value.trim().to_string());
                }
                None => {
                    return Err(TransportError::Protocol {
                        reason: format!("malformed header line {line:?}"),
                    });
                }
            }
        }
    }

    async fn read_chunked_body(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut body = Vec::new();
        loop {
            let size_line = self.read_line().await?;
            let size_token = size_line
                .split(';')
                .next()
                .unwrap_or_default()
                .trim();
            let size = usize::from_str_radix(size_token, 16).map_err(|_| {
                TransportError::Protocol {
                    reason: format!("malformed chunk size {size_line:?}"),
                }
            })?;
            if size == 0 {
                // Trailer section, up to the terminating empty line.
                loop {
                    if self.read_line().await?.is_empty() {
                        return Ok(body);
                    }
                }
            }
            let start = body.len();
            body.resize(start + size, 0);
            self.stream
                .read_exact(&mut body[start..])
                .await
                .map_err(|e| TransportError::ReadFailed { source: e })?;
            let trailing = self.read_line().await?;
            if !trailing.is_empty() {
                return Err(TransportError::Protocol {
                    reason: "missing CRLF after chunk".to_string(),
                });
            }
        }
    }

    /// Closes the connection, flushing best-effort.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            trace!(error = %e, "error shutting down session");
        }
    }
}

/// Sends a `CONNECT` through the proxy and validates the reply, leaving
/// the stream ready for the TLS handshake.
async fn establish_tunnel(
    stream: &mut BufStream<Stream>,
    endpoint: &Endpoint,
    proxy: &ProxyConfig,
) -> Result<(), TransportError> {
    let target = endpoint.address();
    let mut request = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n");
    if let Some(authorization) = proxy.basic_authorization() {
        request.push_str(&format!("Proxy-Authorization: {authorization}\r\n"));
    }
    request.push_str("\r\n");

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| TransportError::WriteFailed { source: e })?;
    stream
        .flush()
        .await
        .map_err(|e| TransportError::WriteFailed { source: e })?;

    // Read the tunnel reply in place; a CONNECT response has no body.
    let mut line = String::new();
    stream
        .read_line(&mut line)
        .await
        .map_err(|e| TransportError::ReadFailed { source: e })?;
    let status: u16 = line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| TransportError::Protocol {
            reason: format!("malformed CONNECT reply {line:?}"),
        })?;
    loop {
        let mut header = String::new();
        stream
            .read_line(&mut header)
            .await
            .map_err(|e| TransportError::ReadFailed { source: e })?;
        if header == "\r\n" || header == "\n" || header.is_empty() {
            break;
        }
    }

    match status {
        200..=299 => Ok(()),
        407 => Err(TransportError::AuthenticationFailed {
            reason: "proxy rejected the CONNECT credentials".to_string(),
        }),
        other => Err(TransportError::UnexpectedStatus {
            status: other,
            reason: format!("proxy refused CONNECT to {target}"),
        }),
    }
}

#[cfg(feature = "tls")]
async fn tls_handshake(
    stream: BufStream<Stream>,
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<BufStream<Stream>, TransportError> {
    use rustls::pki_types::ServerName;
    use std::sync::{Arc, OnceLock};
    use tokio_rustls::TlsConnector;

    static CONFIG: OnceLock<Arc<rustls::ClientConfig>> = OnceLock::new();
    let config = match CONFIG.get() {
        Some(config) => config.clone(),
        None => {
            let mut roots = rustls::RootCertStore::empty();
            for cert in
                rustls_native_certs::load_native_certs().map_err(|e| TransportError::Tls {
                    reason: format!("failed to load system root certificates: {e}"),
                })?
            {
                roots.add(cert).map_err(|e| TransportError::Tls {
                    reason: format!("rejected system root certificate: {e}"),
                })?;
            }
            let config = Arc::new(
                rustls::ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth(),
            );
            CONFIG.get_or_init(|| config).clone()
        }
    };

    let server_name = ServerName::try_from(endpoint.host().to_string())
        .map_err(|e| TransportError::Tls {
            reason: format!("invalid server name {:?}: {e}", endpoint.host()),
        })?
        .to_owned();

    let Stream::Plain(tcp) = stream.into_inner() else {
        return Err(TransportError::Tls {
            reason: "connection is already TLS-wrapped".to_string(),
        });
    };

    let connector = TlsConnector::from(config);
    let tls = timed(timeout, async {
        connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| TransportError::Tls {
                reason: format!("handshake with {} failed: {e}", endpoint.host()),
            })
    })
    .await?;

    Ok(BufStream::new(Stream::Tls(Box::new(tls))))
}

#[cfg(not(feature = "tls"))]
async fn tls_handshake(
    _stream: BufStream<Stream>,
    endpoint: &Endpoint,
    _timeout: Duration,
) -> Result<BufStream<Stream>, TransportError> {
    tracing::warn!(endpoint = %endpoint, "https endpoint but TLS support is not compiled in");
    Err(TransportError::Tls {
        reason: "TLS support is not compiled in (enable the `tls` feature)".to_string(),
    })
}

async fn gunzip(body: &[u8]) -> Result<Vec<u8>, TransportError> {
    let mut decoder = GzipDecoder::new(body);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .await
        .map_err(|e| TransportError::Protocol {
            reason: format!("failed to decode gzip response body: {e}"),
        })?;
    Ok(decoded)
}

/// Bounds a network step by `duration`, mapping expiry to
/// [`TransportError::Timeout`].
async fn timed<T, F>(duration: Duration, future: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout { duration }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn session_to(listener: &TcpListener) -> HttpSession {
        let address = listener.local_addr().unwrap();
        let endpoint = Endpoint::parse(&format!("http://{address}/rpc")).unwrap();
        HttpSession::open(&endpoint, None, Duration::from_secs(5))
            .await
            .unwrap()
    }

    fn respond(listener: TcpListener, response: &'static [u8]) {
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = vec![0u8; 4096];
            let _ = socket.read(&mut buffer).await.unwrap();
            socket.write_all(response).await.unwrap();
        });
    }

    #[tokio::test]
    async fn test_content_length_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut session = session_to(&listener).await;
        respond(
            listener,
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello",
        );

        session
            .send("POST /rpc HTTP/1.1\r\n\r\n", b"", false, Duration::from_secs(5))
            .await
            .unwrap();
        let response = session.read_response(Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"hello");
        assert!(!response.wants_close());
    }

    #[tokio::test]
    async fn test_chunked_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut session = session_to(&listener).await;
        respond(
            listener,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n",
        );

        session
            .send("POST /rpc HTTP/1.1\r\n\r\n", b"", false, Duration::from_secs(5))
            .await
            .unwrap();
        let response = session.read_response(Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.body, b"hello world");
    }

    #[tokio::test]
    async fn test_interim_100_is_skipped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut session = session_to(&listener).await;
        respond(
            listener,
            b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n",
        );

        session
            .send("POST /rpc HTTP/1.1\r\n\r\n", b"", false, Duration::from_secs(5))
            .await
            .unwrap();
        let response = session.read_response(Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_connection_close_detection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut session = session_to(&listener).await;
        respond(
            listener,
            b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 2\r\n\r\nok",
        );

        session
            .send("POST /rpc HTTP/1.1\r\n\r\n", b"", false, Duration::from_secs(5))
            .await
            .unwrap();
        let response = session.read_response(Duration::from_secs(5)).await.unwrap();
        assert!(response.wants_close());
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut session = session_to(&listener).await;
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            // Hold the connection open without answering.
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        session
            .send("POST /rpc HTTP/1.1\r\n\r\n", b"", false, Duration::from_secs(5))
            .await
            .unwrap();
        let error = session
            .read_response(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(error, TransportError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_malformed_status_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut session = session_to(&listener).await;
        respond(listener, b"NOT-HTTP nonsense\r\n\r\n");

        session
            .send("POST /rpc HTTP/1.1\r\n\r\n", b"", false, Duration::from_secs(5))
            .await
            .unwrap();
        let error = session
            .read_response(Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(error, TransportError::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_chunked_request_framing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let endpoint = Endpoint::parse(&format!("http://{address}/rpc")).unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buffer = vec![0u8; 4096];
            loop {
                let n = socket.read(&mut buffer).await.unwrap();
                received.extend_from_slice(&buffer[..n]);
                if received.ends_with(b"0\r\n\r\n") {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")
                .await
                .unwrap();
            received
        });

        let mut session = HttpSession::open(&endpoint, None, Duration::from_secs(5))
            .await
            .unwrap();
        session
            .send(
                "POST /rpc HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n",
                b"{\"x\":1}",
                true,
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        session.read_response(Duration::from_secs(5)).await.unwrap();

        let received = server.await.unwrap();
        let text = String::from_utf8(received).unwrap();
        assert!(text.contains("7\r\n{\"x\":1}\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_gzip_response_decoded() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write as _;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"{\"jsonrpc\":\"2.0\",\"result\":1,\"id\":1}").unwrap();
        let compressed = encoder.finish().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut session = session_to(&listener).await;
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\n\r\n",
            compressed.len()
        );
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = vec![0u8; 4096];
            let _ = socket.read(&mut buffer).await.unwrap();
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&compressed).await.unwrap();
        });

        session
            .send("POST /rpc HTTP/1.1\r\n\r\n", b"", false, Duration::from_secs(5))
            .await
            .unwrap();
        let response = session.read_response(Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.body, b"{\"jsonrpc\":\"2.0\",\"result\":1,\"id\":1}");
    }
}
