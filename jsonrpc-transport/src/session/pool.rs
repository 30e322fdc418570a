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

//! Session factory and keep-alive pool.

use crate::endpoint::{Endpoint, ProxyConfig};
use crate::session::session::{HttpSession, SessionKey};
use crate::transport::TransportError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Produces and reuses persistent HTTP sessions keyed by
/// (scheme, host, port, proxy).
///
/// The pool is an explicitly constructed instance, shared by handle:
/// whichever top-level component wires up transports owns an
/// `Arc<SessionPool>` and passes it to each transport at construction.
/// Concurrent acquire/release from multiple transports is safe; a single
/// transport never accesses the pool concurrently with itself (one
/// in-flight call at a time).
///
/// Expired sessions are discarded on acquire, so no background sweeper
/// thread is needed.
///
/// # Examples
///
/// ```rust
/// use jsonrpc_transport::SessionPool;
/// use std::sync::Arc;
///
/// let pool = Arc::new(SessionPool::new());
/// assert_eq!(pool.idle_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct SessionPool {
    idle: Mutex<HashMap<SessionKey, Vec<HttpSession>>>,
}

impl SessionPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an idle, non-expired session for the endpoint, or dials a
    /// new one.
    ///
    /// `keep_alive_timeout` bounds how long an idle pooled session may
    /// have sat unused before it is considered stale and replaced.
    pub(crate) async fn acquire(
        &self,
        endpoint: &Endpoint,
        proxy: Option<&ProxyConfig>,
        timeout: Duration,
        keep_alive_timeout: Duration,
    ) -> Result<HttpSession, TransportError> {
        let key = SessionKey::new(endpoint, proxy);
        let (reused, stale) = self.take_idle(&key, keep_alive_timeout);
        for session in stale {
            session.close().await;
        }
        if let Some(mut session) = reused {
            debug!(host = %key.host, port = key.port, "reusing pooled session");
            session.touch();
            return Ok(session);
        }
        HttpSession::open(endpoint, proxy, timeout).await
    }

    /// Returns a session to the pool when `reusable`, otherwise closes
    /// it. A session is reusable when keep-alive is enabled and the
    /// server did not request `Connection: close`.
    pub(crate) async fn release(&self, mut session: HttpSession, reusable: bool) {
        if reusable {
            session.touch();
            debug!(host = %session.key().host, "returning session to pool");
            let mut idle = self.idle.lock();
            idle.entry(session.key().clone()).or_default().push(session);
        } else {
            session.close().await;
        }
    }

    /// Number of idle sessions currently pooled, across all keys.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().values().map(Vec::len).sum()
    }

    /// Closes every idle session.
    ///
    /// Sessions checked out by in-flight calls are unaffected; they are
    /// closed when released as non-reusable.
    pub fn clear(&self) {
        // Dropping the streams closes the connections; no graceful
        // shutdown is owed to idle peers.
        self.idle.lock().clear();
    }

    /// Pops one fresh session for `key` and drains any stale ones,
    /// under a single lock hold.
    fn take_idle(
        &self,
        key: &SessionKey,
        keep_alive_timeout: Duration,
    ) -> (Option<HttpSession>, Vec<HttpSession>) {
        let mut idle = self.idle.lock();
        let Some(sessions) = idle.get_mut(key) else {
            return (None, Vec::new());
        };
        let mut stale = Vec::new();
        let mut fresh = None;
        while let Some(session) = sessions.pop() {
            if session.idle_for() > keep_alive_timeout {
                stale.push(session);
            } else {
                fresh = Some(session);
                break;
            }
        }
        if sessions.is_empty() {
            idle.remove(key);
        }
        (fresh, stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint =
            Endpoint::parse(&format!("http://{}/rpc", listener.local_addr().unwrap())).unwrap();
        (listener, endpoint)
    }

    fn accept_quietly(listener: TcpListener) {
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                // Keep the connection open so pooled reuse works.
                tokio::spawn(async move {
                    let _socket = socket;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                });
            }
        });
    }

    #[tokio::test]
    async fn test_acquire_release_reuse() {
        let (listener, endpoint) = listener().await;
        accept_quietly(listener);
        let pool = SessionPool::new();

        let session = pool
            .acquire(&endpoint, None, Duration::from_secs(5), Duration::from_secs(8))
            .await
            .unwrap();
        pool.release(session, true).await;
        assert_eq!(pool.idle_count(), 1);

        let _session = pool
            .acquire(&endpoint, None, Duration::from_secs(5), Duration::from_secs(8))
            .await
            .unwrap();
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_release_not_reusable_closes() {
        let (listener, endpoint) = listener().await;
        accept_quietly(listener);
        let pool = SessionPool::new();

        let session = pool
            .acquire(&endpoint, None, Duration::from_secs(5), Duration::from_secs(8))
            .await
            .unwrap();
        pool.release(session, false).await;
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_session_is_discarded() {
        let (listener, endpoint) = listener().await;
        accept_quietly(listener);
        let pool = SessionPool::new();

        let session = pool
            .acquire(&endpoint, None, Duration::from_secs(5), Duration::from_secs(8))
            .await
            .unwrap();
        pool.release(session, true).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        // A zero keep-alive timeout makes the pooled session stale, so
        // acquire must dial a fresh connection.
        let _session = pool
            .acquire(&endpoint, None, Duration::from_secs(5), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_distinct_endpoints_do_not_share() {
        let (listener_a, endpoint_a) = listener().await;
        let (listener_b, endpoint_b) = listener().await;
        accept_quietly(listener_a);
        accept_quietly(listener_b);
        let pool = SessionPool::new();

        let session = pool
            .acquire(&endpoint_a, None, Duration::from_secs(5), Duration::from_secs(8))
            .await
            .unwrap();
        pool.release(session, true).await;

        let session = pool
            .acquire(&endpoint_b, None, Duration::from_secs(5), Duration::from_secs(8))
            .await
            .unwrap();
        // endpoint_a's pooled session is untouched.
        assert_eq!(pool.idle_count(), 1);
        pool.release(session, true).await;
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let (listener, endpoint) = listener().await;
        accept_quietly(listener);
        let pool = SessionPool::new();

        let session = pool
            .acquire(&endpoint, None, Duration::from_secs(5), Duration::from_secs(8))
            .await
            .unwrap();
        pool.release(session, true).await;
        pool.clear();
        assert_eq!(pool.idle_count(), 0);
    }
}
