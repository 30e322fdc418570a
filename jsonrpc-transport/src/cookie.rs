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

//! Cookie store for the HTTP transport.
//!
//! The store holds cookies received via `Set-Cookie` response headers and
//! provides the matching set for the `Cookie` header of the next request
//! to the same endpoint. Entries are keyed by (domain, path, name);
//! cookies persist across calls on the same transport and are cleared
//! only by [`CookieStore::clear`] or by server-signalled expiry.
//!
//! The store itself is not synchronized. A transport guards its own store
//! with the single-in-flight-call discipline; sharing one store across
//! several transports goes through the `Arc<Mutex<CookieStore>>` handle
//! the transport accepts.

use crate::endpoint::Endpoint;
use cookie::{Cookie, Expiration};
use time::OffsetDateTime;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    /// Set when the cookie carried an explicit `Domain` attribute,
    /// which enables subdomain (suffix) matching.
    domain_attr: bool,
    path: String,
    expires_at: Option<OffsetDateTime>,
}

impl StoredCookie {
    fn matches(&self, host: &str, request_path: &str) -> bool {
        let domain_ok = if self.domain_attr {
            host == self.domain || host.ends_with(&format!(".{}", self.domain))
        } else {
            host == self.domain
        };
        if !domain_ok {
            return false;
        }
        request_path == self.path
            || (request_path.starts_with(&self.path)
                && (self.path.ends_with('/')
                    || request_path.as_bytes().get(self.path.len()) == Some(&b'/')))
    }

    fn expired_at(&self, now: OffsetDateTime) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// Two entries share a storage slot when (domain, path, name) agree.
    fn same_key(&self, other: &StoredCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

/// Ordered cookie storage scoped per endpoint.
///
/// # Examples
///
/// ```rust
/// use jsonrpc_transport::{CookieStore, Endpoint};
///
/// let endpoint = Endpoint::parse("http://server.local/rpc").unwrap();
/// let mut store = CookieStore::new();
/// store.update(&["sid=abc; Path=/; Max-Age=3600".to_string()], &endpoint);
/// assert_eq!(store.header_for(&endpoint).as_deref(), Some("sid=abc"));
/// ```
#[derive(Debug, Default)]
pub struct CookieStore {
    entries: Vec<StoredCookie>,
}

impl CookieStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored (possibly expired) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Applies a batch of `Set-Cookie` header values received from
    /// `endpoint`.
    ///
    /// An existing entry with the same (domain, path, name) key is
    /// overwritten. A cookie whose `Max-Age`/`Expires` indicates
    /// immediate expiry is treated as a deletion signal and removed.
    /// Unparseable headers are skipped with a warning.
    pub fn update(&mut self, set_cookie_headers: &[String], endpoint: &Endpoint) {
        let now = OffsetDateTime::now_utc();
        for header in set_cookie_headers {
            let parsed = match Cookie::parse(header.clone()) {
                Ok(cookie) => cookie,
                Err(e) => {
                    warn!(header = %header, error = %e, "skipping unparseable Set-Cookie header");
                    continue;
                }
            };

            let domain_attr = parsed.domain().is_some();
            let domain = parsed
                .domain()
                .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
                .unwrap_or_else(|| endpoint.host().to_ascii_lowercase());
            let path = parsed
                .path()
                .map(str::to_string)
                .unwrap_or_else(|| default_path(endpoint.path()));

            // Max-Age takes precedence over Expires when both are present.
            let expires_at = match (parsed.max_age(), parsed.expires()) {
                (Some(max_age), _) => Some(now + max_age),
                (None, Some(Expiration::DateTime(at))) => Some(at),
                _ => None,
            };

            let replacement = StoredCookie {
                name: parsed.name().to_string(),
                value: parsed.value().to_string(),
                domain,
                domain_attr,
                path,
                expires_at,
            };

            if matches!(expires_at, Some(at) if at <= now) {
                debug!(
                    name = %replacement.name,
                    domain = %replacement.domain,
                    path = %replacement.path,
                    "removing expired cookie"
                );
                self.entries.retain(|entry| !entry.same_key(&replacement));
                continue;
            }

            if let Some(existing) = self
                .entries
                .iter_mut()
                .find(|entry| entry.same_key(&replacement))
            {
                *existing = replacement;
            } else {
                self.entries.push(replacement);
            }
        }
    }

    /// Returns the (name, value) pairs to send to `endpoint`, longest
    /// path first, excluding expired entries.
    pub fn cookies_for(&self, endpoint: &Endpoint) -> Vec<(String, String)> {
        self.cookies_for_at(endpoint, OffsetDateTime::now_utc())
    }

    pub(crate) fn cookies_for_at(
        &self,
        endpoint: &Endpoint,
        now: OffsetDateTime,
    ) -> Vec<(String, String)> {
        let host = endpoint.host().to_ascii_lowercase();
        let path = endpoint.path();
        let mut matched: Vec<&StoredCookie> = self
            .entries
            .iter()
            .filter(|entry| !entry.expired_at(now) && entry.matches(&host, path))
            .collect();
        matched.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matched
            .into_iter()
            .map(|entry| (entry.name.clone(), entry.value.clone()))
            .collect()
    }

    /// Builds the `Cookie` request header value for `endpoint`, or `None`
    /// when no cookie matches.
    pub fn header_for(&self, endpoint: &Endpoint) -> Option<String> {
        let cookies = self.cookies_for(endpoint);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Shifts every stored expiry back by `seconds`, as if the wall clock
    /// had advanced. Test instrumentation only.
    #[cfg(test)]
    pub(crate) fn advance_clock(&mut self, seconds: i64) {
        for entry in &mut self.entries {
            if let Some(at) = entry.expires_at.as_mut() {
                *at -= time::Duration::seconds(seconds);
            }
        }
    }
}

/// RFC 6265 default-path: the request path up to, but not including, the
/// last `/`, falling back to `/`.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(uri: &str) -> Endpoint {
        Endpoint::parse(uri).unwrap()
    }

    #[test]
    fn test_set_then_send() {
        let ep = endpoint("http://server.local/rpc");
        let mut store = CookieStore::new();
        store.update(&["sid=abc; Path=/; Max-Age=3600".to_string()], &ep);
        assert_eq!(store.header_for(&ep).as_deref(), Some("sid=abc"));
    }

    #[test]
    fn test_expiry_omits_cookie() {
        let ep = endpoint("http://server.local/rpc");
        let mut store = CookieStore::new();
        store.update(&["sid=abc; Path=/; Max-Age=3600".to_string()], &ep);
        assert_eq!(store.cookies_for(&ep).len(), 1);

        store.advance_clock(3601);
        assert!(store.cookies_for(&ep).is_empty());
    }

    #[test]
    fn test_max_age_zero_is_deletion_signal() {
        let ep = endpoint("http://server.local/rpc");
        let mut store = CookieStore::new();
        store.update(&["sid=abc; Path=/".to_string()], &ep);
        assert_eq!(store.len(), 1);

        store.update(&["sid=gone; Path=/; Max-Age=0".to_string()], &ep);
        assert!(store.is_empty());
    }

    #[test]
    fn test_overwrite_same_key() {
        let ep = endpoint("http://server.local/rpc");
        let mut store = CookieStore::new();
        store.update(&["sid=old; Path=/".to_string()], &ep);
        store.update(&["sid=new; Path=/".to_string()], &ep);
        assert_eq!(store.len(), 1);
        assert_eq!(store.header_for(&ep).as_deref(), Some("sid=new"));
    }

    #[test]
    fn test_path_scoping() {
        let ep_api = endpoint("http://server.local/api/v2");
        let ep_other = endpoint("http://server.local/other");
        let mut store = CookieStore::new();
        store.update(&["scoped=1; Path=/api".to_string()], &ep_api);

        assert_eq!(store.cookies_for(&ep_api).len(), 1);
        assert!(store.cookies_for(&ep_other).is_empty());
        // Prefix must fall on a path boundary.
        let ep_apiary = endpoint("http://server.local/apiary");
        assert!(store.cookies_for(&ep_apiary).is_empty());
    }

    #[test]
    fn test_longest_path_first() {
        let ep = endpoint("http://server.local/a/b/c");
        let mut store = CookieStore::new();
        store.update(
            &[
                "outer=1; Path=/".to_string(),
                "inner=2; Path=/a/b".to_string(),
                "mid=3; Path=/a".to_string(),
            ],
            &ep,
        );
        let names: Vec<String> = store
            .cookies_for(&ep)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["inner", "mid", "outer"]);
    }

    #[test]
    fn test_domain_attribute_allows_subdomains() {
        let ep = endpoint("http://rpc.example.com/x");
        let mut store = CookieStore::new();
        store.update(&["wide=1; Path=/; Domain=example.com".to_string()], &ep);
        assert_eq!(store.cookies_for(&ep).len(), 1);

        // Without a Domain attribute the cookie is host-only.
        store.clear();
        let origin = endpoint("http://example.com/x");
        store.update(&["narrow=1; Path=/".to_string()], &origin);
        assert!(store.cookies_for(&ep).is_empty());
        assert_eq!(store.cookies_for(&origin).len(), 1);
    }

    #[test]
    fn test_default_path_from_request() {
        let ep = endpoint("http://server.local/api/v2/rpc");
        let mut store = CookieStore::new();
        store.update(&["d=1".to_string()], &ep);

        assert_eq!(store.cookies_for(&ep).len(), 1);
        let sibling = endpoint("http://server.local/api/v2/other");
        assert_eq!(store.cookies_for(&sibling).len(), 1);
        let outside = endpoint("http://server.local/api");
        assert!(store.cookies_for(&outside).is_empty());
    }

    #[test]
    fn test_mixed_batch_overwrites_deletes_and_inserts() {
        let ep = endpoint("http://server.local/rpc");
        let mut store = CookieStore::new();
        store.update(
            &[
                "keep=old; Path=/".to_string(),
                "gone=x; Path=/".to_string(),
            ],
            &ep,
        );

        // One batch overwrites an existing key, deletes another and
        // inserts a third.
        store.update(
            &[
                "keep=new; Path=/".to_string(),
                "gone=x; Path=/; Max-Age=0".to_string(),
                "fresh=1; Path=/".to_string(),
            ],
            &ep,
        );
        assert_eq!(store.len(), 2);
        assert_eq!(store.header_for(&ep).as_deref(), Some("keep=new; fresh=1"));
    }

    #[test]
    fn test_unparseable_header_is_skipped() {
        let ep = endpoint("http://server.local/rpc");
        let mut store = CookieStore::new();
        store.update(&["".to_string(), "ok=1; Path=/".to_string()], &ep);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_default_path_helper() {
        assert_eq!(default_path("/a/b/c"), "/a/b");
        assert_eq!(default_path("/a"), "/");
        assert_eq!(default_path("/"), "/");
        assert_eq!(default_path(""), "/");
    }
}
