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

//! HTTP credential negotiation.
//!
//! Holds the configured username/password and authentication mode and
//! decides, per request, whether to preemptively attach Basic
//! credentials or to answer a server challenge with a Digest response
//! (RFC 2617, MD5, with and without `qop="auth"`).

use crate::transport::TransportError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Authentication mode of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// No authentication
    #[default]
    None,
    /// HTTP Basic authentication; credentials are always sent
    Basic,
    /// HTTP Digest authentication; answers a 401 challenge
    Digest,
    /// Basic or Digest, whichever the server requests on its challenge
    Any,
}

impl AuthMode {
    /// Returns `true` for the challenge-driven modes (Digest and Any),
    /// which require the request body to be resendable and a response
    /// to inspect, and so are incompatible with chunked transfer encoding
    /// and with one-way messages.
    pub fn is_challenge_driven(&self) -> bool {
        matches!(self, Self::Digest | Self::Any)
    }
}

/// Username/password pair, mutated only between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub(crate) struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    /// Builds the value of a preemptive `Authorization: Basic` header.
    pub fn basic_header(&self) -> String {
        let token = BASE64.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

/// A parsed `WWW-Authenticate` challenge.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Challenge {
    Basic,
    Digest(DigestChallenge),
    Other(String),
}

impl Challenge {
    /// Parses the value of a `WWW-Authenticate` header.
    pub fn parse(header: &str) -> Result<Self, TransportError> {
        let header = header.trim();
        let (scheme, rest) = match header.split_once(char::is_whitespace) {
            Some((scheme, rest)) => (scheme, rest),
            None => (header, ""),
        };
        match scheme.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "digest" => Ok(Self::Digest(DigestChallenge::parse(rest)?)),
            _ => Ok(Self::Other(scheme.to_string())),
        }
    }
}

/// The fields of a Digest challenge needed to compute the response.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Set when the server offered `qop="auth"`
    pub qop_auth: bool,
}

impl DigestChallenge {
    /// Parses the comma-separated `k=v` parameter list after the scheme
    /// token.
    pub fn parse(params: &str) -> Result<Self, TransportError> {
        let mut challenge = Self::default();
        let mut saw_nonce = false;
        for (key, value) in parse_auth_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => challenge.realm = value,
                "nonce" => {
                    challenge.nonce = value;
                    saw_nonce = true;
                }
                "opaque" => challenge.opaque = Some(value),
                "qop" => {
                    challenge.qop_auth = value
                        .split(',')
                        .any(|option| option.trim().eq_ignore_ascii_case("auth"));
                }
                // algorithm=MD5 is the only one we implement; stale and
                // domain do not affect a single retry.
                _ => {}
            }
        }
        if !saw_nonce {
            return Err(TransportError::Protocol {
                reason: "Digest challenge is missing a nonce".to_string(),
            });
        }
        Ok(challenge)
    }

    /// Computes the `Authorization: Digest` header answering this
    /// challenge for one request.
    pub fn respond(&self, credentials: &Credentials, method: &str, uri: &str) -> String {
        let ha1 = md5_hex(&format!(
            "{}:{}:{}",
            credentials.username, self.realm, credentials.password
        ));
        let ha2 = md5_hex(&format!("{method}:{uri}"));

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\"",
            credentials.username, self.realm, self.nonce, uri
        );
        if self.qop_auth {
            let cnonce = format!("{:08x}", rand::random::<u32>());
            let nc = "00000001";
            let response = md5_hex(&format!(
                "{ha1}:{}:{nc}:{cnonce}:auth:{ha2}",
                self.nonce
            ));
            header.push_str(&format!(
                ", qop=auth, nc={nc}, cnonce=\"{cnonce}\", response=\"{response}\""
            ));
        } else {
            let response = md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce));
            header.push_str(&format!(", response=\"{response}\""));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque=\"{opaque}\""));
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Splits `realm="x", nonce="y", qop="auth,auth-int"` into pairs,
/// honoring quoting.
fn parse_auth_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = params.trim();
    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].trim().to_string();
        rest = rest[eq + 1..].trim_start();

        let value;
        if let Some(stripped) = rest.strip_prefix('"') {
            let end = stripped.find('"').unwrap_or(stripped.len());
            value = stripped[..end].to_string();
            rest = stripped.get(end + 1..).unwrap_or("");
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            value = rest[..end].trim().to_string();
            rest = rest.get(end..).unwrap_or("");
        }
        rest = rest.trim_start().trim_start_matches(',').trim_start();
        if !key.is_empty() {
            pairs.push((key, value));
        }
    }
    pairs
}
