// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! AWS Signature V4 request signing for analytics batch submissions.
//!
//! Batches are authorized with a short-lived access key / secret / session
//! token triple issued per installation, so no static secret ships in the app.
//!
//! # Pipeline
//!
//! ```text
//! HttpRequest ──► fixed headers (token, host, date, target, content-type)
//!             ──► CanonicalRequest (method, path, query, sorted headers, body hash)
//!             ──► string to sign (algorithm, timestamp, scope, hash(canonical))
//!             ──► HMAC chain: "AWS4"+secret → date → region → service → "aws4_request"
//!             ──► Authorization header
//! ```
//!
//! Signing either yields a fully signed copy of the request or an error;
//! the input request is never modified.

mod canonical;
mod signer;

pub use canonical::{AmzDate, CanonicalRequest};
pub use signer::RequestSigner;

use std::fmt;

use thiserror::Error;

/// Algorithm identifier leading the string to sign and the Authorization header
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
/// Terminator of the credential scope and last step of the key derivation
pub const AWS4_REQUEST: &str = "aws4_request";

pub const HEADER_SECURITY_TOKEN: &str = "X-Amz-Security-Token";
pub const HEADER_DATE: &str = "X-Amz-Date";
pub const HEADER_TARGET: &str = "X-Amz-Target";
pub const HEADER_HOST: &str = "Host";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("request URL '{0}' cannot be parsed")]
    InvalidUrl(String),
    #[error("request URL '{0}' has no host")]
    MissingHost(String),
}

/// Minimal HTTP request model: what the signer needs and what a transport sends.
///
/// Header names are matched case-insensitively; [`HttpRequest::set_header`]
/// keeps at most one value per name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::new("POST", url)
        }
    }

    /// Set `name` to `value`, replacing every existing value for that name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(first) => {
                self.headers[first] = (name.clone(), value);
                let mut index = 0;
                self.headers.retain(|(existing, _)| {
                    let keep = index <= first || !existing.eq_ignore_ascii_case(&name);
                    index += 1;
                    keep
                });
            }
            None => self.headers.push((name, value)),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Short-lived signing credential issued to an installation.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningCredential {
    pub access_key_id: String,
    pub secret_key: String,
    pub session_token: String,
}

impl SigningCredential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key: secret_key.into(),
            session_token: session_token.into(),
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}
