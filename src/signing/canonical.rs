use std::fmt;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use url::Url;

use super::{HttpRequest, SigningError, HEADER_AUTHORIZATION};

/// Signing timestamp in the two forms the protocol uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmzDate {
    full: String,
    short: String,
}

impl AmzDate {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            full: at.format("%Y%m%dT%H%M%SZ").to_string(),
            short: at.format("%Y%m%d").to_string(),
        }
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// `yyyyMMdd'T'HHmmss'Z'`, carried in `X-Amz-Date`
    #[must_use]
    pub fn full(&self) -> &str {
        &self.full
    }

    /// `yyyyMMdd`, the first credential scope component
    #[must_use]
    pub fn short(&self) -> &str {
        &self.short
    }
}

/// Normalized form of a request, input to the string to sign.
///
/// Built fresh for every signing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: String,
    path: String,
    query: String,
    /// Lowercased names, sorted by name
    headers: Vec<(String, String)>,
    payload_hash: String,
}

impl CanonicalRequest {
    /// Canonicalize `request`. Fails only when its URL cannot be parsed.
    pub fn from_request(request: &HttpRequest) -> Result<Self, SigningError> {
        let url = Url::parse(&request.url)
            .map_err(|_| SigningError::InvalidUrl(request.url.clone()))?;
        Ok(Self::build(request, &url))
    }

    pub(crate) fn build(request: &HttpRequest, url: &Url) -> Self {
        // Signed as it goes on the wire: percent-encoded, never decoded
        let path = match url.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        // An existing signature is never part of what gets signed
        let mut lowered: Vec<(String, String)> = request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case(HEADER_AUTHORIZATION))
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        lowered.sort_by(|a, b| a.0.cmp(&b.0));

        // One line per name; repeated names keep insertion order, comma-joined
        let mut headers: Vec<(String, String)> = Vec::with_capacity(lowered.len());
        for (name, value) in lowered {
            match headers.last_mut() {
                Some((last, joined)) if *last == name => {
                    joined.push(',');
                    joined.push_str(&value);
                }
                _ => headers.push((name, value)),
            }
        }

        Self {
            method: request.method.clone(),
            path,
            query: url.query().unwrap_or_default().to_string(),
            headers,
            payload_hash: sha256_hex(&request.body),
        }
    }

    /// `;`-joined lowercased header names, in canonical order.
    #[must_use]
    pub fn signed_headers(&self) -> String {
        self.headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }

    #[must_use]
    pub fn payload_hash(&self) -> &str {
        &self.payload_hash
    }

    /// Hex SHA-256 of the canonical text.
    #[must_use]
    pub fn hash(&self) -> String {
        sha256_hex(self.to_string().as_bytes())
    }
}

impl fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.query)?;
        for (name, value) in &self.headers {
            writeln!(f, "{}:{}", name, value)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers())?;
        write!(f, "{}", self.payload_hash)
    }
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_amz_date_forms() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 15, 30).unwrap();
        let date = AmzDate::from_datetime(at);

        assert_eq!(date.full(), "20240305T091530Z");
        assert_eq!(date.short(), "20240305");
        assert_eq!(&date.full()[..8], date.short());
    }

    #[test]
    fn test_get_with_query_and_empty_body() {
        let request = HttpRequest::get("https://h/sdk/x?a=1")
            .with_header("Host", "h")
            .with_header("X-Amz-Date", "d");

        let canonical = CanonicalRequest::from_request(&request).unwrap();
        let text = canonical.to_string();

        assert_eq!(
            text,
            format!("GET\n/sdk/x\na=1\nhost:h\nx-amz-date:d\n\nhost;x-amz-date\n{}", EMPTY_SHA256)
        );
        assert_eq!(text.lines().last(), Some(EMPTY_SHA256));
    }

    #[test]
    fn test_headers_sorted_by_lowercased_name() {
        let request = HttpRequest::post("https://h/", b"x".to_vec())
            .with_header("X-Amz-Target", "t")
            .with_header("content-type", "c")
            .with_header("Host", "h");

        let canonical = CanonicalRequest::from_request(&request).unwrap();
        assert_eq!(canonical.signed_headers(), "content-type;host;x-amz-target");
    }

    #[test]
    fn test_root_path_and_missing_query() {
        let request = HttpRequest::get("https://example.com");
        let canonical = CanonicalRequest::from_request(&request).unwrap();
        let text = canonical.to_string();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("GET"));
        assert_eq!(lines.next(), Some("/"));
        assert_eq!(lines.next(), Some(""));
    }

    #[test]
    fn test_existing_authorization_is_not_canonicalized() {
        let plain = HttpRequest::get("https://h/").with_header("Host", "h");
        let signed = plain.clone().with_header("Authorization", "AWS4-HMAC-SHA256 old");

        let a = CanonicalRequest::from_request(&plain).unwrap();
        let b = CanonicalRequest::from_request(&signed).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_body_hash() {
        let request = HttpRequest::post("https://h/", b"hello".to_vec());
        let canonical = CanonicalRequest::from_request(&request).unwrap();
        assert_eq!(
            canonical.payload_hash(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_unparseable_url() {
        let request = HttpRequest::get("not a url");
        assert_eq!(
            CanonicalRequest::from_request(&request),
            Err(SigningError::InvalidUrl("not a url".to_string()))
        );
    }

    #[test]
    fn test_path_stays_percent_encoded() {
        let encoded = HttpRequest::get("https://h/a%20b/%C3%A9");
        let raw = HttpRequest::get("https://h/a b/é");

        let text = CanonicalRequest::from_request(&encoded).unwrap().to_string();
        assert_eq!(text.lines().nth(1), Some("/a%20b/%C3%A9"));
        assert_eq!(
            CanonicalRequest::from_request(&raw).unwrap(),
            CanonicalRequest::from_request(&encoded).unwrap()
        );
    }

    #[test]
    fn test_repeated_header_names_fold_into_one_line() {
        let mut request = HttpRequest::get("https://h/");
        request.headers.push(("X-Tag".to_string(), "a".to_string()));
        request.headers.push(("Host".to_string(), "h".to_string()));
        request.headers.push(("x-tag".to_string(), "b".to_string()));

        let canonical = CanonicalRequest::from_request(&request).unwrap();
        assert_eq!(canonical.signed_headers(), "host;x-tag");
        assert!(canonical.to_string().contains("\nx-tag:a,b\n"));
    }
}
