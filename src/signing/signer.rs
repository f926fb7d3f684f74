use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};
use url::Url;

use crate::config::SdkConfig;

use super::{
    AmzDate, CanonicalRequest, HttpRequest, SigningCredential, SigningError, ALGORITHM,
    AWS4_REQUEST, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE, HEADER_DATE, HEADER_HOST,
    HEADER_SECURITY_TOKEN, HEADER_TARGET,
};

type HmacSha256 = Hmac<Sha256>;

/// Signs requests for one region/service pair.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    region: String,
    service: String,
    amz_target: String,
    content_type: String,
}

impl RequestSigner {
    pub fn new(
        region: impl Into<String>,
        service: impl Into<String>,
        amz_target: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            service: service.into(),
            amz_target: amz_target.into(),
            content_type: content_type.into(),
        }
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self::new(
            config.region.clone(),
            config.service.clone(),
            config.amz_target.clone(),
            config.content_type.clone(),
        )
    }

    /// Sign `request` with the current time.
    pub fn sign(
        &self,
        request: &HttpRequest,
        credential: &SigningCredential,
    ) -> Result<HttpRequest, SigningError> {
        self.sign_at(request, credential, &AmzDate::now())
    }

    /// Sign `request` as of `date`, returning a signed copy.
    ///
    /// Deterministic: the same request, credential and date always produce
    /// the same Authorization header.
    pub fn sign_at(
        &self,
        request: &HttpRequest,
        credential: &SigningCredential,
        date: &AmzDate,
    ) -> Result<HttpRequest, SigningError> {
        // Resolve everything fallible before touching any header
        let url = Url::parse(&request.url).map_err(|_| {
            crate::metrics::record_signing_error("invalid_url");
            SigningError::InvalidUrl(request.url.clone())
        })?;
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => {
                warn!(url = %request.url, "Cannot sign request without a host");
                crate::metrics::record_signing_error("missing_host");
                return Err(SigningError::MissingHost(request.url.clone()));
            }
        };

        let mut signed = request.clone();
        signed
            .headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case(HEADER_AUTHORIZATION));
        signed.set_header(HEADER_SECURITY_TOKEN, credential.session_token.clone());
        signed.set_header(HEADER_HOST, host);
        signed.set_header(HEADER_DATE, date.full());
        signed.set_header(HEADER_TARGET, self.amz_target.clone());
        signed.set_header(HEADER_CONTENT_TYPE, self.content_type.clone());

        let canonical = CanonicalRequest::build(&signed, &url);
        let string_to_sign = self.string_to_sign(&canonical, date);
        let signing_key = derive_signing_key(&credential.secret_key, date.short(), &self.region, &self.service);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            credential.access_key_id,
            self.credential_scope(date),
            canonical.signed_headers(),
            signature
        );
        signed.headers.push((HEADER_AUTHORIZATION.to_string(), authorization));

        debug!(method = %signed.method, signed_headers = %canonical.signed_headers(), "Request signed");
        Ok(signed)
    }

    /// `shortDate/region/service/aws4_request`
    #[must_use]
    pub fn credential_scope(&self, date: &AmzDate) -> String {
        [date.short(), self.region.as_str(), self.service.as_str(), AWS4_REQUEST].join("/")
    }

    #[must_use]
    pub fn string_to_sign(&self, canonical: &CanonicalRequest, date: &AmzDate) -> String {
        [
            ALGORITHM.to_string(),
            date.full().to_string(),
            self.credential_scope(date),
            canonical.hash(),
        ]
        .join("\n")
    }
}

/// Derive the per-day signing key:
/// `HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`.
pub fn derive_signing_key(secret: &str, short_date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_secret = format!("AWS4{}", secret);
    let k_date = hmac_sha256(k_secret.as_bytes(), short_date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, AWS4_REQUEST.as_bytes())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const BODY: &str = r#"{"Records":[],"StreamName":"s"}"#;

    fn signer() -> RequestSigner {
        RequestSigner::from_config(&SdkConfig::default())
    }

    fn credential() -> SigningCredential {
        SigningCredential::new("AKIDTEST", "test-secret", "session-token")
    }

    fn date() -> AmzDate {
        AmzDate::from_datetime(Utc.with_ymd_and_hms(2024, 3, 5, 9, 15, 30).unwrap())
    }

    fn request() -> HttpRequest {
        HttpRequest::post("https://kinesis.us-east-1.amazonaws.com/", BODY.as_bytes().to_vec())
    }

    #[test]
    fn test_derive_signing_key_matches_published_vector() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_sign_sets_fixed_headers() {
        let signed = signer().sign_at(&request(), &credential(), &date()).unwrap();

        assert_eq!(signed.header("X-Amz-Security-Token"), Some("session-token"));
        assert_eq!(signed.header("Host"), Some("kinesis.us-east-1.amazonaws.com"));
        assert_eq!(signed.header("X-Amz-Date"), Some("20240305T091530Z"));
        assert_eq!(signed.header("X-Amz-Target"), Some("Kinesis_20131202.PutRecords"));
        assert_eq!(signed.header("Content-Type"), Some("application/x-amz-json-1.1"));
        assert_eq!(signed.body, BODY.as_bytes());
    }

    #[test]
    fn test_authorization_header_known_answer() {
        let signed = signer().sign_at(&request(), &credential(), &date()).unwrap();

        assert_eq!(
            signed.header("Authorization"),
            Some(
                "AWS4-HMAC-SHA256 Credential=AKIDTEST/20240305/us-east-1/kinesis/aws4_request, \
                 SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target, \
                 Signature=003fa67111d0d0491d624dde3bd97292c2f6cd1abb0d244012de8d3a24478162"
            )
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = signer();
        let first = signer.sign_at(&request(), &credential(), &date()).unwrap();
        let second = signer.sign_at(&request(), &credential(), &date()).unwrap();
        assert_eq!(first.header("Authorization"), second.header("Authorization"));

        // Re-signing an already signed request gives the same signature
        let resigned = signer.sign_at(&first, &credential(), &date()).unwrap();
        assert_eq!(first.header("Authorization"), resigned.header("Authorization"));
        assert_eq!(
            resigned.headers.iter().filter(|(n, _)| n == "Authorization").count(),
            1
        );
    }

    #[test]
    fn test_different_secret_changes_signature() {
        let other = SigningCredential::new("AKIDTEST", "other-secret", "session-token");
        let a = signer().sign_at(&request(), &credential(), &date()).unwrap();
        let b = signer().sign_at(&request(), &other, &date()).unwrap();
        assert_ne!(a.header("Authorization"), b.header("Authorization"));
    }

    #[test]
    fn test_string_to_sign_layout() {
        let signer = signer();
        let signed = signer.sign_at(&request(), &credential(), &date()).unwrap();
        let canonical = CanonicalRequest::from_request(&signed).unwrap();
        let sts = signer.string_to_sign(&canonical, &date());
        let lines: Vec<&str> = sts.lines().collect();

        assert_eq!(lines[0], "AWS4-HMAC-SHA256");
        assert_eq!(lines[1], "20240305T091530Z");
        assert_eq!(lines[2], "20240305/us-east-1/kinesis/aws4_request");
        assert_eq!(lines[3], canonical.hash());
    }

    #[test]
    fn test_missing_host_fails_without_mutation() {
        let original = HttpRequest::post("file:///tmp/batch", BODY.as_bytes().to_vec());
        let result = signer().sign_at(&original, &credential(), &date());

        assert_eq!(result, Err(SigningError::MissingHost("file:///tmp/batch".to_string())));
        assert!(original.headers.is_empty());
    }

    #[test]
    fn test_invalid_url_fails() {
        let original = HttpRequest::post("::nonsense::", vec![]);
        let result = signer().sign_at(&original, &credential(), &date());
        assert!(matches!(result, Err(SigningError::InvalidUrl(_))));
    }
}
