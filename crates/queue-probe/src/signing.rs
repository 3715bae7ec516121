//! AWS Signature Version 4 request signing.
//!
//! Implements the four-step signing process:
//! 1. Create canonical request (method, URI, query, headers, payload hash)
//! 2. Create string to sign (algorithm, timestamp, scope, request hash)
//! 3. Derive signing key (4-level HMAC chain)
//! 4. Calculate signature and build the Authorization header
//!
//! ## References
//!
//! - [AWS Signature V4](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)

use crate::provider::Credentials;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

#[cfg(test)]
#[path = "signing_tests.rs"]
mod tests;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Signer for a single AWS service in a single region
#[derive(Clone)]
pub(crate) struct AwsV4Signer {
    access_key: String,
    secret_key: String,
    region: String,
    service: String,
    /// S3 requires the payload hash as a signed header
    content_sha256_header: bool,
}

impl AwsV4Signer {
    pub(crate) fn new(access_key: &str, secret_key: &str, region: &str, service: &str) -> Self {
        Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            region: region.to_string(),
            service: service.to_string(),
            content_sha256_header: false,
        }
    }

    /// Build a signer from configured credentials; anonymous credentials sign nothing
    pub(crate) fn from_credentials(
        credentials: &Credentials,
        region: &str,
        service: &str,
    ) -> Option<Self> {
        match credentials {
            Credentials::Anonymous => None,
            Credentials::Static {
                access_key_id,
                secret_access_key,
            } => Some(Self::new(access_key_id, secret_access_key, region, service)),
        }
    }

    pub(crate) fn with_content_sha256_header(mut self) -> Self {
        self.content_sha256_header = true;
        self
    }

    /// Sign a request, returning the headers to attach to it
    pub(crate) fn sign(
        &self,
        method: &str,
        url: &Url,
        payload: &[u8],
        timestamp: &DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex::encode(Sha256::digest(payload));

        let canonical_uri = canonical_uri(url);
        let canonical_query_string = canonical_query(url);

        let mut canonical_headers = format!("host:{}\n", host_header(url));
        let signed_headers = if self.content_sha256_header {
            canonical_headers.push_str(&format!("x-amz-content-sha256:{}\n", payload_hash));
            "host;x-amz-content-sha256;x-amz-date"
        } else {
            "host;x-amz-date"
        };
        canonical_headers.push_str(&format!("x-amz-date:{}\n", amz_date));

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method,
            canonical_uri,
            canonical_query_string,
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = self.signing_key(&date_stamp);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.access_key, credential_scope, signed_headers, signature
        );

        let mut headers = vec![
            ("authorization".to_string(), authorization),
            ("x-amz-date".to_string(), amz_date),
        ];
        if self.content_sha256_header {
            headers.push(("x-amz-content-sha256".to_string(), payload_hash));
        }
        headers
    }

    /// Derive the signing key for a date (YYYYMMDD)
    fn signing_key(&self, date_stamp: &str) -> Vec<u8> {
        let k_secret = format!("AWS4{}", self.secret_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        hmac_sha256(&k_service, b"aws4_request")
    }
}

impl std::fmt::Debug for AwsV4Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsV4Signer")
            .field("access_key", &self.access_key)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

/// Host header value, including the port when it is not the scheme default
pub(crate) fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Path with every segment encoded using only the unreserved character set
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".to_string();
    }

    path.split('/')
        .map(|segment| {
            let raw = urlencoding::decode_binary(segment.as_bytes());
            urlencoding::encode_binary(&raw).into_owned()
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect::<Vec<_>>();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
