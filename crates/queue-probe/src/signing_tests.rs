//! Tests for AWS Signature V4 signing.

use super::*;
use chrono::TimeZone;

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Signing key derivation example from the AWS documentation
#[test]
fn test_signing_key_derivation() {
    let signer = AwsV4Signer::new(
        "AKIDEXAMPLE",
        "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        "us-east-1",
        "iam",
    );

    assert_eq!(
        hex::encode(signer.signing_key("20120215")),
        "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
    );
}

/// `get-vanilla` case from the AWS Signature V4 test suite
#[test]
fn test_get_vanilla_signature() {
    let signer = AwsV4Signer::new(
        "AKIDEXAMPLE",
        "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        "us-east-1",
        "service",
    );
    let url = Url::parse("https://example.amazonaws.com/").unwrap();
    let timestamp = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();

    let headers = signer.sign("GET", &url, b"", &timestamp);

    assert_eq!(header(&headers, "x-amz-date"), Some("20150830T123600Z"));
    assert_eq!(
        header(&headers, "authorization"),
        Some(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        )
    );
    assert_eq!(header(&headers, "x-amz-content-sha256"), None);
}

#[test]
fn test_content_sha256_header_is_signed() {
    let signer = AwsV4Signer::new("AKID", "secret", "us-east-1", "s3").with_content_sha256_header();
    let url = Url::parse("http://localhost:4566/bucket/go.mod").unwrap();
    let timestamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    let headers = signer.sign("GET", &url, b"", &timestamp);

    assert_eq!(
        header(&headers, "x-amz-content-sha256"),
        Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
    );
    let authorization = header(&headers, "authorization").unwrap();
    assert!(authorization.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
    assert!(authorization.contains("/20240102/us-east-1/s3/aws4_request"));
}

#[test]
fn test_anonymous_credentials_produce_no_signer() {
    assert!(AwsV4Signer::from_credentials(&Credentials::Anonymous, "us-east-1", "sqs").is_none());

    let credentials = Credentials::Static {
        access_key_id: "AKID".to_string(),
        secret_access_key: "secret".to_string(),
    };
    assert!(AwsV4Signer::from_credentials(&credentials, "us-east-1", "sqs").is_some());
}

#[test]
fn test_host_header_keeps_non_default_port() {
    assert_eq!(
        host_header(&Url::parse("http://localhost:4566/").unwrap()),
        "localhost:4566"
    );
    assert_eq!(
        host_header(&Url::parse("https://sqs.us-east-1.amazonaws.com/").unwrap()),
        "sqs.us-east-1.amazonaws.com"
    );
}

#[test]
fn test_canonical_query_is_sorted_and_encoded() {
    let url = Url::parse("http://localhost/bucket?prefix=a b&list-type=2").unwrap();
    assert_eq!(canonical_query(&url), "list-type=2&prefix=a%20b");
}

#[test]
fn test_canonical_uri_encodes_reserved_characters() {
    let url = Url::parse("http://localhost:4566/bucket/a+b=c!(1).txt").unwrap();
    assert_eq!(canonical_uri(&url), "/bucket/a%2Bb%3Dc%21%281%29.txt");

    let url = Url::parse("http://localhost:4566/bucket/dir/my%20file.txt").unwrap();
    assert_eq!(canonical_uri(&url), "/bucket/dir/my%20file.txt");

    let url = Url::parse("http://localhost:4566/").unwrap();
    assert_eq!(canonical_uri(&url), "/");
}

#[test]
fn test_literal_plus_signs_same_as_encoded_plus() {
    let signer = AwsV4Signer::new("AKID", "secret", "us-east-1", "s3").with_content_sha256_header();
    let timestamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let literal = Url::parse("http://localhost:4566/bucket/a+b.txt").unwrap();
    let encoded = Url::parse("http://localhost:4566/bucket/a%2Bb.txt").unwrap();

    assert_eq!(
        signer.sign("GET", &literal, b"", &timestamp),
        signer.sign("GET", &encoded, b"", &timestamp)
    );
}
