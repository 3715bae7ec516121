//! S3 object store using path-style REST requests.
//!
//! Objects are addressed as `{endpoint}/{bucket}/{key}` so the store works
//! against emulators that do not serve virtual-hosted buckets. Listing uses
//! ListObjectsV2 and follows continuation tokens until the result is complete.

use crate::client::{ObjectStore, ObjectSummary};
use crate::error::{ConfigurationError, Operation, QueueError, TransportError, ValidationError};
use crate::provider::ServiceEndpoint;
use crate::signing::AwsV4Signer;
use crate::transport::SignedHttpClient;
use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Method;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[cfg(test)]
#[path = "s3_tests.rs"]
mod tests;

/// S3 object store
pub struct S3ObjectStore {
    http: SignedHttpClient,
    endpoint: Url,
}

impl S3ObjectStore {
    /// Create new S3 object store
    ///
    /// # Errors
    ///
    /// Returns error if the region is empty or the HTTP client cannot be built.
    pub fn new(service: &ServiceEndpoint) -> Result<Self, QueueError> {
        let endpoint = service.service_url("s3")?;
        let signer = AwsV4Signer::from_credentials(&service.credentials, &service.region, "s3")
            .map(AwsV4Signer::with_content_sha256_header);
        let http = SignedHttpClient::new(signer).map_err(|e| ConfigurationError::Invalid {
            message: e.to_string(),
        })?;

        Ok(Self { http, endpoint })
    }

    /// Build `{endpoint}/{bucket}/{key...}`, percent-encoding each segment
    fn object_url(&self, bucket: &str, key: &[&str]) -> Result<Url, ValidationError> {
        if bucket.is_empty() {
            return Err(ValidationError::Required {
                field: "bucket".to_string(),
            });
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ValidationError::InvalidFormat {
                field: "endpoint_url".to_string(),
                message: "cannot be used as a base URL".to_string(),
            })?
            .pop_if_empty()
            .push(bucket)
            .extend(key);
        Ok(url)
    }

    async fn get(&self, operation: Operation, url: Url) -> Result<Bytes, QueueError> {
        let response = self
            .http
            .send(Method::GET, url, None, Vec::new(), Duration::ZERO)
            .await
            .map_err(|e| QueueError::transport(operation, e))?;

        debug!(status = response.status, bytes = response.body.len(), "S3 request complete");
        Ok(response.body)
    }
}

impl fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, QueueError> {
        if key.is_empty() {
            return Err(ValidationError::Required {
                field: "key".to_string(),
            }
            .into());
        }
        let segments: Vec<&str> = key.split('/').collect();
        let url = self.object_url(bucket, &segments)?;

        debug!(bucket, key, "Getting object");
        self.get(Operation::GetObject, url).await
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, QueueError> {
        let base = self.object_url(bucket, &[])?;
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut url = base.clone();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("list-type", "2");
                if let Some(token) = &continuation {
                    query.append_pair("continuation-token", token);
                }
            }

            debug!(bucket, page_token = ?continuation, "Listing objects");
            let body = self.get(Operation::ListObjects, url).await?;
            let page = parse_list_objects_response(&body)
                .map_err(|e| QueueError::transport(Operation::ListObjects, e))?;
            objects.extend(page.objects);

            match (page.is_truncated, page.next_continuation_token) {
                (true, Some(token)) => continuation = Some(token),
                (true, None) => {
                    return Err(QueueError::transport(
                        Operation::ListObjects,
                        TransportError::MalformedResponse(
                            "Truncated listing without NextContinuationToken".to_string(),
                        ),
                    ))
                }
                (false, _) => break,
            }
        }

        Ok(objects)
    }
}

// ============================================================================
// XML Response Parsing
// ============================================================================

/// One page of a ListObjectsV2 result
#[derive(Debug, Default, PartialEq, Eq)]
struct ListPage {
    objects: Vec<ObjectSummary>,
    is_truncated: bool,
    next_continuation_token: Option<String>,
}

fn parse_list_objects_response(body: &[u8]) -> Result<ListPage, TransportError> {
    let xml = std::str::from_utf8(body).map_err(|e| {
        TransportError::MalformedResponse(format!("Response body is not UTF-8: {}", e))
    })?;
    // Untrimmed so keys keep surrounding whitespace; text between elements
    // arrives with no current element and is skipped
    let mut reader = Reader::from_str(xml);

    let mut page = ListPage::default();
    let mut in_contents = false;
    let mut current_key: Option<String> = None;
    let mut current_size: u64 = 0;
    let mut element: Vec<u8> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                element = e.name().as_ref().to_vec();
                if element == b"Contents" {
                    in_contents = true;
                    current_key = None;
                    current_size = 0;
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| {
                    TransportError::MalformedResponse(format!("Failed to parse XML: {}", e))
                })?;
                match (element.as_slice(), in_contents) {
                    (b"Key", true) => current_key
                        .get_or_insert_with(String::new)
                        .push_str(&text),
                    (b"Size", true) => {
                        current_size = text.trim().parse().map_err(|_| {
                            TransportError::MalformedResponse(format!("Invalid object size: {}", text))
                        })?
                    }
                    (b"IsTruncated", false) => page.is_truncated = text.trim() == "true",
                    (b"NextContinuationToken", false) => {
                        page.next_continuation_token = Some(text.trim().to_string())
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"Contents" {
                    in_contents = false;
                    let key = current_key.take().ok_or_else(|| {
                        TransportError::MalformedResponse("Contents without Key".to_string())
                    })?;
                    page.objects.push(ObjectSummary {
                        key,
                        size: current_size,
                    });
                }
                element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TransportError::MalformedResponse(format!(
                    "XML parsing error: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(page)
}
