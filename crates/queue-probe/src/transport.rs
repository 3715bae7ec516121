//! Signed HTTP transport shared by the SQS and S3 providers.

use crate::error::TransportError;
use crate::signing::AwsV4Signer;
use bytes::Bytes;
use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client as HttpClient, Method};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;

/// Request timeout added on top of any server-side long-poll wait
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response body of a successful call
#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub(crate) fn text(&self) -> Result<&str, TransportError> {
        std::str::from_utf8(&self.body).map_err(|e| {
            TransportError::MalformedResponse(format!("Response body is not UTF-8: {}", e))
        })
    }
}

/// HTTP client that optionally signs every request
#[derive(Debug, Clone)]
pub(crate) struct SignedHttpClient {
    http_client: HttpClient,
    signer: Option<AwsV4Signer>,
}

impl SignedHttpClient {
    pub(crate) fn new(signer: Option<AwsV4Signer>) -> Result<Self, TransportError> {
        let http_client = HttpClient::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                TransportError::Connection(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            signer,
        })
    }

    /// Send a request, mapping non-2xx responses through the service error body
    pub(crate) async fn send(
        &self,
        method: Method,
        url: Url,
        content_type: Option<&str>,
        body: Vec<u8>,
        extra_wait: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self
            .http_client
            .request(method.clone(), url.clone())
            .timeout(REQUEST_TIMEOUT + extra_wait);

        if let Some(signer) = &self.signer {
            for (name, value) in signer.sign(method.as_str(), &url, &body, &Utc::now()) {
                request = request.header(name, value);
            }
        }

        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        if !body.is_empty() {
            request = request.body(body);
        }

        debug!(method = %method, url = %url, signed = self.signer.is_some(), "Sending request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Connection(format!("Request timeout: {}", e))
            } else if e.is_connect() {
                TransportError::Connection(format!("Connection failed: {}", e))
            } else {
                TransportError::Connection(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            TransportError::Connection(format!("Failed to read response body: {}", e))
        })?;

        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(ServiceErrorBody::parse(&text).into_transport_error(status.as_u16()));
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// `<Error><Code/><Message/></Error>` body returned by SQS and S3
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ServiceErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ServiceErrorBody {
    pub(crate) fn parse(xml: &str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut parsed = Self::default();
        let mut in_error = false;
        let mut in_code = false;
        let mut in_message = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"Error" => in_error = true,
                    b"Code" if in_error => in_code = true,
                    b"Message" if in_error => in_message = true,
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    let text = e.unescape().ok().map(|s| s.into_owned());
                    if in_code {
                        parsed.code = text;
                    } else if in_message {
                        parsed.message = text;
                    }
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"Error" => in_error = false,
                    b"Code" => in_code = false,
                    b"Message" => in_message = false,
                    _ => {}
                },
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
            buf.clear();
        }

        parsed
    }

    /// Map AWS error codes onto transport error causes
    pub(crate) fn into_transport_error(self, status: u16) -> TransportError {
        let code = self.code.unwrap_or_else(|| "Unknown".to_string());
        let message = self.message.unwrap_or_else(|| "Unknown error".to_string());

        match code.as_str() {
            "AWS.SimpleQueueService.NonExistentQueue" | "QueueDoesNotExist" => {
                TransportError::QueueNotFound(message)
            }
            "NoSuchKey" | "NoSuchBucket" => TransportError::NotFound(format!("{}: {}", code, message)),
            "InvalidClientTokenId"
            | "UnrecognizedClientException"
            | "SignatureDoesNotMatch"
            | "InvalidAccessKeyId"
            | "AccessDenied" => TransportError::Authentication(format!("{}: {}", code, message)),
            "InvalidReceiptHandle" | "ReceiptHandleIsInvalid" => {
                TransportError::InvalidReceipt(message)
            }
            _ if status == 401 || status == 403 => {
                TransportError::Authentication(format!("{}: {}", code, message))
            }
            _ if status == 404 => TransportError::NotFound(format!("{}: {}", code, message)),
            _ => TransportError::Service {
                status,
                code,
                message,
            },
        }
    }
}
