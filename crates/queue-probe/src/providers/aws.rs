//! AWS SQS provider implementation using the Query API over HTTP.
//!
//! Requests are form-encoded `POST`s against the service endpoint carrying the
//! `QueueUrl` parameter, so an endpoint override (LocalStack or any other
//! emulator) works without rewriting queue URLs.
//!
//! ## Authentication
//!
//! - **Static credentials**: requests are signed with AWS Signature V4
//! - **Anonymous**: requests are sent unsigned, which local emulators accept
//!
//! ## Limits
//!
//! - `WaitTimeSeconds` is clamped to 0..=20 (SQS maximum long-poll)
//! - `MaxNumberOfMessages` is clamped to 1..=10

use crate::client::QueueProvider;
use crate::error::{ConfigurationError, Operation, QueueError, TransportError};
use crate::message::{MessageId, QueueUrl, ReceiptHandle, ReceiveRequest, ReceivedMessage};
use crate::provider::{ProviderType, ServiceEndpoint};
use crate::signing::AwsV4Signer;
use crate::transport::SignedHttpClient;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Method;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[cfg(test)]
#[path = "aws_tests.rs"]
mod tests;

const API_VERSION: &str = "2012-11-05";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// AWS SQS queue provider
pub struct AwsSqsProvider {
    http: SignedHttpClient,
    endpoint: Url,
    region: String,
}

impl AwsSqsProvider {
    /// Create new AWS SQS provider
    ///
    /// # Errors
    ///
    /// Returns error if the region is empty or the HTTP client cannot be built.
    pub fn new(service: &ServiceEndpoint) -> Result<Self, QueueError> {
        let endpoint = service.service_url("sqs")?;
        let signer = AwsV4Signer::from_credentials(&service.credentials, &service.region, "sqs");
        let http = SignedHttpClient::new(signer).map_err(|e| ConfigurationError::Invalid {
            message: e.to_string(),
        })?;

        Ok(Self {
            http,
            endpoint,
            region: service.region.clone(),
        })
    }

    /// Issue one Query API action and return the response body
    async fn call(
        &self,
        operation: Operation,
        action: &str,
        queue: &QueueUrl,
        params: &[(&str, String)],
        extra_wait: Duration,
    ) -> Result<String, QueueError> {
        // The serializer is not Send, so it must not live across the await below
        let body = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            form.append_pair("Action", action);
            form.append_pair("Version", API_VERSION);
            form.append_pair("QueueUrl", queue.as_str());
            for (key, value) in params {
                form.append_pair(key, value);
            }
            form.finish()
        };

        debug!(action, queue = %queue, region = %self.region, "Calling SQS");

        let response = self
            .http
            .send(
                Method::POST,
                self.endpoint.clone(),
                Some(FORM_CONTENT_TYPE),
                body.into_bytes(),
                extra_wait,
            )
            .await
            .map_err(|e| QueueError::transport(operation, e))?;

        response
            .text()
            .map(str::to_string)
            .map_err(|e| QueueError::transport(operation, e))
    }
}

impl fmt::Debug for AwsSqsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSqsProvider")
            .field("endpoint", &self.endpoint.as_str())
            .field("region", &self.region)
            .finish()
    }
}

#[async_trait]
impl QueueProvider for AwsSqsProvider {
    async fn send_message(&self, queue: &QueueUrl, body: &str) -> Result<MessageId, QueueError> {
        let response = self
            .call(
                Operation::Send,
                "SendMessage",
                queue,
                &[("MessageBody", body.to_string())],
                Duration::ZERO,
            )
            .await?;

        parse_send_message_response(&response).map_err(|e| QueueError::transport(Operation::Send, e))
    }

    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let limits = self.provider_type();
        let requested_wait = request.wait_time.as_secs();
        let wait_seconds = limits
            .max_wait_seconds()
            .map_or(requested_wait, |max| requested_wait.min(max));
        if wait_seconds != requested_wait {
            warn!(
                requested = requested_wait,
                applied = wait_seconds,
                "Long-poll wait exceeds SQS maximum, clamping"
            );
        }

        let mut params = vec![
            (
                "MaxNumberOfMessages",
                request.max_messages.clamp(1, limits.max_receive_batch()).to_string(),
            ),
            ("WaitTimeSeconds", wait_seconds.to_string()),
            ("AttributeName.1", "ApproximateReceiveCount".to_string()),
        ];
        if let Some(visibility) = request.visibility_timeout {
            params.push(("VisibilityTimeout", visibility.as_secs().to_string()));
        }

        let response = self
            .call(
                Operation::Receive,
                "ReceiveMessage",
                queue,
                &params,
                Duration::from_secs(wait_seconds),
            )
            .await?;

        parse_receive_message_response(&response)
            .map_err(|e| QueueError::transport(Operation::Receive, e))
    }

    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError> {
        // DeleteMessage returns an empty result element on success
        self.call(
            Operation::Delete,
            "DeleteMessage",
            queue,
            &[("ReceiptHandle", receipt.as_str().to_string())],
            Duration::ZERO,
        )
        .await?;
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::AwsSqs
    }
}

// ============================================================================
// XML Response Parsing
// ============================================================================

/// Parse SendMessage XML response
fn parse_send_message_response(xml: &str) -> Result<MessageId, TransportError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut in_message_id = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"MessageId" => {
                in_message_id = true;
            }
            Ok(Event::Text(e)) if in_message_id => {
                let id = e.unescape().map_err(|e| {
                    TransportError::MalformedResponse(format!("Failed to parse XML: {}", e))
                })?;
                return id
                    .parse::<MessageId>()
                    .map_err(|e| TransportError::MalformedResponse(e.to_string()));
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

    Err(TransportError::MalformedResponse(
        "MessageId not found in response".to_string(),
    ))
}

/// Leaf element inside a `<Message>` whose text is being collected
#[derive(Clone, Copy, PartialEq, Eq)]
enum MessageField {
    MessageId,
    ReceiptHandle,
    Body,
    AttributeName,
    AttributeValue,
}

#[derive(Default)]
struct PartialMessage {
    message_id: Option<String>,
    receipt_handle: Option<String>,
    body: String,
    receive_count: Option<u32>,
    attribute_name: String,
    attribute_value: String,
}

impl PartialMessage {
    fn finish(self) -> Result<ReceivedMessage, TransportError> {
        let message_id = self
            .message_id
            .ok_or_else(|| TransportError::MalformedResponse("Message without MessageId".into()))?
            .parse::<MessageId>()
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
        let receipt_handle = self
            .receipt_handle
            .ok_or_else(|| {
                TransportError::MalformedResponse("Message without ReceiptHandle".into())
            })?
            .parse::<ReceiptHandle>()
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        let message = ReceivedMessage::new(message_id, self.body, receipt_handle);
        Ok(match self.receive_count {
            Some(count) => message.with_receive_count(count),
            None => message,
        })
    }
}

/// Parse ReceiveMessage XML response
///
/// Text is not trimmed so message bodies keep their surrounding whitespace.
fn parse_receive_message_response(xml: &str) -> Result<Vec<ReceivedMessage>, TransportError> {
    let mut reader = Reader::from_str(xml);

    let mut messages = Vec::new();
    let mut current: Option<PartialMessage> = None;
    let mut field: Option<MessageField> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match (e.name().as_ref(), current.is_some()) {
                (b"Message", _) => current = Some(PartialMessage::default()),
                (b"MessageId", true) => field = Some(MessageField::MessageId),
                (b"ReceiptHandle", true) => field = Some(MessageField::ReceiptHandle),
                (b"Body", true) => field = Some(MessageField::Body),
                (b"Name", true) => field = Some(MessageField::AttributeName),
                (b"Value", true) => field = Some(MessageField::AttributeValue),
                (b"Attribute", true) => {
                    if let Some(message) = current.as_mut() {
                        message.attribute_name.clear();
                        message.attribute_value.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let (Some(active), Some(message)) = (field, current.as_mut()) {
                    let text = e.unescape().map_err(|e| {
                        TransportError::MalformedResponse(format!("Failed to parse XML: {}", e))
                    })?;
                    match active {
                        MessageField::MessageId => {
                            message.message_id.get_or_insert_with(String::new).push_str(&text)
                        }
                        MessageField::ReceiptHandle => message
                            .receipt_handle
                            .get_or_insert_with(String::new)
                            .push_str(&text),
                        MessageField::Body => message.body.push_str(&text),
                        MessageField::AttributeName => message.attribute_name.push_str(&text),
                        MessageField::AttributeValue => message.attribute_value.push_str(&text),
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"Message" => {
                    if let Some(message) = current.take() {
                        messages.push(message.finish()?);
                    }
                    field = None;
                }
                b"Attribute" => {
                    if let Some(message) = current.as_mut() {
                        if message.attribute_name.trim() == "ApproximateReceiveCount" {
                            message.receive_count = message.attribute_value.trim().parse().ok();
                        }
                    }
                }
                _ => field = None,
            },
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

    Ok(messages)
}
