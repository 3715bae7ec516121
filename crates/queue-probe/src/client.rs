//! Capability traits for the queue and object storage services.

use crate::error::QueueError;
use crate::message::{MessageId, QueueUrl, ReceiptHandle, ReceiveRequest, ReceivedMessage};
use crate::provider::{ProviderType, QueueEndpoint, ServiceEndpoint};
use crate::providers::{AwsSqsProvider, InMemoryProvider, S3ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Interface implemented by specific queue providers (AWS SQS, in-memory)
#[async_trait]
pub trait QueueProvider: Send + Sync {
    /// Publish a message body, returning the service-assigned ID
    async fn send_message(&self, queue: &QueueUrl, body: &str) -> Result<MessageId, QueueError>;

    /// Receive up to `request.max_messages`, long-polling for `request.wait_time`
    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Permanently remove a delivered message
    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

/// Object metadata returned by a bucket listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

/// Read-only object storage operations
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full contents of an object
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, QueueError>;

    /// List every object in a bucket, following pagination
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, QueueError>;
}

/// Factory for creating providers from endpoint configuration
pub struct QueueClientFactory;

impl QueueClientFactory {
    /// Create an SQS provider for the endpoint's service connection
    pub fn create_provider(endpoint: &QueueEndpoint) -> Result<Box<dyn QueueProvider>, QueueError> {
        Ok(Box::new(AwsSqsProvider::new(&endpoint.service)?))
    }

    /// Create an S3 object store for a service connection
    pub fn create_object_store(
        service: &ServiceEndpoint,
    ) -> Result<Box<dyn ObjectStore>, QueueError> {
        Ok(Box::new(S3ObjectStore::new(service)?))
    }

    /// Create test provider backed by process memory
    pub fn create_test_provider() -> Box<dyn QueueProvider> {
        Box::new(InMemoryProvider::default())
    }
}
