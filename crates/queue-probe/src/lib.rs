//! # Queue Probe
//!
//! Minimal message-queue round-trip client with bounded retry polling, plus
//! read-only object storage calls, for exercising SQS and S3 compatible
//! services such as LocalStack.
//!
//! This library provides:
//! - A round-trip client that sends one message, then receives and deletes one
//!   message within a bounded number of long-poll attempts
//! - SQS (Query API) and in-memory queue providers
//! - An S3 object store for fetching and listing objects
//! - Settings resolved from a config file and the environment
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all operations
//! - [`message`] - Message structures, identifiers and receive parameters
//! - [`provider`] - Provider types and connection configuration
//! - [`client`] - Provider traits and the factory
//! - [`providers`] - Concrete SQS, S3 and in-memory implementations
//! - [`retry`] - Polling policy
//! - [`roundtrip`] - The round-trip client
//! - [`settings`] - Configuration loading

// Module declarations
pub mod client;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod roundtrip;
pub mod settings;

mod signing;
mod transport;

// Re-export commonly used types at crate root for convenience
pub use client::{ObjectStore, ObjectSummary, QueueClientFactory, QueueProvider};
pub use error::{ConfigurationError, Operation, QueueError, TransportError, ValidationError};
pub use message::{MessageId, QueueUrl, ReceiptHandle, ReceiveRequest, ReceivedMessage};
pub use provider::{Credentials, ProviderType, QueueEndpoint, ServiceEndpoint};
pub use providers::{AwsSqsProvider, InMemoryConfig, InMemoryProvider, S3ObjectStore};
pub use retry::{RetryPolicy, RetryState};
pub use roundtrip::{ReceiveOutcome, RetryingQueueClient};
pub use settings::Settings;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
