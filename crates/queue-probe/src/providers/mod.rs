//! Provider implementations.
//!
//! This module contains concrete implementations of the `QueueProvider` and
//! `ObjectStore` traits for the supported backends.

pub mod aws;
pub mod memory;
pub mod s3;

pub use aws::AwsSqsProvider;
pub use memory::{InMemoryConfig, InMemoryProvider};
pub use s3::S3ObjectStore;
