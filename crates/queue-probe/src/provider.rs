//! Provider types and connection configuration.

use crate::error::ValidationError;
use crate::message::QueueUrl;
use url::Url;

/// Enumeration of supported queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    AwsSqs,
    InMemory,
}

impl ProviderType {
    /// Maximum long-poll wait the provider honors, if bounded
    pub fn max_wait_seconds(&self) -> Option<u64> {
        match self {
            Self::AwsSqs => Some(20),
            Self::InMemory => None,
        }
    }

    /// Maximum number of messages returned by one receive call
    pub fn max_receive_batch(&self) -> u32 {
        match self {
            Self::AwsSqs => 10,
            Self::InMemory => 100,
        }
    }

    /// Maximum message body size in bytes
    pub fn max_message_size(&self) -> usize {
        match self {
            Self::AwsSqs => 256 * 1024,
            Self::InMemory => 10 * 1024 * 1024,
        }
    }
}

/// Credentials used to sign service requests
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Unsigned requests, as accepted by local emulators
    #[default]
    Anonymous,
    Static {
        access_key_id: String,
        secret_access_key: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Static { access_key_id, .. } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Connection settings shared by every request to the cloud service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Endpoint override (e.g. LocalStack); `None` uses the public AWS endpoint
    pub endpoint_url: Option<Url>,
    pub region: String,
    pub credentials: Credentials,
}

impl ServiceEndpoint {
    /// Create new service endpoint with validation
    pub fn new(region: String) -> Result<Self, ValidationError> {
        if region.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "region".to_string(),
            });
        }

        Ok(Self {
            endpoint_url: None,
            region,
            credentials: Credentials::Anonymous,
        })
    }

    /// Route requests to a custom endpoint
    pub fn with_endpoint_url(mut self, endpoint_url: Url) -> Self {
        self.endpoint_url = Some(endpoint_url);
        self
    }

    /// Sign requests with static credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Resolve the base URL for an AWS service (`sqs`, `s3`)
    pub fn service_url(&self, service: &str) -> Result<Url, ValidationError> {
        match &self.endpoint_url {
            Some(url) => Ok(url.clone()),
            None => {
                let default = format!("https://{}.{}.amazonaws.com", service, self.region);
                Url::parse(&default).map_err(|e| ValidationError::InvalidFormat {
                    field: "region".to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Target queue plus the connection used to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEndpoint {
    pub queue_url: QueueUrl,
    pub service: ServiceEndpoint,
}

impl QueueEndpoint {
    pub fn new(queue_url: QueueUrl, service: ServiceEndpoint) -> Self {
        Self { queue_url, service }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
