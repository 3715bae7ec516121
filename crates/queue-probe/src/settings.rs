//! Runtime settings resolved once at start-up.
//!
//! Sources, later overriding earlier:
//!  1. Optional config file (TOML, YAML or JSON, picked by extension)
//!  2. Process environment (`SQS_QUEUE_URL`, `AWS_DEFAULT_REGION`, ...)
//!
//! File keys are the lower-case form of the environment variable names, e.g.
//! `sqs_queue_url = "http://localhost:4566/000000000000/probe-queue"`.
//! Empty values count as missing.

use crate::error::ConfigurationError;
use crate::message::QueueUrl;
use crate::provider::{Credentials, QueueEndpoint, ServiceEndpoint};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

pub const SQS_QUEUE_URL: &str = "SQS_QUEUE_URL";
pub const SQS_QUEUE: &str = "SQS_QUEUE";
pub const LOCALSTACK_ENDPOINT: &str = "LOCALSTACK_ENDPOINT";
pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const S3_BUCKET: &str = "S3_BUCKET";

/// Raw configuration values
#[derive(Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    sqs_queue_url: Option<String>,
    #[serde(default)]
    sqs_queue: Option<String>,
    #[serde(default)]
    localstack_endpoint: Option<String>,
    #[serde(default)]
    aws_default_region: Option<String>,
    #[serde(default)]
    aws_access_key_id: Option<String>,
    #[serde(default)]
    aws_secret_access_key: Option<String>,
    #[serde(default)]
    s3_bucket: Option<String>,
}

impl Settings {
    /// Load settings from an optional file and the process environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigurationError> {
        Self::load_from(config_file, None)
    }

    /// Load settings with an explicit environment map in place of the process environment
    pub fn load_from(
        config_file: Option<&Path>,
        environment: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::default()
                    .ignore_empty(true)
                    .source(environment),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Connection settings for the service (region, endpoint override, credentials)
    ///
    /// # Errors
    ///
    /// - `Missing` when `AWS_DEFAULT_REGION` is unset
    /// - `Invalid` when the endpoint is not a URL or only one credential is set
    pub fn service_endpoint(&self) -> Result<ServiceEndpoint, ConfigurationError> {
        let region = required(&self.aws_default_region, AWS_DEFAULT_REGION)?;
        let mut service = ServiceEndpoint::new(region.to_string()).map_err(|e| {
            ConfigurationError::Invalid {
                message: format!("{}: {}", AWS_DEFAULT_REGION, e),
            }
        })?;

        if let Some(endpoint) = present(&self.localstack_endpoint) {
            let url = Url::parse(endpoint).map_err(|e| ConfigurationError::Invalid {
                message: format!("{}: {}", LOCALSTACK_ENDPOINT, e),
            })?;
            service = service.with_endpoint_url(url);
        }

        let credentials = match (
            present(&self.aws_access_key_id),
            present(&self.aws_secret_access_key),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Credentials::Static {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
            },
            (None, None) => Credentials::Anonymous,
            _ => {
                return Err(ConfigurationError::Invalid {
                    message: format!(
                        "{} and {} must be set together",
                        AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY
                    ),
                })
            }
        };

        Ok(service.with_credentials(credentials))
    }

    /// Queue address plus connection settings
    ///
    /// # Errors
    ///
    /// Everything `service_endpoint` reports, plus `Missing`/`Invalid` for
    /// `SQS_QUEUE_URL`.
    pub fn queue_endpoint(&self) -> Result<QueueEndpoint, ConfigurationError> {
        let raw_url = required(&self.sqs_queue_url, SQS_QUEUE_URL)?;
        let queue_url =
            QueueUrl::new(raw_url.to_string()).map_err(|e| ConfigurationError::Invalid {
                message: format!("{}: {}", SQS_QUEUE_URL, e),
            })?;

        if let (Some(name), Some(url_name)) = (present(&self.sqs_queue), queue_url.queue_name()) {
            if name != url_name {
                warn!(
                    queue = name,
                    queue_url = %queue_url,
                    "Configured queue name does not match the queue URL"
                );
            }
        }

        Ok(QueueEndpoint::new(queue_url, self.service_endpoint()?))
    }

    /// Bucket to use: the explicit override, else `S3_BUCKET`
    pub fn bucket(&self, explicit: Option<&str>) -> Result<String, ConfigurationError> {
        match explicit.filter(|b| !b.is_empty()) {
            Some(bucket) => Ok(bucket.to_string()),
            None => required(&self.s3_bucket, S3_BUCKET).map(str::to_string),
        }
    }

    /// Configured queue name, falling back to the last segment of the queue URL
    pub fn queue_name(&self) -> Option<String> {
        present(&self.sqs_queue).map(str::to_string).or_else(|| {
            present(&self.sqs_queue_url)
                .and_then(|url| QueueUrl::new(url.to_string()).ok())
                .and_then(|url| url.queue_name())
        })
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("sqs_queue_url", &self.sqs_queue_url)
            .field("sqs_queue", &self.sqs_queue)
            .field("localstack_endpoint", &self.localstack_endpoint)
            .field("aws_default_region", &self.aws_default_region)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field(
                "aws_secret_access_key",
                &self.aws_secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("s3_bucket", &self.s3_bucket)
            .finish()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, ConfigurationError> {
    present(value).ok_or_else(|| ConfigurationError::Missing {
        key: key.to_string(),
    })
}
