//! # Queue-Probe CLI
//!
//! Command-line interface for exercising SQS and S3 compatible services.
//!
//! This module provides CLI commands for:
//! - Sending a message and consuming it back (`roundtrip`)
//! - Sending or consuming a single message (`send`, `receive`)
//! - Fetching and listing objects (`object get`, `object list`)
//!
//! Command output goes to stdout; logs go to stderr.

use clap::{Args, CommandFactory, Parser, Subcommand};
use queue_probe::{
    ConfigurationError, ObjectSummary, QueueClientFactory, QueueError, ReceiveOutcome,
    RetryPolicy, RetryingQueueClient, Settings, ValidationError,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Body sent by `roundtrip` when none is given
pub const DEFAULT_BODY: &str = "Hello, we are using SQS in LocalStack!";

// ============================================================================
// CLI Structure
// ============================================================================

/// Queue-Probe CLI - round-trip checks against SQS and S3 compatible services
#[derive(Parser)]
#[command(name = "queue-probe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Round-trip probe for SQS and S3 compatible services")]
#[command(
    long_about = "Queue-Probe sends a message to a queue and consumes it back with bounded long-poll retries, and reads objects from a bucket"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "QUEUE_PROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Send a message, then receive and acknowledge one
    Roundtrip {
        /// Message body to send
        #[arg(short, long, default_value = DEFAULT_BODY)]
        body: String,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Overall limit for the receive phase in seconds
        #[arg(long)]
        deadline: Option<u64>,
    },

    /// Send a single message
    Send {
        /// Message body to send
        #[arg(short, long)]
        body: String,
    },

    /// Receive and acknowledge a single message
    Receive {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Overall limit in seconds
        #[arg(long)]
        deadline: Option<u64>,
    },

    /// Object storage commands
    Object {
        #[command(subcommand)]
        action: ObjectCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Object storage subcommands
#[derive(Subcommand)]
pub enum ObjectCommands {
    /// Write an object's contents to stdout
    Get {
        /// Object key
        #[arg(short, long)]
        key: String,

        /// Bucket (defaults to S3_BUCKET)
        #[arg(short, long)]
        bucket: Option<String>,
    },

    /// List the objects in a bucket
    List {
        /// Bucket (defaults to S3_BUCKET)
        #[arg(short, long)]
        bucket: Option<String>,
    },
}

/// Polling policy flags shared by `roundtrip` and `receive`
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PolicyArgs {
    /// Maximum number of receive attempts
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Long-poll wait per attempt in seconds
    #[arg(long, default_value_t = 20)]
    pub poll_wait: u64,

    /// Pause between empty attempts in seconds
    #[arg(long, default_value_t = 2)]
    pub delay: u64,

    /// Visibility timeout for the received message in seconds
    #[arg(long)]
    pub visibility_timeout: Option<u64>,
}

impl PolicyArgs {
    pub fn to_policy(&self) -> Result<RetryPolicy, ValidationError> {
        let policy = RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.poll_wait),
            Duration::from_secs(self.delay),
        )?;
        Ok(match self.visibility_timeout {
            Some(secs) => policy.with_visibility_timeout(Duration::from_secs(secs)),
            None => policy,
        })
    }
}

/// Output format options
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Queue(QueueError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<QueueError> for CliError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Configuration(e) => Self::Configuration(e),
            QueueError::Validation(e) => Self::Validation(e),
            other => Self::Queue(other),
        }
    }
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Validation(_) | Self::InvalidArgument { .. } => 2,
            Self::Queue(QueueError::Timeout { .. }) => 4,
            Self::Queue(_) => 3,
            Self::Io(_) => 5,
        }
    }
}

// ============================================================================
// Command Output
// ============================================================================

/// Result of a command, rendered as text or JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutput {
    Sent {
        message_id: String,
    },
    Received {
        #[serde(skip_serializing_if = "Option::is_none")]
        sent_message_id: Option<String>,
        message_id: String,
        body: String,
        attempts: u32,
    },
    NotReceived {
        #[serde(skip_serializing_if = "Option::is_none")]
        sent_message_id: Option<String>,
        attempts: u32,
    },
    Object {
        bucket: String,
        key: String,
        size: usize,
        /// Lossy UTF-8 in JSON output; raw bytes in text output
        #[serde(serialize_with = "serialize_lossy")]
        content: Vec<u8>,
    },
    Objects {
        bucket: String,
        objects: Vec<ObjectEntry>,
    },
}

/// Object listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

impl From<ObjectSummary> for ObjectEntry {
    fn from(summary: ObjectSummary) -> Self {
        Self {
            key: summary.key,
            size: summary.size,
        }
    }
}

impl CommandOutput {
    fn from_outcome(outcome: ReceiveOutcome, sent_message_id: Option<String>) -> Self {
        match outcome {
            ReceiveOutcome::Acknowledged { message, attempts } => Self::Received {
                sent_message_id,
                message_id: message.message_id.to_string(),
                body: message.body,
                attempts,
            },
            ReceiveOutcome::NotFound { attempts } => Self::NotReceived {
                sent_message_id,
                attempts,
            },
        }
    }

    /// Write the output in the requested format
    pub fn render(&self, format: &OutputFormat, out: &mut dyn Write) -> std::io::Result<()> {
        match format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, self)?;
                writeln!(out)
            }
            OutputFormat::Text => match self {
                Self::Sent { message_id } => writeln!(out, "{}", message_id),
                Self::Received { body, .. } => writeln!(out, "{}", body),
                Self::NotReceived { attempts, .. } => {
                    writeln!(out, "no message received after {} attempts", attempts)
                }
                Self::Object { content, .. } => out.write_all(content),
                Self::Objects { objects, .. } => {
                    for object in objects {
                        writeln!(out, "{}\t{}", object.key, object.size)?;
                    }
                    Ok(())
                }
            },
        }
    }
}

fn serialize_lossy<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    // Initialize logging
    initialize_logging(&cli)?;

    let mut stdout = std::io::stdout().lock();
    run(cli, &mut stdout).await
}

/// Execute a parsed command line, writing command output to `out`
pub async fn run(cli: Cli, out: &mut dyn Write) -> Result<(), CliError> {
    let output = match cli.command {
        Commands::Completions { shell } => return execute_completions_command(shell, out),
        Commands::Roundtrip {
            body,
            policy,
            deadline,
        } => {
            let policy = policy.to_policy()?;
            let settings = load_configuration(cli.config.as_ref())?;
            execute_roundtrip_command(&settings, &body, &policy, deadline).await?
        }
        Commands::Send { body } => {
            let settings = load_configuration(cli.config.as_ref())?;
            execute_send_command(&settings, &body).await?
        }
        Commands::Receive { policy, deadline } => {
            let policy = policy.to_policy()?;
            let settings = load_configuration(cli.config.as_ref())?;
            execute_receive_command(&settings, &policy, deadline).await?
        }
        Commands::Object { action } => {
            let settings = load_configuration(cli.config.as_ref())?;
            execute_object_command(&settings, action).await?
        }
    };

    output.render(&cli.format, out)?;
    out.flush()?;
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Initialize logging based on CLI arguments
///
/// `RUST_LOG` takes precedence over `--log-level`.
pub fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .map_err(|e| CliError::InvalidArgument {
            arg: "log-level".to_string(),
            message: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::InvalidArgument {
        arg: "log-level".to_string(),
        message: e.to_string(),
    })
}

/// Load settings from the optional file and the environment
fn load_configuration(config_path: Option<&PathBuf>) -> Result<Settings, CliError> {
    let settings = Settings::load(config_path.map(PathBuf::as_path))?;
    debug!(settings = ?settings, "Configuration loaded");
    Ok(settings)
}

fn queue_client(settings: &Settings) -> Result<RetryingQueueClient, CliError> {
    let endpoint = settings.queue_endpoint()?;
    let provider = QueueClientFactory::create_provider(&endpoint)?;
    let queue_name = settings.queue_name().unwrap_or_default();

    info!(
        queue = %queue_name,
        queue_url = %endpoint.queue_url,
        region = %endpoint.service.region,
        endpoint = endpoint.service.endpoint_url.as_ref().map(|u| u.as_str()).unwrap_or("aws"),
        "Using queue"
    );
    Ok(RetryingQueueClient::new(provider, &endpoint))
}

async fn receive(
    client: &RetryingQueueClient,
    policy: &RetryPolicy,
    deadline: Option<u64>,
) -> Result<ReceiveOutcome, QueueError> {
    match deadline {
        Some(secs) => {
            client
                .receive_and_acknowledge_within(policy, Duration::from_secs(secs))
                .await
        }
        None => client.receive_and_acknowledge(policy).await,
    }
}

/// Execute roundtrip command
async fn execute_roundtrip_command(
    settings: &Settings,
    body: &str,
    policy: &RetryPolicy,
    deadline: Option<u64>,
) -> Result<CommandOutput, CliError> {
    let client = queue_client(settings)?;

    let message_id = client.send(body).await?;
    let outcome = receive(&client, policy, deadline).await?;

    Ok(CommandOutput::from_outcome(
        outcome,
        Some(message_id.to_string()),
    ))
}

/// Execute send command
async fn execute_send_command(settings: &Settings, body: &str) -> Result<CommandOutput, CliError> {
    let client = queue_client(settings)?;
    let message_id = client.send(body).await?;

    Ok(CommandOutput::Sent {
        message_id: message_id.to_string(),
    })
}

/// Execute receive command
async fn execute_receive_command(
    settings: &Settings,
    policy: &RetryPolicy,
    deadline: Option<u64>,
) -> Result<CommandOutput, CliError> {
    let client = queue_client(settings)?;
    let outcome = receive(&client, policy, deadline).await?;

    Ok(CommandOutput::from_outcome(outcome, None))
}

/// Execute object command
async fn execute_object_command(
    settings: &Settings,
    action: ObjectCommands,
) -> Result<CommandOutput, CliError> {
    let store = QueueClientFactory::create_object_store(&settings.service_endpoint()?)?;

    match action {
        ObjectCommands::Get { key, bucket } => {
            let bucket = settings.bucket(bucket.as_deref())?;
            info!(bucket = %bucket, key = %key, "Fetching object");

            let content = store.get_object(&bucket, &key).await?;
            Ok(CommandOutput::Object {
                bucket,
                key,
                size: content.len(),
                content: content.to_vec(),
            })
        }
        ObjectCommands::List { bucket } => {
            let bucket = settings.bucket(bucket.as_deref())?;
            info!(bucket = %bucket, "Listing objects");

            let objects = store.list_objects(&bucket).await?;
            Ok(CommandOutput::Objects {
                bucket,
                objects: objects.into_iter().map(ObjectEntry::from).collect(),
            })
        }
    }
}

/// Execute completions command
fn execute_completions_command(
    shell: clap_complete::Shell,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    debug!(shell = ?shell, "Generating shell completions");

    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "queue-probe", out);
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
