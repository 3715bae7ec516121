//! Round-trip client: publish one message, then receive and acknowledge one
//! message within a bounded number of long-poll attempts.
//!
//! The polling loop moves through these states, each logged as a `tracing`
//! event with the attempt number:
//!
//! ```text
//! Idle -> Polling -> Found -> Acknowledging -> Done
//!            |                     |
//!            v                     v
//!          Empty -> Polling      Failed
//!            |
//!            v
//!        Exhausted
//! ```
//!
//! Any provider error ends the loop at once. Errors are never retried; only
//! empty receives lead to another attempt.

use crate::client::QueueProvider;
use crate::error::{QueueError, ValidationError};
use crate::message::{MessageId, QueueUrl, ReceivedMessage};
use crate::provider::QueueEndpoint;
use crate::retry::{RetryPolicy, RetryState};
use std::time::Duration;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "roundtrip_tests.rs"]
mod tests;

/// Result of a receive-and-acknowledge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// A message was received and deleted from the queue
    Acknowledged {
        message: ReceivedMessage,
        /// Attempt (1-based) on which the message arrived
        attempts: u32,
    },

    /// Every attempt came back empty
    NotFound { attempts: u32 },
}

impl ReceiveOutcome {
    /// Number of receive attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Acknowledged { attempts, .. } | Self::NotFound { attempts } => *attempts,
        }
    }

    /// Consumed message, if any
    pub fn message(&self) -> Option<&ReceivedMessage> {
        match self {
            Self::Acknowledged { message, .. } => Some(message),
            Self::NotFound { .. } => None,
        }
    }
}

/// Queue client bound to a single queue
pub struct RetryingQueueClient {
    provider: Box<dyn QueueProvider>,
    queue: QueueUrl,
    queue_name: String,
}

impl RetryingQueueClient {
    /// Create a client for the endpoint's queue
    pub fn new(provider: Box<dyn QueueProvider>, endpoint: &QueueEndpoint) -> Self {
        let queue = endpoint.queue_url.clone();
        let queue_name = queue.queue_name().unwrap_or_default();
        Self {
            provider,
            queue,
            queue_name,
        }
    }

    /// Queue this client sends to and receives from
    pub fn queue(&self) -> &QueueUrl {
        &self.queue
    }

    /// Publish one message
    ///
    /// # Errors
    ///
    /// - `QueueError::Validation` if the body is empty or exceeds the provider limit
    /// - `QueueError::Transport` with operation `send` if the provider fails
    pub async fn send(&self, body: &str) -> Result<MessageId, QueueError> {
        if body.is_empty() {
            return Err(ValidationError::Required {
                field: "body".to_string(),
            }
            .into());
        }

        let limit = self.provider.provider_type().max_message_size();
        if body.len() > limit {
            return Err(ValidationError::OutOfRange {
                field: "body".to_string(),
                message: format!("{} bytes exceeds the {} byte limit", body.len(), limit),
            }
            .into());
        }

        let message_id = self.provider.send_message(&self.queue, body).await?;

        info!(
            queue = %self.queue_name,
            message_id = %message_id,
            bytes = body.len(),
            "Message sent"
        );
        Ok(message_id)
    }

    /// Receive one message and delete it, polling up to `policy.max_attempts` times
    ///
    /// An empty queue is not an error: exhausting every attempt returns
    /// `ReceiveOutcome::NotFound`.
    ///
    /// # Errors
    ///
    /// - `QueueError::Validation` if `policy.max_attempts` is zero
    /// - `QueueError::Transport` with operation `receive` or `delete` on the
    ///   first provider failure; no further calls are made
    pub async fn receive_and_acknowledge(
        &self,
        policy: &RetryPolicy,
    ) -> Result<ReceiveOutcome, QueueError> {
        policy.validate()?;

        let request = policy.receive_request();
        let mut retry_state = RetryState::new();
        debug!(
            queue = %self.queue_name,
            max_attempts = policy.max_attempts,
            worst_case_secs = policy.worst_case_duration().as_secs(),
            "Starting receive loop"
        );

        loop {
            let attempt = retry_state.attempt;
            debug!(
                queue = %self.queue_name,
                attempt,
                max_attempts = policy.max_attempts,
                wait_secs = policy.poll_wait.as_secs(),
                "Polling for message"
            );

            let messages = self.provider.receive_messages(&self.queue, &request).await?;

            if let Some(message) = messages.into_iter().next() {
                info!(
                    queue = %self.queue_name,
                    attempt,
                    message_id = %message.message_id,
                    "Message received, acknowledging"
                );

                if let Err(error) = self
                    .provider
                    .delete_message(&self.queue, &message.receipt_handle)
                    .await
                {
                    warn!(
                        queue = %self.queue_name,
                        attempt,
                        message_id = %message.message_id,
                        error = %error,
                        "Acknowledgement failed"
                    );
                    return Err(error);
                }

                info!(
                    queue = %self.queue_name,
                    attempt,
                    message_id = %message.message_id,
                    "Message acknowledged"
                );
                return Ok(ReceiveOutcome::Acknowledged {
                    message,
                    attempts: attempt,
                });
            }

            if !retry_state.can_retry(policy) {
                warn!(
                    queue = %self.queue_name,
                    attempts = attempt,
                    "No message received, attempts exhausted"
                );
                return Ok(ReceiveOutcome::NotFound { attempts: attempt });
            }

            let delay = retry_state.get_delay(policy);
            info!(
                queue = %self.queue_name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "No message received, retrying"
            );
            tokio::time::sleep(delay).await;
            retry_state.next_attempt();
        }
    }

    /// `receive_and_acknowledge` bounded by an overall deadline
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Timeout` if the deadline passes first. A message
    /// received but not yet deleted at that point returns to the queue once
    /// its visibility timeout expires.
    pub async fn receive_and_acknowledge_within(
        &self,
        policy: &RetryPolicy,
        deadline: Duration,
    ) -> Result<ReceiveOutcome, QueueError> {
        match tokio::time::timeout(deadline, self.receive_and_acknowledge(policy)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    queue = %self.queue_name,
                    deadline_ms = deadline.as_millis() as u64,
                    "Receive deadline elapsed"
                );
                Err(QueueError::Timeout { duration: deadline })
            }
        }
    }

    /// Send `body`, then receive and acknowledge one message
    ///
    /// The message consumed is whichever the queue delivers first; on a
    /// shared queue it need not be the one just sent.
    pub async fn round_trip(
        &self,
        body: &str,
        policy: &RetryPolicy,
    ) -> Result<(MessageId, ReceiveOutcome), QueueError> {
        policy.validate()?;
        let message_id = self.send(body).await?;
        let outcome = self.receive_and_acknowledge(policy).await?;
        Ok((message_id, outcome))
    }
}

impl std::fmt::Debug for RetryingQueueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingQueueClient")
            .field("queue", &self.queue.as_str())
            .field("provider", &self.provider.provider_type())
            .finish()
    }
}
