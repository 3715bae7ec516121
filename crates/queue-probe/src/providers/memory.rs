//! In-memory queue provider implementation for testing and development.
//!
//! This module provides a process-local queue that:
//! - Hides received messages for their visibility timeout
//! - Returns undeleted messages to the queue once the timeout expires
//! - Honors long-poll waits by parking receivers until a send arrives
//!
//! Time is measured with `tokio::time::Instant` so tests can pause the clock.

use crate::client::QueueProvider;
use crate::error::{Operation, QueueError, TransportError};
use crate::message::{MessageId, QueueUrl, ReceiptHandle, ReceiveRequest, ReceivedMessage};
use crate::provider::ProviderType;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// In-memory provider configuration
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    pub max_queue_size: usize,
    /// Applied when a receive request carries no visibility timeout
    pub default_visibility_timeout: Duration,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10000,
            default_visibility_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Internal Storage Structures
// ============================================================================

#[derive(Clone)]
struct StoredMessage {
    message_id: MessageId,
    body: String,
    receive_count: u32,
}

struct InFlightMessage {
    message: StoredMessage,
    visible_at: Instant,
}

#[derive(Default)]
struct InMemoryQueue {
    ready: VecDeque<StoredMessage>,
    in_flight: HashMap<String, InFlightMessage>,
}

impl InMemoryQueue {
    fn len(&self) -> usize {
        self.ready.len() + self.in_flight.len()
    }

    /// Move in-flight messages whose visibility timeout elapsed back to the front
    fn release_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, m)| m.visible_at <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(in_flight) = self.in_flight.remove(&receipt) {
                self.ready.push_front(in_flight.message);
            }
        }
    }

    /// Earliest instant at which an in-flight message becomes visible again
    fn next_visible_at(&self) -> Option<Instant> {
        self.in_flight.values().map(|m| m.visible_at).min()
    }
}

// ============================================================================
// InMemoryProvider
// ============================================================================

/// In-memory queue provider implementation
pub struct InMemoryProvider {
    queues: Arc<Mutex<HashMap<QueueUrl, InMemoryQueue>>>,
    arrivals: Arc<Notify>,
    config: InMemoryConfig,
}

impl InMemoryProvider {
    /// Create new in-memory provider with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            arrivals: Arc::new(Notify::new()),
            config,
        }
    }

    /// Number of messages held for a queue, visible or in flight
    pub fn queue_depth(&self, queue: &QueueUrl) -> usize {
        self.lock().get(queue).map(InMemoryQueue::len).unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueueUrl, InMemoryQueue>> {
        // A panic while holding the lock cannot leave a queue half-updated
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take up to `max` visible messages, or report when to look again
    fn try_receive(
        &self,
        queue: &QueueUrl,
        max: usize,
        visibility: Duration,
    ) -> (Vec<ReceivedMessage>, Option<Instant>) {
        let now = Instant::now();
        let mut queues = self.lock();
        let state = queues.entry(queue.clone()).or_default();
        state.release_expired(now);

        let mut delivered = Vec::new();
        while delivered.len() < max {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            message.receive_count += 1;

            let receipt = ReceiptHandle::generate();
            let received = ReceivedMessage::new(
                message.message_id.clone(),
                message.body.clone(),
                receipt.clone(),
            )
            .with_receive_count(message.receive_count);

            state.in_flight.insert(
                receipt.as_str().to_string(),
                InFlightMessage {
                    message,
                    visible_at: instant_after(now, visibility),
                },
            );
            delivered.push(received);
        }

        (delivered, state.next_visible_at())
    }
}

/// Roughly thirty years; stands in for durations the clock cannot represent
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn instant_after(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE)
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl QueueProvider for InMemoryProvider {
    async fn send_message(&self, queue: &QueueUrl, body: &str) -> Result<MessageId, QueueError> {
        let message_id = MessageId::new();
        {
            let mut queues = self.lock();
            let state = queues.entry(queue.clone()).or_default();
            if state.len() >= self.config.max_queue_size {
                return Err(QueueError::transport(
                    Operation::Send,
                    TransportError::Service {
                        status: 403,
                        code: "OverLimit".to_string(),
                        message: format!(
                            "Queue holds the maximum of {} messages",
                            self.config.max_queue_size
                        ),
                    },
                ));
            }
            state.ready.push_back(StoredMessage {
                message_id: message_id.clone(),
                body: body.to_string(),
                receive_count: 0,
            });
        }

        debug!(queue = %queue, message_id = %message_id, "Stored message");
        self.arrivals.notify_waiters();
        Ok(message_id)
    }

    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let max = request
            .max_messages
            .clamp(1, ProviderType::InMemory.max_receive_batch()) as usize;
        let visibility = request
            .visibility_timeout
            .unwrap_or(self.config.default_visibility_timeout);
        let deadline = instant_after(Instant::now(), request.wait_time);

        loop {
            // Register interest before checking so a send in between is not missed
            let arrival = self.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            let (messages, next_visible) = self.try_receive(queue, max, visibility);
            if !messages.is_empty() {
                return Ok(messages);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }

            let wake_at = next_visible
                .filter(|at| *at < deadline)
                .unwrap_or(deadline);
            // Either an arrival or the wake-up instant ends the wait
            let _ = tokio::time::timeout_at(wake_at, arrival).await;
        }
    }

    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError> {
        let mut queues = self.lock();
        let removed = queues
            .get_mut(queue)
            .and_then(|state| state.in_flight.remove(receipt.as_str()));

        match removed {
            Some(in_flight) => {
                debug!(queue = %queue, message_id = %in_flight.message.message_id, "Deleted message");
                Ok(())
            }
            None => Err(QueueError::transport(
                Operation::Delete,
                TransportError::InvalidReceipt(receipt.as_str().to_string()),
            )),
        }
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
