//! # Retry Policy Module
//!
//! Bounded polling policy for receiving a message: a fixed number of
//! long-poll attempts separated by a constant delay.

use crate::error::ValidationError;
use crate::message::ReceiveRequest;
use std::time::Duration;

/// Polling policy for `receive_and_acknowledge`
///
/// # Examples
///
/// ```rust
/// use queue_probe::RetryPolicy;
/// use std::time::Duration;
///
/// // Default policy: 3 attempts, 20s long poll, 2s between attempts
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
///
/// // Custom policy
/// let policy = RetryPolicy::new(5, Duration::from_secs(1), Duration::from_millis(500)).unwrap();
/// assert_eq!(policy.poll_wait, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of receive attempts (at least 1)
    pub max_attempts: u32,

    /// Long-poll wait requested from the service on each attempt
    pub poll_wait: Duration,

    /// Client-side pause after an empty attempt, before the next one
    pub inter_attempt_delay: Duration,

    /// Visibility timeout for received messages; `None` keeps the queue default
    pub visibility_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            poll_wait: Duration::from_secs(20),
            inter_attempt_delay: Duration::from_secs(2),
            visibility_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::OutOfRange` when `max_attempts` is zero.
    pub fn new(
        max_attempts: u32,
        poll_wait: Duration,
        inter_attempt_delay: Duration,
    ) -> Result<Self, ValidationError> {
        let policy = Self {
            max_attempts,
            poll_wait,
            inter_attempt_delay,
            visibility_timeout: None,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Override the visibility timeout of received messages
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = Some(timeout);
        self
    }

    /// Check the policy invariants
    ///
    /// Fields are public, so callers that build the struct directly are
    /// checked again before the loop starts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::OutOfRange {
                field: "max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Receive parameters for a single attempt
    pub fn receive_request(&self) -> ReceiveRequest {
        let request = ReceiveRequest::new()
            .with_max_messages(1)
            .with_wait_time(self.poll_wait);
        match self.visibility_timeout {
            Some(timeout) => request.with_visibility_timeout(timeout),
            None => request,
        }
    }

    /// Upper bound on the time the loop spends waiting, ignoring call latency
    ///
    /// Saturates at `Duration::MAX` for policies too long to represent.
    pub fn worst_case_duration(&self) -> Duration {
        let polls = self.poll_wait.saturating_mul(self.max_attempts);
        let pauses = self
            .inter_attempt_delay
            .saturating_mul(self.max_attempts.saturating_sub(1));
        polls.saturating_add(pauses)
    }
}

/// State tracker for a polling loop
///
/// Attempts are numbered from 1; the number reported in outcomes is the
/// attempt that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    /// Current attempt (1-based)
    pub attempt: u32,
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryState {
    /// Create new state positioned at the first attempt
    pub fn new() -> Self {
        Self { attempt: 1 }
    }

    /// Advance to the next attempt
    pub fn next_attempt(&mut self) {
        self.attempt += 1;
    }

    /// Check if another attempt is allowed after the current one
    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        self.attempt < policy.max_attempts
    }

    /// Delay to apply before the next attempt
    pub fn get_delay(&self, policy: &RetryPolicy) -> Duration {
        policy.inter_attempt_delay
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
