//! Tests for retry policy module

use super::*;

// ============================================================================
// RetryPolicy Tests
// ============================================================================

#[test]
fn test_retry_policy_default_values() {
    let policy = RetryPolicy::default();

    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.poll_wait, Duration::from_secs(20));
    assert_eq!(policy.inter_attempt_delay, Duration::from_secs(2));
    assert_eq!(policy.visibility_timeout, None);
    assert!(policy.validate().is_ok());
}

#[test]
fn test_retry_policy_custom_values() {
    let policy = RetryPolicy::new(5, Duration::from_secs(1), Duration::from_millis(250))
        .unwrap()
        .with_visibility_timeout(Duration::ZERO);

    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.poll_wait, Duration::from_secs(1));
    assert_eq!(policy.inter_attempt_delay, Duration::from_millis(250));
    assert_eq!(policy.visibility_timeout, Some(Duration::ZERO));
}

#[test]
fn test_zero_attempts_is_rejected() {
    let result = RetryPolicy::new(0, Duration::from_secs(20), Duration::from_secs(2));

    match result {
        Err(ValidationError::OutOfRange { field, .. }) => assert_eq!(field, "max_attempts"),
        other => panic!("Expected OutOfRange, got: {:?}", other),
    }
}

#[test]
fn test_validate_catches_directly_built_policy() {
    let policy = RetryPolicy {
        max_attempts: 0,
        ..RetryPolicy::default()
    };

    assert!(policy.validate().is_err());
}

#[test]
fn test_receive_request_asks_for_single_message() {
    let request = RetryPolicy::default().receive_request();

    assert_eq!(request.max_messages, 1);
    assert_eq!(request.wait_time, Duration::from_secs(20));
    assert_eq!(request.visibility_timeout, None);
}

#[test]
fn test_receive_request_carries_visibility_timeout() {
    let request = RetryPolicy::default()
        .with_visibility_timeout(Duration::from_secs(45))
        .receive_request();

    assert_eq!(request.visibility_timeout, Some(Duration::from_secs(45)));
}

#[test]
fn test_worst_case_duration() {
    // 3 polls of 20s plus 2 pauses of 2s
    assert_eq!(
        RetryPolicy::default().worst_case_duration(),
        Duration::from_secs(64)
    );

    let single = RetryPolicy::new(1, Duration::from_secs(5), Duration::from_secs(9)).unwrap();
    assert_eq!(single.worst_case_duration(), Duration::from_secs(5));
}

#[test]
fn test_worst_case_duration_saturates() {
    let policy =
        RetryPolicy::new(u32::MAX, Duration::from_secs(u64::MAX), Duration::from_secs(2)).unwrap();

    assert_eq!(policy.worst_case_duration(), Duration::MAX);
}

// ============================================================================
// RetryState Tests
// ============================================================================

#[test]
fn test_retry_state_starts_at_first_attempt() {
    let state = RetryState::new();
    assert_eq!(state.attempt, 1);
}

#[test]
fn test_retry_state_stops_at_max_attempts() {
    let policy = RetryPolicy::default();
    let mut state = RetryState::new();

    assert!(state.can_retry(&policy));
    state.next_attempt();
    assert!(state.can_retry(&policy));
    state.next_attempt();
    assert_eq!(state.attempt, 3);
    assert!(!state.can_retry(&policy));
}

#[test]
fn test_single_attempt_policy_never_retries() {
    let policy = RetryPolicy::new(1, Duration::ZERO, Duration::ZERO).unwrap();
    assert!(!RetryState::new().can_retry(&policy));
}

#[test]
fn test_retry_state_delay_is_constant() {
    let policy = RetryPolicy::default();
    let mut state = RetryState::new();

    let first = state.get_delay(&policy);
    state.next_attempt();

    assert_eq!(first, Duration::from_secs(2));
    assert_eq!(state.get_delay(&policy), first);
}
