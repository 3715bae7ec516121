//! Tests for message types and identifiers.

use super::*;

mod queue_url_tests {
    use super::*;

    #[test]
    fn test_valid_queue_urls() {
        assert!(QueueUrl::new("http://localhost:4566/000000000000/orders".to_string()).is_ok());
        assert!(QueueUrl::new(
            "https://sqs.us-east-1.amazonaws.com/123456789012/orders.fifo".to_string()
        )
        .is_ok());
    }

    #[test]
    fn test_empty_queue_url_is_required() {
        match QueueUrl::new("   ".to_string()) {
            Err(ValidationError::Required { field }) => assert_eq!(field, "queue_url"),
            other => panic!("Expected Required error, got: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_queue_urls() {
        assert!(matches!(
            QueueUrl::new("orders".to_string()),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            QueueUrl::new("ftp://localhost/orders".to_string()),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_queue_name_from_url() {
        let url: QueueUrl = "http://localhost:4566/000000000000/orders".parse().unwrap();
        assert_eq!(url.queue_name().as_deref(), Some("orders"));

        let trailing: QueueUrl = "http://localhost:4566/000000000000/orders/".parse().unwrap();
        assert_eq!(trailing.queue_name().as_deref(), Some("orders"));

        let bare: QueueUrl = "http://localhost:4566".parse().unwrap();
        assert_eq!(bare.queue_name(), None);
    }
}

mod identifier_tests {
    use super::*;

    #[test]
    fn test_message_id_generation() {
        let id1 = MessageId::new();
        let id2 = MessageId::new();
        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_message_id_parsing() {
        let id: MessageId = "5fea7756-0ea4-451a-a703-a558b933e274".parse().unwrap();
        assert_eq!(id.as_str(), "5fea7756-0ea4-451a-a703-a558b933e274");
        assert!("".parse::<MessageId>().is_err());
    }

    #[test]
    fn test_receipt_handle_requires_value() {
        assert!(ReceiptHandle::new(String::new()).is_err());
        let receipt = ReceiptHandle::new("r1".to_string()).unwrap();
        assert_eq!(receipt.as_str(), "r1");
        assert_eq!(receipt.to_string(), "r1");
    }
}

mod receive_request_tests {
    use super::*;

    #[test]
    fn test_receive_request_defaults() {
        let request = ReceiveRequest::default();
        assert_eq!(request.max_messages, 1);
        assert_eq!(request.wait_time, Duration::ZERO);
        assert_eq!(request.visibility_timeout, None);
    }

    #[test]
    fn test_receive_request_builder() {
        let request = ReceiveRequest::new()
            .with_max_messages(5)
            .with_wait_time(Duration::from_secs(20))
            .with_visibility_timeout(Duration::from_secs(0));

        assert_eq!(request.max_messages, 5);
        assert_eq!(request.wait_time, Duration::from_secs(20));
        assert_eq!(request.visibility_timeout, Some(Duration::ZERO));
    }
}

#[test]
fn test_received_message_builder() {
    let message = ReceivedMessage::new(
        "m1".parse().unwrap(),
        "hello".to_string(),
        "r1".parse().unwrap(),
    )
    .with_receive_count(2);

    assert_eq!(message.body, "hello");
    assert_eq!(message.receipt_handle.as_str(), "r1");
    assert_eq!(message.receive_count, Some(2));
}
