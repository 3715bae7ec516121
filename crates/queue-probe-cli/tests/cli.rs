//! End-to-end tests running the `queue-probe` binary.
//!
//! Service calls are answered by a `wiremock` server passed in as the
//! `LOCALSTACK_ENDPOINT` override.

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUEUE_URL: &str = "http://localhost:4566/000000000000/probe-queue";

/// Command with a clean environment so host settings cannot leak in
fn probe() -> Command {
    let mut command = Command::cargo_bin("queue-probe").unwrap();
    command.env_clear();
    command
}

fn probe_against(server: &MockServer) -> Command {
    let mut command = probe();
    command
        .env("SQS_QUEUE", "probe-queue")
        .env("SQS_QUEUE_URL", QUEUE_URL)
        .env("LOCALSTACK_ENDPOINT", server.uri())
        .env("AWS_DEFAULT_REGION", "us-east-1")
        .env("S3_BUCKET", "probe-bucket");
    command
}

async fn mount_send(server: &MockServer) {
    Mock::given(method("POST"))
        .and(body_string_contains("Action=SendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<SendMessageResponse><SendMessageResult>\
             <MessageId>m1</MessageId></SendMessageResult></SendMessageResponse>",
        ))
        .mount(server)
        .await;
}

#[test]
fn test_help_lists_commands() {
    probe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("roundtrip"))
        .stdout(predicate::str::contains("object"));
}

#[test]
fn test_missing_configuration_exits_with_config_code() {
    probe()
        .env("AWS_DEFAULT_REGION", "us-east-1")
        .args(["send", "--body", "hello"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("SQS_QUEUE_URL"));
}

#[test]
fn test_zero_attempts_exits_with_validation_code() {
    probe()
        .args(["receive", "--max-attempts", "0"])
        .assert()
        .code(2);
}

#[test]
fn test_config_file_supplies_settings() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("probe.toml");
    std::fs::write(&file, "aws_default_region = \"us-east-1\"\n").unwrap();

    // Region comes from the file; the bucket is still missing
    probe()
        .env("QUEUE_PROBE_CONFIG", &file)
        .args(["object", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("S3_BUCKET"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_send_prints_message_id() {
    let server = MockServer::start().await;
    mount_send(&server).await;

    probe_against(&server)
        .args(["send", "--body", "hello"])
        .assert()
        .success()
        .stdout("m1\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_roundtrip_prints_received_body() {
    let server = MockServer::start().await;
    mount_send(&server).await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=ReceiveMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ReceiveMessageResponse><ReceiveMessageResult><Message>\
             <MessageId>m1</MessageId><ReceiptHandle>r1</ReceiptHandle>\
             <Body>hello</Body></Message></ReceiveMessageResult></ReceiveMessageResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=DeleteMessage"))
        .and(body_string_contains("ReceiptHandle=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<DeleteMessageResponse/>"))
        .expect(1)
        .mount(&server)
        .await;

    probe_against(&server)
        .args(["roundtrip", "--body", "hello", "--poll-wait", "0"])
        .assert()
        .success()
        .stdout("hello\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_roundtrip_reports_exhausted_attempts() {
    let server = MockServer::start().await;
    mount_send(&server).await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=ReceiveMessage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<ReceiveMessageResponse><ReceiveMessageResult/></ReceiveMessageResponse>"),
        )
        .expect(2)
        .mount(&server)
        .await;

    probe_against(&server)
        .args([
            "roundtrip",
            "--max-attempts",
            "2",
            "--poll-wait",
            "0",
            "--delay",
            "0",
        ])
        .assert()
        .success()
        .stdout("no message received after 2 attempts\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_receive_failure_exits_with_transport_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "<ErrorResponse><Error><Code>AWS.SimpleQueueService.NonExistentQueue</Code>\
             <Message>The specified queue does not exist.</Message></Error></ErrorResponse>",
        ))
        .mount(&server)
        .await;

    probe_against(&server)
        .args(["receive", "--poll-wait", "0"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("receive failed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_object_get_prints_contents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/probe-bucket/go.mod"))
        .respond_with(ResponseTemplate::new(200).set_body_string("module example\n"))
        .mount(&server)
        .await;

    probe_against(&server)
        .args(["object", "get", "--key", "go.mod"])
        .assert()
        .success()
        .stdout("module example\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_object_list_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/other-bucket"))
        .and(query_param("list-type", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ListBucketResult><IsTruncated>false</IsTruncated>\
             <Contents><Key>go.mod</Key><Size>42</Size></Contents></ListBucketResult>",
        ))
        .mount(&server)
        .await;

    probe_against(&server)
        .args(["--format", "json", "object", "list", "--bucket", "other-bucket"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""key":"go.mod""#))
        .stdout(predicate::str::contains(r#""size":42"#));
}
