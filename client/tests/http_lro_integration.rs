use claims::{assert_err, assert_ok};
use client::builder::{ClientBuilder, ClientConfig, LroOptions, ServiceClient};
use client::common::ClientError;
use client::http::CancelRoute;
use client::model::OperationStatus;
use mockito::{Server, ServerGuard};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize, PartialEq)]
struct Resource {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

fn client_for(server: &ServerGuard) -> ServiceClient {
    assert_ok!(ClientBuilder::new(ClientConfig::new(server.url())).build())
}

fn fast_polling() -> LroOptions {
    LroOptions {
        poll_interval: Some(Duration::from_millis(10)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_put_with_async_operation_reads_original_uri() {
    let mut server = Server::new_async().await;
    let monitor = format!("{}/operations/1", server.url());

    server
        .mock("PUT", "/vaults/v1")
        .with_status(201)
        .with_header("azure-asyncoperation", &monitor)
        .with_body(r#"{"name":"v1","properties":{"provisioningState":"Creating"}}"#)
        .create_async()
        .await;
    let running = server
        .mock("GET", "/operations/1")
        .with_status(200)
        .with_body(r#"{"status":"InProgress"}"#)
        .expect(1)
        .create_async()
        .await;
    let done = server
        .mock("GET", "/operations/1")
        .with_status(200)
        .with_body(r#"{"status":"Succeeded"}"#)
        .expect(1)
        .create_async()
        .await;
    let resource = server
        .mock("GET", "/vaults/v1")
        .with_status(200)
        .with_body(r#"{"name":"v1","properties":{"provisioningState":"Succeeded"}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let mut poller = assert_ok!(
        client
            .begin::<Resource>(
                Method::PUT,
                "vaults/v1",
                Some(json!({"location": "westeurope"})),
                fast_polling(),
            )
            .await
    );
    assert_eq!(poller.status(), OperationStatus::InProgress);
    assert_eq!(poller.context().poll_url.as_deref(), Some(monitor.as_str()));

    let vault = assert_ok!(
        poller
            .wait_for_completion(Duration::from_millis(10), WAIT_TIMEOUT)
            .await
    );

    assert_eq!(vault.name.as_deref(), Some("v1"));
    assert_eq!(poller.poll_count(), 2);
    running.assert_async().await;
    done.assert_async().await;
    resource.assert_async().await;
}

#[tokio::test]
async fn test_post_with_location_returns_final_body() {
    let mut server = Server::new_async().await;
    let location = format!("{}/results/9", server.url());

    server
        .mock("POST", "/jobs")
        .with_status(202)
        .with_header("location", &location)
        .with_header("retry-after", "0")
        .create_async()
        .await;
    server
        .mock("GET", "/results/9")
        .with_status(202)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/results/9")
        .with_status(200)
        .with_body(r#"{"id":"42"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut poller = assert_ok!(
        client_for(&server)
            .begin::<Resource>(Method::POST, "jobs", None, fast_polling())
            .await
    );
    let result = assert_ok!(
        poller
            .wait_for_completion(Duration::from_millis(10), WAIT_TIMEOUT)
            .await
    );

    assert_eq!(result.id.as_deref(), Some("42"));
    assert_eq!(poller.status(), OperationStatus::Succeeded);
}

#[tokio::test]
async fn test_synchronous_completion_needs_no_polling() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/vaults/v3")
        .with_status(200)
        .with_body(r#"{"name":"v3"}"#)
        .create_async()
        .await;
    let never = server
        .mock("GET", "/vaults/v3")
        .expect(0)
        .create_async()
        .await;

    let mut poller = assert_ok!(
        client_for(&server)
            .begin::<Resource>(Method::PUT, "vaults/v3", Some(json!({})), fast_polling())
            .await
    );
    assert!(poller.is_done());

    let vault = assert_ok!(poller.result().await);
    assert_eq!(vault.name.as_deref(), Some("v3"));
    never.assert_async().await;
}

#[tokio::test]
async fn test_failed_operation_carries_service_error() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/vaults/v2")
        .with_status(202)
        .with_header("operation-location", &format!("{}/operations/2", server.url()))
        .create_async()
        .await;
    server
        .mock("GET", "/operations/2")
        .with_status(200)
        .with_body(
            r#"{"id":"op-2","status":"Failed","error":{"code":"Conflict","message":"Vault is locked"}}"#,
        )
        .create_async()
        .await;

    let mut poller = assert_ok!(
        client_for(&server)
            .begin::<serde_json::Value>(Method::DELETE, "vaults/v2", None, fast_polling())
            .await
    );
    let error = assert_err!(
        poller
            .wait_for_completion(Duration::from_millis(10), WAIT_TIMEOUT)
            .await
    );

    match error {
        ClientError::OperationFailed {
            operation_id,
            error_detail,
        } => {
            assert_eq!(operation_id.as_deref(), Some("op-2"));
            assert_eq!(error_detail.code, "Conflict");
            assert_eq!(error_detail.message, "Vault is locked");
        }
        other => panic!("Expected OperationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_poll_request_keeps_operation_running() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/jobs")
        .with_status(202)
        .with_header("operation-location", &format!("{}/operations/4", server.url()))
        .create_async()
        .await;
    server
        .mock("GET", "/operations/4")
        .with_status(503)
        .with_body(r#"{"error":{"code":"ServiceUnavailable","message":"try later"}}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/operations/4")
        .with_status(200)
        .with_body(r#"{"status":"Succeeded","result":{"id":"7"}}"#)
        .expect(1)
        .create_async()
        .await;

    let mut poller = assert_ok!(
        client_for(&server)
            .begin::<Resource>(Method::POST, "jobs", None, fast_polling())
            .await
    );

    let error = assert_err!(poller.poll().await);
    assert_eq!(error.status_code(), Some(503));
    assert_eq!(poller.status(), OperationStatus::InProgress);

    let response = assert_ok!(poller.poll().await);
    assert_eq!(response.status, OperationStatus::Succeeded);
    assert_eq!(assert_ok!(poller.result().await).id.as_deref(), Some("7"));
}

#[tokio::test]
async fn test_cancel_through_status_monitor() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/jobs")
        .with_status(202)
        .with_header("operation-location", &format!("{}/operations/3", server.url()))
        .create_async()
        .await;
    let cancel = server
        .mock("POST", "/operations/3:cancel")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let options = LroOptions {
        cancel: Some(CancelRoute::PollUrlSuffix(":cancel".into())),
        ..fast_polling()
    };
    let mut poller = assert_ok!(
        client_for(&server)
            .begin::<Resource>(Method::POST, "jobs", None, options)
            .await
    );

    assert!(poller.supports_cancel());
    assert_ok!(poller.cancel().await);
    assert_eq!(poller.status(), OperationStatus::Cancelled);
    cancel.assert_async().await;
}

#[tokio::test]
async fn test_cancel_without_route_stops_local_polling() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/jobs")
        .with_status(202)
        .with_header("operation-location", &format!("{}/operations/5", server.url()))
        .create_async()
        .await;
    let polls = server
        .mock("GET", "/operations/5")
        .with_status(200)
        .with_body(r#"{"status":"Running"}"#)
        .expect(0)
        .create_async()
        .await;

    let mut poller = assert_ok!(
        client_for(&server)
            .begin::<Resource>(Method::POST, "jobs", None, fast_polling())
            .await
    );

    let error = assert_err!(poller.cancel().await);
    assert!(matches!(error, ClientError::CancellationUnsupported { .. }));

    let error = assert_err!(
        poller
            .wait_for_completion(Duration::from_millis(10), WAIT_TIMEOUT)
            .await
    );
    assert!(matches!(error, ClientError::OperationCancelled { .. }));
    polls.assert_async().await;
}
