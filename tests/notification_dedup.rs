//! Failure notifications: dedup while visible, grace-window reset, markup escaping.

mod common;

use common::{json, ScriptedTransport};
use serde_json::json as j;
use service_request::notify::InMemoryNotifier;
use service_request::{ErrorKind, FlatRequestClient, RequestDescriptor};
use std::sync::Arc;
use std::time::Duration;

fn client_with(
    transport: Arc<ScriptedTransport>,
    notifier: Arc<InMemoryNotifier>,
    grace: Duration,
) -> FlatRequestClient {
    common::builder(transport)
        .with_notifier(notifier)
        .notification_grace_window(grace)
        .build_flat()
        .unwrap()
}

#[tokio::test]
async fn test_concurrent_identical_failures_notify_once() {
    let transport = ScriptedTransport::new(vec![json(400, j!({"code": 1001, "msg": "quota exceeded"}))]);
    let notifier = Arc::new(InMemoryNotifier::new());
    let client = client_with(transport, notifier.clone(), Duration::from_millis(50));

    let (a, b) = tokio::join!(
        client.request(RequestDescriptor::post("/v2/jobs")),
        client.request(RequestDescriptor::post("/v2/jobs")),
    );

    assert_eq!(a.error.unwrap().kind(), ErrorKind::BackendRejected);
    assert_eq!(b.error.unwrap().message(), "quota exceeded");
    assert_eq!(notifier.shown().len(), 1);
    assert_eq!(client.coordinator().notifications().len(), 1);
}

#[tokio::test]
async fn test_new_notification_after_dismiss_and_grace() {
    let transport = ScriptedTransport::new(vec![json(400, j!({"code": 1001, "msg": "quota exceeded"}))]);
    let notifier = Arc::new(InMemoryNotifier::new());
    let client = client_with(transport, notifier.clone(), Duration::from_millis(50));

    client.request(RequestDescriptor::post("/v2/jobs")).await;
    client.request(RequestDescriptor::post("/v2/jobs")).await;
    assert_eq!(notifier.shown().len(), 1, "still visible");

    notifier.dismiss_all();
    tokio::time::sleep(Duration::from_millis(80)).await;

    client.request(RequestDescriptor::post("/v2/jobs")).await;
    assert_eq!(notifier.shown().len(), 2);
    assert_eq!(notifier.visible_count(), 1);
}

#[tokio::test]
async fn test_distinct_messages_each_notified() {
    let transport = ScriptedTransport::new(vec![
        json(400, j!({"code": 1, "msg": "first"})),
        json(400, j!({"code": 2, "msg": "second"})),
    ]);
    let notifier = Arc::new(InMemoryNotifier::new());
    let client = client_with(transport, notifier.clone(), Duration::from_secs(5));

    client.request(RequestDescriptor::post("/v2/jobs")).await;
    client.request(RequestDescriptor::post("/v2/jobs")).await;

    let shown = notifier.shown();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[0].message, "Request failed");
}

#[tokio::test]
async fn test_report_is_escaped() {
    let transport = ScriptedTransport::new(vec![json(
        422,
        j!({"code": 42, "msg": "<script>alert('x')</script>"}),
    )]);
    let notifier = Arc::new(InMemoryNotifier::new());
    let client = client_with(transport, notifier.clone(), Duration::from_secs(5));

    let out = client
        .request(RequestDescriptor::post("/v2/users").query("q", "<b>"))
        .await;
    let err = out.error.unwrap();

    let report = err.to_report_message();
    assert!(!report.contains("<script>"));
    assert!(report.contains("&lt;script&gt;"));
    assert!(report.contains("at status (422 unknown-422)"));
    assert!(report.contains("at settle (/api/v2/users?q=%3Cb%3E)"));

    let content = notifier.shown()[0].content.clone().unwrap();
    assert!(!content.contains("<script>"));
    assert!(content.starts_with("<p>&lt;script&gt;"));
    assert_eq!(content.matches("<p>").count(), 3);
}

#[tokio::test]
async fn test_silenced_request_not_notified() {
    let transport = ScriptedTransport::new(vec![json(400, j!({"code": 1, "msg": "quiet"}))]);
    let notifier = Arc::new(InMemoryNotifier::new());
    let client = client_with(transport, notifier.clone(), Duration::from_secs(5));

    let out = client
        .request(RequestDescriptor::post("/v2/jobs").silent_error_notify(false))
        .await;

    assert!(out.error.is_some());
    assert!(notifier.shown().is_empty());
}

#[tokio::test]
async fn test_cancellation_not_notified() {
    let transport = ScriptedTransport::new(vec![common::Step::Hang]);
    let notifier = Arc::new(InMemoryNotifier::new());
    let client = client_with(transport.clone(), notifier.clone(), Duration::from_secs(5));

    let pending = client.dispatch(RequestDescriptor::get("/v2/slow"));
    let token = pending.cancellation_token();
    let task = tokio::spawn(pending.send_flat());
    transport.wait_for_calls(1).await;
    token.cancel();

    assert!(task.await.unwrap().error.unwrap().is_cancelled());
    assert!(notifier.shown().is_empty());
}
