//! The reqwest transport against a local mock server.

use mockito::{Matcher, Server};
use serde_json::json;
use service_request::{
    ClientConfig, ErrorKind, ExtractLevel, FlatRequestClient, RequestDescriptor,
};

fn client(base_url: &str) -> FlatRequestClient {
    FlatRequestClient::builder()
        .with_config(ClientConfig::new().with_base_url(format!("{}/api", base_url)))
        .build_flat()
        .unwrap()
}

#[tokio::test]
async fn test_structured_success_over_http() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v2/users")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .match_header("x-request-id", Matcher::Any)
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":0,"msg":"ok","data":[{"id":1},{"id":2}]}"#)
        .create_async()
        .await;

    let out = client(&server.url())
        .request(
            RequestDescriptor::get("/v2/users")
                .query("page", "2")
                .extract_level(ExtractLevel::Payload),
        )
        .await;

    mock.assert_async().await;
    assert_eq!(out.data.unwrap().to_value(), json!([{"id": 1}, {"id": 2}]));
    assert_eq!(out.response.unwrap().status, 200);
}

#[tokio::test]
async fn test_json_body_is_sent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/users")
        .match_body(Matcher::Json(json!({"name": "ann"})))
        .with_status(200)
        .with_body(r#"{"code":0,"data":{"id":9}}"#)
        .create_async()
        .await;

    let out = client(&server.url())
        .request(RequestDescriptor::post("/v2/users").json(json!({"name": "ann"})))
        .await;

    mock.assert_async().await;
    assert!(out.is_ok());
}

#[tokio::test]
async fn test_500_with_html_is_truncated_fault_and_not_retried() {
    let mut server = Server::new_async().await;
    let page = format!("<html><body>{}</body></html>", "oops ".repeat(60));
    let mock = server
        .mock("GET", "/api/v2/report")
        .with_status(500)
        .with_header("content-type", "text/html")
        .with_body(page)
        .expect(1)
        .create_async()
        .await;

    let err = client(&server.url())
        .request(RequestDescriptor::get("/v2/report"))
        .await
        .error
        .unwrap();

    mock.assert_async().await;
    assert_eq!(err.kind(), ErrorKind::Fault);
    assert_eq!(err.status(), Some(500));
    assert!(err.message().ends_with("[omit...]"));
    assert_eq!(err.message().chars().count(), 128);
}

#[tokio::test]
async fn test_503_retried_up_to_cap() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v2/flaky")
        .with_status(503)
        .expect(4)
        .create_async()
        .await;

    let err = client(&server.url())
        .request(RequestDescriptor::get("/v2/flaky"))
        .await
        .error
        .unwrap();

    mock.assert_async().await;
    assert_eq!(
        err.message(),
        "unknown error: ERR_BAD_RESPONSE, Request failed with status code 503"
    );
}

#[tokio::test]
async fn test_unsupported_scheme_is_fault() {
    let client = FlatRequestClient::builder()
        .with_config(ClientConfig::new().with_base_url("ftp://files.test/pub"))
        .build_flat()
        .unwrap();

    let err = client
        .request(RequestDescriptor::get("/readme.txt"))
        .await
        .error
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::Fault);
    assert!(err.status().is_none());
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let client = FlatRequestClient::builder()
        .with_config(ClientConfig::new().with_base_url("http://127.0.0.1:1"))
        .build_flat()
        .unwrap();

    let err = client
        .request(RequestDescriptor::get("/v2/ping"))
        .await
        .error
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.status().is_none());
    assert!(err.response().is_none());
}
