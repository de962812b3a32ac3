//! Gateway behavior seen from an HTTP client: routing errors, body limits,
//! metadata in both directions and status mapping.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, Response, StatusCode};
use http_body_util::Full;
use serde_json::{json, Value};
use tandem_core::REQUEST_ID_HEADER;
use tandem_server::ServerConfig;
use tandem_test::{TestServer, SERVED_BY_VALUE};

const ECHO: &str = "/v1/diagnostics/echo";
const TICKETS: &str = "/v1/frontendservice/tickets";

#[tokio::test]
async fn test_unknown_path_is_404_envelope() {
    let mut server = TestServer::start().await.unwrap();

    let response = server.get("/v1/nothing/here").await.unwrap();
    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_content_type("application/json")
        .assert_json_field("code", &json!(5))
        .assert_json_field("status", &json!("NOT_FOUND"));
    let request_id = response.header_str(REQUEST_ID_HEADER).unwrap();
    response.assert_json_field("request_id", &json!(request_id));

    server.stop().await;
}

#[tokio::test]
async fn test_wrong_method_is_405_with_allow() {
    let mut server = TestServer::start().await.unwrap();

    server
        .send(server.request(Method::PUT, TICKETS))
        .await
        .unwrap()
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "POST");

    server
        .send(server.request(Method::POST, &format!("{TICKETS}/t-1")))
        .await
        .unwrap()
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "GET, DELETE");

    server
        .send(server.request(Method::POST, "/healthz"))
        .await
        .unwrap()
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let mut server = TestServer::builder()
        .config(ServerConfig::builder().max_body_bytes(64).build())
        .start()
        .await
        .unwrap();

    let padding = "x".repeat(4096);
    server
        .post_json(ECHO, &json!({ "message": padding }))
        .await
        .unwrap()
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE)
        .assert_json_field("status", &json!("RESOURCE_EXHAUSTED"));

    server
        .post_json(ECHO, &json!({"message": "small"}))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_metadata_headers_reach_the_rpc() {
    let mut server = TestServer::start().await.unwrap();

    let response = server
        .send(
            server
                .request(Method::POST, ECHO)
                .header("grpc-metadata-tenant", "eu-1")
                .header("authorization", "Bearer abc")
                .header("x-not-forwarded", "dropped")
                .json(&json!({"message": "hi"})),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::OK)
        .assert_json_field("message", &json!("hi"))
        .assert_json_field("metadata/tenant", &json!("eu-1"))
        .assert_json_field("metadata/authorization", &json!("Bearer abc"))
        .assert_header("grpc-metadata-x-served-by", SERVED_BY_VALUE);

    let body: Value = response.json().unwrap();
    assert!(body["metadata"].get("x-not-forwarded").is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_request_id_is_echoed_and_forwarded() {
    let mut server = TestServer::start().await.unwrap();
    let id = "0190f5e4-7b1c-7c3a-9d2e-4f5a6b7c8d9e";

    server
        .send(
            server
                .request(Method::POST, ECHO)
                .header(REQUEST_ID_HEADER, id)
                .json(&json!({"message": "trace me"})),
        )
        .await
        .unwrap()
        .assert_header(REQUEST_ID_HEADER, id)
        .assert_json_field("metadata/x-request-id", &json!(id));

    let generated = server.get("/healthz").await.unwrap();
    assert!(generated.header(REQUEST_ID_HEADER).is_some());

    server.stop().await;
}

#[tokio::test]
async fn test_rpc_status_maps_to_http_status() {
    let mut server = TestServer::start().await.unwrap();

    let cases = [
        (3, StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
        (5, StatusCode::NOT_FOUND, "NOT_FOUND"),
        (6, StatusCode::CONFLICT, "ALREADY_EXISTS"),
        (7, StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
        (8, StatusCode::TOO_MANY_REQUESTS, "RESOURCE_EXHAUSTED"),
        (12, StatusCode::NOT_IMPLEMENTED, "UNIMPLEMENTED"),
        (14, StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
        (16, StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
    ];
    for (code, http_status, name) in cases {
        server
            .post_json(ECHO, &json!({"message": "refused", "fail_code": code}))
            .await
            .unwrap()
            .assert_status(http_status)
            .assert_json_field("code", &json!(code))
            .assert_json_field("status", &json!(name))
            .assert_json_field("message", &json!("refused"))
            .assert_header("grpc-metadata-x-served-by", SERVED_BY_VALUE);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_missing_ticket_is_404() {
    let mut server = TestServer::start().await.unwrap();

    server
        .get(&format!("{TICKETS}/does-not-exist"))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND)
        .assert_json_field("message", &json!("ticket does-not-exist not found"));

    server.stop().await;
}

#[tokio::test]
async fn test_path_and_query_are_merged_into_the_message() {
    let mut server = TestServer::start().await.unwrap();

    server
        .get(&format!("{ECHO}/hello%20world"))
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_json_field("message", &json!("hello world"));

    server
        .send(
            server
                .request(Method::POST, &format!("{ECHO}?message=from-query"))
                .json(&json!({"message": "from-body"})),
        )
        .await
        .unwrap()
        .assert_json_field("message", &json!("from-query"));

    server
        .get(&format!("{ECHO}/from-path?message=from-query"))
        .await
        .unwrap()
        .assert_json_field("message", &json!("from-path"));

    server.stop().await;
}

#[tokio::test]
async fn test_raw_http_handler_bypasses_translation() {
    let mut server = TestServer::builder()
        .configure(|params| {
            params.add_http_handler("/debug/method", |req: http::Request<Bytes>| async move {
                let body = format!("{} {}", req.method(), req.body().len());
                Response::new(Full::new(Bytes::from(body)))
            });
        })
        .start()
        .await
        .unwrap();

    let get = server.get("/debug/method").await.unwrap();
    get.assert_status(StatusCode::OK).assert_body_eq("GET 0");
    assert!(get.header(REQUEST_ID_HEADER).is_some());

    server
        .send(server.request(Method::PUT, "/debug/method").body("four"))
        .await
        .unwrap()
        .assert_body_eq("PUT 4");

    server.stop().await;
}

#[tokio::test]
async fn test_health_path_is_configurable() {
    let mut moved = TestServer::builder()
        .configure(|params| {
            params.with_health_path("/livez");
        })
        .start()
        .await
        .unwrap();
    moved.get("/livez").await.unwrap().assert_body_eq("ok");
    moved
        .get("/healthz")
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
    moved.stop().await;

    let mut disabled = TestServer::builder()
        .config(
            ServerConfig::builder()
                .without_health_check()
                .request_timeout(Duration::from_secs(5))
                .build(),
        )
        .start()
        .await
        .unwrap();
    disabled
        .get("/healthz")
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
    disabled.stop().await;
}
