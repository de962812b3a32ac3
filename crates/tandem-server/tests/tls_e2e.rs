//! Both transports over TLS with one certificate.

use http::StatusCode;
use serde_json::json;
use tandem_server::{acquire, Server, ServerError, ServerParams, TlsMaterial};
use tandem_test::proto::v1::{CreateTicketRequest, EchoRequest, Ticket};
use tandem_test::{tls, FrontendRegistration, FakeFrontend, TestServer};

#[tokio::test]
async fn test_tls_serves_both_transports() {
    let mut server = TestServer::builder().tls().start().await.unwrap();
    assert!(server.server().rpc_endpoint().unwrap().is_tls());
    assert!(server.url("/healthz").starts_with("https://"));

    let mut client = server.frontend_client().await.unwrap();
    let ticket = client
        .create_ticket(CreateTicketRequest::default())
        .await
        .unwrap()
        .into_inner();
    assert_eq!(ticket, Ticket::default());
    drop(client);

    server
        .post_json("/v1/frontendservice/tickets", &json!({}))
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_body_eq("{}");
    server
        .get("/healthz")
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_body_eq("ok");

    let report = server.stop().await;
    assert!(report.is_clean(), "unexpected shutdown: {report}");
}

#[tokio::test]
async fn test_tls_metadata_round_trip() {
    let mut server = TestServer::builder().tls().start().await.unwrap();

    server
        .send(
            server
                .request(http::Method::POST, "/v1/diagnostics/echo")
                .header("grpc-metadata-tenant", "eu-2")
                .json(&json!({"message": "secure"})),
        )
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_json_field("metadata/tenant", &json!("eu-2"));

    let mut client = server.diagnostics_client().await.unwrap();
    let echo = client
        .echo(EchoRequest {
            message: "direct".to_string(),
            fail_code: 0,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(echo.message, "direct");

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_plaintext_client_is_rejected() {
    let mut server = TestServer::builder().tls().start().await.unwrap();

    let plain = reqwest::Client::new()
        .get(format!("http://{}/healthz", server.gateway_addr()))
        .send()
        .await;
    assert!(plain.is_err());

    server
        .get("/healthz")
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    server.stop().await;
}

#[tokio::test]
async fn test_tls_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let cert = dir.path().join("server.crt");
    let key = dir.path().join("server.key");
    std::fs::write(&cert, tls::SERVER_CERT_PEM).unwrap();
    std::fs::write(&key, tls::SERVER_KEY_PEM).unwrap();

    let mut server = TestServer::builder()
        .tls()
        .configure(move |params| {
            params.with_tls(TlsMaterial::from_files(cert, key).with_ca_pem(tls::CA_CERT_PEM));
        })
        .start()
        .await
        .unwrap();

    server
        .post_json("/v1/frontendservice/tickets", &json!({}))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    server.stop().await;
}

#[tokio::test]
async fn test_missing_tls_file_fails_start() {
    let mut server = Server::new();
    let mut params = ServerParams::from_listeners(acquire(0).unwrap(), acquire(0).unwrap());
    params
        .add_registration(FrontendRegistration::new(FakeFrontend::new()))
        .with_tls(TlsMaterial::from_files(
            "/nonexistent/server.crt",
            "/nonexistent/server.key",
        ));

    let err = server.start(params).await.unwrap_err();
    assert!(
        matches!(err, ServerError::TlsFile { .. }),
        "unexpected error: {err}"
    );
    assert!(server.gateway_addr().is_none());
}
