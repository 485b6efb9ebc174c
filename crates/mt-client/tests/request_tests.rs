//! Requester Tests
//!
//! Tests for:
//! - Bearer token attached only to authenticated requests
//! - Error normalization (backend message, status defaults, transport errors)
//! - Concurrent requests with different credentials

use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mt_client::error::{
    CONNECTION_ERROR_MESSAGE, INVALID_RESPONSE_MESSAGE, NOT_FOUND_MESSAGE, SERVER_ERROR_MESSAGE,
    TIMEOUT_ERROR_MESSAGE, UNAUTHORIZED_MESSAGE,
};
use mt_client::{ClientConfig, MediTurnos, RequestDescriptor, TokenStore};
use serde_json::{json, Value};

fn create_client(base_url: &str) -> MediTurnos {
    let config = ClientConfig::new(base_url).with_retry_delay(Duration::ZERO);
    MediTurnos::new(config, TokenStore::in_memory()).unwrap()
}

#[tokio::test]
async fn test_authenticated_request_sends_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/home"))
        .and(header("Authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"turnos": 2})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server.uri());
    client.tokens().set_access_token("tok-123");

    let body: Value = client
        .requester()
        .execute(RequestDescriptor::get("/home"))
        .await
        .unwrap();

    assert_eq!(body["turnos"], 2);
}

#[tokio::test]
async fn test_anonymous_request_never_sends_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/solicitarNuevoTurnoExpress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server.uri());
    client.tokens().set_access_token("tok-123");

    let _: Value = client
        .requester()
        .execute(
            RequestDescriptor::post("/solicitarNuevoTurnoExpress")
                .anonymous()
                .json(&json!({"email": "ana@b.com"}))
                .unwrap(),
        )
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_authenticated_request_without_token_is_sent_bare() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server.uri());
    let _: Value = client
        .requester()
        .execute(RequestDescriptor::get("/home"))
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_query_parameters_are_encoded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/obtenerHistorialClinicoDelPaciente"))
        .and(query_param("pacienteMail", "ana+1@b.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server.uri());
    let body: Option<Value> = client
        .requester()
        .execute(
            RequestDescriptor::get("/obtenerHistorialClinicoDelPaciente")
                .query("pacienteMail", "ana+1@b.com"),
        )
        .await
        .unwrap();

    assert!(body.is_none());
}

#[tokio::test]
async fn test_backend_message_wins() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/verBloqueados"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "No tenés permisos"})),
        )
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server.uri());
    let err = client
        .requester()
        .execute::<Value>(RequestDescriptor::get("/verBloqueados"))
        .await
        .unwrap_err();

    assert_eq!(err.status, 403);
    assert_eq!(err.message, "No tenés permisos");
}

#[tokio::test]
async fn test_status_defaults_without_backend_message() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&mock_server)
        .await;
    Mock::given(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "nope"})))
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server.uri());
    let requester = client.requester();

    let missing = requester
        .execute::<Value>(RequestDescriptor::get("/missing"))
        .await
        .unwrap_err();
    assert_eq!(missing.status, 404);
    assert_eq!(missing.message, NOT_FOUND_MESSAGE);

    let broken = requester
        .execute::<Value>(RequestDescriptor::get("/broken"))
        .await
        .unwrap_err();
    assert_eq!(broken.status, 502);
    assert_eq!(broken.message, SERVER_ERROR_MESSAGE);

    let rejected = requester
        .execute::<Value>(RequestDescriptor::post("/login").anonymous())
        .await
        .unwrap_err();
    assert_eq!(rejected.status, 401);
    assert_eq!(rejected.message, UNAUTHORIZED_MESSAGE);
}

#[tokio::test]
async fn test_other_statuses_fall_back_to_transport_text() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/register"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server.uri());
    let err = client
        .requester()
        .execute::<Value>(RequestDescriptor::put("/register").anonymous())
        .await
        .unwrap_err();

    assert_eq!(err.status, 400);
    assert!(err.message.contains("400"), "unexpected message: {}", err.message);
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let client = create_client("http://127.0.0.1:1");

    let err = client
        .requester()
        .execute::<Value>(RequestDescriptor::get("/home"))
        .await
        .unwrap_err();

    assert_eq!(err.status, 500);
    assert_eq!(err.message, CONNECTION_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_slow_server_is_timeout_error() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/home"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::new(mock_server.uri()).with_timeout(Duration::from_millis(100));
    let client = MediTurnos::new(config, TokenStore::in_memory()).unwrap();

    let err = client
        .requester()
        .execute::<Value>(RequestDescriptor::get("/home"))
        .await
        .unwrap_err();

    assert_eq!(err.status, 500);
    assert_eq!(err.message, TIMEOUT_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_unexpected_body_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/VerPagos"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server.uri());
    let err = client
        .requester()
        .execute::<Vec<Value>>(RequestDescriptor::get("/VerPagos"))
        .await
        .unwrap_err();

    assert_eq!(err.status, 500);
    assert_eq!(err.message, INVALID_RESPONSE_MESSAGE);
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/enviarMailRecuperarClave"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server.uri());
    client.tokens().set_access_token("tok-abc");
    let requester = client.requester();

    let calls = (0..10).map(|i| {
        let descriptor = if i % 2 == 0 {
            RequestDescriptor::get("/home")
        } else {
            RequestDescriptor::post("/enviarMailRecuperarClave").anonymous()
        };
        requester.execute::<Value>(descriptor)
    });
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(Result::is_ok));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 10);
    for request in requests {
        let auth = request.headers.get("authorization");
        if request.url.path() == "/home" {
            assert_eq!(auth.unwrap().to_str().unwrap(), "Bearer tok-abc");
        } else {
            assert!(auth.is_none());
        }
    }
}
