//! Model calls against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the client over real
//! HTTP with the ureq transport. Checks that what the core assembles is what
//! a server actually receives, and that real responses parse as expected.

#![cfg(feature = "ureq")]

use std::net::SocketAddr;

use apiclient_core::registry::ModelDefinition;
use apiclient_core::transport::UreqTransport;
use apiclient_core::{ApiError, Call, Client, ClientConfig, FieldValue, Model, ModelRegistry, Payload};
use serde_json::{json, Value};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new("mock");
    registry
        .define_root(
            "User",
            ModelDefinition::new()
                .endpoint("/user")
                .fields(["id", "name", "email", "profile"]),
        )
        .define("mock::models::User::Profile", ModelDefinition::new().endpoint("/profile"))
        .define_root("Echo", ModelDefinition::new().endpoint("/echo").http_auth())
        .define_root("Session", ModelDefinition::new().endpoint("/session"))
        .define_root("Cached", ModelDefinition::new().endpoint("/cached"))
        .define_root("Plain", ModelDefinition::new().endpoint("/plain"));
    registry
}

fn connect(addr: SocketAddr) -> Client {
    let config = ClientConfig {
        domain: Some(addr.to_string()),
        https: false,
        timeout_secs: Some(10),
        ..ClientConfig::default()
    };
    Client::from_config(&config, registry()).unwrap()
}

fn parsed(payload: Payload) -> Value {
    payload.into_json().expect("expected a parsed payload")
}

fn profile_of(user: &Model) -> Model {
    user.get_field("profile")
        .unwrap()
        .and_then(FieldValue::into_model)
        .unwrap()
}

#[test]
fn user_lifecycle() {
    let client = connect(start_server());
    let user = client.model("user").unwrap();

    // List is empty and reports the query it was sent.
    let list = parsed(user.get("/list", json!({"page": "1"})).unwrap());
    assert_eq!(list["users"], json!([]));
    assert_eq!(list["query"]["page"], "1");
    assert_eq!(user.last_http_code(), Some(200));

    // Create.
    let created = parsed(user.post("", json!({"name": "Integration"})).unwrap());
    assert_eq!(user.last_http_code(), Some(201));
    assert_eq!(created["name"], "Integration");
    let id = created["id"].as_str().unwrap().to_string();

    // PUT rides on the POST path with a method override.
    let updated = parsed(user.put(&format!("/{id}"), json!({"email": "it@example.com"})).unwrap());
    assert_eq!(updated["name"], "Integration");
    assert_eq!(updated["email"], "it@example.com");

    // Nested model: /user + /profile.
    let profile = profile_of(&user);
    let body = parsed(profile.get(&format!("/{id}"), Value::Null).unwrap());
    assert_eq!(body["user_id"], id.as_str());

    let list = parsed(user.get("/list", Value::Null).unwrap());
    assert_eq!(list["users"].as_array().map(Vec::len), Some(1));
    assert_eq!(list["query"], json!({}), "params from earlier calls must not leak");

    // Unknown id.
    user.get("/00000000-0000-0000-0000-000000000000", Value::Null).unwrap();
    assert_eq!(user.last_http_code(), Some(404));
}

#[test]
fn echo_sees_what_was_assembled() {
    let client = connect(start_server());
    client
        .params_mut()
        .add_auth("login", "bob")
        .add_auth("password", "s3cret");

    let echo = client.model("echo").unwrap();
    echo.set_headers([("X-Trace", "abc")]);
    let seen = parsed(echo.put("/a", json!({"n": 1})).unwrap());

    assert_eq!(seen["method"], "PUT");
    assert_eq!(seen["path"], "/echo/a");
    assert_eq!(seen["headers"]["content-type"], "application/json");
    assert_eq!(seen["headers"]["x-trace"], "abc");
    assert_eq!(seen["headers"]["authorization"], "Basic Ym9iOnMzY3JldA==");
    let body: Value = serde_json::from_str(seen["body"].as_str().unwrap()).unwrap();
    assert_eq!(body, json!({"n": 1}));
}

#[test]
fn form_bodies_and_get_auth() {
    let client = connect(start_server());
    client
        .params_mut()
        .set_json(false)
        .set_get_auth(true)
        .add_auth("api_key", "k1");

    let echo = client.model("echo").unwrap();
    let seen = parsed(echo.post("", json!({"name": "Ada", "tags": ["a", "b"]})).unwrap());
    assert_eq!(seen["method"], "POST");
    assert_eq!(seen["query"], "api_key=k1");
    assert_eq!(seen["headers"]["content-type"], "application/x-www-form-urlencoded");
    assert_eq!(seen["body"], "name=Ada&tags%5B0%5D=a&tags%5B1%5D=b");
}

#[test]
fn file_uploads_are_sent_as_the_body() {
    let client = connect(start_server());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.txt");
    std::fs::write(&path, "file contents").unwrap();

    let echo = client.model("echo").unwrap();
    client.params_mut().set_file(&path).unwrap();
    let seen = parsed(echo.execute(Call::post("/upload")).unwrap());

    assert_eq!(seen["method"], "POST");
    assert_eq!(seen["body"], "file contents");
    assert!(!client.params().has_file());
}

#[test]
fn non_json_bodies() {
    let client = connect(start_server());
    let plain = client.model("plain").unwrap();
    assert_eq!(plain.get("", Value::Null).unwrap(), Payload::Json(Value::Null));

    plain.set_parse_response(false);
    assert_eq!(
        plain.get("", Value::Null).unwrap(),
        Payload::Raw("pong".to_string())
    );
}

#[test]
fn if_modified_since_reaches_the_server() {
    let client = connect(start_server());
    let cached = client.model("cached").unwrap();

    cached.get("", Value::Null).unwrap();
    assert_eq!(cached.last_http_code(), Some(200));

    cached
        .execute(Call::get("").if_modified_since("2024-01-01"))
        .unwrap();
    assert_eq!(cached.last_http_code(), Some(304));
}

#[test]
fn cookie_jar_round_trip() {
    let client = connect(start_server());
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("cookie.txt");
    client.set_cookie_jar(&jar).set_cookies(true);

    let session = client.model("session").unwrap();
    let first = parsed(session.get("", Value::Null).unwrap());
    assert!(first["cookie"].is_null());
    assert!(std::fs::read_to_string(&jar).unwrap().contains(mock_server::SESSION_COOKIE));

    let second = parsed(session.get("", Value::Null).unwrap());
    assert_eq!(second["cookie"], mock_server::SESSION_COOKIE);
}

#[test]
fn refused_connection_is_a_network_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = connect(addr);
    let err = client.model("user").unwrap().get("/list", Value::Null).unwrap_err();
    assert!(matches!(err, ApiError::Network { .. }), "got {err:?}");
    assert!(err.network_code().is_some());
}

#[test]
fn explicit_transport_construction() {
    let addr = start_server();
    let client = Client::new(registry(), UreqTransport::new());
    client
        .params_mut()
        .set_domain(addr.to_string())
        .set_https(false);
    let list = parsed(client.model("user").unwrap().get("/list", Value::Null).unwrap());
    assert_eq!(list["users"], json!([]));
}
