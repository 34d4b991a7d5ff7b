//! Pipeline behaviour against a real HTTP server

use std::sync::Arc;
use std::time::Duration;

use guardian_transport::{
    DecodeError, Method, NetworkConfig, NetworkError, NetworkOperation, Payload, RemoteError,
    ResponseError, TELEMETRY_HEADER, Telemetry, TransportError, Url,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Device {
    id: String,
    push_credentials: Option<Value>,
}

fn config() -> NetworkConfig {
    NetworkConfig::builder()
        .timeout(Duration::from_secs(5))
        .telemetry(Telemetry::new("pipeline-tests", "1.0.0"))
        .build()
        .unwrap()
}

fn endpoint(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{route}", server.uri())).unwrap()
}

#[tokio::test]
async fn test_json_round_trip_with_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/device-accounts/dev_1"))
        .and(header("authorization", "Bearer device-token"))
        .and(header("content-type", "application/json"))
        .and(header(
            TELEMETRY_HEADER,
            Telemetry::new("pipeline-tests", "1.0.0").header_value().as_str(),
        ))
        .and(body_json(json!({"name": "pixel"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "dev_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = NetworkOperation::<Device>::new(
        config(),
        Method::POST,
        endpoint(&server, "/api/device-accounts/dev_1"),
        [("Authorization", "Bearer device-token")],
        Some(&json!({"name": "pixel"})),
    )
    .execute()
    .await
    .unwrap();

    assert_eq!(
        result,
        Payload::Content(Device {
            id: "dev_1".to_string(),
            push_credentials: None,
        })
    );
}

#[tokio::test]
async fn test_no_content_with_body_is_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204).set_body_string("ignored"))
        .mount(&server)
        .await;

    let result = NetworkOperation::<Device>::new::<(), _, &str, &str>(
        config(),
        Method::DELETE,
        endpoint(&server, "/api/device-accounts/dev_1"),
        [],
        None,
    )
    .execute()
    .await
    .unwrap();

    assert!(result.is_no_content());
}

#[tokio::test]
async fn test_empty_ok_body_is_missing_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = NetworkOperation::<Value>::get(config(), endpoint(&server, "/x"), [("A", "b")])
        .execute()
        .await
        .unwrap_err();
    assert_eq!(err, NetworkError::Decode(DecodeError::MissingBody));
}

#[tokio::test]
async fn test_forbidden_is_not_authorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = NetworkOperation::<Value>::get(config(), endpoint(&server, "/x"), [("A", "b")])
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NetworkError::Response(ResponseError::NotAuthorized { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_remote_error_mapper_only_for_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fail"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errorCode": "enrollment_not_found",
            "description": "Enrollment not found",
            "statusCode": 404
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": "looks_like_an_error"
        })))
        .mount(&server)
        .await;

    let mapper = |response: &guardian_transport::HttpResponse| {
        RemoteError::from_body(&response.body)
            .map(|err| NetworkError::Remote(err.with_status(response.status)))
    };

    let err = NetworkOperation::<Value>::new(
        config(),
        Method::POST,
        endpoint(&server, "/fail"),
        [("A", "b")],
        Some(&json!({})),
    )
    .map_error(mapper)
    .execute()
    .await
    .unwrap_err();

    let remote = err.remote().unwrap();
    assert_eq!(remote.code, "enrollment_not_found");
    assert_eq!(remote.description.as_deref(), Some("Enrollment not found"));
    assert_eq!(remote.info["statusCode"], 404);
    assert_eq!(err.status_code(), Some(404));

    let ok = NetworkOperation::<Value>::new(
        config(),
        Method::POST,
        endpoint(&server, "/ok"),
        [("A", "b")],
        Some(&json!({})),
    )
    .map_error(mapper)
    .execute()
    .await
    .unwrap();
    assert_eq!(ok, Payload::Content(json!({"errorCode": "looks_like_an_error"})));
}

#[tokio::test]
async fn test_caller_header_wins_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header(TELEMETRY_HEADER, "caller-value"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = NetworkOperation::<Value>::new(
        config(),
        Method::POST,
        endpoint(&server, "/x"),
        [(TELEMETRY_HEADER, "caller-value")],
        Some(&json!({})),
    )
    .execute()
    .await
    .unwrap();
    assert!(result.is_no_content());
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = NetworkConfig::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let err = NetworkOperation::<Value>::get(config, endpoint(&server, "/slow"), [("A", "b")])
        .execute()
        .await
        .unwrap_err();
    assert_eq!(err, NetworkError::Transport(TransportError::Timeout));
    assert!(err.is_retryable_hint());
}

#[tokio::test]
async fn test_hooks_observe_request_and_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429).set_body_raw("slow down", "text/plain"),
        )
        .mount(&server)
        .await;

    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let on_request = seen.clone();
    let on_response = seen.clone();

    let (sender, receiver) = tokio::sync::oneshot::channel();
    NetworkOperation::<Value>::get(config(), endpoint(&server, "/limited"), [("A", "b")])
        .on_request(move |request| {
            on_request
                .lock()
                .push(format!("{} {}", request.method, request.url.path()))
        })
        .on_response(move |response| on_response.lock().push(response.status.to_string()))
        .start(move |result| {
            let _ = sender.send(result);
        });

    let err = receiver.await.unwrap().unwrap_err();
    assert_eq!(
        err,
        NetworkError::Response(ResponseError::RateLimited {
            status: 429,
            message: Some("slow down".to_string()),
        })
    );
    assert_eq!(*seen.lock(), vec!["GET /limited".to_string(), "429".to_string()]);
}
