use flagops_lib::{ClientError, FlagApi, FlagRecord, HttpFlagClient, ResolvedConnection};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connection(base_url: String) -> ResolvedConnection {
    ResolvedConnection {
        base_url,
        api_key: "sk_test".to_string(),
        environment: "prod".to_string(),
    }
}

/// The blocking client must not run on an async worker thread.
async fn with_client<T, F>(base_url: String, f: F) -> T
where
    F: FnOnce(&HttpFlagClient) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let client = HttpFlagClient::new(&connection(base_url)).unwrap();
        f(&client)
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_sends_bearer_and_environment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/flags"))
        .and(query_param("environment", "prod"))
        .and(header("authorization", "Bearer sk_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"key": "new-checkout", "environment": "prod", "enabled": true, "rollout": 50},
            {"key": "dark-mode", "environment": "prod"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    // Trailing slash on the base URL is tolerated.
    let flags = with_client(format!("{}/", server.uri()), |c| c.list_by_environment("prod"))
        .await
        .unwrap();
    assert_eq!(flags.len(), 2);
    assert!(flags[0].enabled);
    assert_eq!(flags[0].rollout, 50);
    assert!(!flags[1].enabled);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upsert_puts_full_record() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/flags"))
        .and(header("authorization", "Bearer sk_test"))
        .and(body_partial_json(json!({
            "key": "new-checkout",
            "environment": "prod",
            "enabled": false,
            "rollout": 0,
            "owner": "payments"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut record = FlagRecord::new("new-checkout", "prod");
    record.extra.insert("owner".to_string(), json!("payments"));
    with_client(server.uri(), move |c| c.upsert(&record))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_addresses_key_and_environment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/flags/new-checkout"))
        .and(query_param("environment", "staging"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    with_client(server.uri(), |c| c.delete("new-checkout", "staging"))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_encodes_key_as_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/api/v1/flags/_legacy%2[Ff]flag$"))
        .and(query_param("environment", "prod"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    with_client(server.uri(), |c| c.delete("_legacy/flag", "prod"))
        .await
        .unwrap();
}

#[test]
fn test_rejects_unusable_base_url() {
    for base_url in ["not a url", "mailto:ops@example.com", "ftp://flags.example.com"] {
        let err = HttpFlagClient::new(&connection(base_url.to_string())).unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl(ref url) if url == base_url));
    }
}

#[test]
fn test_debug_hides_api_key() {
    let conn = ResolvedConnection {
        api_key: "sk_live_secret".to_string(),
        ..connection("https://flags.example.com".to_string())
    };
    let client = HttpFlagClient::new(&conn).unwrap();
    let shown = format!("{client:?}");
    assert!(!shown.contains("sk_live_secret"));
    assert!(shown.contains("flags.example.com"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/flags"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string(r#"{"error":"version conflict"}"#),
        )
        .mount(&server)
        .await;

    let record = FlagRecord::new("new-checkout", "prod");
    let err = with_client(server.uri(), move |c| c.upsert(&record))
        .await
        .unwrap_err();
    match err {
        ClientError::Remote { status, body } => {
            assert_eq!(status, 409);
            assert_eq!(body, r#"{"error":"version conflict"}"#);
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_is_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = with_client(server.uri(), |c| c.list_by_environment("prod"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Remote { status: 401, ref body } if body == "Unauthorized"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_undecodable_list_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = with_client(server.uri(), |c| c.list_by_environment("prod"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_server_is_transport_error() {
    let err = with_client("http://127.0.0.1:1".to_string(), |c| {
        c.list_by_environment("prod")
    })
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
}
