use dist_nexus::{NexusClient, NexusError, DEFAULT_TIMEOUT};
use dist_store::{Record, RecordStore, StoreError};
use dist_types::{Namespace, Quantity};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> NexusClient {
    NexusClient::new(&server.uri(), DEFAULT_TIMEOUT)
        .unwrap()
        .with_session("s-123")
}

fn api_error(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": { "code": -1, "message": message }
    }))
}

#[tokio::test]
async fn get_record_returns_result_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/assets/get/asset"))
        .and(body_partial_json(json!({ "name": "distordia:L1-verified-1", "session": "s-123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "distordia-type": "verification-registry", "namespaces": "[]" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server)
        .get_record("distordia:L1-verified-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.type_tag(), Some("verification-registry"));
    assert_eq!(record.get_str("namespaces"), Some("[]"));
}

#[tokio::test]
async fn missing_asset_reads_as_none() {
    let server = MockServer::start().await;
    Mock::given(path("/assets/get/asset"))
        .respond_with(api_error("Object not found"))
        .mount(&server)
        .await;

    assert!(client(&server).get_record("distordia:disputes-1").await.unwrap().is_none());
}

#[tokio::test]
async fn create_sends_local_name_and_json_data() {
    let server = MockServer::start().await;
    Mock::given(path("/assets/create/asset"))
        .and(body_partial_json(json!({
            "name": "L2-verified-4",
            "format": "JSON",
            "data": "{\"tier\":\"L2\"}"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": { "success": true } })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .create_record("distordia:L2-verified-4", &Record::new().with("tier", "L2"))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_flattens_fields_into_body() {
    let server = MockServer::start().await;
    Mock::given(path("/assets/update/asset"))
        .and(body_partial_json(json!({
            "name": "distordia:req-7",
            "status": "approved",
            "message": "verified at L1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let fields = Record::new()
        .with("status", "approved")
        .with("message", "verified at L1");
    client(&server).update_record("distordia:req-7", &fields).await.unwrap();
}

#[tokio::test]
async fn rejected_write_is_not_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(path("/assets/update/asset"))
        .respond_with(api_error("insufficient fee"))
        .mount(&server)
        .await;

    let err = client(&server)
        .update_record("distordia:req-7", &Record::new().with("status", "approved"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected(ref m) if m == "insufficient fee"));
}

#[tokio::test]
async fn balance_is_read_in_base_units() {
    let server = MockServer::start().await;
    Mock::given(path("/finance/get/account"))
        .and(body_partial_json(json!({ "name": "alice::DIST-verification" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "balance": 15_000_000_000u64 }
        })))
        .mount(&server)
        .await;

    let balance = client(&server)
        .get_balance("alice::DIST-verification")
        .await
        .unwrap();
    assert_eq!(balance, Quantity::from_units(15_000));
}

#[tokio::test]
async fn unknown_account_has_zero_balance() {
    let server = MockServer::start().await;
    Mock::given(path("/finance/get/account"))
        .respond_with(api_error("Account not found"))
        .mount(&server)
        .await;

    assert_eq!(
        client(&server).get_balance("nobody::DIST-verification").await.unwrap(),
        Quantity::ZERO
    );
}

#[tokio::test]
async fn namespace_resolution() {
    let server = MockServer::start().await;
    Mock::given(path("/names/get/namespace"))
        .and(body_partial_json(json!({ "name": "alice" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "name": "alice", "address": "8abc" }
        })))
        .mount(&server)
        .await;
    Mock::given(path("/names/get/namespace"))
        .and(body_partial_json(json!({ "name": "ghost" })))
        .respond_with(api_error("Namespace not found"))
        .mount(&server)
        .await;

    let c = client(&server);
    let alice = c
        .resolve_identifier(&Namespace::new("alice").unwrap())
        .await
        .unwrap();
    assert!(alice.exists);
    assert_eq!(alice.address.as_deref(), Some("8abc"));

    let ghost = c
        .resolve_identifier(&Namespace::new("ghost").unwrap())
        .await
        .unwrap();
    assert!(!ghost.exists);
}

#[tokio::test]
async fn list_filters_on_type_field() {
    let server = MockServer::start().await;
    Mock::given(path("/register/list/assets:asset"))
        .and(body_partial_json(json!({
            "where": "results.distordia-type=verification-request"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                { "address": "a1", "namespace": "alice", "status": "pending" },
                "not an object",
                { "address": "a2", "namespace": "bob", "status": "approved" }
            ]
        })))
        .mount(&server)
        .await;

    let records = client(&server)
        .list_records_by_type("verification-request")
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get_str("namespace"), Some("bob"));
}

#[tokio::test]
async fn non_array_listing_is_empty() {
    let server = MockServer::start().await;
    Mock::given(path("/register/list/assets:asset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .mount(&server)
        .await;

    assert!(client(&server)
        .list_records_by_type("dispute-request")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn login_stores_session_for_later_calls() {
    let server = MockServer::start().await;
    Mock::given(path("/sessions/create/local"))
        .and(body_partial_json(json!({ "username": "op", "password": "pw", "pin": "1234" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "session": "fresh-session-id-0001", "genesis": "a1" }
        })))
        .mount(&server)
        .await;
    Mock::given(path("/sessions/unlock/local"))
        .and(body_partial_json(json!({ "pin": "1234", "session": "fresh-session-id-0001" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": { "unlocked": true } })))
        .expect(1)
        .mount(&server)
        .await;

    let mut c = NexusClient::new(&server.uri(), DEFAULT_TIMEOUT).unwrap();
    let session = c.login("op", "pw", "1234").await.unwrap();
    assert_eq!(session, "fresh-session-id-0001");
    assert_eq!(c.session(), Some("fresh-session-id-0001"));
    c.unlock("1234").await.unwrap();
}

#[tokio::test]
async fn failed_login_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(path("/sessions/create/local"))
        .respond_with(api_error("Invalid credentials"))
        .mount(&server)
        .await;

    let mut c = NexusClient::new(&server.uri(), DEFAULT_TIMEOUT).unwrap();
    let err = c.login("op", "bad", "0000").await.unwrap_err();
    assert!(err.is_api());
    assert!(c.session().is_none());
}

#[tokio::test]
async fn slow_node_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(path("/assets/get/asset"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": {} }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let c = NexusClient::new(&server.uri(), Duration::from_millis(50)).unwrap();
    let err = c.get_record("distordia:L1-verified-1").await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}

#[tokio::test]
async fn garbage_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(path("/assets/get/asset"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let c = client(&server);
    let err = c
        .call("assets/get/asset", json!({ "name": "x" }))
        .await
        .unwrap_err();
    assert!(matches!(err, NexusError::InvalidResponse(_)));
}
