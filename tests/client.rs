mod common;

use common::*;
use librato_provider::librato::models::{Alert, ConditionType, Service, ServiceRef};
use librato_provider::testing::ProviderTester;
use librato_provider::{LibratoApi, LibratoClient, LibratoProvider, ProviderConfig, ProviderError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// base64("ops@example.com:secret")
const AUTHORIZATION: &str = "Basic b3BzQGV4YW1wbGUuY29tOnNlY3JldA==";

async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

fn config_for(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        email: "ops@example.com".to_string(),
        token: "secret".to_string(),
        url: format!("{}/v1", server.uri()),
    }
}

fn client_for(server: &MockServer) -> LibratoClient {
    LibratoClient::new(&config_for(server)).unwrap()
}

fn alert_body(id: u64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "description": "A Test Alert",
        "conditions": [{
            "id": 77,
            "type": "above",
            "metric_name": CPU_METRIC,
            "threshold": 10.0,
            "duration": 600,
            "tags": [{"name": "some_tag", "grouped": false, "values": ["value1"]}]
        }],
        "services": [{"id": 5, "type": "mail", "title": "Foo Bar", "settings": {}}],
        "attributes": {"runbook_url": RUNBOOK_URL},
        "active": true,
        "rearm_seconds": 600,
        "version": 2
    })
}

#[tokio::test]
async fn test_get_alert() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/v1/alerts/12"))
        .and(header("Authorization", AUTHORIZATION))
        .respond_with(ResponseTemplate::new(200).set_body_json(alert_body(12, "cpu")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let alert = client_for(&mock_server).get_alert(12).await.unwrap();
    assert_eq!(alert.id, Some(12));
    assert_eq!(alert.service_ids(), vec![5]);
    assert_eq!(alert.conditions[0].condition_type, ConditionType::Above);
    assert_eq!(alert.conditions[0].tags[0].grouped, Some(false));
}

#[tokio::test]
async fn test_create_alert_sends_service_ids() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/v1/alerts"))
        .and(header("Authorization", AUTHORIZATION))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "name": "cpu",
            "conditions": [],
            "services": [5],
            "active": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(alert_body(12, "cpu")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut alert = Alert::named("cpu");
    alert.services = vec![ServiceRef::Id(5)];
    alert.active = Some(true);

    let created = client_for(&mock_server).create_alert(&alert).await.unwrap();
    assert_eq!(created.id, Some(12));
}

#[tokio::test]
async fn test_update_and_delete_alert() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("PUT"))
        .and(path("/v1/alerts/12"))
        .and(body_json(json!({"name": "mem", "conditions": [], "services": []})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/alerts/12"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.update_alert(12, &Alert::named("mem")).await.unwrap();
    client.delete_alert(12).await.unwrap();
}

#[tokio::test]
async fn test_service_endpoints() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/v1/services"))
        .and(body_json(json!({
            "title": "Foo Bar",
            "type": "mail",
            "settings": {"addresses": "admin@example.com"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 5,
            "title": "Foo Bar",
            "type": "mail",
            "settings": {"addresses": "admin@example.com"}
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/services/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "title": "Foo Bar",
            "type": "mail",
            "settings": {"addresses": "admin@example.com"}
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let service = Service {
        id: None,
        title: "Foo Bar".to_string(),
        service_type: "mail".to_string(),
        settings: serde_json::from_str(r#"{"addresses": "admin@example.com"}"#).unwrap(),
    };

    let created = client.create_service(&service).await.unwrap();
    assert_eq!(created.id, Some(5));

    let fetched = client.get_service(5).await.unwrap();
    assert_eq!(fetched.service_type, "mail");
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let mock_server = setup_mock_server().await;

    let cases = [
        (1, ResponseTemplate::new(404)),
        (2, ResponseTemplate::new(401)),
        (
            3,
            ResponseTemplate::new(422).set_body_json(json!({
                "errors": {"params": {"name": ["is not present"]}}
            })),
        ),
        (4, ResponseTemplate::new(429)),
        (5, ResponseTemplate::new(503)),
        (6, ResponseTemplate::new(409).set_body_string("conflict")),
    ];
    for (id, response) in cases {
        Mock::given(method("GET"))
            .and(path(format!("/v1/alerts/{}", id)))
            .respond_with(response)
            .mount(&mock_server)
            .await;
    }

    let client = client_for(&mock_server);

    assert!(matches!(client.get_alert(1).await, Err(ProviderError::NotFound(_))));
    assert!(matches!(
        client.get_alert(2).await,
        Err(ProviderError::PermissionDenied(_))
    ));
    match client.get_alert(3).await {
        Err(ProviderError::Validation(message)) => {
            assert!(message.contains("params.name: is not present"), "{}", message);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(matches!(
        client.get_alert(4).await,
        Err(ProviderError::ResourceExhausted(_))
    ));
    assert!(matches!(
        client.get_alert(5).await,
        Err(ProviderError::Unavailable(_))
    ));
    assert!(matches!(
        client.get_alert(6).await,
        Err(ProviderError::Api { status: 409, .. })
    ));
}

#[tokio::test]
async fn test_invalid_response_body() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/v1/alerts/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server).get_alert(1).await.unwrap_err();
    assert!(matches!(err, ProviderError::Serialization(_)));
}

#[tokio::test]
async fn test_provider_over_http() {
    init();
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/v1/alerts"))
        .and(header("Authorization", AUTHORIZATION))
        .and(body_json(json!({
            "name": "cpu",
            "conditions": [],
            "services": [],
            "active": true,
            "rearm_seconds": 600
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 12,
            "name": "cpu",
            "conditions": [],
            "services": [],
            "active": true,
            "rearm_seconds": 600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "name": "cpu",
            "conditions": [],
            "services": [],
            "active": true,
            "rearm_seconds": 600
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/alerts/12"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let tester = ProviderTester::new(LibratoProvider::new());
    tester
        .configure(json!({
            "email": "ops@example.com",
            "token": "secret",
            "url": format!("{}/v1", mock_server.uri())
        }))
        .await
        .unwrap();

    let state = tester
        .apply(ALERT, None, alert_config_minimal("cpu"))
        .await
        .unwrap();
    assert_eq!(state["id"], "12");

    // The remote already forgot the alert; destroy still succeeds.
    tester.destroy(ALERT, state).await.unwrap();
}

#[tokio::test]
async fn test_update_sends_cleared_fields() {
    init();
    let mock_server = setup_mock_server().await;

    Mock::given(method("PUT"))
        .and(path("/v1/alerts/12"))
        .and(body_json(json!({
            "name": "cpu",
            "description": "",
            "conditions": [],
            "services": [],
            "attributes": {},
            "active": true,
            "rearm_seconds": 600
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "name": "cpu",
            "description": "",
            "conditions": [],
            "services": [],
            "attributes": {},
            "active": true,
            "rearm_seconds": 600
        })))
        .mount(&mock_server)
        .await;

    let tester = ProviderTester::new(LibratoProvider::new());
    tester
        .configure(json!({
            "email": "ops@example.com",
            "token": "secret",
            "url": format!("{}/v1", mock_server.uri())
        }))
        .await
        .unwrap();

    let prior = json!({
        "id": "12",
        "name": "cpu",
        "description": "A Test Alert",
        "services": [],
        "active": true,
        "rearm_seconds": 600,
        "condition": [],
        "attributes": {"runbook_url": RUNBOOK_URL}
    });
    let state = tester
        .apply(ALERT, Some(prior), alert_config_minimal("cpu"))
        .await
        .unwrap();

    assert_eq!(state["id"], "12");
    assert!(state["description"].is_null());
    assert!(state["attributes"].is_null());
}
