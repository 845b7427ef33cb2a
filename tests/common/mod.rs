#![allow(dead_code)]

use std::sync::Arc;

use librato_provider::librato::alert;
use librato_provider::librato::models::{Alert, ConditionType};
use librato_provider::librato::service;
use librato_provider::testing::{
    assert_plan_changes_attribute, assert_plan_no_changes, assert_plan_updates_in_place,
    ProviderTester,
};
use librato_provider::{LibratoApi, LibratoProvider, MemoryClient};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};

pub const ALERT: &str = alert::RESOURCE_TYPE;
pub const SERVICE: &str = service::RESOURCE_TYPE;

pub const CPU_METRIC: &str = "librato.cpu.percent.idle";
pub const RUNBOOK_URL: &str = "https://runbooks.example.com/cpu-idle";

/// Lowercase alphanumeric name, unique enough to run against a shared account.
pub fn rand_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

pub fn init() {
    librato_provider::try_init_logging();
}

pub fn memory_tester() -> (Arc<MemoryClient>, ProviderTester<LibratoProvider>) {
    let api = Arc::new(MemoryClient::new());
    let tester = ProviderTester::new(LibratoProvider::with_api(api.clone()));
    (api, tester)
}

// =========================================================================
// Configurations
// =========================================================================

pub fn alert_config_minimal(name: &str) -> Value {
    json!({ "name": name })
}

pub fn alert_config_basic(name: &str) -> Value {
    json!({
        "name": name,
        "description": "A Test Alert"
    })
}

pub fn alert_config_new_value(name: &str) -> Value {
    json!({
        "name": name,
        "description": "A modified Test Alert"
    })
}

pub fn alert_config_full(name: &str, service_id: &str) -> Value {
    let mut config = full_alert(name, service_id, 600, 300);
    config["condition"][0]["tag"] = json!([{
        "name": "some_tag",
        "values": ["value1"]
    }]);
    config
}

pub fn alert_config_full_update(name: &str, service_id: &str) -> Value {
    full_alert(name, service_id, 60, 1200)
}

fn full_alert(name: &str, service_id: &str, duration: u64, rearm_seconds: u64) -> Value {
    json!({
        "name": name,
        "description": "A Test Alert",
        "services": [service_id],
        "condition": [{
            "type": "above",
            "threshold": 10,
            "duration": duration,
            "metric_name": CPU_METRIC
        }],
        "attributes": [{
            "runbook_url": RUNBOOK_URL
        }],
        "active": false,
        "rearm_seconds": rearm_seconds
    })
}

pub fn service_config(title: &str) -> Value {
    json!({
        "title": title,
        "type": "mail",
        "settings": "{\n  \"addresses\": \"admin@example.com\"\n}\n"
    })
}

// =========================================================================
// Checks
// =========================================================================

pub fn state_id(state: &Value) -> u64 {
    state["id"]
        .as_str()
        .expect("state has an id")
        .parse()
        .expect("id is numeric")
}

pub async fn check_alert_exists(api: &dyn LibratoApi, state: &Value) -> Alert {
    let id = state_id(state);
    let alert = api.get_alert(id).await.expect("alert exists remotely");
    assert_eq!(alert.id, Some(id));
    alert
}

pub async fn check_alert_destroyed(api: &dyn LibratoApi, id: u64) {
    let err = api
        .get_alert(id)
        .await
        .expect_err("alert still exists after destroy");
    assert!(err.is_not_found(), "unexpected error: {}", err);
}

pub async fn check_service_destroyed(api: &dyn LibratoApi, id: u64) {
    let err = api
        .get_service(id)
        .await
        .expect_err("service still exists after destroy");
    assert!(err.is_not_found(), "unexpected error: {}", err);
}

// =========================================================================
// Scenarios
// =========================================================================

pub async fn scenario_minimal(tester: &ProviderTester<LibratoProvider>, api: &dyn LibratoApi) {
    let name = rand_string(10);
    let state = tester
        .apply(ALERT, None, alert_config_minimal(&name))
        .await
        .expect("apply minimal alert");

    let alert = check_alert_exists(api, &state).await;
    assert_eq!(alert.name, name);
    assert_eq!(state["name"], name.as_str());

    tester.destroy(ALERT, state.clone()).await.expect("destroy");
    check_alert_destroyed(api, state_id(&state)).await;
}

pub async fn scenario_basic(tester: &ProviderTester<LibratoProvider>, api: &dyn LibratoApi) {
    let name = rand_string(10);
    let state = tester
        .apply(ALERT, None, alert_config_basic(&name))
        .await
        .expect("apply basic alert");

    let alert = check_alert_exists(api, &state).await;
    assert_eq!(alert.name, name);
    assert_eq!(alert.description.as_deref(), Some("A Test Alert"));
    assert_eq!(state["description"], "A Test Alert");

    tester.destroy(ALERT, state.clone()).await.expect("destroy");
    check_alert_destroyed(api, state_id(&state)).await;
}

pub async fn scenario_full(tester: &ProviderTester<LibratoProvider>, api: &dyn LibratoApi) {
    let name = rand_string(10);
    let service_state = tester
        .apply(SERVICE, None, service_config("Foo Bar"))
        .await
        .expect("apply service");
    let service_id = service_state["id"].as_str().expect("service id").to_string();

    let state = tester
        .apply(ALERT, None, alert_config_full(&name, &service_id))
        .await
        .expect("apply full alert");

    let alert = check_alert_exists(api, &state).await;
    assert_eq!(alert.name, name);
    assert_eq!(alert.description.as_deref(), Some("A Test Alert"));
    assert_eq!(alert.service_ids(), vec![state_id(&service_state)]);
    assert_eq!(alert.active, Some(false));
    assert_eq!(alert.rearm_seconds, Some(300));
    assert_eq!(
        alert.attributes.as_ref().and_then(|a| a.runbook_url.as_deref()),
        Some(RUNBOOK_URL)
    );

    assert_eq!(alert.conditions.len(), 1);
    let condition = &alert.conditions[0];
    assert_eq!(condition.condition_type, ConditionType::Above);
    assert_eq!(condition.threshold, Some(10.0));
    assert_eq!(condition.duration, Some(600));
    assert_eq!(condition.metric_name, CPU_METRIC);
    assert_eq!(condition.tags.len(), 1);
    assert_eq!(condition.tags[0].name, "some_tag");
    assert_eq!(condition.tags[0].values, vec!["value1"]);

    // Values the server fills in for unset fields are not drift.
    let plan = tester
        .plan_update(ALERT, state.clone(), alert_config_full(&name, &service_id))
        .await
        .expect("plan after apply");
    assert_plan_no_changes(&plan);

    tester.destroy(ALERT, state.clone()).await.expect("destroy alert");
    tester
        .destroy(SERVICE, service_state.clone())
        .await
        .expect("destroy service");
    check_alert_destroyed(api, state_id(&state)).await;
    check_service_destroyed(api, state_id(&service_state)).await;
}

pub async fn scenario_updated(tester: &ProviderTester<LibratoProvider>, api: &dyn LibratoApi) {
    let name = rand_string(10);
    let created = tester
        .apply(ALERT, None, alert_config_basic(&name))
        .await
        .expect("apply basic alert");

    let plan = tester
        .plan_update(ALERT, created.clone(), alert_config_new_value(&name))
        .await
        .expect("plan update");
    assert_plan_updates_in_place(&plan);
    assert_plan_changes_attribute(&plan, "description");

    let updated = tester
        .apply(ALERT, Some(created.clone()), alert_config_new_value(&name))
        .await
        .expect("apply update");
    assert_eq!(updated["id"], created["id"]);

    let alert = check_alert_exists(api, &updated).await;
    assert_eq!(alert.description.as_deref(), Some("A modified Test Alert"));

    tester.destroy(ALERT, updated.clone()).await.expect("destroy");
    check_alert_destroyed(api, state_id(&updated)).await;
}

pub async fn scenario_rename(tester: &ProviderTester<LibratoProvider>, api: &dyn LibratoApi) {
    let name = rand_string(10);
    let created = tester
        .apply(ALERT, None, alert_config_minimal(&name))
        .await
        .expect("apply minimal alert");

    let new_name = rand_string(10);
    let renamed = tester
        .apply(ALERT, Some(created.clone()), alert_config_minimal(&new_name))
        .await
        .expect("apply rename");
    assert_eq!(renamed["id"], created["id"]);

    let alert = check_alert_exists(api, &renamed).await;
    assert_eq!(alert.name, new_name);

    tester.destroy(ALERT, renamed.clone()).await.expect("destroy");
    check_alert_destroyed(api, state_id(&renamed)).await;
}

pub async fn scenario_full_update(tester: &ProviderTester<LibratoProvider>, api: &dyn LibratoApi) {
    let name = rand_string(10);
    let service_state = tester
        .apply(SERVICE, None, service_config("Foo Bar"))
        .await
        .expect("apply service");
    let service_id = service_state["id"].as_str().expect("service id").to_string();

    let created = tester
        .apply(ALERT, None, alert_config_full(&name, &service_id))
        .await
        .expect("apply full alert");
    let updated = tester
        .apply(
            ALERT,
            Some(created.clone()),
            alert_config_full_update(&name, &service_id),
        )
        .await
        .expect("apply full update");
    assert_eq!(updated["id"], created["id"]);

    let alert = check_alert_exists(api, &updated).await;
    assert_eq!(alert.rearm_seconds, Some(1200));
    assert_eq!(alert.conditions.len(), 1);
    assert_eq!(alert.conditions[0].duration, Some(60));
    assert_eq!(alert.conditions[0].threshold, Some(10.0));
    assert!(alert.conditions[0].tags.is_empty());

    let plan = tester
        .plan_update(
            ALERT,
            updated.clone(),
            alert_config_full_update(&name, &service_id),
        )
        .await
        .expect("plan after update");
    assert_plan_no_changes(&plan);

    tester.destroy(ALERT, updated.clone()).await.expect("destroy alert");
    tester
        .destroy(SERVICE, service_state.clone())
        .await
        .expect("destroy service");
    check_alert_destroyed(api, state_id(&updated)).await;
}
