mod common;

use common::*;
use librato_provider::testing::{
    assert_error_contains, assert_plan_changes_attribute, assert_plan_no_changes,
    assert_plan_updates_in_place, assert_state_attr, TestError,
};
use librato_provider::{LibratoApi, ProviderError, ProviderService};
use serde_json::json;

#[tokio::test]
async fn test_alert_minimal() {
    init();
    let (api, tester) = memory_tester();
    scenario_minimal(&tester, api.as_ref()).await;
}

#[tokio::test]
async fn test_alert_basic() {
    init();
    let (api, tester) = memory_tester();
    scenario_basic(&tester, api.as_ref()).await;
}

#[tokio::test]
async fn test_alert_full() {
    init();
    let (api, tester) = memory_tester();
    scenario_full(&tester, api.as_ref()).await;
}

#[tokio::test]
async fn test_alert_updated() {
    init();
    let (api, tester) = memory_tester();
    scenario_updated(&tester, api.as_ref()).await;
}

#[tokio::test]
async fn test_alert_rename() {
    init();
    let (api, tester) = memory_tester();
    scenario_rename(&tester, api.as_ref()).await;
}

#[tokio::test]
async fn test_alert_full_update() {
    init();
    let (api, tester) = memory_tester();
    scenario_full_update(&tester, api.as_ref()).await;
}

#[tokio::test]
async fn test_alert_state_carries_server_defaults() {
    let (_api, tester) = memory_tester();
    let state = tester
        .apply(ALERT, None, alert_config_minimal("cpu"))
        .await
        .unwrap();

    assert_state_attr(&state, "active", json!(true));
    assert_state_attr(&state, "rearm_seconds", json!(600));
    assert_state_attr(&state, "services", json!([]));

    let plan = tester
        .plan_update(ALERT, state, alert_config_minimal("cpu"))
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_alert_full_state_paths() {
    let (_api, tester) = memory_tester();
    let service = tester
        .apply(SERVICE, None, service_config("Foo Bar"))
        .await
        .unwrap();
    let service_id = service["id"].as_str().unwrap().to_string();

    let state = tester
        .apply(ALERT, None, alert_config_full("cpu", &service_id))
        .await
        .unwrap();

    assert_state_attr(&state, "services.0", json!(service_id));
    assert_state_attr(&state, "condition.0.type", json!("above"));
    assert_state_attr(&state, "condition.0.metric_name", json!(CPU_METRIC));
    assert_state_attr(&state, "condition.0.tag.0.name", json!("some_tag"));
    assert_state_attr(&state, "condition.0.tag.0.values.0", json!("value1"));
    assert_state_attr(&state, "attributes.runbook_url", json!(RUNBOOK_URL));
    assert_state_attr(&state, "active", json!(false));

    let plan = tester
        .plan_update(ALERT, state, alert_config_full("cpu", &service_id))
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_alert_server_filled_condition_fields_are_not_drift() {
    let (api, tester) = memory_tester();
    let config = json!({
        "name": "cpu",
        "condition": [{
            "type": "above",
            "metric_name": CPU_METRIC,
            "threshold": 10,
            "tag": [{"name": "host", "values": ["web1"]}]
        }]
    });
    let state = tester.apply(ALERT, None, config.clone()).await.unwrap();

    let alert = check_alert_exists(api.as_ref(), &state).await;
    assert_eq!(alert.conditions[0].summary_function.as_deref(), Some("average"));
    assert_eq!(alert.conditions[0].detect_reset, Some(false));
    assert_eq!(alert.conditions[0].tags[0].grouped, Some(false));
    assert_state_attr(&state, "condition.0.summary_function", json!("average"));
    assert_state_attr(&state, "condition.0.tag.0.grouped", json!(false));

    let plan = tester
        .plan_update(ALERT, state.clone(), config.clone())
        .await
        .unwrap();
    assert_plan_no_changes(&plan);

    let mut explicit = config;
    explicit["condition"][0]["summary_function"] = json!("max");
    let plan = tester.plan_update(ALERT, state, explicit).await.unwrap();
    assert_plan_updates_in_place(&plan);
    assert_plan_changes_attribute(&plan, "condition");
}

#[tokio::test]
async fn test_alert_condition_order_is_not_significant() {
    let (_api, tester) = memory_tester();
    let config = json!({
        "name": "cpu",
        "condition": [
            {"type": "above", "metric_name": "cpu.user", "threshold": 90, "duration": 60},
            {"type": "absent", "metric_name": "cpu.idle", "duration": 300}
        ]
    });
    let state = tester.apply(ALERT, None, config).await.unwrap();

    let reordered = json!({
        "name": "cpu",
        "condition": [
            {"type": "absent", "metric_name": "cpu.idle", "duration": 300},
            {"type": "above", "metric_name": "cpu.user", "threshold": 90.0, "duration": 60}
        ]
    });
    let plan = tester.plan_update(ALERT, state, reordered).await.unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_alert_condition_change_updates_in_place() {
    let (_api, tester) = memory_tester();
    let service = tester
        .apply(SERVICE, None, service_config("Foo Bar"))
        .await
        .unwrap();
    let service_id = service["id"].as_str().unwrap().to_string();

    let state = tester
        .apply(ALERT, None, alert_config_full("cpu", &service_id))
        .await
        .unwrap();

    let plan = tester
        .plan_update(ALERT, state, alert_config_full_update("cpu", &service_id))
        .await
        .unwrap();

    assert_plan_updates_in_place(&plan);
    assert_plan_changes_attribute(&plan, "condition");
    assert_plan_changes_attribute(&plan, "rearm_seconds");
}

#[tokio::test]
async fn test_alert_removed_outside_is_dropped_from_state() {
    let (api, tester) = memory_tester();
    let state = tester
        .apply(ALERT, None, alert_config_basic("cpu"))
        .await
        .unwrap();

    api.delete_alert(state_id(&state)).await.unwrap();

    let refreshed = tester.refresh(ALERT, state.clone()).await.unwrap();
    assert!(refreshed.is_none());

    // Destroying something already gone still succeeds.
    tester.destroy(ALERT, state).await.unwrap();
}

#[tokio::test]
async fn test_alert_update_after_remote_delete_is_not_found() {
    let (api, tester) = memory_tester();
    let state = tester
        .apply(ALERT, None, alert_config_basic("cpu"))
        .await
        .unwrap();
    api.delete_alert(state_id(&state)).await.unwrap();

    let err = tester
        .apply(ALERT, Some(state), alert_config_new_value("cpu"))
        .await
        .unwrap_err();
    assert!(err.provider_error().is_some_and(ProviderError::is_not_found));
}

#[tokio::test]
async fn test_alert_invalid_id_is_fatal() {
    let (_api, tester) = memory_tester();
    let err = tester
        .read(ALERT, json!({"id": "not-a-number", "name": "cpu"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidId(_)));

    let err = tester
        .delete(ALERT, json!({"name": "cpu"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidId(_)));
}

#[tokio::test]
async fn test_alert_import() {
    let (_api, tester) = memory_tester();
    let state = tester
        .apply(ALERT, None, alert_config_basic("cpu"))
        .await
        .unwrap();

    let imported = tester
        .import_resource(ALERT, state["id"].as_str().unwrap())
        .await
        .unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].resource_type, ALERT);
    assert_eq!(imported[0].state, state);

    let err = tester.import_resource(ALERT, "4242").await.unwrap_err();
    assert!(err.is_not_found());
    let err = tester.import_resource(ALERT, "abc").await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidId(_)));
}

#[tokio::test]
async fn test_alert_validation() {
    let (_api, tester) = memory_tester();

    let diagnostics = tester
        .provider()
        .validate_resource_config(
            ALERT,
            json!({
                "name": "cpu",
                "services": ["mail"],
                "condition": [{"type": "sideways", "metric_name": "cpu"}],
                "rearm_seconds": -1
            }),
        )
        .await
        .unwrap();

    assert_error_contains(&diagnostics, "Invalid value for attribute 'condition.0.type'");
    assert_error_contains(&diagnostics, "Invalid service ID");
    assert_error_contains(&diagnostics, "out of range");

    let err = tester
        .apply(ALERT, None, json!({"description": "no name"}))
        .await
        .unwrap_err();
    match err {
        TestError::Diagnostics(diagnostics) => {
            assert_error_contains(&diagnostics, "Missing required attribute 'name'");
        }
        other => panic!("expected diagnostics, got {}", other),
    }
}

#[tokio::test]
async fn test_alert_unknown_service_is_rejected_remotely() {
    let (api, tester) = memory_tester();
    let err = tester
        .apply(
            ALERT,
            None,
            json!({"name": "cpu", "services": ["999"]}),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err.provider_error(),
        Some(ProviderError::Validation(_))
    ));
    assert_eq!(api.alert_count().await, 0);
}

#[tokio::test]
async fn test_alert_read_returns_created_condition() {
    let (api, tester) = memory_tester();
    let config = json!({
        "name": "abc1234567",
        "condition": [{
            "type": "above",
            "threshold": 10,
            "duration": 600,
            "metric_name": CPU_METRIC
        }]
    });

    let state = tester.apply(ALERT, None, config.clone()).await.unwrap();
    let read = tester
        .read(ALERT, state.clone())
        .await
        .unwrap()
        .expect("alert exists");
    assert_eq!(read, state);

    assert_state_attr(&read, "name", json!("abc1234567"));
    assert_state_attr(&read, "condition.0.type", json!("above"));
    assert_state_attr(&read, "condition.0.threshold", json!(10.0));
    assert_state_attr(&read, "condition.0.duration", json!(600));
    assert_state_attr(&read, "condition.0.metric_name", json!(CPU_METRIC));

    let alert = check_alert_exists(api.as_ref(), &read).await;
    assert_eq!(alert.conditions[0].metric_name, CPU_METRIC);

    let plan = tester.plan_update(ALERT, read, config).await.unwrap();
    assert_plan_no_changes(&plan);
}
