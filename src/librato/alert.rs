//! The `librato_alert` resource.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::client::LibratoApi;
use super::models::{
    Alert, AlertAttributes, AlertCondition, ConditionTag, ConditionType, ServiceRef,
};
use super::{parse_id, parse_id_str};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};

/// Resource type name.
pub const RESOURCE_TYPE: &str = "librato_alert";

/// Server-side default for `rearm_seconds`.
pub const DEFAULT_REARM_SECONDS: u64 = 600;

/// Schema of `librato_alert`.
pub fn schema() -> Schema {
    let tag = Block::new()
        .with_attribute("name", Attribute::required_string().non_empty())
        .with_attribute("grouped", Attribute::optional_bool().with_computed())
        .with_attribute("values", Attribute::optional_string_list());

    let condition = Block::new()
        .with_attribute(
            "type",
            Attribute::required_string().one_of(ConditionType::NAMES),
        )
        .with_attribute("metric_name", Attribute::required_string().non_empty())
        .with_attribute("threshold", Attribute::optional_float64())
        .with_attribute(
            "duration",
            Attribute::optional_int64()
                .at_least(0)
                .with_description("Seconds the condition must hold before firing."),
        )
        .with_attribute("source", Attribute::optional_string().with_computed())
        .with_attribute("detect_reset", Attribute::optional_bool().with_computed())
        .with_attribute(
            "summary_function",
            Attribute::optional_string()
                .with_computed()
                .with_description("Defaults to average on the server."),
        )
        .with_block("tag", NestedBlock::list(tag));

    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("name", Attribute::required_string().non_empty())
        .with_attribute("description", Attribute::optional_string())
        .with_attribute(
            "services",
            Attribute::optional_string_set().with_description("IDs of librato_service resources to notify."),
        )
        .with_attribute("active", Attribute::optional_bool().with_default(json!(true)))
        .with_attribute(
            "rearm_seconds",
            Attribute::optional_int64()
                .at_least(0)
                .with_default(json!(DEFAULT_REARM_SECONDS)),
        )
        .with_block("condition", NestedBlock::set(condition))
        .with_block(
            "attributes",
            NestedBlock::single(
                Block::new().with_attribute("runbook_url", Attribute::optional_string()),
            ),
        )
}

/// Checks the schema cannot express.
pub fn validate(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if let Some(services) = config.get("services").and_then(Value::as_array) {
        for (i, service) in services.iter().enumerate() {
            if let Some(raw) = service.as_str() {
                if parse_id_str(raw).is_err() {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid service ID \"{}\"", raw))
                            .with_detail("Service IDs are numeric")
                            .with_attribute(format!("services.{}", i)),
                    );
                }
            }
        }
    }

    if let Some(conditions) = config.get("condition").and_then(Value::as_array) {
        for (i, condition) in conditions.iter().enumerate() {
            let ty = condition.get("type").and_then(Value::as_str);
            let has_threshold = condition.get("threshold").is_some_and(|t| !t.is_null());
            if matches!(ty, Some("above") | Some("below")) && !has_threshold {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Condition of type \"{}\" needs a threshold",
                        ty.unwrap_or_default()
                    ))
                    .with_attribute(format!("condition.{}.threshold", i)),
                );
            }
        }
    }

    diagnostics
}

/// Alert state as stored by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AlertState {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub services: Option<Vec<String>>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub rearm_seconds: Option<u64>,
    #[serde(default)]
    pub condition: Option<Vec<ConditionState>>,
    #[serde(default)]
    pub attributes: Option<AttributesState>,
}

/// One `condition` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ConditionState {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub metric_name: String,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub detect_reset: Option<bool>,
    #[serde(default)]
    pub summary_function: Option<String>,
    #[serde(default)]
    pub tag: Option<Vec<TagState>>,
}

/// One `tag` block inside a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TagState {
    pub name: String,
    #[serde(default)]
    pub grouped: Option<bool>,
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

/// The `attributes` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AttributesState {
    #[serde(default)]
    pub runbook_url: Option<String>,
}

impl AlertState {
    /// Parse state or planned configuration.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize back into host state.
    pub fn into_value(self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Build the full API representation.
    pub fn to_alert(&self) -> Result<Alert, ProviderError> {
        let services = self
            .services
            .iter()
            .flatten()
            .map(|raw| {
                parse_id_str(raw).map(ServiceRef::Id).map_err(|_| {
                    ProviderError::Validation(format!("services: \"{}\" is not a service ID", raw))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let conditions = self
            .condition
            .iter()
            .flatten()
            .map(|c| AlertCondition {
                condition_type: c.condition_type,
                metric_name: c.metric_name.clone(),
                threshold: c.threshold,
                duration: c.duration,
                source: c.source.clone(),
                detect_reset: c.detect_reset,
                summary_function: c.summary_function.clone(),
                tags: c
                    .tag
                    .iter()
                    .flatten()
                    .map(|t| ConditionTag {
                        name: t.name.clone(),
                        grouped: t.grouped,
                        values: t.values.clone().unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        Ok(Alert {
            id: None,
            name: self.name.clone(),
            description: self.description.clone(),
            conditions,
            services,
            attributes: self.attributes.as_ref().map(|a| AlertAttributes {
                runbook_url: a.runbook_url.clone(),
            }),
            active: self.active,
            rearm_seconds: self.rearm_seconds,
        })
    }

    /// The body of a PUT. Unset `description` and `attributes` are sent
    /// cleared so the server drops their previous values.
    pub fn to_replacement(&self) -> Result<Alert, ProviderError> {
        let mut alert = self.to_alert()?;
        alert.description.get_or_insert_with(String::new);
        alert.attributes.get_or_insert_with(AlertAttributes::default);
        Ok(alert)
    }

    /// Map an API alert into state. `id` is used when the body omits one.
    /// A cleared description or attributes object maps back to unset.
    pub fn from_alert(alert: &Alert, id: u64) -> Self {
        let condition = alert
            .conditions
            .iter()
            .map(|c| ConditionState {
                condition_type: c.condition_type,
                metric_name: c.metric_name.clone(),
                threshold: c.threshold,
                duration: c.duration,
                source: c.source.clone(),
                detect_reset: c.detect_reset,
                summary_function: c.summary_function.clone(),
                tag: (!c.tags.is_empty()).then(|| {
                    c.tags
                        .iter()
                        .map(|t| TagState {
                            name: t.name.clone(),
                            grouped: t.grouped,
                            values: Some(t.values.clone()),
                        })
                        .collect()
                }),
            })
            .collect();

        Self {
            id: Some(alert.id.unwrap_or(id).to_string()),
            name: alert.name.clone(),
            description: alert.description.clone().filter(|d| !d.is_empty()),
            services: Some(
                alert
                    .service_ids()
                    .into_iter()
                    .map(|id| id.to_string())
                    .collect(),
            ),
            active: alert.active,
            rearm_seconds: alert.rearm_seconds,
            condition: Some(condition),
            attributes: alert
                .attributes
                .as_ref()
                .filter(|a| a.runbook_url.is_some())
                .map(|a| AttributesState {
                    runbook_url: a.runbook_url.clone(),
                }),
        }
    }
}

/// Create the alert and return its state.
#[instrument(skip_all, name = "librato_alert.create")]
pub async fn create(api: &dyn LibratoApi, planned: Value) -> Result<Value, ProviderError> {
    let desired = AlertState::from_value(planned)?;
    let created = api.create_alert(&desired.to_alert()?).await?;
    let id = created
        .id
        .ok_or_else(|| ProviderError::InvalidId("create alert response has no ID".to_string()))?;

    info!(id, name = %created.name, "Created alert");
    AlertState::from_alert(&created, id).into_value()
}

/// Refresh state from the API; `None` when the alert is gone.
#[instrument(skip_all, name = "librato_alert.read")]
pub async fn read(api: &dyn LibratoApi, state: Value) -> Result<Option<Value>, ProviderError> {
    let id = parse_id(&state)?;
    match api.get_alert(id).await {
        Ok(alert) => AlertState::from_alert(&alert, id).into_value().map(Some),
        Err(e) if e.is_not_found() => {
            warn!(id, "Alert no longer exists, removing from state");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Replace the alert with the planned representation, then re-read it.
#[instrument(skip_all, name = "librato_alert.update")]
pub async fn update(
    api: &dyn LibratoApi,
    prior: Value,
    planned: Value,
) -> Result<Value, ProviderError> {
    let id = parse_id(&prior)?;
    let desired = AlertState::from_value(planned)?;

    debug!(id, "Updating alert");
    api.update_alert(id, &desired.to_replacement()?).await?;

    let alert = api.get_alert(id).await?;
    info!(id, name = %alert.name, "Updated alert");
    AlertState::from_alert(&alert, id).into_value()
}

/// Delete the alert; an alert that is already gone counts as deleted.
#[instrument(skip_all, name = "librato_alert.delete")]
pub async fn delete(api: &dyn LibratoApi, state: Value) -> Result<(), ProviderError> {
    let id = parse_id(&state)?;
    match api.delete_alert(id).await {
        Ok(()) => {
            info!(id, "Deleted alert");
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            debug!(id, "Alert already deleted");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Import an existing alert by ID.
#[instrument(skip(api), name = "librato_alert.import")]
pub async fn import(api: &dyn LibratoApi, id: &str) -> Result<Value, ProviderError> {
    let id = parse_id_str(id)?;
    let alert = api.get_alert(id).await?;
    AlertState::from_alert(&alert, id).into_value()
}
