//! The `librato_service` resource.
//!
//! `settings` is carried as a JSON-encoded string. It is rewritten into a
//! canonical encoding (sorted keys, compact) before planning and whenever
//! state is written, so a reformatted configuration plans no changes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::client::LibratoApi;
use super::models::Service;
use super::{parse_id, parse_id_str};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Resource type name.
pub const RESOURCE_TYPE: &str = "librato_service";

/// Schema of `librato_service`.
pub fn schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("title", Attribute::required_string().non_empty())
        .with_attribute(
            "type",
            Attribute::required_string()
                .non_empty()
                .with_force_new()
                .with_description("Integration type, e.g. mail, slack, pagerduty."),
        )
        .with_attribute(
            "settings",
            Attribute::required_string()
                .json_object()
                .with_description("Integration settings as a JSON object."),
        )
}

/// Parse a settings string into its object form.
pub fn parse_settings(raw: &str) -> Result<Map<String, Value>, ProviderError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(ProviderError::Validation(format!(
            "settings must be a JSON object, got {}",
            other
        ))),
    }
}

/// Canonical encoding of a settings object.
pub fn encode_settings(settings: &Map<String, Value>) -> String {
    sorted(&Value::Object(settings.clone())).to_string()
}

/// Re-encode a settings string canonically.
pub fn normalize_settings(raw: &str) -> Result<String, ProviderError> {
    parse_settings(raw).map(|settings| encode_settings(&settings))
}

/// Canonicalize `settings` inside a configuration object in place.
///
/// Values that do not parse are left alone for validation to report.
pub fn normalize_config(config: &mut Value) {
    let Some(raw) = config.get("settings").and_then(Value::as_str) else {
        return;
    };
    if let Ok(normalized) = normalize_settings(raw) {
        config["settings"] = Value::String(normalized);
    }
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Service state as stored by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ServiceState {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub settings: String,
}

impl ServiceState {
    /// Parse state or planned configuration.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize back into host state.
    pub fn into_value(self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Build the full API representation.
    pub fn to_service(&self) -> Result<Service, ProviderError> {
        Ok(Service {
            id: None,
            title: self.title.clone(),
            service_type: self.service_type.clone(),
            settings: parse_settings(&self.settings)?,
        })
    }

    /// Map an API service into state. `id` is used when the body omits one.
    pub fn from_service(service: &Service, id: u64) -> Self {
        Self {
            id: Some(service.id.unwrap_or(id).to_string()),
            title: service.title.clone(),
            service_type: service.service_type.clone(),
            settings: encode_settings(&service.settings),
        }
    }
}

/// Create the service and return its state.
#[instrument(skip_all, name = "librato_service.create")]
pub async fn create(api: &dyn LibratoApi, planned: Value) -> Result<Value, ProviderError> {
    let desired = ServiceState::from_value(planned)?;
    let created = api.create_service(&desired.to_service()?).await?;
    let id = created
        .id
        .ok_or_else(|| ProviderError::InvalidId("create service response has no ID".to_string()))?;

    info!(id, title = %created.title, "Created service");
    ServiceState::from_service(&created, id).into_value()
}

/// Refresh state from the API; `None` when the service is gone.
#[instrument(skip_all, name = "librato_service.read")]
pub async fn read(api: &dyn LibratoApi, state: Value) -> Result<Option<Value>, ProviderError> {
    let id = parse_id(&state)?;
    match api.get_service(id).await {
        Ok(service) => ServiceState::from_service(&service, id).into_value().map(Some),
        Err(e) if e.is_not_found() => {
            warn!(id, "Service no longer exists, removing from state");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Replace the service with the planned representation, then re-read it.
#[instrument(skip_all, name = "librato_service.update")]
pub async fn update(
    api: &dyn LibratoApi,
    prior: Value,
    planned: Value,
) -> Result<Value, ProviderError> {
    let id = parse_id(&prior)?;
    let desired = ServiceState::from_value(planned)?;

    debug!(id, "Updating service");
    api.update_service(id, &desired.to_service()?).await?;

    let service = api.get_service(id).await?;
    info!(id, title = %service.title, "Updated service");
    ServiceState::from_service(&service, id).into_value()
}

/// Delete the service; a service that is already gone counts as deleted.
#[instrument(skip_all, name = "librato_service.delete")]
pub async fn delete(api: &dyn LibratoApi, state: Value) -> Result<(), ProviderError> {
    let id = parse_id(&state)?;
    match api.delete_service(id).await {
        Ok(()) => {
            info!(id, "Deleted service");
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            debug!(id, "Service already deleted");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Import an existing service by ID.
#[instrument(skip(api), name = "librato_service.import")]
pub async fn import(api: &dyn LibratoApi, id: &str) -> Result<Value, ProviderError> {
    let id = parse_id_str(id)?;
    let service = api.get_service(id).await?;
    ServiceState::from_service(&service, id).into_value()
}
