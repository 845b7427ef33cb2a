//! Request and response bodies of the Librato alerts and services API.

use serde::{Deserialize, Serialize};

/// Comparison an alert condition performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    /// Fires when the metric rises above the threshold.
    Above,
    /// Fires when the metric falls below the threshold.
    Below,
    /// Fires when the metric stops reporting.
    Absent,
}

impl ConditionType {
    /// Every accepted value, in wire form.
    pub const NAMES: [&'static str; 3] = ["above", "below", "absent"];

    /// Wire name of this condition type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
            Self::Absent => "absent",
        }
    }
}

/// A tag filter narrowing the streams a condition looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouped: Option<bool>,
    #[serde(default)]
    pub values: Vec<String>,
}

/// A single threshold rule within an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_reset: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_function: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<ConditionTag>,
}

/// Free-form alert attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_url: Option<String>,
}

/// A service attached to an alert.
///
/// Requests carry bare IDs; responses embed the whole service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceRef {
    Id(u64),
    Embedded { id: u64 },
}

impl ServiceRef {
    pub fn id(&self) -> u64 {
        match self {
            Self::Id(id) | Self::Embedded { id } => *id,
        }
    }
}

/// A Librato alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: Vec<AlertCondition>,
    #[serde(default)]
    pub services: Vec<ServiceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<AlertAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rearm_seconds: Option<u64>,
}

impl Alert {
    /// An alert with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            conditions: Vec::new(),
            services: Vec::new(),
            attributes: None,
            active: None,
            rearm_seconds: None,
        }
    }

    /// IDs of the attached services.
    pub fn service_ids(&self) -> Vec<u64> {
        self.services.iter().map(ServiceRef::id).collect()
    }
}

/// A Librato notification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub title: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

/// Error body returned by the API on 4xx responses.
///
/// `{"errors": {"params": {"name": ["is not present"]}, "request": ["..."]}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrors {
    #[serde(default)]
    pub errors: serde_json::Value,
}

impl ApiErrors {
    /// Flatten the nested error object into `params.name: is not present; ...`.
    pub fn summary(&self) -> Option<String> {
        let mut parts = Vec::new();
        collect_messages(&self.errors, String::new(), &mut parts);
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

fn collect_messages(value: &serde_json::Value, prefix: String, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, inner) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                collect_messages(inner, path, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_messages(item, prefix.clone(), out);
            }
        }
        serde_json::Value::Null => {}
        other => {
            let message = other
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string());
            if prefix.is_empty() {
                out.push(message);
            } else {
                out.push(format!("{}: {}", prefix, message));
            }
        }
    }
}
