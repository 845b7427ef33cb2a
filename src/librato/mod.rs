//! Librato alerts and notification services.
//!
//! [`LibratoProvider`] implements [`ProviderService`] for the
//! `librato_alert` and `librato_service` resources. It holds no client until
//! [`ProviderService::configure`] succeeds; handlers receive the client
//! explicitly.

pub mod alert;
pub mod client;
pub mod config;
pub mod memory;
#[allow(missing_docs)]
pub mod models;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use self::client::{LibratoApi, LibratoClient};
use self::config::ProviderConfig;
use crate::error::ProviderError;
use crate::plan;
use crate::provider::ProviderService;
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Read the numeric ID stored under `id` in resource state.
pub(crate) fn parse_id(state: &Value) -> Result<u64, ProviderError> {
    match state.get("id") {
        Some(Value::String(raw)) => parse_id_str(raw),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| ProviderError::InvalidId(n.to_string())),
        _ => Err(ProviderError::InvalidId("state has no id".to_string())),
    }
}

pub(crate) fn parse_id_str(raw: &str) -> Result<u64, ProviderError> {
    raw.trim()
        .parse()
        .map_err(|_| ProviderError::InvalidId(format!("\"{}\" is not a numeric ID", raw)))
}

/// The Librato provider.
pub struct LibratoProvider {
    api: RwLock<Option<Arc<dyn LibratoApi>>>,
}

impl LibratoProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self {
            api: RwLock::new(None),
        }
    }

    /// A provider that talks to `api` without going through `configure`.
    pub fn with_api(api: Arc<dyn LibratoApi>) -> Self {
        Self {
            api: RwLock::new(Some(api)),
        }
    }

    async fn api(&self) -> Result<Arc<dyn LibratoApi>, ProviderError> {
        self.api
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::Configuration("provider not configured".to_string()))
    }

    /// Validate `config`, resolve credentials through `env`, and install a
    /// client. The client is left untouched when diagnostics carry errors.
    async fn configure_with<F>(
        &self,
        config: &Value,
        env: F,
    ) -> Result<Vec<Diagnostic>, ProviderError>
    where
        F: Fn(&str) -> Option<String> + Send,
    {
        let diagnostics = validation::validate(&config::schema(), config);
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }

        let resolved = match ProviderConfig::resolve_with(config, env) {
            Ok(resolved) => resolved,
            Err(diagnostics) => return Ok(diagnostics),
        };
        let client = LibratoClient::new(&resolved)?;
        info!(url = %client.base_url(), email = %resolved.email, "Configured Librato client");

        *self.api.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }
}

impl Default for LibratoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LibratoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibratoProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderService for LibratoProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(config::schema())
            .with_resource(alert::RESOURCE_TYPE, alert::schema())
            .with_resource(service::RESOURCE_TYPE, service::schema())
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&config::schema(), &config);
        if let Err(missing) = ProviderConfig::resolve(&config) {
            diagnostics.extend(missing);
        }
        Ok(diagnostics)
    }

    #[instrument(skip_all, name = "librato.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        self.configure_with(&config, |key| std::env::var(key).ok()).await
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        let mut diagnostics = validation::validate(&schema, &config);
        if resource_type == alert::RESOURCE_TYPE {
            diagnostics.extend(alert::validate(&config));
        }
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        mut proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        if resource_type == service::RESOURCE_TYPE {
            service::normalize_config(&mut proposed_state);
        }
        Ok(plan::plan(&schema, prior_state.as_ref(), &proposed_state))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let api = self.api().await?;
        match resource_type {
            alert::RESOURCE_TYPE => alert::create(api.as_ref(), planned_state).await,
            service::RESOURCE_TYPE => service::create(api.as_ref(), planned_state).await,
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let api = self.api().await?;
        match resource_type {
            alert::RESOURCE_TYPE => alert::read(api.as_ref(), current_state).await,
            service::RESOURCE_TYPE => service::read(api.as_ref(), current_state).await,
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let api = self.api().await?;
        match resource_type {
            alert::RESOURCE_TYPE => alert::update(api.as_ref(), prior_state, planned_state).await,
            service::RESOURCE_TYPE => {
                service::update(api.as_ref(), prior_state, planned_state).await
            }
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let api = self.api().await?;
        match resource_type {
            alert::RESOURCE_TYPE => alert::delete(api.as_ref(), current_state).await,
            service::RESOURCE_TYPE => service::delete(api.as_ref(), current_state).await,
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let api = self.api().await?;
        let state = match resource_type {
            alert::RESOURCE_TYPE => alert::import(api.as_ref(), id).await?,
            service::RESOURCE_TYPE => service::import(api.as_ref(), id).await?,
            other => return Err(ProviderError::UnknownResource(other.to_string())),
        };
        Ok(vec![ImportedResource::new(resource_type, state)])
    }
}
