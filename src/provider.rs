//! The provider interface the host drives.
//!
//! [`ProviderService`] is the seam between the host's resource lifecycle
//! (validate → plan → apply → refresh → destroy) and a concrete provider.
//! Default methods cover everything that only needs the schema; a provider
//! implements configuration and the four CRUD operations.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::plan;
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation;

/// Trait that provider implementations must implement.
///
/// State and configuration travel as JSON objects keyed by schema attribute
/// and block names.
#[async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata, derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> = self.schema().resources.keys().cloned().collect();
        resources.sort();
        ProviderMetadata { resources }
    }

    /// Look up the schema of a resource type.
    fn resource_schema(&self, resource_type: &str) -> Result<Schema, ProviderError> {
        self.schema()
            .resources
            .remove(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        Ok(validation::validate(&schema, &config))
    }

    /// Plan changes for a resource. A null `proposed_state` plans destruction.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        Ok(plan::plan(&schema, prior_state.as_ref(), &proposed_state))
    }

    /// Create a new resource and return its state.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    ///
    /// Returns `None` when the remote object no longer exists, so the host
    /// can drop it from state instead of failing.
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError>;

    /// Update an existing resource in place and return its refreshed state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource. Deleting something already gone succeeds.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}
