//! Testing utilities for provider implementations.
//!
//! [`ProviderTester`] drives a `ProviderService` through the same steps the
//! host takes (validate, plan, apply, refresh, destroy) so acceptance
//! scenarios can run in-process.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use librato_provider::{testing::ProviderTester, LibratoProvider, MemoryClient};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_alert() {
//!     let api = Arc::new(MemoryClient::new());
//!     let tester = ProviderTester::new(LibratoProvider::with_api(api));
//!
//!     let state = tester
//!         .apply("librato_alert", None, json!({"name": "cpu"}))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["name"], "cpu");
//! }
//! ```

use crate::error::ProviderError;
use crate::provider::ProviderService;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanAction, PlanResult};
use serde_json::Value;
use tracing::debug;

/// A test harness for provider implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider.plan(resource_type, None, config).await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource. `None` means it is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Apply `config` on top of `prior_state` the way the host does:
    /// validate → plan → create/update/replace → read.
    ///
    /// Returns the refreshed state.
    pub async fn apply(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate_resource_config(resource_type, config.clone())
            .await?;

        let had_prior = prior_state.is_some();
        let plan = self
            .provider
            .plan(resource_type, prior_state.clone(), config)
            .await?;
        let action = plan.action(had_prior);
        debug!(resource_type, ?action, changes = plan.changes.len(), "Applying plan");

        let state = match (action, prior_state) {
            (PlanAction::NoOp, Some(prior)) => prior,
            (PlanAction::Update, Some(prior)) => {
                self.update(resource_type, prior, plan.planned_state)
                    .await?
            }
            (PlanAction::Replace, Some(prior)) => {
                self.delete(resource_type, prior).await?;
                self.create(resource_type, plan.planned_state).await?
            }
            _ => self.create(resource_type, plan.planned_state).await?,
        };

        self.refresh(resource_type, state).await?.ok_or_else(|| {
            TestError::Provider(ProviderError::NotFound(format!(
                "{} vanished right after apply",
                resource_type
            )))
        })
    }

    /// Refresh state from the remote. `None` means the resource is gone.
    pub async fn refresh(
        &self,
        resource_type: &str,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.read(resource_type, state).await
    }

    /// Run a destroy: plan deletion, then delete.
    pub async fn destroy(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        let plan = self.plan_delete(resource_type, state.clone()).await?;
        assert_plan_deletes(&plan);
        self.delete(resource_type, state).await
    }

    /// Run a full CRUD lifecycle: apply → apply update → destroy.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, TestError> {
        let created = self.apply(resource_type, None, initial_config).await?;
        let updated = self
            .apply(resource_type, Some(created), updated_config)
            .await?;
        self.destroy(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl TestError {
    /// The provider error, if this is one.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            TestError::Provider(e) => Some(e),
            TestError::Diagnostics(_) => None,
        }
    }
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Return the error diagnostics, if any, as a [`TestError`].
pub fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// State Helpers
// =========================================================================

/// Look up a dotted path such as `condition.0.tag.0.name` in resource state.
///
/// Numeric segments index into arrays.
pub fn state_attr<'a>(state: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(state, |value, segment| match value {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

/// Assert that `path` in `state` equals `expected`.
///
/// # Panics
///
/// Panics if the path is missing or holds a different value.
pub fn assert_state_attr(state: &Value, path: &str, expected: Value) {
    let actual = state_attr(state, path);
    assert_eq!(
        actual,
        Some(&expected),
        "Expected state attribute '{}' to be {}, got {:?}",
        path,
        expected,
        actual
    );
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result destroys the resource.
///
/// # Panics
///
/// Panics if the plan keeps a planned state.
pub fn assert_plan_deletes(plan: &PlanResult) {
    assert!(
        plan.planned_state.is_null(),
        "Expected plan to delete, but it plans state {}",
        plan.planned_state
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan result indicates changes are needed.
///
/// # Panics
///
/// Panics if the plan has no changes.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes, but got no changes"
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan changes something without replacing the resource.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert_plan_has_changes(plan);
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes_attribute(path),
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not have a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan has a change for the given path.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        !plan.changes_attribute(path),
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        crate::schema::has_errors(diagnostics),
        "Expected at least one error, but got none"
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| d.is_error() && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}
