//! Librato Provider
//!
//! Declarative management of Librato alerts and the notification services
//! they fire into.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **Schema types**: Attribute and block descriptions that drive validation and planning
//! - **ProviderService trait**: The interface a host drives through validate, plan, apply, refresh and destroy
//! - **Librato provider**: The `librato_alert` and `librato_service` resources
//! - **API clients**: An HTTPS client for the Librato API and an in-memory one for tests
//! - **Error types**: A single error enum shared by the provider and the clients
//! - **Logging**: Integration with `tracing` for structured logging
//! - **Testing**: A harness that runs acceptance scenarios in-process
//!
//! # Quick Start
//!
//! ```ignore
//! use librato_provider::{LibratoProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     librato_provider::init_logging();
//!
//!     let provider = LibratoProvider::new();
//!     provider
//!         .configure(json!({"email": "ops@example.com", "token": "..."}))
//!         .await?;
//!
//!     let config = json!({
//!         "name": "cpu.idle",
//!         "condition": [{
//!             "type": "above",
//!             "metric_name": "librato.cpu.percent.idle",
//!             "threshold": 10,
//!             "duration": 600
//!         }]
//!     });
//!     let plan = provider.plan("librato_alert", None, config).await?;
//!     let state = provider.create("librato_alert", plan.planned_state).await?;
//!     println!("created alert {}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Resources
//!
//! - **librato_alert**: name, description, services, conditions (with tag
//!   filters), runbook attributes, `active` and `rearm_seconds`
//! - **librato_service**: title, type (changing it replaces the service) and
//!   JSON settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod librato;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod schema;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use error::ProviderError;
pub use librato::client::{LibratoApi, LibratoClient};
pub use librato::config::ProviderConfig;
pub use librato::memory::MemoryClient;
pub use librato::LibratoProvider;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::ProviderService;
pub use schema::{Diagnostic, ProviderSchema};
pub use types::{AttributeChange, ImportedResource, PlanAction, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
