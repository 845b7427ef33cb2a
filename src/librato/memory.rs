//! In-memory [`LibratoApi`] for tests and offline runs.
//!
//! Mirrors the remote's observable behavior: sequential IDs, server-side
//! defaults for `active`, `rearm_seconds` and condition fields, embedded
//! services in alert responses, and not-found errors for unknown IDs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::alert::DEFAULT_REARM_SECONDS;
use super::client::LibratoApi;
use super::models::{Alert, Service, ServiceRef};
use crate::error::ProviderError;

const DEFAULT_SUMMARY_FUNCTION: &str = "average";

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    alerts: BTreeMap<u64, Alert>,
    services: BTreeMap<u64, Service>,
}

impl Store {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_alert(&self, alert: &Alert) -> Result<(), ProviderError> {
        if alert.name.trim().is_empty() {
            return Err(ProviderError::Validation(
                "params.name: is not present".to_string(),
            ));
        }
        for id in alert.service_ids() {
            if !self.services.contains_key(&id) {
                return Err(ProviderError::Validation(format!(
                    "params.services: service {} does not exist",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Stored form of an alert: defaults applied, services embedded.
    fn stored_alert(&self, id: u64, alert: &Alert) -> Alert {
        let mut stored = alert.clone();
        stored.id = Some(id);
        stored.active = Some(alert.active.unwrap_or(true));
        stored.rearm_seconds = Some(alert.rearm_seconds.unwrap_or(DEFAULT_REARM_SECONDS));
        stored.services = alert
            .service_ids()
            .into_iter()
            .map(|id| ServiceRef::Embedded { id })
            .collect();
        for condition in &mut stored.conditions {
            condition
                .summary_function
                .get_or_insert_with(|| DEFAULT_SUMMARY_FUNCTION.to_string());
            condition.detect_reset.get_or_insert(false);
            for tag in &mut condition.tags {
                tag.grouped.get_or_insert(false);
            }
        }
        stored
    }
}

fn check_service(service: &Service) -> Result<(), ProviderError> {
    if service.title.trim().is_empty() {
        return Err(ProviderError::Validation(
            "params.title: is not present".to_string(),
        ));
    }
    if service.service_type.trim().is_empty() {
        return Err(ProviderError::Validation(
            "params.type: is not present".to_string(),
        ));
    }
    Ok(())
}

/// A [`LibratoApi`] backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryClient {
    store: Mutex<Store>,
}

impl MemoryClient {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of alerts currently stored.
    pub async fn alert_count(&self) -> usize {
        self.store.lock().await.alerts.len()
    }

    /// Number of services currently stored.
    pub async fn service_count(&self) -> usize {
        self.store.lock().await.services.len()
    }
}

#[async_trait]
impl LibratoApi for MemoryClient {
    async fn get_alert(&self, id: u64) -> Result<Alert, ProviderError> {
        self.store
            .lock()
            .await
            .alerts
            .get(&id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("alert {}", id)))
    }

    async fn create_alert(&self, alert: &Alert) -> Result<Alert, ProviderError> {
        let mut store = self.store.lock().await;
        store.check_alert(alert)?;
        let id = store.allocate();
        let stored = store.stored_alert(id, alert);
        store.alerts.insert(id, stored.clone());
        debug!(id, "Stored alert");
        Ok(stored)
    }

    async fn update_alert(&self, id: u64, alert: &Alert) -> Result<(), ProviderError> {
        let mut store = self.store.lock().await;
        if !store.alerts.contains_key(&id) {
            return Err(ProviderError::NotFound(format!("alert {}", id)));
        }
        store.check_alert(alert)?;
        let stored = store.stored_alert(id, alert);
        store.alerts.insert(id, stored);
        Ok(())
    }

    async fn delete_alert(&self, id: u64) -> Result<(), ProviderError> {
        self.store
            .lock()
            .await
            .alerts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(format!("alert {}", id)))
    }

    async fn get_service(&self, id: u64) -> Result<Service, ProviderError> {
        self.store
            .lock()
            .await
            .services
            .get(&id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("service {}", id)))
    }

    async fn create_service(&self, service: &Service) -> Result<Service, ProviderError> {
        check_service(service)?;
        let mut store = self.store.lock().await;
        let id = store.allocate();
        let mut stored = service.clone();
        stored.id = Some(id);
        store.services.insert(id, stored.clone());
        debug!(id, "Stored service");
        Ok(stored)
    }

    async fn update_service(&self, id: u64, service: &Service) -> Result<(), ProviderError> {
        check_service(service)?;
        let mut store = self.store.lock().await;
        let Some(existing) = store.services.get_mut(&id) else {
            return Err(ProviderError::NotFound(format!("service {}", id)));
        };
        *existing = Service {
            id: Some(id),
            ..service.clone()
        };
        Ok(())
    }

    async fn delete_service(&self, id: u64) -> Result<(), ProviderError> {
        self.store
            .lock()
            .await
            .services
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(format!("service {}", id)))
    }
}
