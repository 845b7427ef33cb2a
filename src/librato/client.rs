//! HTTP binding for the Librato alerts and services endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use super::config::ProviderConfig;
use super::models::{Alert, ApiErrors, Service};
use crate::error::ProviderError;

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://metrics-api.librato.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the provider needs from the Librato API.
///
/// Implementations return [`ProviderError::NotFound`] when the remote object
/// does not exist; handlers rely on that to detect drift.
#[async_trait]
pub trait LibratoApi: Send + Sync {
    /// Fetch an alert by ID.
    async fn get_alert(&self, id: u64) -> Result<Alert, ProviderError>;
    /// Create an alert; the returned alert carries the assigned ID.
    async fn create_alert(&self, alert: &Alert) -> Result<Alert, ProviderError>;
    /// Replace the alert's full representation.
    async fn update_alert(&self, id: u64, alert: &Alert) -> Result<(), ProviderError>;
    /// Delete an alert.
    async fn delete_alert(&self, id: u64) -> Result<(), ProviderError>;

    /// Fetch a service by ID.
    async fn get_service(&self, id: u64) -> Result<Service, ProviderError>;
    /// Create a service; the returned service carries the assigned ID.
    async fn create_service(&self, service: &Service) -> Result<Service, ProviderError>;
    /// Replace the service's full representation.
    async fn update_service(&self, id: u64, service: &Service) -> Result<(), ProviderError>;
    /// Delete a service.
    async fn delete_service(&self, id: u64) -> Result<(), ProviderError>;
}

/// [`LibratoApi`] over HTTPS with basic authentication.
#[derive(Clone)]
pub struct LibratoClient {
    http: Client,
    base_url: String,
    email: String,
    token: String,
}

impl std::fmt::Debug for LibratoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibratoClient")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl LibratoClient {
    /// Build a client from resolved provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("librato-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Configuration(format!("building HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            token: config.token.clone(),
        })
    }

    /// The API base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth(&self.email, Some(&self.token))
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response, ProviderError> {
        let response = builder.send().await.map_err(|e| {
            error!(error = %e, what, "Librato request failed");
            if e.is_timeout() {
                ProviderError::DeadlineExceeded(format!("{}: {}", what, e))
            } else {
                ProviderError::Http(e)
            }
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), what, "Librato responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, what, &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, ProviderError> {
        let response = self.send(self.request(Method::GET, path), what).await?;
        decode(response, what).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .send(self.request(Method::POST, path).json(body), what)
            .await?;
        decode(response, what).await
    }

    async fn put_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<(), ProviderError> {
        self.send(self.request(Method::PUT, path).json(body), what)
            .await?;
        Ok(())
    }

    async fn delete(&self, path: &str, what: &str) -> Result<(), ProviderError> {
        self.send(self.request(Method::DELETE, path), what).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ProviderError> {
    let bytes = response.bytes().await.map_err(ProviderError::Http)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        error!(error = %e, what, "Invalid Librato response body");
        ProviderError::Serialization(e)
    })
}

/// Map a non-success status to the provider's error taxonomy.
fn status_error(status: StatusCode, what: &str, body: &str) -> ProviderError {
    let detail = || {
        serde_json::from_str::<ApiErrors>(body)
            .ok()
            .and_then(|e| e.summary())
            .unwrap_or_else(|| body.trim().to_string())
    };

    match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound(what.to_string()),
        StatusCode::UNAUTHORIZED => {
            ProviderError::PermissionDenied("invalid Librato email or token".to_string())
        }
        StatusCode::FORBIDDEN => ProviderError::PermissionDenied(format!("{}: {}", what, detail())),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::Validation(format!("{}: {}", what, detail()))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            warn!(what, "Librato rate limit exceeded");
            ProviderError::ResourceExhausted(format!("{}: rate limit exceeded", what))
        }
        s if s.is_server_error() => ProviderError::Unavailable(format!("{}: {}", what, s)),
        s => ProviderError::Api {
            status: s.as_u16(),
            message: format!("{}: {}", what, detail()),
        },
    }
}

#[async_trait]
impl LibratoApi for LibratoClient {
    #[instrument(skip(self), name = "librato.get_alert")]
    async fn get_alert(&self, id: u64) -> Result<Alert, ProviderError> {
        self.get_json(&format!("/alerts/{}", id), &format!("alert {}", id))
            .await
    }

    #[instrument(skip_all, fields(name = %alert.name), name = "librato.create_alert")]
    async fn create_alert(&self, alert: &Alert) -> Result<Alert, ProviderError> {
        self.post_json("/alerts", alert, "create alert").await
    }

    #[instrument(skip(self, alert), name = "librato.update_alert")]
    async fn update_alert(&self, id: u64, alert: &Alert) -> Result<(), ProviderError> {
        self.put_json(&format!("/alerts/{}", id), alert, &format!("alert {}", id))
            .await
    }

    #[instrument(skip(self), name = "librato.delete_alert")]
    async fn delete_alert(&self, id: u64) -> Result<(), ProviderError> {
        self.delete(&format!("/alerts/{}", id), &format!("alert {}", id))
            .await
    }

    #[instrument(skip(self), name = "librato.get_service")]
    async fn get_service(&self, id: u64) -> Result<Service, ProviderError> {
        self.get_json(&format!("/services/{}", id), &format!("service {}", id))
            .await
    }

    #[instrument(skip_all, fields(title = %service.title), name = "librato.create_service")]
    async fn create_service(&self, service: &Service) -> Result<Service, ProviderError> {
        self.post_json("/services", service, "create service").await
    }

    #[instrument(skip(self, service), name = "librato.update_service")]
    async fn update_service(&self, id: u64, service: &Service) -> Result<(), ProviderError> {
        self.put_json(
            &format!("/services/{}", id),
            service,
            &format!("service {}", id),
        )
        .await
    }

    #[instrument(skip(self), name = "librato.delete_service")]
    async fn delete_service(&self, id: u64) -> Result<(), ProviderError> {
        self.delete(&format!("/services/{}", id), &format!("service {}", id))
            .await
    }
}
