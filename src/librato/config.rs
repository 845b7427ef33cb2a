//! Provider configuration: credentials and endpoint.

use serde::Deserialize;
use serde_json::Value;

use super::client::DEFAULT_API_URL;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable consulted when `email` is not configured.
pub const EMAIL_ENV: &str = "LIBRATO_EMAIL";
/// Environment variable consulted when `token` is not configured.
pub const TOKEN_ENV: &str = "LIBRATO_TOKEN";

/// Schema of the `provider "librato"` block.
pub fn schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "email",
            Attribute::optional_string().with_description(format!(
                "The email address of the Librato account. Defaults to ${}.",
                EMAIL_ENV
            )),
        )
        .with_attribute(
            "token",
            Attribute::optional_string()
                .sensitive()
                .with_description(format!(
                    "The API token of the Librato account. Defaults to ${}.",
                    TOKEN_ENV
                )),
        )
        .with_attribute(
            "url",
            Attribute::optional_string()
                .with_description("The Librato API endpoint.")
                .with_default(Value::String(DEFAULT_API_URL.to_string())),
        )
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    email: Option<String>,
    token: Option<String>,
    url: Option<String>,
}

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Account email used as the basic-auth user.
    pub email: String,
    /// API token used as the basic-auth password.
    pub token: String,
    /// API base URL.
    pub url: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("url", &self.url)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve configuration from the provider block, falling back to the
    /// process environment for credentials.
    pub fn resolve(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Like [`ProviderConfig::resolve`] with an explicit environment lookup.
    pub fn resolve_with<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = if config.is_null() {
            RawConfig::default()
        } else {
            serde_json::from_value(config.clone()).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?
        };

        let email = non_empty(raw.email).or_else(|| non_empty(env(EMAIL_ENV)));
        let token = non_empty(raw.token).or_else(|| non_empty(env(TOKEN_ENV)));

        let mut diagnostics = Vec::new();
        if email.is_none() {
            diagnostics.push(missing("email", EMAIL_ENV));
        }
        if token.is_none() {
            diagnostics.push(missing("token", TOKEN_ENV));
        }

        match (email, token) {
            (Some(email), Some(token)) => Ok(Self {
                email,
                token,
                url: non_empty(raw.url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            }),
            _ => Err(diagnostics),
        }
    }

    /// Resolve or fail with a configuration error summarizing the diagnostics.
    pub fn resolve_or_error(config: &Value) -> Result<Self, ProviderError> {
        Self::resolve(config).map_err(|diagnostics| {
            let summary = diagnostics
                .iter()
                .map(|d| d.summary.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            ProviderError::Configuration(summary)
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn missing(attribute: &str, env: &str) -> Diagnostic {
    Diagnostic::error(format!("Missing Librato {}", attribute))
        .with_detail(format!(
            "Set '{}' in the provider block or the {} environment variable",
            attribute, env
        ))
        .with_attribute(attribute)
}
