//! Configuration management module
//!
//! Loads and validates environment-based configuration.
//! Endpoints are always passed explicitly into the clients built from these
//! settings; no module holds ambient mutable URL state.

use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid number format in environment variable")]
    ParseError,
}

/// FHIR search endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct FhirSettings {
    /// Base URL of the FHIR server, e.g. `http://localhost:8080/fhir`
    pub server_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Alternate pre-aggregated backend settings
///
/// Deployments use either the FHIR endpoint or this one, not both.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
    /// Base URL of the model backend
    pub base_url: String,
    /// Route prefix between the base URL and the model name (may be empty)
    pub prefix: String,
}

/// Feature catalog source settings
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    /// Path to the feature table (JSON array of rows)
    pub path: String,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub fhir: FhirSettings,
    pub remote: RemoteSettings,
    pub catalog: CatalogSettings,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        let timeout_secs = env::var("FHIR_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .map_err(|_| SettingsError::ParseError)?;

        Ok(Self {
            fhir: FhirSettings {
                server_url: env::var("FHIR_SERVER_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/fhir".into()),
                timeout_secs,
            },
            remote: RemoteSettings {
                base_url: env::var("MODEL_SERVER_URL")
                    .unwrap_or_else(|_| "http://localhost:5000".into()),
                prefix: env::var("MODEL_SERVER_PREFIX").unwrap_or_default(),
            },
            catalog: CatalogSettings {
                path: env::var("FEATURE_TABLE_PATH")
                    .unwrap_or_else(|_| "./config/features.json".into()),
            },
        })
    }
}
