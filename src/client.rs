//! FHIR search client
//!
//! Thin REST client for the FHIR endpoint. The base URL is injected at
//! construction time; strategies decide resource types and query parameters.

use std::time::Duration;

use tracing::debug;

use crate::config::FhirSettings;
use crate::error::{AppError, AppResult};
use crate::fhir::SearchBundle;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the FHIR resource endpoint
#[derive(Debug, Clone)]
pub struct FhirClient {
    server_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl FhirClient {
    pub fn new(settings: &FhirSettings) -> Self {
        Self {
            server_url: settings.server_url.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            http: reqwest::Client::new(),
        }
    }

    /// Create a client with a custom server URL and default timeout
    pub fn with_server_url(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            http: reqwest::Client::new(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Run one search against the endpoint and decode the result bundle.
    ///
    /// A timeout is reported like any other transport failure; callers treat
    /// both as a retrieval error for the feature at hand.
    pub async fn search(
        &self,
        resource_type: &str,
        params: &[(&str, String)],
    ) -> AppResult<SearchBundle> {
        let url = search_url(&self.server_url, resource_type);
        debug!(%url, ?params, "searching FHIR resources");

        let response = self
            .http
            .get(&url)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("{resource_type} search: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Retrieval(format!("{resource_type} search: {e}")))?;

        response
            .json::<SearchBundle>()
            .await
            .map_err(|e| AppError::Malformed(format!("{resource_type} bundle: {e}")))
    }
}

fn search_url(server_url: &str, resource_type: &str) -> String {
    format!("{}/{}", server_url.trim_end_matches('/'), resource_type)
}
