//! Alternate pre-aggregated backend client
//!
//! Some deployments front the FHIR server with a model backend that returns a
//! whole feature set in one call, already shaped per feature. That path
//! bypasses the resource strategy set entirely. The backend emits
//! newest-first arrays; this client flips them into the crate's canonical
//! ascending order before the most-recent snapshot is taken, so "most recent"
//! means the same thing on both retrieval paths.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::config::RemoteSettings;
use crate::error::{AppError, AppResult};
use crate::models::{FeatureResult, NormalizedSeries, Scalar};

/// Response envelope of the model backend
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteEnvelope {
    data: HashMap<String, RemoteSeries>,
}

/// One feature's pre-aggregated history, newest first
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteSeries {
    value: Vec<Option<Scalar>>,
    date: Vec<Option<String>>,
}

/// Client for the pre-aggregated model backend
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    base_url: String,
    prefix: String,
    http: reqwest::Client,
}

impl RemoteBackend {
    pub fn new(settings: &RemoteSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            prefix: settings.prefix.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch a model's whole feature set for a patient in one call
    pub async fn fetch_model(
        &self,
        model: &str,
        patient_id: &str,
    ) -> AppResult<HashMap<String, FeatureResult>> {
        let url = model_url(&self.base_url, &self.prefix, model);
        debug!(%url, patient_id, "fetching pre-aggregated feature set");

        let response = self
            .http
            .get(&url)
            .query(&[("id", patient_id)])
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("model backend: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Retrieval(format!("model backend: {e}")))?;

        let envelope: RemoteEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::Malformed(format!("model backend: {e}")))?;

        Ok(envelope
            .data
            .into_iter()
            .map(|(name, series)| {
                let result = into_ascending_result(name.clone(), series);
                (name, result)
            })
            .collect())
    }
}

fn model_url(base_url: &str, prefix: &str, model: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{base}/{model}")
    } else {
        format!("{base}/{}/{model}", prefix.trim_matches('/'))
    }
}

/// Reverse the backend's newest-first columns into ascending order, then
/// snapshot the most recent value off the tail.
fn into_ascending_result(name: String, series: RemoteSeries) -> FeatureResult {
    let mut values = series.value;
    let mut dates = series.date;
    values.reverse();
    dates.reverse();

    FeatureResult::from_series(name, NormalizedSeries::new(values, dates))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_url_with_and_without_prefix() {
        assert_eq!(
            model_url("http://models.test:5000", "", "diabetes"),
            "http://models.test:5000/diabetes"
        );
        assert_eq!(
            model_url("http://models.test:5000/", "api", "diabetes"),
            "http://models.test:5000/api/diabetes"
        );
    }

    #[test]
    fn test_newest_first_series_becomes_ascending() {
        let series = RemoteSeries {
            value: vec![
                Some(Scalar::Number(6.4)),
                Some(Scalar::Number(5.9)),
                Some(Scalar::Number(5.1)),
            ],
            date: vec![
                Some("2021-12-01T08:00".to_string()),
                Some("2021-06-12T08:00".to_string()),
                Some("2021-01-04T08:00".to_string()),
            ],
        };

        let result = into_ascending_result("hba1c".to_string(), series);

        assert_eq!(
            result.date,
            vec![
                Some("2021-01-04T08:00".to_string()),
                Some("2021-06-12T08:00".to_string()),
                Some("2021-12-01T08:00".to_string()),
            ]
        );
        // The newest value is the take on this path too.
        assert_eq!(result.take, Some(Scalar::Number(6.4)));
    }

    #[test]
    fn test_empty_remote_series() {
        let result = into_ascending_result("hba1c".to_string(), RemoteSeries::default());

        assert!(result.value.is_empty());
        assert!(result.date.is_empty());
        assert_eq!(result.take, None);
    }

    #[test]
    fn test_envelope_deserialization() {
        let envelope: RemoteEnvelope = serde_json::from_str(
            r#"{"data": {"diabetes_mellitus": {"value": [true], "date": ["2021-12-12"]}}}"#,
        )
        .unwrap();

        let series = &envelope.data["diabetes_mellitus"];
        assert_eq!(series.value, vec![Some(Scalar::Bool(true))]);
    }
}
