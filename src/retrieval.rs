//! Resource retrieval coordinator
//!
//! Single-call orchestration per feature: select the strategy named by the
//! feature's `type_of_data`, run the search, and pair the extracted columns
//! into a normalized series.

use chrono::Utc;
use tracing::debug;

use crate::catalog::FeatureDefinition;
use crate::client::FhirClient;
use crate::error::AppResult;
use crate::models::NormalizedSeries;
use crate::resources::ResourceKind;

/// Coordinates one feature fetch from strategy selection to normalized series
#[derive(Debug, Clone)]
pub struct Retriever {
    client: FhirClient,
}

impl Retriever {
    pub fn new(client: FhirClient) -> Self {
        Self { client }
    }

    /// Fetch one feature's history for a patient.
    ///
    /// Zero search results produce an allocated empty series, so "no data"
    /// flows through aggregation like any other outcome. No retries live
    /// here; those belong to the transport.
    pub async fn fetch(
        &self,
        patient_id: &str,
        feature: &FeatureDefinition,
    ) -> AppResult<NormalizedSeries> {
        let kind: ResourceKind = feature.type_of_data.parse()?;
        let since = feature
            .alive_window()
            .and_then(|window| window.cutoff_from(Utc::now()));

        let bundle = kind
            .search(&self.client, patient_id, &feature.code, since)
            .await?;

        let series = NormalizedSeries::new(
            kind.extract_values(&bundle),
            kind.extract_timestamps(&bundle),
        );

        debug!(
            patient_id,
            code = %feature.code,
            points = series.len(),
            "feature series assembled"
        );

        Ok(series)
    }
}
