//! Feature data aggregator
//!
//! Fetches every feature of a model's set concurrently and folds the
//! outcomes into the result mapping handed back to the caller's state layer.
//! Features are independent and share no mutable state, so the per-feature
//! fetches run as one joined batch; dropping the returned future cancels all
//! in-flight fetches together.

use std::collections::HashMap;
use std::future::Future;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{FeatureDefinition, FeatureSet};
use crate::error::AppResult;
use crate::models::{FeatureResult, NormalizedSeries};
use crate::retrieval::Retriever;

/// Features of this kind come straight from the subject record and are
/// supplied by the caller, never fetched.
const SUBJECT_SUPPLIED_KIND: &str = "patient";

fn is_subject_supplied(definition: &FeatureDefinition) -> bool {
    definition
        .type_of_data
        .eq_ignore_ascii_case(SUBJECT_SUPPLIED_KIND)
}

/// Aggregate a feature set for a patient using the given fetch operation.
///
/// Generic over the fetch so the orchestration is exercisable without a
/// server; [`Retriever::aggregate`] binds it to the FHIR coordinator. A fetch
/// failure is logged with enough context to diagnose and its key omitted from
/// the result; the remaining features complete regardless.
pub async fn aggregate_with<F, Fut>(
    patient_id: &str,
    features: &FeatureSet,
    fetch: F,
) -> HashMap<String, FeatureResult>
where
    F: Fn(String, FeatureDefinition) -> Fut,
    Fut: Future<Output = AppResult<NormalizedSeries>>,
{
    let correlation_id = Uuid::new_v4();
    info!(
        %correlation_id,
        patient_id,
        features = features.len(),
        "aggregating feature set"
    );

    let tasks = features
        .iter()
        .filter(|(_, definition)| !is_subject_supplied(definition))
        .map(|(name, definition)| {
            let outcome = fetch(patient_id.to_string(), definition.clone());
            let name = name.clone();
            let code = definition.code.clone();
            async move { (name, code, outcome.await) }
        });

    let mut results = HashMap::new();
    for (name, code, outcome) in join_all(tasks).await {
        match outcome {
            Ok(series) => {
                results.insert(name.clone(), FeatureResult::from_series(name, series));
            }
            Err(error) => {
                warn!(
                    %correlation_id,
                    patient_id,
                    feature = %name,
                    code = %code,
                    %error,
                    "feature retrieval failed, omitting from result"
                );
            }
        }
    }

    info!(
        %correlation_id,
        patient_id,
        resolved = results.len(),
        "aggregation complete"
    );

    results
}

impl Retriever {
    /// Aggregate one model's feature set for a patient against the FHIR
    /// endpoint.
    pub async fn aggregate(
        &self,
        patient_id: &str,
        features: &FeatureSet,
    ) -> HashMap<String, FeatureResult> {
        aggregate_with(patient_id, features, |patient, definition| async move {
            self.fetch(&patient, &definition).await
        })
        .await
    }
}
