//! Resource strategy set
//!
//! One strategy per supported clinical resource kind, each knowing how to
//! search the endpoint and how to read timestamps and values out of the
//! returned resources. The set is a closed sum type: kind selection happens
//! through `FromStr` on the feature's `type_of_data` tag, and an unknown tag
//! is a typed `UnsupportedKind` failure instead of a construction attempt.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::client::FhirClient;
use crate::error::{AppError, AppResult};
use crate::fhir::FhirResource;
use crate::models::Scalar;

/// Fixed placeholder returned as the timestamp of Condition presence facts.
/// Condition presence carries no meaningful observation date in this design;
/// callers must treat this value as a sentinel, not a real date.
pub const CONDITION_SENTINEL_DATE: &str = "2021-12-12";

/// Search results for one feature query
#[derive(Debug, Clone, Default)]
pub struct ResourceBundle {
    /// Matched resources in server-side ascending date order
    pub resources: Vec<FhirResource>,
    /// The code that matched as a panel sub-measurement, when the direct
    /// code search came back empty
    pub component: Option<String>,
}

/// The closed set of supported resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Continuous or quantitative measurements, possibly multi-component panels
    Observation,
    /// Boolean presence/absence facts
    Condition,
    /// Performed interventions, reported as presence facts
    Procedure,
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "observation" => Ok(Self::Observation),
            "condition" => Ok(Self::Condition),
            "procedure" => Ok(Self::Procedure),
            other => Err(AppError::UnsupportedKind(other.to_string())),
        }
    }
}

impl ResourceKind {
    /// Query the endpoint for a patient's resources matching `code`.
    ///
    /// `since` narrows the search to resources newer than the feature's
    /// data-alive window, when one is configured.
    pub async fn search(
        &self,
        client: &FhirClient,
        patient_id: &str,
        code: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<ResourceBundle> {
        match self {
            Self::Observation => search_observation(client, patient_id, code, since).await,
            // Presence stub: no server query is issued and no code filter
            // applies. Known limitation of the Condition path.
            Self::Condition => Ok(ResourceBundle::default()),
            Self::Procedure => search_procedure(client, patient_id, code, since).await,
        }
    }

    /// Clinical dates of the matched resources, index-aligned with
    /// `extract_values`. Empty bundles produce empty vectors.
    pub fn extract_timestamps(&self, bundle: &ResourceBundle) -> Vec<Option<String>> {
        match self {
            Self::Observation => bundle
                .resources
                .iter()
                .map(|resource| {
                    resource
                        .effective_date_time
                        .clone()
                        .or_else(|| {
                            resource
                                .effective_period
                                .as_ref()
                                .and_then(|period| period.start.clone())
                        })
                        .or_else(|| resource.issued.clone())
                })
                .collect(),
            Self::Condition => vec![Some(CONDITION_SENTINEL_DATE.to_string())],
            Self::Procedure => bundle
                .resources
                .iter()
                .map(|resource| {
                    resource.performed_date_time.clone().or_else(|| {
                        resource
                            .performed_period
                            .as_ref()
                            .and_then(|period| period.start.clone())
                    })
                })
                .collect(),
        }
    }

    /// Scalar values of the matched resources. A resource that lacks the
    /// expected field (or a matching panel component) yields a hole, never an
    /// error.
    pub fn extract_values(&self, bundle: &ResourceBundle) -> Vec<Option<Scalar>> {
        match self {
            Self::Observation => match bundle.component.as_deref() {
                None => bundle
                    .resources
                    .iter()
                    .map(|resource| resource.quantity_value().map(Scalar::Number))
                    .collect(),
                Some(code) => bundle
                    .resources
                    .iter()
                    .map(|resource| resource.component_value(code).map(Scalar::Number))
                    .collect(),
            },
            // A single presence flag per query, regardless of resource count.
            Self::Condition => vec![Some(Scalar::Bool(true))],
            Self::Procedure => bundle
                .resources
                .iter()
                .map(|_| Some(Scalar::Bool(true)))
                .collect(),
        }
    }
}

async fn search_observation(
    client: &FhirClient,
    patient_id: &str,
    code: &str,
    since: Option<DateTime<Utc>>,
) -> AppResult<ResourceBundle> {
    let direct = client
        .search(
            "Observation",
            &search_params("code", patient_id, code, since),
        )
        .await?;

    if direct.total > 0 {
        return Ok(ResourceBundle {
            resources: direct.into_resources(),
            component: None,
        });
    }

    // Zero direct matches: the code may name a panel sub-measurement, so
    // retry against component-code and remember which code matched.
    let panel = client
        .search(
            "Observation",
            &search_params("component-code", patient_id, code, since),
        )
        .await?;

    if panel.total == 0 {
        return Ok(ResourceBundle::default());
    }

    Ok(ResourceBundle {
        resources: panel.into_resources(),
        component: Some(code.to_string()),
    })
}

async fn search_procedure(
    client: &FhirClient,
    patient_id: &str,
    code: &str,
    since: Option<DateTime<Utc>>,
) -> AppResult<ResourceBundle> {
    let bundle = client
        .search("Procedure", &search_params("code", patient_id, code, since))
        .await?;

    Ok(ResourceBundle {
        resources: bundle.into_resources(),
        component: None,
    })
}

fn search_params(
    code_param: &'static str,
    patient_id: &str,
    code: &str,
    since: Option<DateTime<Utc>>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("subject", patient_id.to_string()),
        (code_param, code.to_string()),
        ("_sort", "date".to_string()),
    ];

    if let Some(cutoff) = since {
        params.push(("date", format!("ge{}", cutoff.format("%Y-%m-%d"))));
    }

    params
}
