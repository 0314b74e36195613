//! FHIR payload models
//!
//! Serde models for the slice of FHIR the crate reads: the search-bundle
//! envelope and the resource fields the value/timestamp extractors touch.
//! Every field is optional or defaulted so that heterogeneous server payloads
//! decode leniently; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// FHIR search-bundle envelope returned by the resource endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchBundle {
    pub resource_type: Option<String>,

    /// Number of matches reported by the server
    pub total: u32,

    pub entry: Vec<BundleEntry>,
}

impl SearchBundle {
    /// Unwrap the entries into their contained resources, preserving order
    pub fn into_resources(self) -> Vec<FhirResource> {
        self.entry.into_iter().map(|entry| entry.resource).collect()
    }
}

/// One search-bundle entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleEntry {
    pub resource: FhirResource,
}

/// A clinical resource, reduced to the fields retrieval cares about
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FhirResource {
    pub resource_type: Option<String>,

    pub id: Option<String>,

    /// Observation point-in-time clinical date
    pub effective_date_time: Option<String>,

    /// Observation clinical date range, used when no point-in-time is given
    pub effective_period: Option<FhirPeriod>,

    /// Instant the observation result was released
    pub issued: Option<String>,

    /// Procedure point-in-time date
    pub performed_date_time: Option<String>,

    /// Procedure date range
    pub performed_period: Option<FhirPeriod>,

    /// Scalar measurement carried directly on the resource
    pub value_quantity: Option<FhirQuantity>,

    /// Panel sub-measurements (multi-component observations)
    pub component: Vec<FhirComponent>,
}

impl FhirResource {
    /// The resource's own scalar value, when it carries one
    pub fn quantity_value(&self) -> Option<f64> {
        self.value_quantity.as_ref().and_then(|quantity| quantity.value)
    }

    /// The scalar value of the panel component matching `code`, if any
    pub fn component_value(&self, code: &str) -> Option<f64> {
        self.component
            .iter()
            .find(|component| component.matches_code(code))
            .and_then(|component| component.value_quantity.as_ref())
            .and_then(|quantity| quantity.value)
    }
}

/// FHIR period element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FhirPeriod {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// FHIR quantity element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FhirQuantity {
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub system: Option<String>,
    pub code: Option<String>,
}

/// One sub-measurement of a panel observation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FhirComponent {
    pub code: FhirCodeableConcept,
    pub value_quantity: Option<FhirQuantity>,
}

impl FhirComponent {
    /// Whether any of the component's codings carries the given code
    pub fn matches_code(&self, code: &str) -> bool {
        self.code
            .coding
            .iter()
            .any(|coding| coding.code.as_deref() == Some(code))
    }
}

/// FHIR codeable concept
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FhirCodeableConcept {
    pub coding: Vec<FhirCoding>,
    pub text: Option<String>,
}

/// FHIR coding element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FhirCoding {
    pub system: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}
