//! Riskfetch: clinical feature retrieval for risk models
//!
//! Retrieves a patient's clinical observations from a FHIR server, normalizes
//! heterogeneous resource shapes (lab values, vital signs, boolean
//! conditions) into uniform time series, and merges a declarative feature
//! table into the read-only catalog that drives those queries. The result
//! mapping is handed to the caller's state layer in the shape the downstream
//! scoring contract expects.

pub mod aggregate;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod fhir;
pub mod models;
pub mod remote;
pub mod resources;
pub mod retrieval;

pub use aggregate::aggregate_with;
pub use catalog::{DataAliveTime, FeatureCatalog, FeatureDefinition, FeatureRow, FeatureSet};
pub use client::FhirClient;
pub use error::{AppError, AppResult};
pub use models::{FeatureResult, NormalizedSeries, Scalar};
pub use remote::RemoteBackend;
pub use resources::{ResourceBundle, ResourceKind};
pub use retrieval::Retriever;
