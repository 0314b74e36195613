//! Feature catalog module
//!
//! Folds the flat feature table (one row per model/feature/code combination)
//! into the nested lookup structure that drives retrieval: model name ->
//! feature name -> definition. The catalog is built once at startup and is
//! read-only afterwards; refreshing it means running the builder over a fresh
//! row set.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Days, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Row attributes that are folded into the catalog structure itself rather
/// than copied onto the feature definition.
const RESERVED_FIELDS: [&str; 4] = ["model", "feature", "code", "code_system"];

/// One record of the feature table
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeatureRow {
    #[validate(length(min = 1, message = "model name must not be empty"))]
    pub model: String,

    #[validate(length(min = 1, message = "feature name must not be empty"))]
    pub feature: String,

    /// Resource code(s) identifying the feature's clinical data
    #[validate(
        required(message = "code must be present"),
        length(min = 1, message = "code must not be empty")
    )]
    pub code: Option<String>,

    /// Coding system qualifying `code` (e.g. `loinc`)
    pub code_system: Option<String>,

    /// Resource kind tag driving strategy selection
    pub type_of_data: Option<String>,

    /// Any further columns, copied onto the definition verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A feature's merged catalog entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureDefinition {
    /// Comma-joined union of every `code_system|code` token contributed by
    /// rows sharing this (model, feature) pair, in input order
    pub code: String,

    pub type_of_data: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FeatureDefinition {
    /// The optional freshness window configured on this feature.
    ///
    /// Parsed on demand out of the pass-through attributes; a malformed
    /// window is reported and treated as absent.
    pub fn alive_window(&self) -> Option<DataAliveTime> {
        let raw = self.extra.get("data_alive_time")?.as_str()?;
        match DataAliveTime::parse(raw) {
            Ok(window) => Some(window),
            Err(error) => {
                warn!(data_alive_time = raw, %error, "ignoring malformed data-alive window");
                None
            }
        }
    }
}

/// The set of features one model consumes
pub type FeatureSet = HashMap<String, FeatureDefinition>;

/// Built, read-only mapping from model and feature name to definition
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureCatalog {
    models: HashMap<String, FeatureSet>,
}

impl FeatureCatalog {
    /// Build the catalog from feature rows in input order.
    ///
    /// Malformed rows degrade gracefully: the row's feature entry is still
    /// created and its non-code attributes merged, but no code token is
    /// contributed for that occurrence. The build itself never fails.
    pub fn from_rows(rows: impl IntoIterator<Item = FeatureRow>) -> Self {
        let mut models: HashMap<String, FeatureSet> = HashMap::new();

        for row in rows {
            let valid = match row.validate() {
                Ok(()) => true,
                Err(errors) => {
                    warn!(
                        model = %row.model,
                        feature = %row.feature,
                        %errors,
                        "feature row failed validation, no code merged for this occurrence"
                    );
                    false
                }
            };

            let definition = models
                .entry(row.model.clone())
                .or_default()
                .entry(row.feature.clone())
                .or_default();

            if valid {
                let code = row.code.as_deref().unwrap_or_default();
                let token = match row.code_system.as_deref() {
                    Some(system) => format!("{system}|{code}"),
                    None => code.to_string(),
                };

                if definition.code.is_empty() {
                    definition.code = token;
                } else {
                    definition.code.push(',');
                    definition.code.push_str(&token);
                }
            }

            if let Some(kind) = row.type_of_data {
                definition.type_of_data = kind;
            }

            // Remaining columns pass through, later rows win on key clashes.
            for (key, value) in row.extra {
                if !RESERVED_FIELDS.contains(&key.as_str()) {
                    definition.extra.insert(key, value);
                }
            }
        }

        debug!(models = models.len(), "feature catalog built");
        Self { models }
    }

    /// Parse a JSON array of feature rows and build the catalog
    pub fn from_json_str(raw: &str) -> AppResult<Self> {
        let rows: Vec<FeatureRow> = serde_json::from_str(raw)
            .map_err(|e| AppError::Malformed(format!("feature table: {e}")))?;
        Ok(Self::from_rows(rows))
    }

    /// Load the feature table from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("feature table {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Look up one model's feature set
    pub fn model(&self, name: &str) -> Option<&FeatureSet> {
        self.models.get(name)
    }

    /// Names of every model present in the catalog
    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Freshness window bounding how old a usable resource may be.
///
/// Written in the feature table as `YYYY-MM-DDThh:mm:ss` where every
/// component is an offset, not a calendar date: `0000-00-02T00:00:00` means
/// "within the last two days".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataAliveTime {
    years: u32,
    months: u32,
    days: u32,
    hours: u32,
    minutes: u32,
    seconds: u32,
}

impl DataAliveTime {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let malformed =
            || AppError::Validation(format!("data_alive_time '{raw}' is not an offset"));

        let (date, time) = raw.split_once('T').ok_or_else(malformed)?;

        let date_parts: Vec<u32> = date
            .splitn(3, '-')
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| malformed())?;
        let time_parts: Vec<u32> = time
            .splitn(3, ':')
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| malformed())?;

        if date_parts.len() != 3 || time_parts.len() != 3 {
            return Err(malformed());
        }

        Ok(Self {
            years: date_parts[0],
            months: date_parts[1],
            days: date_parts[2],
            hours: time_parts[0],
            minutes: time_parts[1],
            seconds: time_parts[2],
        })
    }

    /// The earliest acceptable resource date, counting back from `now`.
    ///
    /// Year and month components are calendar-aware; the rest is a plain
    /// duration.
    pub fn cutoff_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_months(Months::new(self.years * 12 + self.months))?
            .checked_sub_days(Days::new(u64::from(self.days)))?
            .checked_sub_signed(
                Duration::hours(i64::from(self.hours))
                    + Duration::minutes(i64::from(self.minutes))
                    + Duration::seconds(i64::from(self.seconds)),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row(value: Value) -> FeatureRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_codes_comma_join_in_input_order() {
        let catalog = FeatureCatalog::from_rows(vec![
            row(json!({
                "model": "diabetes",
                "feature": "hba1c",
                "code": "4548-4",
                "type_of_data": "observation"
            })),
            row(json!({
                "model": "diabetes",
                "feature": "hba1c",
                "code": "17856-6",
                "code_system": "loinc",
                "type_of_data": "observation"
            })),
        ]);

        let definition = &catalog.model("diabetes").unwrap()["hba1c"];
        assert_eq!(definition.code, "4548-4,loinc|17856-6");
        assert_eq!(definition.type_of_data, "observation");
    }

    #[test]
    fn test_code_system_prefixes_token() {
        let catalog = FeatureCatalog::from_rows(vec![row(json!({
            "model": "diabetes",
            "feature": "glucose",
            "code": "2339-0",
            "code_system": "loinc",
            "type_of_data": "observation"
        }))]);

        assert_eq!(
            catalog.model("diabetes").unwrap()["glucose"].code,
            "loinc|2339-0"
        );
    }

    #[test]
    fn test_missing_code_does_not_abort_build() {
        let catalog = FeatureCatalog::from_rows(vec![
            row(json!({
                "model": "diabetes",
                "feature": "hba1c",
                "code": null,
                "type_of_data": "observation",
                "unit": "%"
            })),
            row(json!({
                "model": "diabetes",
                "feature": "hba1c",
                "code": "4548-4",
                "type_of_data": "observation"
            })),
        ]);

        let definition = &catalog.model("diabetes").unwrap()["hba1c"];
        // The invalid row still created the entry and merged its attributes,
        // but only the valid row contributed a code token.
        assert_eq!(definition.code, "4548-4");
        assert_eq!(definition.extra["unit"], json!("%"));
    }

    #[test]
    fn test_entry_exists_even_when_every_code_is_missing() {
        let catalog = FeatureCatalog::from_rows(vec![row(json!({
            "model": "diabetes",
            "feature": "hba1c",
            "code": null,
            "type_of_data": "observation"
        }))]);

        let definition = &catalog.model("diabetes").unwrap()["hba1c"];
        assert_eq!(definition.code, "");
    }

    #[test]
    fn test_extra_attributes_last_write_wins() {
        let catalog = FeatureCatalog::from_rows(vec![
            row(json!({
                "model": "qcsi",
                "feature": "spo2",
                "code": "2708-6",
                "type_of_data": "observation",
                "unit": "%",
                "display": "oxygen saturation"
            })),
            row(json!({
                "model": "qcsi",
                "feature": "spo2",
                "code": "59408-5",
                "type_of_data": "observation",
                "display": "SpO2 by pulse oximetry"
            })),
        ]);

        let definition = &catalog.model("qcsi").unwrap()["spo2"];
        assert_eq!(definition.extra["unit"], json!("%"));
        assert_eq!(definition.extra["display"], json!("SpO2 by pulse oximetry"));
    }

    #[test]
    fn test_model_lookup_and_listing() {
        let catalog = FeatureCatalog::from_rows(vec![
            row(json!({"model": "diabetes", "feature": "hba1c", "code": "4548-4"})),
            row(json!({"model": "qcsi", "feature": "spo2", "code": "2708-6"})),
        ]);

        assert_eq!(catalog.len(), 2);
        assert!(catalog.model("nsti").is_none());

        let mut names = catalog.model_names();
        names.sort_unstable();
        assert_eq!(names, vec!["diabetes", "qcsi"]);
    }

    #[test]
    fn test_from_json_str() {
        let catalog = FeatureCatalog::from_json_str(
            r#"[{"model": "diabetes", "feature": "glucose", "code": "2339-0"}]"#,
        )
        .unwrap();

        assert_eq!(catalog.model("diabetes").unwrap()["glucose"].code, "2339-0");

        assert!(FeatureCatalog::from_json_str("not json").is_err());
    }

    #[test]
    fn test_alive_window_parsing() {
        let window = DataAliveTime::parse("0000-00-02T00:00:00").unwrap();
        let now = Utc.with_ymd_and_hms(2021, 12, 15, 12, 0, 0).unwrap();

        assert_eq!(
            window.cutoff_from(now),
            Some(Utc.with_ymd_and_hms(2021, 12, 13, 12, 0, 0).unwrap())
        );

        assert!(DataAliveTime::parse("2 days").is_err());
        assert!(DataAliveTime::parse("0000-00-02").is_err());
    }

    #[test]
    fn test_alive_window_calendar_components() {
        let window = DataAliveTime::parse("0001-01-00T06:00:00").unwrap();
        let now = Utc.with_ymd_and_hms(2021, 3, 15, 12, 0, 0).unwrap();

        assert_eq!(
            window.cutoff_from(now),
            Some(Utc.with_ymd_and_hms(2020, 2, 15, 6, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_alive_window_from_definition() {
        let catalog = FeatureCatalog::from_rows(vec![row(json!({
            "model": "diabetes",
            "feature": "glucose",
            "code": "2339-0",
            "type_of_data": "observation",
            "data_alive_time": "0000-00-02T00:00:00"
        }))]);

        let definition = &catalog.model("diabetes").unwrap()["glucose"];
        assert!(definition.alive_window().is_some());

        // Pass-through attributes keep the raw string.
        assert_eq!(
            definition.extra["data_alive_time"],
            json!("0000-00-02T00:00:00")
        );
    }
}
