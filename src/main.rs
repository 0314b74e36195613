//! Riskfetch demo fetcher
//!
//! Loads the feature table, aggregates one model's feature set for a patient
//! against the configured FHIR server, and prints the result mapping as JSON.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use riskfetch::config::Settings;
use riskfetch::{FeatureCatalog, FhirClient, Retriever};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenv::dotenv().ok();

    // Logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,riskfetch=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();

    // Load configuration
    let settings = Settings::from_env().context("Failed to load configuration")?;

    let mut args = std::env::args().skip(1);
    let usage = "usage: riskfetch <model> <patient-id>";
    let model = args.next().context(usage)?;
    let patient_id = args.next().context(usage)?;

    let catalog = FeatureCatalog::from_json_file(&settings.catalog.path)
        .context("Failed to load feature table")?;
    let features = catalog
        .model(&model)
        .with_context(|| format!("model '{model}' is not in the feature table"))?;

    info!(
        model = %model,
        patient_id = %patient_id,
        server = %settings.fhir.server_url,
        "fetching feature set"
    );

    let retriever = Retriever::new(FhirClient::new(&settings.fhir));
    let results = retriever.aggregate(&patient_id, features).await;

    println!("{}", serde_json::to_string_pretty(&results)?);

    Ok(())
}
