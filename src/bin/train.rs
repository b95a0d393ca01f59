use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signal_classifier::config::{Config, EnvConfig};
use signal_classifier::model::Trainer;
use signal_classifier::training::metrics;
use signal_classifier::training::{
    Dataset, HistoricalSource, InfluxClient, SyntheticGenerator, TrainingDataAssembler,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("{}", "=".repeat(50));
    info!("Signal Classifier - Training Pipeline");
    info!("{}", "=".repeat(50));

    let env_config = EnvConfig::load()?;
    let config = Config::resolve(&env_config)?;
    let training = &config.training;

    // Token absent means synthetic-data mode
    let source: Option<Box<dyn HistoricalSource>> = match &env_config.influxdb_token {
        Some(token) => match InfluxClient::new(config.influxdb.clone(), token.clone()) {
            Ok(client) => Some(Box::new(client) as Box<dyn HistoricalSource>),
            Err(e) => {
                warn!("Could not create InfluxDB client: {}", e);
                None
            }
        },
        None => None,
    };

    let mut assembler = TrainingDataAssembler::new(
        source,
        SyntheticGenerator::seeded(training.synthetic_seed),
        training.min_records,
        training.synthetic_samples,
    );
    let records = assembler.assemble().await;
    info!("📊 Total samples: {}", records.len());

    let dataset = Dataset::prepare(&records);
    if dataset.is_empty() {
        anyhow::bail!("No usable training records");
    }
    info!(
        "📊 Feature shape: ({}, {})",
        dataset.len(),
        signal_classifier::signals::types::FEATURE_COUNT
    );
    info!(
        "📊 Class distribution: Win={}, Loss={}",
        dataset.wins(),
        dataset.losses()
    );

    let (train, test) = dataset.stratified_split(training.test_fraction, training.split_seed);
    info!("🚀 Training on {} rows, evaluating on {}", train.len(), test.len());

    let model = Trainer::new(training.booster.clone())
        .fit(&train.features, &train.labels)
        .context("Model training failed")?;

    let report = metrics::evaluate(&model, &test).context("Evaluation failed")?;
    info!("✅ Model trained with {:.2}% accuracy", report.accuracy * 100.0);
    info!("📊 Classification Report:\n{}", report);

    info!("📈 Feature Importance:");
    for (feature, importance) in model.ranked_importance() {
        info!("  {}: {:.4}", feature, importance);
    }

    model
        .save(&config.scoring.model_path)
        .context("Failed to save model")?;
    info!("💾 Model saved to {}", config.scoring.model_path);

    info!("{}", "=".repeat(50));
    info!("✅ Training complete!");
    info!("{}", "=".repeat(50));

    Ok(())
}
