use rand::Rng;
use tracing::{info, warn};

use crate::training::influx::HistoricalSource;
use crate::training::synthetic::SyntheticGenerator;
use crate::training::types::TrainingRecord;

/// Builds the labelled dataset for a training run.
///
/// History comes first. Missing, failing, or thin history (fewer than
/// `min_records`) is made up with synthetic trades, so the pipeline always
/// has something to train on.
pub struct TrainingDataAssembler<R: Rng> {
    source: Option<Box<dyn HistoricalSource>>,
    generator: SyntheticGenerator<R>,
    min_records: usize,
    synthetic_samples: usize,
}

impl<R: Rng> TrainingDataAssembler<R> {
    pub fn new(
        source: Option<Box<dyn HistoricalSource>>,
        generator: SyntheticGenerator<R>,
        min_records: usize,
        synthetic_samples: usize,
    ) -> Self {
        Self {
            source,
            generator,
            min_records,
            synthetic_samples,
        }
    }

    pub async fn assemble(&mut self) -> Vec<TrainingRecord> {
        let Some(source) = &self.source else {
            warn!("Historical source not configured, using synthetic data");
            return self.generator.generate(self.synthetic_samples);
        };

        let mut records = match source.fetch_trades().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Historical data unavailable ({}), using synthetic data", e);
                return self.generator.generate(self.synthetic_samples);
            }
        };

        if records.len() < self.min_records {
            warn!(
                "Only {} trades found, supplementing with synthetic data",
                records.len()
            );
            records.extend(self.generator.generate(self.synthetic_samples));
            return records;
        }

        info!("Loaded {} historical trades", records.len());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataUnavailableError;
    use crate::training::synthetic::SyntheticGenerator;
    use crate::training::types::RecordOrigin;
    use async_trait::async_trait;
    use rand::rngs::StdRng;

    struct FixedSource(Vec<TrainingRecord>);

    #[async_trait]
    impl HistoricalSource for FixedSource {
        async fn fetch_trades(&self) -> Result<Vec<TrainingRecord>, DataUnavailableError> {
            Ok(self.0.clone())
        }
    }

    struct DownSource;

    #[async_trait]
    impl HistoricalSource for DownSource {
        async fn fetch_trades(&self) -> Result<Vec<TrainingRecord>, DataUnavailableError> {
            Err(DataUnavailableError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    /// Synthetic rows relabelled as history, for feeding `FixedSource`.
    fn history(n: usize) -> Vec<TrainingRecord> {
        SyntheticGenerator::seeded(1)
            .generate(n)
            .into_iter()
            .map(|mut r| {
                r.origin = RecordOrigin::Historical;
                r
            })
            .collect()
    }

    fn assembler(source: Option<Box<dyn HistoricalSource>>) -> TrainingDataAssembler<StdRng> {
        TrainingDataAssembler::new(source, SyntheticGenerator::seeded(42), 50, 100)
    }

    fn count(records: &[TrainingRecord], origin: RecordOrigin) -> usize {
        records.iter().filter(|r| r.origin == origin).count()
    }

    #[tokio::test]
    async fn test_no_source_is_synthetic() {
        let records = assembler(None).assemble().await;
        assert_eq!(records.len(), 100);
        assert_eq!(count(&records, RecordOrigin::Synthetic), 100);
    }

    #[tokio::test]
    async fn test_source_failure_is_recovered() {
        let records = assembler(Some(Box::new(DownSource))).assemble().await;
        assert_eq!(count(&records, RecordOrigin::Synthetic), 100);
        assert_eq!(count(&records, RecordOrigin::Historical), 0);
    }

    #[tokio::test]
    async fn test_thin_history_is_supplemented() {
        let records = assembler(Some(Box::new(FixedSource(history(49))))).assemble().await;
        assert_eq!(count(&records, RecordOrigin::Historical), 49);
        assert_eq!(count(&records, RecordOrigin::Synthetic), 100);
    }

    #[tokio::test]
    async fn test_enough_history_used_alone() {
        let records = assembler(Some(Box::new(FixedSource(history(50))))).assemble().await;
        assert_eq!(records.len(), 50);
        assert_eq!(count(&records, RecordOrigin::Synthetic), 0);
    }

    #[tokio::test]
    async fn test_synthetic_fallback_is_reproducible() {
        let a = assembler(None).assemble().await;
        let b = assembler(Some(Box::new(DownSource))).assemble().await;
        assert_eq!(a, b);
    }
}
