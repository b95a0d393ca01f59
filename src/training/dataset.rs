use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::warn;

use crate::signals::features;
use crate::signals::types::FeatureVector;
use crate::training::types::TrainingRecord;

/// Feature matrix and labels, row-aligned.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<bool>,
}

impl Dataset {
    /// Build the matrix through the same feature builder used at serving time.
    pub fn prepare(records: &[TrainingRecord]) -> Self {
        let mut dataset = Dataset::default();
        let mut skipped = 0usize;

        for record in records {
            match features::build(&record.signal) {
                Ok(row) => {
                    dataset.features.push(row);
                    dataset.labels.push(record.label());
                }
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping training record for {}: {}", record.signal.symbol, e);
                }
            }
        }

        if skipped > 0 {
            warn!("Skipped {} invalid training records", skipped);
        }
        dataset
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn wins(&self) -> usize {
        self.labels.iter().filter(|&&win| win).count()
    }

    pub fn losses(&self) -> usize {
        self.len() - self.wins()
    }

    fn select(&self, rows: &[usize]) -> Dataset {
        Dataset {
            features: rows.iter().map(|&i| self.features[i]).collect(),
            labels: rows.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Split into (train, test), keeping the win/loss ratio in both halves.
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> (Dataset, Dataset) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut train_rows = Vec::new();
        let mut test_rows = Vec::new();

        for class in [false, true] {
            let mut rows: Vec<usize> = (0..self.len()).filter(|&i| self.labels[i] == class).collect();
            rows.shuffle(&mut rng);
            let n_test = (rows.len() as f64 * test_fraction).round() as usize;
            test_rows.extend_from_slice(&rows[..n_test]);
            train_rows.extend_from_slice(&rows[n_test..]);
        }

        train_rows.shuffle(&mut rng);
        test_rows.shuffle(&mut rng);
        (self.select(&train_rows), self.select(&test_rows))
    }
}
