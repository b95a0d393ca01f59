use std::fmt;

use crate::error::ModelError;
use crate::model::ModelScorer;
use crate::training::dataset::Dataset;

/// Predicted-win cutoff used when scoring the held-out split.
const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassReport {
    pub label: &'static str,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub log_loss: f64,
    pub classes: Vec<ClassReport>,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>8} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        write!(f, "accuracy {:.2}%, logloss {:.4}", self.accuracy * 100.0, self.log_loss)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn evaluate(model: &dyn ModelScorer, data: &Dataset) -> Result<EvaluationReport, ModelError> {
    let probabilities = data
        .features
        .iter()
        .map(|row| model.predict_probability(row))
        .collect::<Result<Vec<f64>, _>>()?;
    Ok(report(&probabilities, &data.labels))
}

pub fn report(probabilities: &[f64], labels: &[bool]) -> EvaluationReport {
    let predicted: Vec<bool> = probabilities.iter().map(|&p| p >= DECISION_THRESHOLD).collect();

    let class = |label: &'static str, positive: bool| {
        let mut tp = 0;
        let mut fp = 0;
        let mut fn_ = 0;
        for (&pred, &actual) in predicted.iter().zip(labels) {
            match (pred == positive, actual == positive) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => {}
            }
        }
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassReport {
            label,
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    };

    let correct = predicted.iter().zip(labels).filter(|(p, a)| p == a).count();
    let log_loss = if labels.is_empty() {
        0.0
    } else {
        probabilities
            .iter()
            .zip(labels)
            .map(|(&p, &win)| {
                let p = p.clamp(1e-15, 1.0 - 1e-15);
                if win {
                    -p.ln()
                } else {
                    -(1.0 - p).ln()
                }
            })
            .sum::<f64>()
            / labels.len() as f64
    };

    EvaluationReport {
        accuracy: ratio(correct, labels.len()),
        log_loss,
        classes: vec![class("loss", false), class("win", true)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        // predicted: win, win, loss, loss; actual: win, loss, win, loss
        let report = report(&[0.9, 0.7, 0.2, 0.1], &[true, false, true, false]);
        assert_eq!(report.accuracy, 0.5);

        let win = &report.classes[1];
        assert_eq!(win.label, "win");
        assert_eq!(win.support, 2);
        assert_eq!(win.precision, 0.5);
        assert_eq!(win.recall, 0.5);
        assert_eq!(win.f1, 0.5);

        let loss = &report.classes[0];
        assert_eq!(loss.support, 2);
        assert!(report.log_loss > 0.0);
    }

    #[test]
    fn test_perfect_predictions() {
        let report = report(&[1.0, 0.0], &[true, false]);
        assert_eq!(report.accuracy, 1.0);
        assert!(report.log_loss < 1e-10);
        assert!(report.classes.iter().all(|c| c.f1 == 1.0));
    }

    #[test]
    fn test_empty_split() {
        let report = report(&[], &[]);
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.log_loss, 0.0);
        assert!(report.to_string().contains("accuracy"));
    }
}
