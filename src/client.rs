use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ValidatorConfig;
use crate::signals::{RawSignal, ScoreResult};

/// Trading-engine side of the scoring service.
///
/// Fails open: a disabled client, a slow service, or any transport or status
/// error lets the trade through. Only an explicit `recommended: false` from a
/// healthy service blocks it.
pub struct SignalValidator {
    client: Client,
    config: ValidatorConfig,
}

impl SignalValidator {
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        info!(
            "Signal validator initialized: enabled={}, url={}, timeout={}ms",
            config.enabled, config.url, config.timeout_ms
        );
        Ok(Self { client, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    /// `true` if the signal should be traded.
    pub async fn validate(&self, signal: &RawSignal) -> bool {
        if !self.config.enabled {
            return true;
        }

        match self.request_score(signal).await {
            Ok(result) => {
                if result.recommended {
                    info!(
                        "Signal VALIDATED: {} {} - {:.1}% probability ({})",
                        result.symbol,
                        result.side,
                        result.probability * 100.0,
                        result.confidence
                    );
                } else {
                    warn!(
                        "Signal REJECTED: {} {} - {:.1}% probability ({})",
                        result.symbol,
                        result.side,
                        result.probability * 100.0,
                        result.confidence
                    );
                }
                result.recommended
            }
            Err(e) => {
                warn!("Signal validation error: {:#}, falling back to allow trade", e);
                true
            }
        }
    }

    async fn request_score(&self, signal: &RawSignal) -> Result<ScoreResult> {
        let response = self
            .client
            .post(&self.config.url)
            .timeout(self.timeout())
            .json(signal)
            .send()
            .await
            .context("Scoring request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("scoring service returned status {}", status);
        }

        response
            .json::<ScoreResult>()
            .await
            .context("Failed to parse scoring response")
    }

    fn health_url(&self) -> String {
        self.config.url.replace("/predict", "/health")
    }

    pub async fn is_service_healthy(&self) -> bool {
        if !self.config.enabled {
            return true;
        }

        let result = self
            .client
            .get(self.health_url())
            .timeout(self.timeout() * 2)
            .send()
            .await;

        match result {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                warn!("Scoring service health check failed: {}", e);
                false
            }
        }
    }
}
