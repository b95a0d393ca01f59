use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::InfluxConfig;
use crate::error::DataUnavailableError;
use crate::signals::types::{RawSignal, Side};
use crate::training::types::{RecordOrigin, TrainingRecord};

/// Somewhere closed trades can be read from.
#[async_trait]
pub trait HistoricalSource: Send + Sync {
    async fn fetch_trades(&self) -> Result<Vec<TrainingRecord>, DataUnavailableError>;
}

/// Reads closed positions from InfluxDB 2.x through the Flux HTTP API.
pub struct InfluxClient {
    client: Client,
    config: InfluxConfig,
    token: String,
}

impl InfluxClient {
    pub fn new(config: InfluxConfig, token: String) -> Result<Self, DataUnavailableError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config, token })
    }

    fn flux_query(&self) -> String {
        format!(
            r#"from(bucket: "{bucket}")
  |> range(start: -{days}d)
  |> filter(fn: (r) => r._measurement == "{measurement}")
  |> pivot(rowKey: ["_time"], columnKey: ["_field"], valueColumn: "_value")"#,
            bucket = self.config.bucket,
            days = self.config.lookback_days,
            measurement = self.config.measurement,
        )
    }
}

#[async_trait]
impl HistoricalSource for InfluxClient {
    async fn fetch_trades(&self) -> Result<Vec<TrainingRecord>, DataUnavailableError> {
        info!("Fetching trade data from InfluxDB at {}", self.config.url);

        let url = format!("{}/api/v2/query", self.config.url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .query(&[("org", self.config.org.as_str())])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(self.flux_query())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DataUnavailableError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows = parse_annotated_csv(&body)?;
        let total = rows.len();
        let records: Vec<TrainingRecord> = rows.iter().filter_map(row_to_record).collect();
        if records.len() < total {
            warn!(
                "Skipped {} of {} InfluxDB rows with missing or invalid fields",
                total - records.len(),
                total
            );
        }
        Ok(records)
    }
}

/// Parse Flux annotated CSV into one map per data row.
///
/// Tables are separated by blank lines and each starts with its own header
/// row. Annotation rows (`#datatype`, `#group`, `#default`) are ignored.
pub fn parse_annotated_csv(body: &str) -> Result<Vec<HashMap<String, String>>, DataUnavailableError> {
    let mut rows = Vec::new();
    let mut header: Option<Vec<String>> = None;

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            header = None;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let cells = split_csv_line(line);
        match &header {
            None => header = Some(cells),
            Some(columns) => {
                if cells.len() != columns.len() {
                    return Err(DataUnavailableError::Parse(format!(
                        "row has {} cells, header has {}",
                        cells.len(),
                        columns.len()
                    )));
                }
                rows.push(columns.iter().cloned().zip(cells).collect());
            }
        }
    }

    debug!("Parsed {} rows from Flux response", rows.len());
    Ok(rows)
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut cell)),
            other => cell.push(other),
        }
    }
    cells.push(cell);
    cells
}

/// Convert a pivoted row. Rows missing the side, the pnl, or any indicator are
/// dropped rather than filled with made-up values.
fn row_to_record(row: &HashMap<String, String>) -> Option<TrainingRecord> {
    let num = |key: &str| -> Option<f64> {
        row.get(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };

    let side: Side = row.get("side")?.trim().parse().ok()?;
    let signal = RawSignal {
        symbol: row.get("symbol").cloned().unwrap_or_default(),
        side,
        rsi: num("rsi")?,
        macd: num("macd")?,
        macd_signal: num("macd_signal")?,
        ema_alignment: num("ema_alignment")?,
        atr_percent: num("atr_percent")?,
        volume_ratio: num("volume_ratio")?,
        cvd: num("cvd")?,
        adx: num("adx")?,
        price: num("entry_price").or_else(|| num("price"))?,
    };

    let win = row.get("win").and_then(|v| match v.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    });

    let closed_at = row
        .get("_time")
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc));

    Some(TrainingRecord {
        signal,
        pnl: num("pnl").unwrap_or(0.0),
        win,
        closed_at,
        origin: RecordOrigin::Historical,
    })
}
