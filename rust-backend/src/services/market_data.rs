//! Kline fetcher for the inference pipeline.
//! -----------------------------------------------------------------
//! ‣ One REST call per request: no retry, no cache, no pagination.
//! ‣ Only close time and close price survive parsing.
//! ‣ `KlineSource` is the seam the request handler talks to, so tests can
//!   swap the exchange for a canned series.
//! -----------------------------------------------------------------

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::utils::errors::{ApiError, FetchError};

pub const BINANCE_API_URL: &str = "https://api.binance.com";

/// Binance kline rows are fixed-width arrays.
const KLINE_FIELDS: usize = 12;
const CLOSE_IDX: usize = 4;
const CLOSE_TIME_IDX: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    /// Close time of the bucket.
    pub ts: DateTime<Utc>,
    pub close: f64,
}

#[async_trait]
pub trait KlineSource: Send + Sync {
    /// Up to `limit` most recent candles, oldest first.
    async fn fetch(&self, symbol: &str, interval: &str, limit: u32)
        -> Result<Vec<Candle>, FetchError>;
}

/* ─────────────────────────────────────────  Binance REST ────── */

#[derive(Debug, Clone)]
pub struct BinanceClient {
    http: Client,
    base_url: String,
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceClient {
    pub fn new() -> Self {
        Self::with_base_url(BINANCE_API_URL)
    }

    /// Points the client at another host (testnet, local stub).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn klines_url(&self, symbol: &str, interval: &str, limit: u32) -> String {
        format!(
            "{}/api/v3/klines?symbol={symbol}&interval={interval}&limit={limit}",
            self.base_url
        )
    }
}

#[async_trait]
impl KlineSource for BinanceClient {
    async fn fetch(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = self.klines_url(symbol, interval, limit);
        log::debug!("binance klines GET {url}");

        let resp = self.http.get(&url).send().await.map_err(ApiError::from)?;
        let status = resp.status();
        let body = resp.text().await.map_err(ApiError::from)?;

        if status != StatusCode::OK {
            log::warn!("binance klines {symbol}: http {status}");
            return Err(FetchError::Upstream { status: status.as_u16(), body });
        }

        let candles = parse_klines(&body)?;
        log::debug!("binance klines {symbol}: {} candles", candles.len());
        Ok(candles)
    }
}

/* ─────────────────────────────────────────  Row parsing ─────── */

/// Parses the raw `/api/v3/klines` payload into time-ascending candles.
pub fn parse_klines(body: &str) -> Result<Vec<Candle>, FetchError> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body).map_err(ApiError::from)?;

    let mut candles = rows
        .iter()
        .enumerate()
        .map(|(i, row)| parse_row(row).map_err(|e| FetchError::Malformed(format!("row {i}: {e}"))))
        .collect::<Result<Vec<_>, _>>()?;

    candles.sort_by_key(|c| c.ts);
    Ok(candles)
}

fn parse_row(row: &[Value]) -> Result<Candle, String> {
    if row.len() != KLINE_FIELDS {
        return Err(format!("expected {KLINE_FIELDS} fields, got {}", row.len()));
    }

    let close_ms = row[CLOSE_TIME_IDX]
        .as_i64()
        .ok_or_else(|| format!("close time {} is not an integer", row[CLOSE_TIME_IDX]))?;
    let ts = DateTime::<Utc>::from_timestamp_millis(close_ms)
        .ok_or_else(|| format!("close time {close_ms} out of range"))?;

    // prices arrive as decimal strings
    let close = match &row[CLOSE_IDX] {
        Value::String(s) => s.parse::<f64>().map_err(|e| format!("close {s:?}: {e}"))?,
        Value::Number(n) => n.as_f64().ok_or("close is not finite")?,
        other => return Err(format!("close {other} is not a price")),
    };
    // "NaN" and "inf" parse fine but poison the scaler
    if !close.is_finite() {
        return Err(format!("close {close} is not finite"));
    }

    Ok(Candle { ts, close })
}
