// src/services/inference.rs

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::services::market_data::{Candle, KlineSource};
use crate::services::model::HybridModel;
use crate::services::normalizer::MinMaxScaler;
use crate::utils::errors::InferenceError;

/// Candle interval requested from the provider.
pub const KLINE_INTERVAL: &str = "1m";
/// Candles requested per call; the window is cut from the tail locally.
pub const KLINE_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Eth,
    Btc,
    Bnb,
    Sol,
    Arb,
}

impl Token {
    pub const ALL: [Token; 5] = [Token::Eth, Token::Btc, Token::Bnb, Token::Sol, Token::Arb];

    /// Provider trading pair.
    pub fn symbol(self) -> &'static str {
        match self {
            Token::Eth => "ETHUSDT",
            Token::Btc => "BTCUSDT",
            Token::Bnb => "BNBUSDT",
            Token::Sol => "SOLUSDT",
            Token::Arb => "ARBUSDT",
        }
    }

    /// Trailing candles fed to the model.
    pub fn window_len(self) -> usize {
        match self {
            Token::Btc | Token::Sol => 10,
            Token::Eth | Token::Bnb | Token::Arb => 20,
        }
    }
}

impl FromStr for Token {
    type Err = InferenceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_uppercase().as_str() {
            "ETH" => Ok(Token::Eth),
            "BTC" => Ok(Token::Btc),
            "BNB" => Ok(Token::Bnb),
            "SOL" => Ok(Token::Sol),
            "ARB" => Ok(Token::Arb),
            _ => Err(InferenceError::UnsupportedToken(raw.to_string())),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol().trim_end_matches("USDT"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub token: Token,
    /// Native price units, rounded to cents.
    pub price: f64,
}

impl Prediction {
    /// Response body: the price with exactly two decimals.
    pub fn body(&self) -> String {
        format!("{:.2}", self.price)
    }
}

/// Rounds to cents. `+ 0.0` turns `-0.0` into `0.0` so the body never reads `-0.00`.
pub fn round_price(x: f64) -> f64 {
    (x * 100.0).round() / 100.0 + 0.0
}

/// Closing prices of the last `len` candles, oldest first.
pub fn trailing_window(candles: &[Candle], len: usize) -> Vec<f64> {
    let start = candles.len().saturating_sub(len);
    candles[start..].iter().map(|c| c.close).collect()
}

/// Full request pipeline: model check, validate, fetch, window, scale,
/// predict, unscale, round.
///
/// The forward pass is CPU-bound, so it runs on tokio's blocking pool
/// instead of the actix worker.
pub async fn predict_price(
    model: Option<Arc<HybridModel>>,
    source: &dyn KlineSource,
    raw_token: &str,
) -> Result<Prediction, InferenceError> {
    let model = model.ok_or(InferenceError::ModelUnavailable)?;
    let token: Token = raw_token.parse()?;

    let candles = source
        .fetch(token.symbol(), KLINE_INTERVAL, KLINE_LIMIT)
        .await
        .map_err(|e| {
            log::warn!("{}: kline fetch failed: {e}", token.symbol());
            InferenceError::from(e)
        })?;

    let window = trailing_window(&candles, token.window_len());
    let (scaler, scaled) = MinMaxScaler::fit_transform(&window).ok_or_else(|| {
        InferenceError::ShapeMismatch(format!("no candles returned for {}", token.symbol()))
    })?;
    log::debug!(
        "{}: window of {} closes, min {} max {}",
        token.symbol(),
        window.len(),
        scaler.min(),
        scaler.max()
    );

    let y = tokio::task::spawn_blocking(move || model.predict(&scaled))
        .await
        .map_err(|e| InferenceError::ShapeMismatch(format!("forward pass aborted: {e}")))??;
    let price = round_price(scaler.inverse(f64::from(y)));

    log::info!("{}: predicted {:.2}", token.symbol(), price);
    Ok(Prediction { token, price })
}
