use dotenv::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::services::market_data::BINANCE_API_URL;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL_PATH: &str = "hybrid_lstm_gru_model_optimized.json";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_port: u16,
    pub bind_addr: String,
    pub model_path: PathBuf,
    pub binance_base_url: String,
    /// Prometheus scrape endpoint; no exporter when unset.
    pub metrics_addr: Option<SocketAddr>,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok(); // loads `.env` file automatically

        let server_port = match env::var("SERVER_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| "SERVER_PORT must be a valid u16")?,
            Err(_) => DEFAULT_PORT,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".into());
        let model_path = env::var("MODEL_PATH")
            .unwrap_or_else(|_| DEFAULT_MODEL_PATH.into())
            .into();
        let binance_base_url = env::var("BINANCE_BASE_URL")
            .unwrap_or_else(|_| BINANCE_API_URL.into())
            .trim_end_matches('/')
            .to_string();

        let metrics_addr = match env::var("METRICS_ADDR") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<SocketAddr>()
                    .map_err(|_| "METRICS_ADDR must be host:port")?,
            ),
            _ => None,
        };

        Ok(Self {
            server_port,
            bind_addr,
            model_path,
            binance_base_url,
            metrics_addr,
        })
    }
}
