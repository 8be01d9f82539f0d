use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use metrics_exporter_prometheus::PrometheusBuilder;

use price_oracle_backend::{
    config::settings::Settings,
    middleware::metrics::Metrics,
    routes::{health::health_scope, inference::inference_scope},
    services::market_data::{BinanceClient, KlineSource},
    services::model::{HybridModel, ModelConfig},
    state::AppState,
};

fn init_logging() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();
    log::info!("Starting price oracle backend…");

    let settings = Settings::new().unwrap_or_else(|e| {
        eprintln!("Failed to load settings: {e}");
        std::process::exit(1);
    });

    if let Some(addr) = settings.metrics_addr {
        match PrometheusBuilder::new().with_http_listener(addr).install() {
            Ok(()) => log::info!("prometheus exporter on {addr}"),
            Err(e) => log::error!("prometheus exporter: {e}"),
        }
    }

    // --- model ---------------------------------------------------------------
    // a missing artifact is not fatal: /inference answers 500 until restart
    let model = match HybridModel::load(&settings.model_path, ModelConfig::default()) {
        Ok(m) => {
            log::info!("model loaded from {}", settings.model_path.display());
            Some(m)
        }
        Err(e) => {
            log::error!("model load from {} failed: {e}", settings.model_path.display());
            None
        }
    };

    let klines: Arc<dyn KlineSource> =
        Arc::new(BinanceClient::with_base_url(&settings.binance_base_url));
    let state = web::Data::new(AppState::new(model, klines));

    log::info!("listening on {}:{}", settings.bind_addr, settings.server_port);

    HttpServer::new(move || {
        App::new()
            .wrap(Metrics)
            .wrap(Logger::default())
            .app_data(state.clone())

            //scope
            .service(health_scope())
            .service(inference_scope())
    })
        .bind((settings.bind_addr.as_str(), settings.server_port))?
        .run()
        .await
}
