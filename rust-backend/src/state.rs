use std::sync::Arc;

use crate::services::market_data::KlineSource;
use crate::services::model::HybridModel;

/// Shared application state, handed to route handlers as `web::Data<AppState>`.
pub struct AppState {
    /// `None` when the weights artifact failed to load at startup.
    pub model: Option<Arc<HybridModel>>,
    pub klines: Arc<dyn KlineSource>,
}

impl AppState {
    pub fn new(model: Option<HybridModel>, klines: Arc<dyn KlineSource>) -> Self {
        Self { model: model.map(Arc::new), klines }
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }
}
