// src/routes/inference.rs

use actix_web::{get, http::header::ContentType, web, HttpResponse, Scope};

use crate::services::inference::predict_price;
use crate::state::AppState;
use crate::utils::errors::InferenceError;

/// `GET /inference/{token}` → bare price such as `3012.50`, or a JSON error.
#[get("/{token}")]
pub async fn inference(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, InferenceError> {
    let token = path.into_inner();
    let prediction = predict_price(state.model.clone(), state.klines.as_ref(), &token).await?;

    metrics::increment_counter!(
        "inference_predictions_total",
        "symbol" => prediction.token.symbol(),
    );

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(prediction.body()))
}

pub fn inference_scope() -> Scope {
    web::scope("/inference")
        .service(inference)
}
