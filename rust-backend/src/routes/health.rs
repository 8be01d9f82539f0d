use actix_web::{get, web, HttpResponse, Scope};

use crate::state::AppState;
use crate::utils::types::HealthResponse;

#[get("")]
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".into(),
        model_loaded: state.model_loaded(),
    })
}

pub fn health_scope() -> Scope {
    web::scope("/health")
        .service(health_check)
}
