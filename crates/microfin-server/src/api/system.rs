use actix_web::{HttpResponse, get, web};
use serde::Serialize;

use crate::{
    error::AppError,
    middleware::PrimarySubject,
    model::{
        AppState,
        response::{self, ErrorResult},
    },
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStatus {
    status: &'static str,
    storage_mode: String,
}

#[get("/system/health")]
async fn health(data: web::Data<AppState>) -> HttpResponse {
    let storage_mode = data.persistence.storage_mode().to_string();

    match data.persistence.health_check().await {
        Ok(()) => response::Result::<()>::http_success(HealthStatus {
            status: "UP",
            storage_mode,
        }),
        Err(e) => {
            tracing::warn!("health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(response::Result::success(HealthStatus {
                status: "DOWN",
                storage_mode,
            }))
        }
    }
}

#[get("/system/metrics")]
async fn metrics(
    data: web::Data<AppState>,
    _subject: PrimarySubject,
) -> Result<HttpResponse, AppError> {
    match &data.metrics_handle {
        Some(handle) => Ok(HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render())),
        None => Ok(ErrorResult::new(
            404,
            "METRICS_DISABLED",
            "Metrics are disabled".to_string(),
            "",
        )
        .http_response()),
    }
}
