//! Route policy administration
//!
//! The `{route_key}` segment carries a percent-encoded route key such as
//! `GET%3A%2Fapi%2Froles`.

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;

use microfin_auth::AdminError;
use microfin_common::RouteKey;
use microfin_persistence::RouteConfigChanges;

use crate::{
    error::AppError,
    middleware::PrimarySubject,
    model::{AppState, response},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteGrantForm {
    permission_id: String,
}

fn parse_route_key(raw: &str) -> Result<RouteKey, AppError> {
    raw.parse::<RouteKey>()
        .map_err(|_| AdminError::InvalidRouteKey(raw.to_string()).into())
}

#[get("/permission-routes")]
async fn list(
    data: web::Data<AppState>,
    _subject: PrimarySubject,
) -> Result<HttpResponse, AppError> {
    let catalog = data.engine.registry().list().await?;
    Ok(response::Result::<()>::http_success(catalog))
}

#[get("/permission-routes/{route_key}")]
async fn detail(
    data: web::Data<AppState>,
    _subject: PrimarySubject,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let key = parse_route_key(&path)?;
    let detail = data.admin.route_detail(&key).await?;

    Ok(response::Result::<()>::http_success(detail))
}

#[put("/permission-routes/{route_key}")]
async fn update(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<String>,
    form: web::Json<RouteConfigChanges>,
) -> Result<HttpResponse, AppError> {
    let key = parse_route_key(&path)?;
    let outcome = data
        .admin
        .update_route_config(&subject.0.id, &key, form.into_inner())
        .await?;

    Ok(response::Result::<()>::http_success(outcome))
}

#[post("/permission-routes/{route_key}/assign-permission")]
async fn assign_permission(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<String>,
    form: web::Json<RouteGrantForm>,
) -> Result<HttpResponse, AppError> {
    let key = parse_route_key(&path)?;
    let policy = data
        .admin
        .assign_permission_to_route(&subject.0.id, &key, &form.permission_id)
        .await?;

    Ok(response::Result::<()>::http_success(policy))
}

#[delete("/permission-routes/{route_key}/permissions/{permission_id}")]
async fn remove_permission(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (raw_key, permission_id) = path.into_inner();
    let key = parse_route_key(&raw_key)?;
    let policy = data
        .admin
        .remove_permission_from_route(&subject.0.id, &key, &permission_id)
        .await?;

    Ok(response::Result::<()>::http_success(policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_key() {
        let key = parse_route_key("GET:/api/roles/:id").unwrap();
        assert_eq!(key.path(), "/api/roles/:id");
        assert!(parse_route_key("/api/roles").is_err());
    }
}
