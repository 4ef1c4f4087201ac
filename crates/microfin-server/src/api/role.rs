use actix_web::{HttpResponse, delete, post, web};
use serde::Deserialize;

use crate::{
    error::AppError,
    middleware::PrimarySubject,
    model::{AppState, response},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionIdsForm {
    permission_ids: Vec<String>,
}

#[post("/roles/{id}/permissions")]
async fn assign_permissions(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<String>,
    form: web::Json<PermissionIdsForm>,
) -> Result<HttpResponse, AppError> {
    let outcome = data
        .admin
        .assign_permissions_to_role(&subject.0.id, &path, &form.permission_ids)
        .await?;

    Ok(response::Result::<()>::http_success(outcome))
}

#[delete("/roles/{id}/permissions")]
async fn remove_permissions(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<String>,
    form: web::Json<PermissionIdsForm>,
) -> Result<HttpResponse, AppError> {
    let removed = data
        .admin
        .remove_permissions_from_role(&subject.0.id, &path, &form.permission_ids)
        .await?;

    Ok(response::Result::<()>::http_success(serde_json::json!({
        "removed": removed,
    })))
}
