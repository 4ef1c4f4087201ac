//! Permission template endpoints

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;

use crate::{
    error::AppError,
    middleware::PrimarySubject,
    model::{AppState, response},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyTemplateForm {
    template_id: String,
    /// Defaults to the primary role
    role_id: Option<String>,
}

#[get("/permission-templates")]
async fn list(
    data: web::Data<AppState>,
    _subject: PrimarySubject,
) -> Result<HttpResponse, AppError> {
    Ok(response::Result::<()>::http_success(data.admin.list_templates()))
}

#[get("/permission-templates/{id}/preview")]
async fn preview(
    data: web::Data<AppState>,
    _subject: PrimarySubject,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let preview = data.admin.preview_template(&path)?;
    Ok(response::Result::<()>::http_success(preview))
}

#[post("/permission-templates/apply")]
async fn apply(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    form: web::Json<ApplyTemplateForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let applied = data
        .admin
        .apply_template(&subject.0.id, &form.template_id, form.role_id.as_deref())
        .await?;

    Ok(response::Result::<()>::http_success(applied))
}
