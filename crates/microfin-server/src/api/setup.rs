//! One-time system setup
//!
//! Both routes are public at the policy level so they stay reachable before
//! any primary role exists. Initialization still needs an authenticated caller
//! and is refused once a primary role is configured.

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;

use crate::{
    error::AppError,
    middleware::AuthenticatedSubject,
    model::{AppState, response},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeForm {
    role_id: String,
}

#[get("/setup/status")]
async fn status(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let status = data.admin.setup_status().await?;
    Ok(response::Result::<()>::http_success(status))
}

#[post("/setup/initialize")]
async fn initialize(
    data: web::Data<AppState>,
    subject: AuthenticatedSubject,
    form: web::Json<InitializeForm>,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedSubject(subject) = subject;
    let role = data
        .admin
        .initialize_primary_role(&subject.id, &form.role_id)
        .await?;

    Ok(response::Result::<()>::http_created(serde_json::json!({
        "primaryRole": role,
    })))
}
