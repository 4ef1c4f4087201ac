use actix_web::{HttpResponse, get, web};

use crate::{
    error::AppError,
    middleware::AuthenticatedSubject,
    model::{AppState, response},
};

/// Effective permission slugs of the caller
#[get("/auth/permissions")]
async fn my_permissions(
    data: web::Data<AppState>,
    subject: AuthenticatedSubject,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedSubject(subject) = subject;
    let permissions = data.engine.effective_permissions(&subject).await?;

    Ok(response::Result::<()>::http_success(serde_json::json!({
        "userId": subject.id,
        "roleName": subject.role_name,
        "isPrimaryRole": subject.is_primary_role,
        "permissions": permissions,
    })))
}
