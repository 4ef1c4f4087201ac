//! Permission catalog and grant endpoints

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;

use microfin_persistence::{NewPermission, PermissionChanges};

use crate::{
    error::AppError,
    middleware::PrimarySubject,
    model::{AppState, response},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleGrantForm {
    role_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserGrantForm {
    user_id: String,
}

#[post("/permissions")]
async fn create(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    form: web::Json<NewPermission>,
) -> Result<HttpResponse, AppError> {
    let created = data
        .admin
        .create_permission(&subject.0.id, form.into_inner())
        .await?;

    Ok(response::Result::<()>::http_created(created))
}

#[get("/permissions")]
async fn list(
    data: web::Data<AppState>,
    _subject: PrimarySubject,
) -> Result<HttpResponse, AppError> {
    let catalog = data.admin.list_permissions().await?;
    Ok(response::Result::<()>::http_success(catalog))
}

#[get("/permissions/{id}")]
async fn detail(
    data: web::Data<AppState>,
    _subject: PrimarySubject,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let detail = data.admin.get_permission(&path).await?;
    Ok(response::Result::<()>::http_success(detail))
}

#[put("/permissions/{id}")]
async fn update(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<String>,
    form: web::Json<PermissionChanges>,
) -> Result<HttpResponse, AppError> {
    let updated = data
        .admin
        .update_permission(&subject.0.id, &path, form.into_inner())
        .await?;

    Ok(response::Result::<()>::http_success(updated))
}

#[delete("/permissions/{id}")]
async fn delete(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let deleted = data.admin.delete_permission(&subject.0.id, &path).await?;
    Ok(response::Result::<()>::http_success(deleted))
}

#[post("/permissions/{id}/assign-to-role")]
async fn assign_to_role(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<String>,
    form: web::Json<RoleGrantForm>,
) -> Result<HttpResponse, AppError> {
    let (role, permission) = data
        .admin
        .assign_permission_to_role(&subject.0.id, &path, &form.role_id)
        .await?;

    Ok(response::Result::<()>::http_success(serde_json::json!({
        "role": role,
        "permission": permission,
    })))
}

#[delete("/permissions/{id}/roles/{role_id}")]
async fn remove_from_role(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (permission_id, role_id) = path.into_inner();
    let (role, permission) = data
        .admin
        .remove_permission_from_role(&subject.0.id, &permission_id, &role_id)
        .await?;

    Ok(response::Result::<()>::http_success(serde_json::json!({
        "role": role,
        "permission": permission,
    })))
}

#[post("/permissions/{id}/assign-to-user")]
async fn assign_to_user(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<String>,
    form: web::Json<UserGrantForm>,
) -> Result<HttpResponse, AppError> {
    let permission = data
        .admin
        .assign_permission_to_user(&subject.0.id, &path, &form.user_id)
        .await?;

    Ok(response::Result::<()>::http_success(serde_json::json!({
        "userId": form.user_id,
        "permission": permission,
    })))
}

#[delete("/permissions/{id}/users/{user_id}")]
async fn remove_from_user(
    data: web::Data<AppState>,
    subject: PrimarySubject,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (permission_id, user_id) = path.into_inner();
    let permission = data
        .admin
        .remove_permission_from_user(&subject.0.id, &permission_id, &user_id)
        .await?;

    Ok(response::Result::<()>::http_success(serde_json::json!({
        "userId": user_id,
        "permission": permission,
    })))
}
