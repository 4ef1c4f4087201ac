// Route access middleware for Actix-web
// Runs the authorization decision for every request before it reaches a handler

use std::rc::Rc;
use std::time::Instant;

use actix_service::forward_ready;
use actix_utils::future::{Ready, ok};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    body::EitherBody,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web::Data,
};
use futures::future::LocalBoxFuture;

use microfin_auth::{AuthError, Decision, Subject};
use microfin_common::RouteKey;

use crate::{
    error::AppError, metrics, middleware::auth::AuthContext, model::AppState,
    model::response::ErrorResult,
};

// Route access middleware transformer
pub struct RouteAccess;

impl<S, B> Transform<S, ServiceRequest> for RouteAccess
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RouteAccessMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RouteAccessMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct RouteAccessMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RouteAccessMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            if Method::OPTIONS == *req.method() {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let Some(app_state) = req.app_data::<Data<AppState>>().cloned() else {
                tracing::error!("AppState not found in request app_data");
                return Err(AppError::from(anyhow::anyhow!("application state missing")).into());
            };

            let started = Instant::now();
            let method = req.method().as_str().to_string();
            let path = req.path().to_string();
            let matched = app_state.route_table.find(&method, &path).cloned();
            let key = matched
                .clone()
                .unwrap_or_else(|| RouteKey::new(&method, &path));
            let route_label = matched
                .as_ref()
                .map(|k| k.to_string())
                .unwrap_or_else(|| metrics::UNMATCHED_ROUTE.to_string());

            let auth_context = req
                .extensions()
                .get::<AuthContext>()
                .cloned()
                .unwrap_or_default();

            let decision = app_state
                .engine
                .decide(&key, auth_context.subject.as_ref())
                .await
                .map_err(AppError::from)?;

            match decision {
                Decision::Allow(_) => {
                    let res = service.call(req).await?;
                    metrics::record_http_request(
                        &method,
                        &route_label,
                        res.status().as_u16(),
                        started.elapsed().as_secs_f64(),
                    );
                    Ok(res.map_into_left_body())
                }
                Decision::Deny(denial) => {
                    // A rejected token explains the missing subject better than a generic 401
                    let denial = match (denial, auth_context.error) {
                        (AuthError::Unauthenticated(_), Some(identity_error)) => identity_error,
                        (denial, _) => denial,
                    };

                    let response = ErrorResult::from_auth_error(&denial, &path).http_response();
                    metrics::record_http_request(
                        &method,
                        &route_label,
                        response.status().as_u16(),
                        started.elapsed().as_secs_f64(),
                    );
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

fn auth_context(req: &HttpRequest) -> AuthContext {
    req.extensions()
        .get::<AuthContext>()
        .cloned()
        .unwrap_or_default()
}

fn require_subject(req: &HttpRequest) -> Result<Subject, AppError> {
    let ctx = auth_context(req);
    match (ctx.subject, ctx.error) {
        (Some(subject), _) => Ok(subject),
        (None, Some(err)) => Err(err.into()),
        (None, None) => Err(AuthError::Unauthenticated(
            "Unauthorized. Please login first".to_string(),
        )
        .into()),
    }
}

/// Extractor for handlers that need the calling subject
#[derive(Debug, Clone)]
pub struct AuthenticatedSubject(pub Subject);

impl FromRequest for AuthenticatedSubject {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        actix_utils::future::ready(require_subject(req).map(AuthenticatedSubject))
    }
}

/// Extractor for administration handlers; non-primary subjects are rejected
#[derive(Debug, Clone)]
pub struct PrimarySubject(pub Subject);

impl FromRequest for PrimarySubject {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = require_subject(req).and_then(|subject| {
            if subject.is_primary_role {
                Ok(PrimarySubject(subject))
            } else {
                Err(AuthError::PrimaryRoleRequired.into())
            }
        });
        actix_utils::future::ready(result)
    }
}
