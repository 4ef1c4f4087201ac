// Authentication middleware for Actix-web
// Resolves the bearer token into a subject and stores the outcome in the request extensions

use std::rc::Rc;

use actix_service::forward_ready;
use actix_utils::future::{Ready, ok};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web::Data,
};
use futures::future::LocalBoxFuture;

use microfin_auth::{AUTHORIZATION_HEADER, AuthError, Subject, extract_bearer_token};

use crate::{error::AppError, model::AppState};

/// Identity outcome of one request
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub token_provided: bool,
    pub subject: Option<Subject>,
    /// Why a provided token did not yield a subject
    pub error: Option<AuthError>,
}

// Authentication middleware transformer
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthenticationMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct AuthenticationMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
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
            if Method::OPTIONS != *req.method() {
                let token = extract_bearer_token(
                    req.headers()
                        .get(AUTHORIZATION_HEADER)
                        .and_then(|v| v.to_str().ok()),
                )
                .map(str::to_string);

                let mut auth_context = AuthContext {
                    token_provided: token.is_some(),
                    ..Default::default()
                };

                if token.is_some() {
                    let Some(app_state) = req.app_data::<Data<AppState>>().cloned() else {
                        tracing::error!("AppState not found in request app_data");
                        return Err(AppError::from(anyhow::anyhow!("application state missing"))
                            .into());
                    };

                    match app_state.identity.resolve(token.as_deref()).await {
                        Ok(subject) => auth_context.subject = Some(subject),
                        Err(err) => match err.downcast::<AuthError>() {
                            Ok(denial) => {
                                tracing::debug!(reason = denial.code(), "token rejected");
                                auth_context.error = Some(denial);
                            }
                            Err(err) => {
                                tracing::error!("identity lookup failed: {:#}", err);
                                return Err(AppError::from(err).into());
                            }
                        },
                    }
                }

                req.extensions_mut().insert(auth_context);
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
