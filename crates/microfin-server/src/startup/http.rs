//! HTTP server setup.

use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};

use crate::{
    api,
    middleware::{Authentication, RouteAccess},
    model::AppState,
};

/// Creates and binds the HTTP server.
///
/// Every request passes authentication and then the route access check
/// before reaching a handler.
pub fn main_server(
    app_state: Arc<AppState>,
    context_path: String,
    address: String,
    port: u16,
) -> Result<Server, std::io::Error> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(RouteAccess)
            .wrap(Authentication)
            .wrap(Logger::default())
            .app_data(web::Data::from(app_state.clone()))
            .service(api::route::routes(&context_path))
    })
    .bind((address, port))?
    .run())
}
