//! Router assembly for the inventory API.
//!
//! `/health` is public; everything else passes through the bearer-token
//! middleware, which attaches a `PrincipalContext` to the request. CORS wraps
//! the whole router so preflight requests never reach the auth layer.

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::cors::CorsLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Router shared by the binary and the black-box tests.
pub fn build_app(jwt_secret: String, cors_origin: HeaderValue, services: AppServices) -> Router {
    let jwt = Arc::new(fablab_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .fallback(routes::system::not_found)
        .layer(cors(cors_origin))
}

/// Credentialed CORS for the single configured browser origin.
fn cors(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
