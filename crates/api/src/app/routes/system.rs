use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};

use crate::app::errors::json_error;
use crate::authz::permissions_from_role;
use crate::context::PrincipalContext;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "message": "FabLab inventory API is running",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Fallback for paths no route matches.
pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "Route not found")
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "userId": principal.user_id().to_string(),
        "email": principal.email(),
        "role": principal.role(),
        "permissions": permissions_from_role(principal.role()),
    }))
}
