use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fablab_auth::AuthzError;
use fablab_infra::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::DuplicateKey(key) => json_error(
            StatusCode::CONFLICT,
            "duplicate_key",
            format!("item with ID '{key}' already exists"),
        ),
        LedgerError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        e @ LedgerError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", e.to_string())
        }
        LedgerError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        LedgerError::Store(e) => {
            tracing::error!(error = %e, "ledger store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "internal server error",
            )
        }
    }
}

pub fn forbidden(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fablab_infra::StoreError;

    #[test]
    fn ledger_errors_map_to_status_codes() {
        let cases = [
            (LedgerError::DuplicateKey("CHOC-001".into()), StatusCode::CONFLICT),
            (LedgerError::NotFound, StatusCode::NOT_FOUND),
            (
                LedgerError::InsufficientStock { available: 2, delta: -3 },
                StatusCode::BAD_REQUEST,
            ),
            (LedgerError::Validation("price".into()), StatusCode::BAD_REQUEST),
            (
                LedgerError::Store(StoreError::Backend("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ledger_error_to_response(err).status(), status);
        }
    }
}
