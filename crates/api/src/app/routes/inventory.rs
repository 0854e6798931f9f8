use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};

use fablab_auth::Permission;
use fablab_core::RecordId;
use fablab_inventory::{ItemPatch, NewItem};

use crate::app::dto::{self, AdjustStockRequest, ItemDetailQuery, ItemList, ListItemsQuery};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/alerts", get(low_stock_alerts))
        .route("/stats", get(stats))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/:id/stock", patch(adjust_stock))
}

fn guard(principal: &PrincipalContext, required: Permission) -> Result<(), Response> {
    authorize_request(principal, required).map_err(errors::forbidden)
}

fn parse_record_id(raw: &str) -> Result<RecordId, Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text()))
}

fn ok(data: impl serde::Serialize, message: Option<&str>) -> Response {
    (StatusCode::OK, Json(dto::envelope(data, message))).into_response()
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ListItemsQuery>,
) -> Response {
    if let Err(resp) = guard(&principal, Permission::InventoryRead) {
        return resp;
    }
    let (filter, page) = match query.into_parts() {
        Ok(parts) => parts,
        Err(resp) => return resp,
    };

    match services.ledger().list(&filter, page).await {
        Ok(page) => ok(ItemList::from(page), None),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn low_stock_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard(&principal, Permission::InventoryRead) {
        return resp;
    }
    match services.ledger().low_stock_alerts().await {
        Ok(items) => ok(items, None),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard(&principal, Permission::InventoryRead) {
        return resp;
    }
    match services.ledger().stats().await {
        Ok(stats) => ok(stats, None),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<ItemDetailQuery>,
) -> Response {
    if let Err(resp) = guard(&principal, Permission::InventoryRead) {
        return resp;
    }
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let history = match query.history() {
        Ok(n) => n,
        Err(resp) => return resp,
    };

    match services.ledger().get(id, history).await {
        Ok(detail) => ok(detail, None),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Response {
    if let Err(resp) = guard(&principal, Permission::InventoryWrite) {
        return resp;
    }
    let candidate = match body(payload) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.ledger().create(candidate, principal.user_id()).await {
        Ok(item) => (
            StatusCode::CREATED,
            Json(dto::envelope(item, Some("Item created successfully"))),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<ItemPatch>, JsonRejection>,
) -> Response {
    if let Err(resp) = guard(&principal, Permission::InventoryWrite) {
        return resp;
    }
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let patch = match body(payload) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.ledger().update(id, patch, principal.user_id()).await {
        Ok(item) => ok(item, Some("Item updated successfully")),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = guard(&principal, Permission::InventoryWrite) {
        return resp;
    }
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledger().delete(id, principal.user_id()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Item deleted successfully",
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<AdjustStockRequest>, JsonRejection>,
) -> Response {
    if let Err(resp) = guard(&principal, Permission::InventoryAdjust) {
        return resp;
    }
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let request = match body(payload) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .adjust(id, request.quantity, request.notes, principal.user_id())
        .await
    {
        Ok(item) => ok(item, Some("Stock adjusted successfully")),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
