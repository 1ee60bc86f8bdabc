use axum::{
    extract::{Path, Query, State},
    Extension,
};
use tracing::instrument;

use super::{
    models::{OrderModel, OrderView},
    service::OrderService,
    types::{OrderQuery, PlaceOrderRequest},
};
use crate::session::Principal;
use crate::shared::{parse_id, ApiResponse, AppError, AppState, ListParams, ListQuery, ValidJson};

/// POST /api/client/order
#[instrument(name = "place_order", skip_all, fields(account_id = %principal.id))]
pub async fn place_order(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidJson(request): ValidJson<PlaceOrderRequest>,
) -> Result<ApiResponse<OrderModel>, AppError> {
    let order = OrderService::from_state(&state)
        .place_order(principal.id, request)
        .await?;
    Ok(ApiResponse::created(order).with_message("Your order has been placed successfully"))
}

/// GET /api/client/orders
#[instrument(name = "my_orders", skip_all, fields(account_id = %principal.id))]
pub async fn my_orders(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<OrderView>>, AppError> {
    let params = ListParams::from(query);
    let page = OrderService::from_state(&state)
        .list_client_orders(principal.id, &params)
        .await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

/// GET /api/admin/orders
#[instrument(name = "list_orders", skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(order_query): Query<OrderQuery>,
) -> Result<ApiResponse<Vec<OrderView>>, AppError> {
    let params = ListParams::from(query);
    let page = OrderService::from_state(&state)
        .list_orders(&params, order_query.payment_status.as_deref())
        .await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

/// PUT /api/admin/check-order/:id
#[instrument(name = "check_order", skip(state))]
pub async fn check_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<OrderModel>, AppError> {
    let id = parse_id(&id, "order")?;
    let order = OrderService::from_state(&state).check_order(id).await?;
    Ok(ApiResponse::ok(order).with_message("Order confirmed successfully"))
}

/// PUT /api/admin/cancel-order/:id
#[instrument(name = "cancel_order", skip(state))]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<OrderModel>, AppError> {
    let id = parse_id(&id, "order")?;
    let order = OrderService::from_state(&state).cancel_order(id).await?;
    Ok(ApiResponse::ok(order).with_message("Order cancelled successfully"))
}
