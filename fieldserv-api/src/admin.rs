use crate::{error::AppError, state::AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use fieldserv_order::{Order, OrderFilter, OrderPage, ScheduleOutcome};
use fieldserv_shared::{OrderStatus, PaymentStatus};
use serde::Deserialize;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/schedule", post(schedule_order))
        .route("/orders/{id}/completion-report", post(upload_completion_report))
        .route("/orders/{id}/complete", post(complete_order))
        .route("/orders/{id}/refund", post(refund_order))
        .route("/orders/{id}/cancel", post(cancel_order))
}

#[derive(Debug, Deserialize)]
struct AdminOrdersQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
    status: Option<OrderStatus>,
    payment_status: Option<PaymentStatus>,
    customer_id: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// GET /v1/admin/orders
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrdersQuery>,
) -> Result<Json<OrderPage>, AppError> {
    let filter = OrderFilter {
        status: query.status,
        payment_status: query.payment_status,
        customer_id: query.customer_id,
    };
    let page = state
        .coordinator
        .list_orders(&filter, query.page, query.limit)
        .await?;
    Ok(Json(page))
}

/// GET /v1/admin/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.coordinator.get_order(order_id).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
struct ScheduleRequest {
    date: NaiveDate,
    time: NaiveTime,
}

/// POST /v1/admin/orders/{id}/schedule
///
/// A slot that no longer fits comes back 200 with the order in
/// scheduling_failed and the feedback the admin should act on.
async fn schedule_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleOutcome>, AppError> {
    let outcome = state
        .coordinator
        .admin_schedule(order_id, req.date, req.time)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct UploadCompletionRequest {
    filename: String,
    content: String,
}

/// POST /v1/admin/orders/{id}/completion-report
async fn upload_completion_report(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UploadCompletionRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .coordinator
        .admin_upload_completion(order_id, &req.filename, req.content.as_bytes())
        .await?;
    Ok(Json(order))
}

/// POST /v1/admin/orders/{id}/complete
async fn complete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.coordinator.admin_mark_completed(order_id).await?;
    Ok(Json(order))
}

/// POST /v1/admin/orders/{id}/refund
///
/// Same transition as the provider's refund webhook, for operators who
/// process the refund manually in the provider dashboard.
async fn refund_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let outcome = state.coordinator.refund_confirmed(order_id).await?;
    Ok(Json(outcome.order))
}

/// POST /v1/admin/orders/{id}/cancel
async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.coordinator.admin_cancel(order_id).await?;
    Ok(Json(order))
}
