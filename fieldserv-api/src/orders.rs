use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use fieldserv_core::payment::CheckoutSession;
use fieldserv_core::EngineError;
use fieldserv_order::{CreateOrderRequest, Order, OrderFilter, OrderPage};
use fieldserv_shared::{EquipmentItem, ServiceType};
use serde::Deserialize;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_my_orders))
        .route("/{id}", get(get_order))
        .route("/{id}/checkout", post(create_checkout))
        .route("/{id}/cancel", post(cancel_order))
}

/// Booking payload; the customer identity comes from the token, never the body
#[derive(Debug, Deserialize)]
struct CreateOrderPayload {
    service_type: ServiceType,
    location_address: String,
    unit_count: u32,
    #[serde(default)]
    equipment_details: Vec<EquipmentItem>,
    notes: Option<String>,
    preferred_date: NaiveDate,
    preferred_time: NaiveTime,
    contact_name: String,
    contact_phone: String,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// POST /v1/orders
async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .coordinator
        .create_order(
            CreateOrderRequest {
                customer_id: claims.sub,
                service_type: payload.service_type,
                location_address: payload.location_address,
                unit_count: payload.unit_count,
                equipment_details: payload.equipment_details,
                notes: payload.notes,
                preferred_date: payload.preferred_date,
                preferred_time: payload.preferred_time,
                contact_name: payload.contact_name,
                contact_phone: payload.contact_phone,
            },
            Utc::now(),
        )
        .await?;
    Ok(Json(order))
}

/// GET /v1/orders
async fn list_my_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Query(query): Query<PageQuery>,
) -> Result<Json<OrderPage>, AppError> {
    let filter = OrderFilter {
        customer_id: Some(claims.sub),
        ..OrderFilter::default()
    };
    let page = state
        .coordinator
        .list_orders(&filter, query.page, query.limit)
        .await?;
    Ok(Json(page))
}

/// Ownership check: another customer's order is indistinguishable from a
/// missing one.
async fn owned_order(
    state: &AppState,
    claims: &CustomerClaims,
    order_id: Uuid,
) -> Result<Order, AppError> {
    let order = state.coordinator.get_order(order_id).await?;
    if order.customer_id != claims.sub {
        return Err(AppError::Engine(EngineError::NotFound(format!(
            "Order {order_id}"
        ))));
    }
    Ok(order)
}

/// GET /v1/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = owned_order(&state, &claims, order_id).await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/checkout
async fn create_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<CheckoutSession>, AppError> {
    owned_order(&state, &claims, order_id).await?;
    let session = state.coordinator.create_checkout(order_id).await?;
    Ok(Json(session))
}

/// POST /v1/orders/{id}/cancel
async fn cancel_order(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    owned_order(&state, &claims, order_id).await?;
    let order = state
        .coordinator
        .request_cancellation(order_id, Utc::now().date_naive())
        .await?;
    Ok(Json(order))
}
