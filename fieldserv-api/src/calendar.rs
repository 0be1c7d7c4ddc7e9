use crate::{error::AppError, state::AppState};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use fieldserv_capacity::availability::{CalendarDay, UnifiedCalendar};
use fieldserv_capacity::feasibility::{Feasibility, UnitCheck};
use fieldserv_core::EngineError;
use fieldserv_shared::ServiceType;
use serde::Deserialize;

pub fn calendar_routes() -> Router<AppState> {
    Router::new()
        .route("/unified/{year}/{month}", get(unified_calendar))
        .route("/{service_type}/{year}/{month}", get(month_calendar))
}

pub fn capacity_routes() -> Router<AppState> {
    Router::new()
        .route("/check", get(check_units))
        .route("/feasibility", get(check_feasibility))
}

fn parse_service(raw: &str) -> Result<ServiceType, AppError> {
    raw.parse::<ServiceType>()
        .map_err(|msg| AppError::Engine(EngineError::Validation(msg)))
}

/// GET /v1/calendar/{service_type}/{year}/{month}
async fn month_calendar(
    State(state): State<AppState>,
    Path((service_type, year, month)): Path<(String, i32, u32)>,
) -> Result<Json<Vec<CalendarDay>>, AppError> {
    let service_type = parse_service(&service_type)?;
    let days = state
        .coordinator
        .month_calendar(service_type, year, month, Utc::now().date_naive())
        .await?;
    Ok(Json(days))
}

/// GET /v1/calendar/unified/{year}/{month}
async fn unified_calendar(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<UnifiedCalendar>, AppError> {
    let calendar = state
        .coordinator
        .unified_calendar(year, month, Utc::now().date_naive())
        .await?;
    Ok(Json(calendar))
}

#[derive(Debug, Deserialize)]
struct CapacityQuery {
    date: NaiveDate,
    time: NaiveTime,
    service_type: ServiceType,
    unit_count: u32,
}

/// GET /v1/capacity/check
async fn check_units(
    State(state): State<AppState>,
    Query(query): Query<CapacityQuery>,
) -> Result<Json<UnitCheck>, AppError> {
    let check = state
        .coordinator
        .check_units(query.date, query.time, query.service_type, query.unit_count)
        .await?;
    Ok(Json(check))
}

/// GET /v1/capacity/feasibility
async fn check_feasibility(
    State(state): State<AppState>,
    Query(query): Query<CapacityQuery>,
) -> Result<Json<Feasibility>, AppError> {
    let feasibility = state
        .coordinator
        .check_feasibility(query.date, query.time, query.service_type, query.unit_count)
        .await?;
    Ok(Json(feasibility))
}
