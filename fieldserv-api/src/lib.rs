use axum::{http::Method, middleware::from_fn_with_state, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod app_config;
pub mod auth;
pub mod calendar;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod state;
pub mod webhooks;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let customer_routes = orders::routes().layer(from_fn_with_state(
        state.clone(),
        middleware::auth::customer_auth_middleware,
    ));
    let admin_routes = admin::routes().layer(from_fn_with_state(
        state.clone(),
        middleware::auth::admin_auth_middleware,
    ));

    Router::new()
        .nest("/v1/auth", auth::routes())
        .nest("/v1/calendar", calendar::calendar_routes())
        .nest("/v1/capacity", calendar::capacity_routes())
        .nest("/v1/orders", customer_routes)
        .nest("/v1/admin", admin_routes)
        .nest("/v1/webhooks", webhooks::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
