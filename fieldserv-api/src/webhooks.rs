use crate::{error::AppError, state::AppState};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use fieldserv_core::payment::PaymentEvent;

pub fn routes() -> Router<AppState> {
    Router::new().route("/payments", post(handle_payment_webhook))
}

/// POST /v1/webhooks/payments
///
/// Delivery point for the payment provider. A confirmation for an order the
/// expiry sweep already purged comes back 404; the provider's retries keep
/// getting 404 and eventually give up.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(event): Json<PaymentEvent>,
) -> Result<StatusCode, AppError> {
    match event {
        PaymentEvent::PaymentConfirmed { order_id } => {
            let order = state.coordinator.payment_confirmed(order_id).await?;
            tracing::info!(order_number = %order.order_number, "Webhook: payment confirmed");
        }
        PaymentEvent::RefundConfirmed { order_id, operator } => {
            let outcome = state.coordinator.refund_confirmed(order_id).await?;
            tracing::info!(
                order_number = %outcome.order.order_number,
                operator,
                email_sent = outcome.email_sent,
                "Webhook: refund confirmed"
            );
        }
    }
    Ok(StatusCode::OK)
}
