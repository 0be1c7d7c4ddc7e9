use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A checkout session opened with the payment provider for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String, // Provider's ID (e.g. cs_123)
    pub order_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Asynchronous events the provider delivers back (webhook side).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PaymentEvent {
    PaymentConfirmed { order_id: Uuid },
    RefundConfirmed { order_id: Uuid, operator: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session for an order's fixed total
    async fn create_checkout_session(
        &self,
        order_id: Uuid,
        amount: i64,
        currency: &str,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        order_id: Uuid,
        amount: i64,
        currency: &str,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>> {
        // Trigger for exercising the DependencyFailure path
        if amount < 0 {
            return Err("Simulated payment gateway failure".into());
        }
        Ok(CheckoutSession {
            // Encode order_id in the session id so the mock can "remember" it
            id: format!("mock_cs_{}", order_id.simple()),
            order_id,
            amount,
            currency: currency.to_string(),
            checkout_url: Some(format!("https://pay.example.test/cs/{}", order_id.simple())),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_session_carries_order_id() {
        let gateway = MockPaymentGateway;
        let order_id = Uuid::new_v4();
        let session = gateway
            .create_checkout_session(order_id, 3000, "TWD")
            .await
            .unwrap();
        assert_eq!(session.order_id, order_id);
        assert!(session.id.starts_with("mock_cs_"));
    }
}
