use crate::types::ServiceType;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

/// Payload handed to the notification collaborator after a successful
/// scheduling or cancellation transition.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderScheduledEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub service_type: ServiceType,
    pub location_address: String,
    pub total_amount: i64,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub estimated_end_time: NaiveTime,
    pub contact_name: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderCancelledEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub service_type: ServiceType,
    pub refunded_amount: i64,
}
