use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fieldserv_core::artifacts::ArtifactRef;
use fieldserv_shared::{BookingSlot, EquipmentItem, OrderStatus, PaymentStatus, ServiceType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed once an admin successfully schedules the order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub estimated_end_time: NaiveTime,
}

/// The single source of truth for a customer's booking.
///
/// `total_amount` is the pricing calculator's output at creation time and is
/// never recomputed. The booking slot is immutable after creation;
/// rescheduling is modeled as cancel + rebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: String,
    pub service_type: ServiceType,
    pub location_address: String,
    pub unit_count: u32,
    pub equipment_details: Vec<EquipmentItem>,
    pub notes: Option<String>,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub slot: BookingSlot,
    pub schedule: Option<ScheduleRecord>,
    pub scheduling_feedback: Option<String>,
    pub completion_artifact: Option<ArtifactRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        customer_id: String,
        service_type: ServiceType,
        location_address: String,
        unit_count: u32,
        equipment_details: Vec<EquipmentItem>,
        notes: Option<String>,
        total_amount: i64,
        slot: BookingSlot,
        now: DateTime<Utc>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            order_number: generate_order_number(id, now),
            customer_id,
            service_type,
            location_address,
            unit_count,
            equipment_details,
            notes,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            slot,
            schedule: None,
            scheduling_feedback: None,
            completion_artifact: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }
}

/// Format: FS{yyyymmddHHMMSS}{4 hex chars from the order id}
fn generate_order_number(id: Uuid, now: DateTime<Utc>) -> String {
    let short = id.simple().to_string()[..4].to_uppercase();
    format!("FS{}{}", now.format("%Y%m%d%H%M%S"), short)
}

/// Admin list filters; all criteria are conjunctive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub customer_id: Option<String>,
}
