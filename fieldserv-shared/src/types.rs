use crate::pii::Masked;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// The three bookable field-service types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Installation,
    Maintenance,
    Repair,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [
        ServiceType::Installation,
        ServiceType::Maintenance,
        ServiceType::Repair,
    ];
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceType::Installation => "INSTALLATION",
            ServiceType::Maintenance => "MAINTENANCE",
            ServiceType::Repair => "REPAIR",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INSTALLATION" => Ok(ServiceType::Installation),
            "MAINTENANCE" => Ok(ServiceType::Maintenance),
            "REPAIR" => Ok(ServiceType::Repair),
            other => Err(format!("Unknown service type: {other}")),
        }
    }
}

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PendingSchedule,
    Scheduled,
    SchedulingFailed,
    Precancel,
    Cancelled,
    Completed,
}

impl OrderStatus {
    /// Terminal states have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PendingSchedule => "pending_schedule",
            OrderStatus::Scheduled => "scheduled",
            OrderStatus::SchedulingFailed => "scheduling_failed",
            OrderStatus::Precancel => "precancel",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// Payment status, monotonic except for the explicit refund transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        };
        write!(f, "{}", s)
    }
}

/// One equipment line on an installation order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EquipmentItem {
    pub name: String,
    pub model: String,
    pub unit_price: i64,
    pub quantity: u32,
}

impl EquipmentItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * self.quantity as i64
    }
}

/// The primary booking slot an order is created with.
/// Never mutated after creation; rescheduling is cancel + rebook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingSlot {
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    pub contact_name: String,
    pub contact_phone: Masked<String>,
}
