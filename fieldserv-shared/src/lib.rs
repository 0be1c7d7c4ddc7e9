pub mod events;
pub mod pii;
pub mod types;

pub use types::{BookingSlot, EquipmentItem, OrderStatus, PaymentStatus, ServiceType};
