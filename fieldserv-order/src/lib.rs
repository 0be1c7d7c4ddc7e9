pub mod coordinator;
pub mod lifecycle;
pub mod models;

pub use coordinator::{
    CancellationOutcome, CreateOrderRequest, EngineConfig, OrderPage, ScheduleOutcome,
    SchedulingCoordinator,
};
pub use lifecycle::OrderLifecycle;
pub use models::{Order, OrderFilter, ScheduleRecord};
