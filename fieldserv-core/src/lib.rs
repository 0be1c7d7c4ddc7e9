pub mod artifacts;
pub mod notify;
pub mod payment;

use fieldserv_shared::{OrderStatus, PaymentStatus};

/// Error taxonomy shared by the whole engine.
///
/// Notification failures are deliberately absent: they degrade the result
/// (`email_sent = false`) instead of failing the triggering transition.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Capacity conflict: {reason} (requested {requested}, max available {max_available})")]
    CapacityConflict {
        requested: u32,
        max_available: u32,
        reason: String,
    },

    #[error("Illegal transition '{attempted}' from status '{status}' (payment: '{payment_status}')")]
    IllegalTransition {
        status: OrderStatus,
        payment_status: PaymentStatus,
        attempted: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Dependency failure: {0}")]
    Dependency(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
