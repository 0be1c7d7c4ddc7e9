pub mod availability;
pub mod feasibility;
pub mod ledger;
pub mod model;
pub mod pricing;

pub use availability::{AvailabilityEngine, CalendarDay, TimeSlot};
pub use feasibility::{Feasibility, FeasibilityChecker, UnitCheck};
pub use ledger::{Commitment, SlotLedger};
pub use model::{CapacityModel, PricingType, ServiceRequirement};
pub use pricing::{PricingCalculator, PricingConfig};
