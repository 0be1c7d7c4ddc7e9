use crate::ledger::SlotLedger;
use crate::model::{CapacityModel, FIRST_SLOT_HOUR, LAST_SLOT_HOUR, MAX_UNITS_PER_ORDER};
use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use fieldserv_shared::ServiceType;
use serde::{Deserialize, Serialize};

/// Result of asking "how many units would still fit in this slot?"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCheck {
    pub can_book: bool,
    pub max_available: u32,
}

/// Hourly capacity breakdown inside a candidate job window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotLoad {
    pub time: NaiveTime,
    pub available_workers: u32,
    pub required_workers: u32,
}

/// Full feasibility verdict for a candidate (slot, service, unit count)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feasibility {
    pub is_bookable: bool,
    pub required_workers: u32,
    pub required_hours: u32,
    pub hourly: Vec<SlotLoad>,
    pub estimated_end_time: NaiveTime,
}

/// Answers whether a candidate slot is actually bookable, independent from
/// whether it is displayed. Runs at submission time and again at admin
/// scheduling time, because capacity may have shifted in between.
pub struct FeasibilityChecker {
    model: CapacityModel,
}

impl FeasibilityChecker {
    pub fn new(model: CapacityModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &CapacityModel {
        &self.model
    }

    /// Largest unit count whose worker-hours fit the slot, and whether the
    /// requested count does. Linear search upward; duration grows with every
    /// unit, so the first count that no longer fits ends the search.
    pub fn check_units(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        service_type: ServiceType,
        unit_count: u32,
        ledger: &SlotLedger,
    ) -> Result<UnitCheck, FeasibilityError> {
        validate_request(time, unit_count)?;
        let required_workers = self.model.requirement(service_type).required_workers;

        let mut max_available = 0;
        for units in 1..=MAX_UNITS_PER_ORDER {
            let hours = self.model.required_hours(service_type, units);
            if ledger.span_fits(date, time, hours, required_workers) {
                max_available = units;
            } else {
                break;
            }
        }

        Ok(UnitCheck {
            can_book: unit_count <= max_available,
            max_available,
        })
    }

    /// Single-verdict re-validation with the hourly breakdown the admin UI
    /// shows when a slot no longer fits.
    pub fn check_feasibility(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        service_type: ServiceType,
        unit_count: u32,
        ledger: &SlotLedger,
    ) -> Result<Feasibility, FeasibilityError> {
        validate_request(time, unit_count)?;
        let required_workers = self.model.requirement(service_type).required_workers;
        let required_hours = self.model.required_hours(service_type, unit_count);

        let mut hourly = Vec::new();
        let mut is_bookable = ledger
            .min_available_in_span(date, time, required_hours)
            .is_some();
        for offset in 0..required_hours {
            let Some(slot_time) = NaiveTime::from_hms_opt(time.hour() + offset, 0, 0) else {
                is_bookable = false;
                break;
            };
            let available_workers = ledger.available_workers(date, slot_time);
            if available_workers < required_workers {
                is_bookable = false;
            }
            hourly.push(SlotLoad {
                time: slot_time,
                available_workers,
                required_workers,
            });
        }

        let estimated_end_time = time + Duration::hours(required_hours as i64);
        Ok(Feasibility {
            is_bookable,
            required_workers,
            required_hours,
            hourly,
            estimated_end_time,
        })
    }
}

fn validate_request(time: NaiveTime, unit_count: u32) -> Result<(), FeasibilityError> {
    if unit_count == 0 {
        return Err(FeasibilityError::InvalidUnitCount(unit_count));
    }
    let on_grid = time.minute() == 0
        && time.second() == 0
        && (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR).contains(&time.hour());
    if !on_grid {
        return Err(FeasibilityError::InvalidSlotTime(time));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum FeasibilityError {
    #[error("Unit count must be at least 1, got {0}")]
    InvalidUnitCount(u32),

    #[error("Slot time {0} is not a canonical start time")]
    InvalidSlotTime(NaiveTime),
}

impl From<FeasibilityError> for fieldserv_core::EngineError {
    fn from(err: FeasibilityError) -> Self {
        fieldserv_core::EngineError::Validation(err.to_string())
    }
}
