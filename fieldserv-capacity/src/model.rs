use chrono::{Duration, NaiveDate, NaiveTime};
use fieldserv_shared::ServiceType;
use serde::{Deserialize, Serialize};

/// First canonical start hour of the day (08:00)
pub const FIRST_SLOT_HOUR: u32 = 8;
/// Last canonical start hour of the day (16:00)
pub const LAST_SLOT_HOUR: u32 = 16;
/// No job may run past this hour
pub const WORKDAY_END_HOUR: u32 = 17;
/// A single job never exceeds one full workday
pub const MAX_JOB_HOURS: u32 = 8;
/// Upper bound for the unit search in feasibility checks
pub const MAX_UNITS_PER_ORDER: u32 = 8;

/// The nine canonical start times, 08:00 through 16:00
pub fn canonical_slot_times() -> Vec<NaiveTime> {
    (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
        .filter_map(|h| NaiveTime::from_hms_opt(h, 0, 0))
        .collect()
}

/// How a service type is priced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
    UnitCount,
    Location,
    Equipment,
}

/// Per-service reference data: crew demand, duration math, booking window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequirement {
    pub required_workers: u32,
    pub base_duration_hours: f64,
    pub additional_duration_hours: f64,
    pub booking_advance_months: u32,
    pub pricing_type: PricingType,
}

/// Read-only reference data for all service types. Holds no mutable state.
#[derive(Debug, Clone)]
pub struct CapacityModel {
    installation: ServiceRequirement,
    maintenance: ServiceRequirement,
    repair: ServiceRequirement,
}

impl Default for CapacityModel {
    fn default() -> Self {
        Self {
            installation: ServiceRequirement {
                required_workers: 2,
                base_duration_hours: 2.0,
                additional_duration_hours: 1.0,
                booking_advance_months: 2,
                pricing_type: PricingType::Equipment,
            },
            maintenance: ServiceRequirement {
                required_workers: 1,
                base_duration_hours: 1.0,
                additional_duration_hours: 0.5,
                booking_advance_months: 3,
                pricing_type: PricingType::UnitCount,
            },
            repair: ServiceRequirement {
                required_workers: 1,
                base_duration_hours: 1.5,
                additional_duration_hours: 0.5,
                booking_advance_months: 1,
                pricing_type: PricingType::Location,
            },
        }
    }
}

impl CapacityModel {
    pub fn requirement(&self, service_type: ServiceType) -> &ServiceRequirement {
        match service_type {
            ServiceType::Installation => &self.installation,
            ServiceType::Maintenance => &self.maintenance,
            ServiceType::Repair => &self.repair,
        }
    }

    /// Worker-hours a job occupies on the hourly grid: base plus one increment
    /// per extra unit, rounded up to whole hours, capped at a full workday.
    pub fn required_hours(&self, service_type: ServiceType, unit_count: u32) -> u32 {
        let req = self.requirement(service_type);
        let raw = req.base_duration_hours
            + unit_count.saturating_sub(1) as f64 * req.additional_duration_hours;
        (raw.ceil() as u32).clamp(1, MAX_JOB_HOURS)
    }

    /// Booking window for a service: dates strictly after `today`, up to
    /// `booking_advance_months` (30-day months) ahead.
    pub fn booking_window(
        &self,
        service_type: ServiceType,
        today: NaiveDate,
    ) -> (NaiveDate, NaiveDate) {
        let months = self.requirement(service_type).booking_advance_months;
        (today, today + Duration::days(months as i64 * 30))
    }

    pub fn is_date_in_window(
        &self,
        service_type: ServiceType,
        date: NaiveDate,
        today: NaiveDate,
    ) -> bool {
        let (from, to) = self.booking_window(service_type, today);
        date > from && date <= to
    }
}
