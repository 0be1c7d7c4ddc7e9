use crate::ledger::SlotLedger;
use crate::model::{canonical_slot_times, CapacityModel};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use fieldserv_shared::ServiceType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One bookable start time with the workers still free at that hour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: NaiveTime,
    pub available_workers: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
    pub is_weekend: bool,
    pub is_available_for_booking: bool,
}

/// Cross-service bookability per date, for contention warnings
pub type UnifiedCalendar = BTreeMap<NaiveDate, BTreeMap<ServiceType, bool>>;

/// Builds the customer-facing booking calendar. Availability is recomputed
/// from the ledger on every call; displaying a calendar reserves nothing.
pub struct AvailabilityEngine {
    model: CapacityModel,
}

impl AvailabilityEngine {
    pub fn new(model: CapacityModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &CapacityModel {
        &self.model
    }

    /// Calendar for one service and month. Every day of the month is listed;
    /// weekend days stay displayable, days outside the booking window or
    /// without a single feasible slot are marked non-bookable.
    pub fn month_calendar(
        &self,
        service_type: ServiceType,
        year: i32,
        month: u32,
        today: NaiveDate,
        ledger: &SlotLedger,
    ) -> Result<Vec<CalendarDay>, AvailabilityError> {
        let mut days = Vec::new();
        for date in month_dates(year, month)? {
            let is_weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            let in_window = self.model.is_date_in_window(service_type, date, today);

            let slots: Vec<TimeSlot> = if in_window {
                self.bookable_slots(service_type, date, ledger)
            } else {
                Vec::new()
            };
            let is_available_for_booking = in_window && !slots.is_empty();

            days.push(CalendarDay {
                date,
                slots,
                is_weekend,
                is_available_for_booking,
            });
        }
        Ok(days)
    }

    /// Per-date, per-service bookability for one month, so callers can warn
    /// about cross-service contention on a date even when the viewed service
    /// still has room.
    pub fn unified_calendar(
        &self,
        year: i32,
        month: u32,
        today: NaiveDate,
        ledger: &SlotLedger,
    ) -> Result<UnifiedCalendar, AvailabilityError> {
        let mut calendar = UnifiedCalendar::new();
        for date in month_dates(year, month)? {
            let mut per_service = BTreeMap::new();
            for service_type in ServiceType::ALL {
                let bookable = self.model.is_date_in_window(service_type, date, today)
                    && self.has_feasible_slot(service_type, date, ledger);
                per_service.insert(service_type, bookable);
            }
            calendar.insert(date, per_service);
        }
        Ok(calendar)
    }

    /// Canonical start times where one unit of the service would fit
    fn bookable_slots(
        &self,
        service_type: ServiceType,
        date: NaiveDate,
        ledger: &SlotLedger,
    ) -> Vec<TimeSlot> {
        let req = self.model.requirement(service_type);
        let hours = self.model.required_hours(service_type, 1);
        canonical_slot_times()
            .into_iter()
            .filter(|time| ledger.span_fits(date, *time, hours, req.required_workers))
            .map(|time| TimeSlot {
                time,
                available_workers: ledger.available_workers(date, time),
            })
            .collect()
    }

    fn has_feasible_slot(
        &self,
        service_type: ServiceType,
        date: NaiveDate,
        ledger: &SlotLedger,
    ) -> bool {
        let req = self.model.requirement(service_type);
        let hours = self.model.required_hours(service_type, 1);
        canonical_slot_times()
            .into_iter()
            .any(|time| ledger.span_fits(date, time, hours, req.required_workers))
    }
}

fn month_dates(year: i32, month: u32) -> Result<Vec<NaiveDate>, AvailabilityError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(AvailabilityError::InvalidMonth { year, month })?;
    let mut dates = Vec::new();
    let mut date = first;
    while date.month() == month {
        dates.push(date);
        date += Duration::days(1);
    }
    Ok(dates)
}

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Invalid calendar month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
}

impl From<AvailabilityError> for fieldserv_core::EngineError {
    fn from(err: AvailabilityError) -> Self {
        fieldserv_core::EngineError::Validation(err.to_string())
    }
}
