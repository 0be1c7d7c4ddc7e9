use crate::model::{FIRST_SLOT_HOUR, WORKDAY_END_HOUR};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Worker-hours one order holds: `workers` crew members for `hours`
/// consecutive hourly slots starting at `start` on `date`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commitment {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub hours: u32,
    pub workers: u32,
}

impl Commitment {
    fn covers(&self, date: NaiveDate, hour: u32) -> bool {
        self.date == date && hour >= self.start.hour() && hour < self.start.hour() + self.hours
    }
}

/// Capacity accounting for the shared crew roster.
///
/// Availability is always derived at read time: roster minus the worker
/// counts of every commitment overlapping the hour, across all service
/// types. Nothing is reserved when a calendar is merely displayed.
pub struct SlotLedger {
    roster: u32,
    commitments: HashMap<Uuid, Commitment>,
}

impl SlotLedger {
    pub fn new(roster: u32) -> Self {
        Self {
            roster,
            commitments: HashMap::new(),
        }
    }

    pub fn roster(&self) -> u32 {
        self.roster
    }

    /// Workers still free at (date, time). Zero outside the workday.
    pub fn available_workers(&self, date: NaiveDate, time: NaiveTime) -> u32 {
        let hour = time.hour();
        if hour < FIRST_SLOT_HOUR || hour >= WORKDAY_END_HOUR {
            return 0;
        }
        let committed: u32 = self
            .commitments
            .values()
            .filter(|c| c.covers(date, hour))
            .map(|c| c.workers)
            .sum();
        self.roster.saturating_sub(committed)
    }

    /// Smallest availability across `hours` consecutive slots from `start`,
    /// or None when the span runs past the end of the workday.
    pub fn min_available_in_span(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        hours: u32,
    ) -> Option<u32> {
        if start.hour() + hours > WORKDAY_END_HOUR || start.hour() < FIRST_SLOT_HOUR {
            return None;
        }
        (start.hour()..start.hour() + hours)
            .map(|hour| {
                let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
                Some(self.available_workers(date, time))
            })
            .collect::<Option<Vec<_>>>()
            .and_then(|spans| spans.into_iter().min())
    }

    /// Whether `workers` crew members fit in every hour of the span.
    pub fn span_fits(&self, date: NaiveDate, start: NaiveTime, hours: u32, workers: u32) -> bool {
        self.min_available_in_span(date, start, hours)
            .map(|available| available >= workers)
            .unwrap_or(false)
    }

    /// Commit an order's worker-hours. Validates every covered hour before
    /// mutating, so a failed commit leaves the ledger untouched.
    pub fn commit(&mut self, order_id: Uuid, commitment: Commitment) -> Result<(), LedgerError> {
        if self.commitments.contains_key(&order_id) {
            return Err(LedgerError::AlreadyCommitted(order_id.to_string()));
        }
        if commitment.start.hour() < FIRST_SLOT_HOUR
            || commitment.start.hour() + commitment.hours > WORKDAY_END_HOUR
        {
            return Err(LedgerError::OutsideWorkday {
                start: commitment.start,
                hours: commitment.hours,
            });
        }
        match self.min_available_in_span(commitment.date, commitment.start, commitment.hours) {
            Some(available) if available >= commitment.workers => {
                self.commitments.insert(order_id, commitment);
                Ok(())
            }
            Some(available) => Err(LedgerError::InsufficientCapacity {
                requested: commitment.workers,
                available,
            }),
            None => Err(LedgerError::OutsideWorkday {
                start: commitment.start,
                hours: commitment.hours,
            }),
        }
    }

    /// Release an order's worker-hours (expiry, cancellation, scheduling failure)
    pub fn release(&mut self, order_id: &Uuid) -> bool {
        self.commitments.remove(order_id).is_some()
    }

    pub fn commitment(&self, order_id: &Uuid) -> Option<&Commitment> {
        self.commitments.get(order_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient capacity: requested {requested} workers, {available} available")]
    InsufficientCapacity { requested: u32, available: u32 },

    #[error("Job window {start} + {hours}h runs outside the workday")]
    OutsideWorkday { start: NaiveTime, hours: u32 },

    #[error("Order already holds a commitment: {0}")]
    AlreadyCommitted(String),
}

impl From<LedgerError> for fieldserv_core::EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientCapacity {
                requested,
                available,
            } => fieldserv_core::EngineError::CapacityConflict {
                requested,
                max_available: available,
                reason: "Insufficient crew capacity in the requested span".to_string(),
            },
            other => fieldserv_core::EngineError::Validation(other.to_string()),
        }
    }
}
