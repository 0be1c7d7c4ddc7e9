use crate::models::{Order, OrderFilter, ScheduleRecord};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use fieldserv_core::artifacts::ArtifactRef;
use fieldserv_shared::{OrderStatus, PaymentStatus};
use std::collections::HashMap;
use uuid::Uuid;

/// State machine governing `status` and `payment_status`.
///
/// Every transition checks its guard before mutating; a rejected transition
/// leaves the order untouched. `completed` and `cancelled` are terminal.
pub struct OrderLifecycle {
    orders: HashMap<Uuid, Order>,
}

impl OrderLifecycle {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
        }
    }

    pub fn insert(&mut self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn get(&self, order_id: &Uuid) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// Orders matching the filter, newest first
    pub fn list(&self, filter: &OrderFilter) -> Vec<&Order> {
        let mut matches: Vec<&Order> = self
            .orders
            .values()
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| filter.payment_status.map_or(true, |p| o.payment_status == p))
            .filter(|o| {
                filter
                    .customer_id
                    .as_deref()
                    .map_or(true, |c| o.customer_id == c)
            })
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches
    }

    /// Transition: pending -> pending_schedule (payment confirmed).
    /// A confirmation arriving after the expiry sweep purged the order is
    /// rejected as NotFound ("order no longer pending").
    pub fn confirm_payment(&mut self, order_id: &Uuid) -> Result<&Order, LifecycleError> {
        let order = get_mut(&mut self.orders, order_id)?;
        if order.status != OrderStatus::Pending || order.payment_status != PaymentStatus::Unpaid {
            return Err(illegal(order, "confirm_payment"));
        }
        order.payment_status = PaymentStatus::Paid;
        order.update_status(OrderStatus::PendingSchedule);
        Ok(order)
    }

    /// Guard check for admin scheduling, without mutating: the order must be
    /// paid and sitting in pending_schedule or scheduling_failed.
    pub fn ensure_schedulable(&self, order_id: &Uuid) -> Result<&Order, LifecycleError> {
        let order = self
            .orders
            .get(order_id)
            .ok_or_else(|| LifecycleError::NotFound(order_id.to_string()))?;
        let schedulable = matches!(
            order.status,
            OrderStatus::PendingSchedule | OrderStatus::SchedulingFailed
        ) && order.payment_status == PaymentStatus::Paid;
        if !schedulable {
            return Err(illegal(order, "schedule"));
        }
        Ok(order)
    }

    /// Transition: pending_schedule | scheduling_failed -> scheduled.
    /// Re-attempts from scheduling_failed are idempotent with respect to the
    /// fixed amount and booking slot; only the schedule record is written.
    pub fn mark_scheduled(
        &mut self,
        order_id: &Uuid,
        record: ScheduleRecord,
    ) -> Result<&Order, LifecycleError> {
        self.ensure_schedulable(order_id)?;
        let order = get_mut(&mut self.orders, order_id)?;
        order.schedule = Some(record);
        order.scheduling_feedback = None;
        order.update_status(OrderStatus::Scheduled);
        Ok(order)
    }

    /// Transition: pending_schedule | scheduling_failed -> scheduling_failed.
    /// Capacity conflicts at scheduling time become actionable state for the
    /// admin instead of a transient fault.
    pub fn mark_scheduling_failed(
        &mut self,
        order_id: &Uuid,
        feedback: String,
    ) -> Result<&Order, LifecycleError> {
        self.ensure_schedulable(order_id)?;
        let order = get_mut(&mut self.orders, order_id)?;
        order.scheduling_feedback = Some(feedback);
        order.update_status(OrderStatus::SchedulingFailed);
        Ok(order)
    }

    /// Transition: any non-terminal paid order -> precancel, when requested
    /// at least `cutoff_days` before the preferred date.
    pub fn request_cancellation(
        &mut self,
        order_id: &Uuid,
        today: NaiveDate,
        cutoff_days: i64,
    ) -> Result<&Order, LifecycleError> {
        let order = get_mut(&mut self.orders, order_id)?;
        if order.status.is_terminal()
            || order.status == OrderStatus::Precancel
            || order.payment_status != PaymentStatus::Paid
        {
            return Err(illegal(order, "request_cancellation"));
        }
        if order.slot.preferred_date - today <= Duration::days(cutoff_days) {
            return Err(illegal(order, "request_cancellation"));
        }
        order.update_status(OrderStatus::Precancel);
        Ok(order)
    }

    /// Transition: precancel -> cancelled; payment_status moves to refunded
    /// as part of this transition. Terminal.
    pub fn confirm_refund(&mut self, order_id: &Uuid) -> Result<&Order, LifecycleError> {
        let order = get_mut(&mut self.orders, order_id)?;
        if order.status != OrderStatus::Precancel || order.payment_status != PaymentStatus::Paid {
            return Err(illegal(order, "confirm_refund"));
        }
        order.payment_status = PaymentStatus::Refunded;
        order.update_status(OrderStatus::Cancelled);
        Ok(order)
    }

    /// Refund confirmed for a paid order that is not in precancel: only
    /// payment_status moves to refunded. The order keeps its status until an
    /// admin follows up with a direct cancel.
    pub fn record_refund(&mut self, order_id: &Uuid) -> Result<&Order, LifecycleError> {
        let order = get_mut(&mut self.orders, order_id)?;
        if order.status.is_terminal()
            || order.status == OrderStatus::Precancel
            || order.payment_status != PaymentStatus::Paid
        {
            return Err(illegal(order, "record_refund"));
        }
        order.payment_status = PaymentStatus::Refunded;
        order.updated_at = Utc::now();
        Ok(order)
    }

    /// Transition: non-terminal, already refunded -> cancelled (admin direct
    /// cancel). Terminal.
    pub fn direct_cancel(&mut self, order_id: &Uuid) -> Result<&Order, LifecycleError> {
        let order = get_mut(&mut self.orders, order_id)?;
        if order.status.is_terminal() || order.payment_status != PaymentStatus::Refunded {
            return Err(illegal(order, "cancel"));
        }
        order.update_status(OrderStatus::Cancelled);
        Ok(order)
    }

    /// Attach a stored completion report to a scheduled order
    pub fn attach_artifact(
        &mut self,
        order_id: &Uuid,
        artifact: ArtifactRef,
    ) -> Result<&Order, LifecycleError> {
        let order = get_mut(&mut self.orders, order_id)?;
        if order.status != OrderStatus::Scheduled {
            return Err(illegal(order, "attach_completion_artifact"));
        }
        order.completion_artifact = Some(artifact);
        order.updated_at = Utc::now();
        Ok(order)
    }

    /// Transition: scheduled -> completed, only once a completion artifact
    /// reference exists. Terminal.
    pub fn mark_completed(&mut self, order_id: &Uuid) -> Result<&Order, LifecycleError> {
        let order = get_mut(&mut self.orders, order_id)?;
        if order.status != OrderStatus::Scheduled || order.completion_artifact.is_none() {
            return Err(illegal(order, "complete"));
        }
        order.update_status(OrderStatus::Completed);
        Ok(order)
    }

    /// Purge pending orders that stayed unpaid past the TTL. The removed
    /// orders are returned so the caller can release their capacity.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<Order> {
        let expired_ids: Vec<Uuid> = self
            .orders
            .values()
            .filter(|o| {
                o.status == OrderStatus::Pending
                    && o.payment_status == PaymentStatus::Unpaid
                    && now - o.created_at > ttl
            })
            .map(|o| o.id)
            .collect();

        expired_ids
            .into_iter()
            .filter_map(|id| self.orders.remove(&id))
            .collect()
    }
}

impl Default for OrderLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

fn get_mut<'a>(
    orders: &'a mut HashMap<Uuid, Order>,
    order_id: &Uuid,
) -> Result<&'a mut Order, LifecycleError> {
    orders
        .get_mut(order_id)
        .ok_or_else(|| LifecycleError::NotFound(order_id.to_string()))
}

fn illegal(order: &Order, attempted: &str) -> LifecycleError {
    LifecycleError::IllegalTransition {
        status: order.status,
        payment_status: order.payment_status,
        attempted: attempted.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Illegal transition '{attempted}' from status '{status}' (payment: '{payment_status}')")]
    IllegalTransition {
        status: OrderStatus,
        payment_status: PaymentStatus,
        attempted: String,
    },
}
