use crate::lifecycle::{LifecycleError, OrderLifecycle};
use crate::models::{Order, OrderFilter, ScheduleRecord};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use fieldserv_capacity::availability::{AvailabilityEngine, CalendarDay, UnifiedCalendar};
use fieldserv_capacity::feasibility::{Feasibility, FeasibilityChecker, UnitCheck};
use fieldserv_capacity::ledger::{Commitment, SlotLedger};
use fieldserv_capacity::model::{CapacityModel, PricingType};
use fieldserv_capacity::pricing::PricingCalculator;
use fieldserv_core::artifacts::CompletionStore;
use fieldserv_core::notify::{Notification, NotificationSender};
use fieldserv_core::payment::{CheckoutSession, PaymentGateway};
use fieldserv_core::{EngineError, EngineResult};
use fieldserv_shared::events::{OrderCancelledEvent, OrderScheduledEvent};
use fieldserv_shared::pii::Masked;
use fieldserv_shared::{BookingSlot, EquipmentItem, OrderStatus, PaymentStatus, ServiceType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Shared crew roster size, all service types draw from it
    pub roster: u32,
    pub currency: String,
    pub unpaid_ttl_minutes: i64,
    pub cancellation_cutoff_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            roster: 3,
            currency: "TWD".to_string(),
            unpaid_ttl_minutes: 30,
            cancellation_cutoff_days: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub service_type: ServiceType,
    pub location_address: String,
    pub unit_count: u32,
    #[serde(default)]
    pub equipment_details: Vec<EquipmentItem>,
    pub notes: Option<String>,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    pub contact_name: String,
    pub contact_phone: String,
}

/// One page of the admin order list
#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u32,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Result of an admin scheduling attempt. When the slot no longer fits, the
/// order comes back in scheduling_failed with feedback instead of an error.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutcome {
    pub order: Order,
    pub email_sent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub order: Order,
    pub email_sent: bool,
}

struct EngineState {
    lifecycle: OrderLifecycle,
    ledger: SlotLedger,
}

/// Serializes every state transition and capacity commit behind one lock, so
/// a feasibility check and the commit it authorizes are atomic. Collaborator
/// calls (payment, mail, artifact storage) happen outside the lock.
pub struct SchedulingCoordinator {
    state: Mutex<EngineState>,
    model: CapacityModel,
    availability: AvailabilityEngine,
    feasibility: FeasibilityChecker,
    pricing: PricingCalculator,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSender>,
    artifacts: Arc<dyn CompletionStore>,
    config: EngineConfig,
}

impl SchedulingCoordinator {
    pub fn new(
        config: EngineConfig,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSender>,
        artifacts: Arc<dyn CompletionStore>,
    ) -> Self {
        let model = CapacityModel::default();
        Self {
            state: Mutex::new(EngineState {
                lifecycle: OrderLifecycle::new(),
                ledger: SlotLedger::new(config.roster),
            }),
            availability: AvailabilityEngine::new(model.clone()),
            feasibility: FeasibilityChecker::new(model.clone()),
            pricing: PricingCalculator::default(),
            model,
            gateway,
            notifier,
            artifacts,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate, price, and create an order, holding its worker-hours from
    /// the moment of creation. The price is computed here and fixed for the
    /// order's whole life.
    pub async fn create_order(
        &self,
        req: CreateOrderRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<Order> {
        let today = now.date_naive();
        if !self
            .model
            .is_date_in_window(req.service_type, req.preferred_date, today)
        {
            return Err(EngineError::Validation(format!(
                "Preferred date {} is outside the {} booking window",
                req.preferred_date, req.service_type
            )));
        }
        let requirement = self.model.requirement(req.service_type);
        if requirement.pricing_type == PricingType::Equipment && req.equipment_details.is_empty() {
            return Err(EngineError::Validation(
                "Installation orders need at least one equipment line".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        let check = self.feasibility.check_units(
            req.preferred_date,
            req.preferred_time,
            req.service_type,
            req.unit_count,
            &state.ledger,
        )?;
        if !check.can_book {
            return Err(EngineError::CapacityConflict {
                requested: req.unit_count,
                max_available: check.max_available,
                reason: format!(
                    "Slot {} {} cannot absorb the requested units",
                    req.preferred_date, req.preferred_time
                ),
            });
        }

        let total_amount = self.pricing.price(
            requirement.pricing_type,
            req.unit_count,
            &req.equipment_details,
            &req.location_address,
        );
        let hours = self.model.required_hours(req.service_type, req.unit_count);

        let order = Order::new(
            req.customer_id,
            req.service_type,
            req.location_address,
            req.unit_count,
            req.equipment_details,
            req.notes,
            total_amount,
            BookingSlot {
                preferred_date: req.preferred_date,
                preferred_time: req.preferred_time,
                contact_name: req.contact_name,
                contact_phone: Masked(req.contact_phone),
            },
            now,
        );
        state.ledger.commit(
            order.id,
            Commitment {
                date: req.preferred_date,
                start: req.preferred_time,
                hours,
                workers: requirement.required_workers,
            },
        )?;
        state.lifecycle.insert(order.clone());
        tracing::info!(
            order_number = %order.order_number,
            service_type = %order.service_type,
            total_amount,
            "Order created"
        );
        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> EngineResult<Order> {
        let state = self.state.lock().await;
        state
            .lifecycle
            .get(&order_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("Order {order_id}")))
    }

    pub async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: u32,
        limit: u32,
    ) -> EngineResult<OrderPage> {
        if page == 0 || limit == 0 {
            return Err(EngineError::Validation(
                "page and limit must be at least 1".to_string(),
            ));
        }
        let state = self.state.lock().await;
        let matches = state.lifecycle.list(filter);
        let total = matches.len() as u32;
        let total_pages = total.div_ceil(limit).max(1);
        let orders = matches
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(OrderPage {
            orders,
            total,
            page,
            limit,
            total_pages,
        })
    }

    pub async fn month_calendar(
        &self,
        service_type: ServiceType,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> EngineResult<Vec<CalendarDay>> {
        let state = self.state.lock().await;
        Ok(self
            .availability
            .month_calendar(service_type, year, month, today, &state.ledger)?)
    }

    pub async fn unified_calendar(
        &self,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> EngineResult<UnifiedCalendar> {
        let state = self.state.lock().await;
        Ok(self
            .availability
            .unified_calendar(year, month, today, &state.ledger)?)
    }

    pub async fn check_units(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        service_type: ServiceType,
        unit_count: u32,
    ) -> EngineResult<UnitCheck> {
        let state = self.state.lock().await;
        Ok(self
            .feasibility
            .check_units(date, time, service_type, unit_count, &state.ledger)?)
    }

    pub async fn check_feasibility(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        service_type: ServiceType,
        unit_count: u32,
    ) -> EngineResult<Feasibility> {
        let state = self.state.lock().await;
        Ok(self
            .feasibility
            .check_feasibility(date, time, service_type, unit_count, &state.ledger)?)
    }

    /// Open a checkout session with the payment provider for a pending,
    /// unpaid order. The provider call runs outside the engine lock.
    pub async fn create_checkout(&self, order_id: Uuid) -> EngineResult<CheckoutSession> {
        let amount = {
            let state = self.state.lock().await;
            let order = state
                .lifecycle
                .get(&order_id)
                .ok_or_else(|| EngineError::NotFound(format!("Order {order_id}")))?;
            if order.status != OrderStatus::Pending
                || order.payment_status != PaymentStatus::Unpaid
            {
                return Err(EngineError::IllegalTransition {
                    status: order.status,
                    payment_status: order.payment_status,
                    attempted: "create_checkout".to_string(),
                });
            }
            order.total_amount
        };
        self.gateway
            .create_checkout_session(order_id, amount, &self.config.currency)
            .await
            .map_err(|err| EngineError::Dependency(err.to_string()))
    }

    /// Webhook side of payment: pending -> pending_schedule. A confirmation
    /// arriving after the expiry sweep purged the order reports NotFound.
    pub async fn payment_confirmed(&self, order_id: Uuid) -> EngineResult<Order> {
        let mut state = self.state.lock().await;
        let order = state.lifecycle.confirm_payment(&order_id)?.clone();
        tracing::info!(order_number = %order.order_number, "Payment confirmed");
        Ok(order)
    }

    pub async fn request_cancellation(
        &self,
        order_id: Uuid,
        today: NaiveDate,
    ) -> EngineResult<Order> {
        let mut state = self.state.lock().await;
        let order = state
            .lifecycle
            .request_cancellation(&order_id, today, self.config.cancellation_cutoff_days)?
            .clone();
        tracing::info!(order_number = %order.order_number, "Cancellation requested");
        Ok(order)
    }

    /// Re-validate and schedule under one lock: the order's own held hours
    /// are released first so they do not count against the requested slot,
    /// then the slot is checked and committed atomically. A slot that no
    /// longer fits moves the order to scheduling_failed with feedback; the
    /// released hours stay released until the next attempt succeeds.
    pub async fn admin_schedule(
        &self,
        order_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> EngineResult<ScheduleOutcome> {
        let (order, event) = {
            let mut state = self.state.lock().await;
            let (service_type, unit_count) = {
                let order = state.lifecycle.ensure_schedulable(&order_id)?;
                (order.service_type, order.unit_count)
            };

            let previous = state.ledger.commitment(&order_id).cloned();
            state.ledger.release(&order_id);

            let feasibility = match self.feasibility.check_feasibility(
                date,
                time,
                service_type,
                unit_count,
                &state.ledger,
            ) {
                Ok(feasibility) => feasibility,
                Err(err) => {
                    // Malformed input, not a capacity problem: keep the hours held.
                    // The same span was just released under this lock, so the
                    // re-commit cannot run out of room.
                    if let Some(previous) = previous {
                        if let Err(restore) = state.ledger.commit(order_id, previous) {
                            tracing::error!(%order_id, %restore, "Failed to restore held worker-hours");
                        }
                    }
                    return Err(err.into());
                }
            };

            if !feasibility.is_bookable {
                let feedback = format!(
                    "Slot {} {} cannot host the job: needs {} worker(s) for {}h",
                    date, time, feasibility.required_workers, feasibility.required_hours
                );
                let order = state
                    .lifecycle
                    .mark_scheduling_failed(&order_id, feedback.clone())?
                    .clone();
                tracing::warn!(order_number = %order.order_number, feedback, "Scheduling attempt failed");
                return Ok(ScheduleOutcome {
                    order,
                    email_sent: false,
                });
            }

            state.ledger.commit(
                order_id,
                Commitment {
                    date,
                    start: time,
                    hours: feasibility.required_hours,
                    workers: feasibility.required_workers,
                },
            )?;
            let order = state
                .lifecycle
                .mark_scheduled(
                    &order_id,
                    ScheduleRecord {
                        scheduled_date: date,
                        scheduled_time: time,
                        estimated_end_time: feasibility.estimated_end_time,
                    },
                )?
                .clone();
            tracing::info!(order_number = %order.order_number, %date, %time, "Order scheduled");

            let event = OrderScheduledEvent {
                order_id,
                order_number: order.order_number.clone(),
                service_type: order.service_type,
                location_address: order.location_address.clone(),
                total_amount: order.total_amount,
                scheduled_date: date,
                scheduled_time: time,
                estimated_end_time: feasibility.estimated_end_time,
                contact_name: order.slot.contact_name.clone(),
            };
            (order, event)
        };

        let email_sent = self
            .notifier
            .send(&Notification::SchedulingConfirmed(event))
            .await
            .is_ok();
        if !email_sent {
            tracing::warn!(order_number = %order.order_number, "Scheduling confirmation mail failed");
        }
        Ok(ScheduleOutcome { order, email_sent })
    }

    /// Webhook side of a refund. Precancel orders finish cancelling and
    /// release their hours; any other paid order only has its payment_status
    /// moved to refunded, leaving the cancellation itself to an admin.
    pub async fn refund_confirmed(&self, order_id: Uuid) -> EngineResult<CancellationOutcome> {
        let (order, event) = {
            let mut state = self.state.lock().await;
            let in_precancel = state
                .lifecycle
                .get(&order_id)
                .map(|order| order.status == OrderStatus::Precancel)
                .unwrap_or(false);

            if in_precancel {
                let order = state.lifecycle.confirm_refund(&order_id)?.clone();
                state.ledger.release(&order_id);
                tracing::info!(order_number = %order.order_number, "Refund confirmed, order cancelled");
                let event = OrderCancelledEvent {
                    order_id,
                    order_number: order.order_number.clone(),
                    service_type: order.service_type,
                    refunded_amount: order.total_amount,
                };
                (order, Some(event))
            } else {
                let order = state.lifecycle.record_refund(&order_id)?.clone();
                tracing::info!(order_number = %order.order_number, "Refund recorded, awaiting admin cancellation");
                (order, None)
            }
        };

        let email_sent = match event {
            Some(event) => {
                let sent = self
                    .notifier
                    .send(&Notification::CancellationConfirmed(event))
                    .await
                    .is_ok();
                if !sent {
                    tracing::warn!(order_number = %order.order_number, "Cancellation confirmation mail failed");
                }
                sent
            }
            None => false,
        };
        Ok(CancellationOutcome { order, email_sent })
    }

    /// Admin direct cancel for an already-refunded order
    pub async fn admin_cancel(&self, order_id: Uuid) -> EngineResult<Order> {
        let mut state = self.state.lock().await;
        let order = state.lifecycle.direct_cancel(&order_id)?.clone();
        state.ledger.release(&order_id);
        tracing::info!(order_number = %order.order_number, "Order cancelled by admin");
        Ok(order)
    }

    /// Store a completion report and attach its reference to the order
    pub async fn admin_upload_completion(
        &self,
        order_id: Uuid,
        filename: &str,
        content: &[u8],
    ) -> EngineResult<Order> {
        {
            let state = self.state.lock().await;
            let order = state
                .lifecycle
                .get(&order_id)
                .ok_or_else(|| EngineError::NotFound(format!("Order {order_id}")))?;
            if order.status != OrderStatus::Scheduled {
                return Err(EngineError::IllegalTransition {
                    status: order.status,
                    payment_status: order.payment_status,
                    attempted: "upload_completion".to_string(),
                });
            }
        }

        let artifact = self
            .artifacts
            .store(order_id, filename, content)
            .await
            .map_err(|err| EngineError::Dependency(err.to_string()))?;

        let mut state = self.state.lock().await;
        let order = state.lifecycle.attach_artifact(&order_id, artifact)?.clone();
        tracing::info!(order_number = %order.order_number, filename, "Completion report attached");
        Ok(order)
    }

    /// Close out a scheduled order. Requires a completion artifact; one
    /// stored earlier but not yet attached is picked up from the store.
    pub async fn admin_mark_completed(&self, order_id: Uuid) -> EngineResult<Order> {
        let has_artifact = {
            let state = self.state.lock().await;
            let order = state
                .lifecycle
                .get(&order_id)
                .ok_or_else(|| EngineError::NotFound(format!("Order {order_id}")))?;
            order.completion_artifact.is_some()
        };

        if !has_artifact {
            let stored = self
                .artifacts
                .fetch(order_id)
                .await
                .map_err(|err| EngineError::Dependency(err.to_string()))?;
            if let Some(artifact) = stored {
                let mut state = self.state.lock().await;
                state.lifecycle.attach_artifact(&order_id, artifact)?;
            }
        }

        let mut state = self.state.lock().await;
        let order = state.lifecycle.mark_completed(&order_id)?.clone();
        state.ledger.release(&order_id);
        tracing::info!(order_number = %order.order_number, "Order completed");
        Ok(order)
    }

    /// Upload and complete in one call, for the common single-step close-out
    pub async fn admin_complete_with_artifact(
        &self,
        order_id: Uuid,
        filename: &str,
        content: &[u8],
    ) -> EngineResult<Order> {
        self.admin_upload_completion(order_id, filename, content)
            .await?;
        self.admin_mark_completed(order_id).await
    }

    /// Purge pending orders unpaid past the TTL and release their hours.
    /// Returns the purged orders.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<Order> {
        let mut state = self.state.lock().await;
        let purged = state
            .lifecycle
            .sweep_expired(now, Duration::minutes(self.config.unpaid_ttl_minutes));
        for order in &purged {
            state.ledger.release(&order.id);
            tracing::info!(order_number = %order.order_number, "Expired unpaid order purged");
        }
        purged
    }
}

impl From<LifecycleError> for EngineError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(what) => EngineError::NotFound(what),
            LifecycleError::IllegalTransition {
                status,
                payment_status,
                attempted,
            } => EngineError::IllegalTransition {
                status,
                payment_status,
                attempted,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fieldserv_core::artifacts::InMemoryCompletionStore;
    use fieldserv_core::notify::MockNotificationSender;
    use fieldserv_core::payment::MockPaymentGateway;

    fn build(roster: u32, notifier: Arc<MockNotificationSender>) -> SchedulingCoordinator {
        SchedulingCoordinator::new(
            EngineConfig {
                roster,
                ..EngineConfig::default()
            },
            Arc::new(MockPaymentGateway),
            notifier,
            Arc::new(InMemoryCompletionStore::default()),
        )
    }

    fn coordinator(roster: u32) -> SchedulingCoordinator {
        build(roster, Arc::new(MockNotificationSender::default()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 6).unwrap()
    }

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    fn maintenance_request(unit_count: u32, time: NaiveTime) -> CreateOrderRequest {
        CreateOrderRequest {
            customer_id: "customer-1".to_string(),
            service_type: ServiceType::Maintenance,
            location_address: "台北市中山區".to_string(),
            unit_count,
            equipment_details: Vec::new(),
            notes: None,
            preferred_date: date(),
            preferred_time: time,
            contact_name: "王小明".to_string(),
            contact_phone: "0912345678".to_string(),
        }
    }

    #[tokio::test]
    async fn create_order_prices_and_holds_capacity() {
        let coordinator = coordinator(1);
        let order = coordinator
            .create_order(maintenance_request(2, at(9)), now())
            .await
            .unwrap();

        assert_eq!(order.total_amount, 3000); // 2000 base + 1000 extra unit
        assert_eq!(order.status, OrderStatus::Pending);

        // 2 units take 2h from 09:00; the single worker is busy until 11:00
        let check = coordinator
            .check_units(date(), at(10), ServiceType::Maintenance, 1)
            .await
            .unwrap();
        assert!(!check.can_book);
        let check = coordinator
            .check_units(date(), at(11), ServiceType::Maintenance, 1)
            .await
            .unwrap();
        assert!(check.can_book);
    }

    #[tokio::test]
    async fn concurrent_creates_yield_exactly_one_conflict() {
        let coordinator = coordinator(1);
        let first = coordinator.create_order(maintenance_request(1, at(9)), now());
        let second = coordinator.create_order(maintenance_request(1, at(9)), now());
        let (first, second) = tokio::join!(first, second);

        let results = [first, second];
        let successes = results.iter().filter(|result| result.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|result| matches!(result, Err(EngineError::CapacityConflict { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn full_lifecycle_happy_path() {
        let notifier = Arc::new(MockNotificationSender::default());
        let coordinator = build(3, notifier.clone());

        let order = coordinator
            .create_order(maintenance_request(2, at(9)), now())
            .await
            .unwrap();

        let session = coordinator.create_checkout(order.id).await.unwrap();
        assert_eq!(session.amount, 3000);

        let paid = coordinator.payment_confirmed(order.id).await.unwrap();
        assert_eq!(paid.status, OrderStatus::PendingSchedule);
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let outcome = coordinator
            .admin_schedule(order.id, date(), at(9))
            .await
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Scheduled);
        assert!(outcome.email_sent);
        let schedule = outcome.order.schedule.unwrap();
        assert_eq!(schedule.estimated_end_time, at(11)); // 2 units -> 2h

        let completed = coordinator
            .admin_complete_with_artifact(order.id, "report.pdf", b"signed off")
            .await
            .unwrap();
        assert_eq!(completed.status, OrderStatus::Completed);
        assert_eq!(completed.total_amount, 3000);
        assert!(completed.completion_artifact.is_some());

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], Notification::SchedulingConfirmed(_)));
    }

    #[tokio::test]
    async fn checkout_on_paid_order_is_rejected() {
        let coordinator = coordinator(3);
        let order = coordinator
            .create_order(maintenance_request(1, at(9)), now())
            .await
            .unwrap();
        coordinator.payment_confirmed(order.id).await.unwrap();

        let err = coordinator.create_checkout(order.id).await.unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn scheduling_a_full_slot_records_failure_then_retry_succeeds() {
        let coordinator = coordinator(1);
        let blocker = coordinator
            .create_order(maintenance_request(1, at(9)), now())
            .await
            .unwrap();
        let order = coordinator
            .create_order(maintenance_request(1, at(10)), now())
            .await
            .unwrap();
        coordinator.payment_confirmed(order.id).await.unwrap();

        // 09:00 is held by the blocker, so scheduling there fails softly
        let outcome = coordinator
            .admin_schedule(order.id, date(), at(9))
            .await
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::SchedulingFailed);
        assert!(outcome.order.scheduling_feedback.is_some());
        assert!(!outcome.email_sent);

        // A free hour works on the retry
        let outcome = coordinator
            .admin_schedule(order.id, date(), at(11))
            .await
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Scheduled);
        assert!(outcome.order.scheduling_feedback.is_none());

        // Scheduling again is a hard rejection, nothing moved
        let err = coordinator
            .admin_schedule(order.id, date(), at(12))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition { .. }));
        let unchanged = coordinator.get_order(order.id).await.unwrap();
        assert_eq!(
            unchanged.schedule.unwrap().scheduled_time,
            at(11)
        );
        drop(blocker);
    }

    #[tokio::test]
    async fn notification_failure_never_rolls_back_the_schedule() {
        let coordinator = build(3, Arc::new(MockNotificationSender::failing()));
        let order = coordinator
            .create_order(maintenance_request(1, at(9)), now())
            .await
            .unwrap();
        coordinator.payment_confirmed(order.id).await.unwrap();

        let outcome = coordinator
            .admin_schedule(order.id, date(), at(9))
            .await
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Scheduled);
        assert!(!outcome.email_sent);
    }

    #[tokio::test]
    async fn sweep_purges_unpaid_order_and_frees_its_slot() {
        let coordinator = coordinator(1);
        let order = coordinator
            .create_order(maintenance_request(1, at(9)), now())
            .await
            .unwrap();

        let check = coordinator
            .check_units(date(), at(9), ServiceType::Maintenance, 1)
            .await
            .unwrap();
        assert!(!check.can_book);

        let purged = coordinator
            .sweep_expired(now() + Duration::minutes(31))
            .await;
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].id, order.id);

        // The slot is free again and a late payment confirmation bounces
        let check = coordinator
            .check_units(date(), at(9), ServiceType::Maintenance, 1)
            .await
            .unwrap();
        assert!(check.can_book);
        let err = coordinator.payment_confirmed(order.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn sweep_leaves_paid_orders_alone() {
        let coordinator = coordinator(1);
        let order = coordinator
            .create_order(maintenance_request(1, at(9)), now())
            .await
            .unwrap();
        coordinator.payment_confirmed(order.id).await.unwrap();

        let purged = coordinator.sweep_expired(now() + Duration::hours(2)).await;
        assert!(purged.is_empty());
        assert!(coordinator.get_order(order.id).await.is_ok());
    }

    #[tokio::test]
    async fn cancellation_and_refund_free_capacity_and_notify() {
        let notifier = Arc::new(MockNotificationSender::default());
        let coordinator = build(1, notifier.clone());
        let order = coordinator
            .create_order(maintenance_request(1, at(9)), now())
            .await
            .unwrap();
        coordinator.payment_confirmed(order.id).await.unwrap();

        let precancel = coordinator
            .request_cancellation(order.id, now().date_naive())
            .await
            .unwrap();
        assert_eq!(precancel.status, OrderStatus::Precancel);

        let outcome = coordinator.refund_confirmed(order.id).await.unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert_eq!(outcome.order.payment_status, PaymentStatus::Refunded);
        assert!(outcome.email_sent);

        let check = coordinator
            .check_units(date(), at(9), ServiceType::Maintenance, 1)
            .await
            .unwrap();
        assert!(check.can_book);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Notification::CancellationConfirmed(event) => {
                assert_eq!(event.refunded_amount, 2000)
            }
            other => panic!("Unexpected notification: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refund_without_precancel_then_admin_cancel_frees_capacity() {
        let notifier = Arc::new(MockNotificationSender::default());
        let coordinator = build(1, notifier.clone());
        let order = coordinator
            .create_order(maintenance_request(1, at(9)), now())
            .await
            .unwrap();
        coordinator.payment_confirmed(order.id).await.unwrap();

        // Refund lands while the order sits in pending_schedule
        let outcome = coordinator.refund_confirmed(order.id).await.unwrap();
        assert_eq!(outcome.order.status, OrderStatus::PendingSchedule);
        assert_eq!(outcome.order.payment_status, PaymentStatus::Refunded);
        assert!(!outcome.email_sent);

        // The hours stay held until the admin cancels
        let check = coordinator
            .check_units(date(), at(9), ServiceType::Maintenance, 1)
            .await
            .unwrap();
        assert!(!check.can_book);

        let cancelled = coordinator.admin_cancel(order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);

        let check = coordinator
            .check_units(date(), at(9), ServiceType::Maintenance, 1)
            .await
            .unwrap();
        assert!(check.can_book);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_schedule_input_keeps_hours_held() {
        let coordinator = coordinator(1);
        let order = coordinator
            .create_order(maintenance_request(1, at(9)), now())
            .await
            .unwrap();
        coordinator.payment_confirmed(order.id).await.unwrap();

        let half_past = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let err = coordinator
            .admin_schedule(order.id, date(), half_past)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // The order still holds its original 09:00 hour
        let check = coordinator
            .check_units(date(), at(9), ServiceType::Maintenance, 1)
            .await
            .unwrap();
        assert!(!check.can_book);
        let unchanged = coordinator.get_order(order.id).await.unwrap();
        assert_eq!(unchanged.status, OrderStatus::PendingSchedule);
    }

    #[tokio::test]
    async fn completion_without_artifact_is_rejected() {
        let coordinator = coordinator(3);
        let order = coordinator
            .create_order(maintenance_request(1, at(9)), now())
            .await
            .unwrap();
        coordinator.payment_confirmed(order.id).await.unwrap();
        coordinator
            .admin_schedule(order.id, date(), at(9))
            .await
            .unwrap();

        let err = coordinator.admin_mark_completed(order.id).await.unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition { .. }));
        let order = coordinator.get_order(order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Scheduled);
    }

    #[tokio::test]
    async fn installation_requires_equipment_lines() {
        let coordinator = coordinator(3);
        let req = CreateOrderRequest {
            service_type: ServiceType::Installation,
            ..maintenance_request(1, at(9))
        };
        let err = coordinator.create_order(req, now()).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn preferred_date_outside_window_is_rejected() {
        let coordinator = coordinator(3);
        let mut req = maintenance_request(1, at(9));
        req.preferred_date = now().date_naive(); // same-day booking
        let err = coordinator.create_order(req, now()).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn order_list_pages_newest_first() {
        let coordinator = coordinator(5);
        for hour in [9, 10, 11] {
            coordinator
                .create_order(
                    maintenance_request(1, at(hour)),
                    now() + Duration::minutes(hour as i64),
                )
                .await
                .unwrap();
        }

        let page = coordinator
            .list_orders(&OrderFilter::default(), 1, 2)
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.orders.len(), 2);
        assert_eq!(page.orders[0].slot.preferred_time, at(11));

        let page = coordinator
            .list_orders(&OrderFilter::default(), 2, 2)
            .await
            .unwrap();
        assert_eq!(page.orders.len(), 1);
    }

    #[tokio::test]
    async fn calendar_reflects_held_capacity() {
        let coordinator = coordinator(1);
        coordinator
            .create_order(
                CreateOrderRequest {
                    unit_count: 8, // 4.5h -> 5h from 08:00
                    ..maintenance_request(8, at(8))
                },
                now(),
            )
            .await
            .unwrap();

        let days = coordinator
            .month_calendar(ServiceType::Maintenance, 2026, 5, now().date_naive())
            .await
            .unwrap();
        let day = days.iter().find(|d| d.date == date()).unwrap();
        // 08:00..13:00 held; only 13:00-16:00 starts remain for a 1h job
        assert!(day.is_available_for_booking);
        assert_eq!(day.slots.len(), 4);
        assert_eq!(day.slots[0].time, at(13));
    }
}
