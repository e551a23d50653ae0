use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::SimulationConfig;

use super::domain::{ApplicationId, CardDetails, Installment, PaymentMode, RepaymentId};
use super::gateway::RepaymentGateway;
use super::methods::PaymentMethodKind;
use super::notify::{Notification, NotificationSink};
use super::schedule::InstallmentRow;
use super::session::{
    CountdownTicket, MethodRoute, PaymentOutcome, PaymentSession, PaymentStep, PaymentTicket,
    SessionError, TickOutcome, VerifyOutcome,
};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Pauses the flow inserts around gateway calls to mimic rail latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTiming {
    pub upi_verify_delay: Duration,
    pub payment_delay: Duration,
}

impl FlowTiming {
    pub fn from_simulation(config: &SimulationConfig) -> Self {
        Self {
            upi_verify_delay: config.upi_verify_delay(),
            payment_delay: config.payment_delay(),
        }
    }

    /// No artificial latency; used by tests and scripted demos.
    pub const fn immediate() -> Self {
        Self {
            upi_verify_delay: Duration::ZERO,
            payment_delay: Duration::ZERO,
        }
    }
}

/// Async driver for one payment dialog session.
///
/// Wraps the synchronous [`PaymentSession`] and runs its outstanding
/// work: schedule fetches, verification and payment calls with their
/// simulated latency, notifications, and the result-screen countdown
/// task. Methods lock the session only to apply events; nothing holds
/// the lock across an await, so `close` can always interleave.
pub struct PaymentFlow<G, N> {
    session: Arc<Mutex<PaymentSession>>,
    gateway: Arc<G>,
    notifications: Arc<N>,
    timing: FlowTiming,
    application_id: ApplicationId,
    countdown_task: Mutex<Option<JoinHandle<()>>>,
    fetch_error: Mutex<Option<String>>,
}

impl<G, N> PaymentFlow<G, N>
where
    G: RepaymentGateway + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        application_id: ApplicationId,
        default_mode: PaymentMode,
        gateway: Arc<G>,
        notifications: Arc<N>,
        timing: FlowTiming,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(PaymentSession::new(default_mode))),
            gateway,
            notifications,
            timing,
            application_id,
            countdown_task: Mutex::new(None),
            fetch_error: Mutex::new(None),
        }
    }

    /// Fetch the schedule and sync it into the session.
    ///
    /// On failure the list empties, the error is retained for a retry
    /// affordance, and the borrower is notified.
    pub fn refresh(&self) -> Result<(), SessionError> {
        match self.gateway.fetch_schedule(&self.application_id) {
            Ok(installments) => {
                self.lock_session().sync_installments(installments)?;
                *self.lock_fetch_error() = None;
                Ok(())
            }
            Err(error) => {
                debug!(application_id = %self.application_id, %error, "schedule fetch failed");
                self.lock_session().sync_installments(Vec::new())?;
                *self.lock_fetch_error() = Some(error.to_string());
                self.notifications
                    .publish(Notification::error("Failed to load EMI schedule"));
                Ok(())
            }
        }
    }

    /// Most recent schedule fetch error, if the last fetch failed.
    pub fn fetch_error(&self) -> Option<String> {
        self.lock_fetch_error().clone()
    }

    pub fn select_installment(&self, id: &RepaymentId) -> Result<PaymentStep, SessionError> {
        let mut session = self.lock_session();
        session.select_installment(id)?;
        Ok(session.step())
    }

    /// Choose a method; net banking submits immediately.
    pub async fn choose_method(
        &self,
        kind: PaymentMethodKind,
    ) -> Result<PaymentStep, SessionError> {
        let route = self.lock_session().choose_method(kind)?;
        if let MethodRoute::Submit(ticket) = route {
            self.run_payment(ticket).await;
        }
        Ok(self.step())
    }

    pub fn choose_provider(&self, name: &str) -> Result<PaymentStep, SessionError> {
        let mut session = self.lock_session();
        session.choose_provider(name)?;
        Ok(session.step())
    }

    /// Verify the typed UPI identifier against the rail.
    pub async fn verify_upi(&self, upi_id: &str) -> Result<PaymentStep, SessionError> {
        let ticket = self.lock_session().submit_upi_id(upi_id)?;

        tokio::time::sleep(self.timing.upi_verify_delay).await;
        let result = self.gateway.verify_upi(&ticket.upi_id);

        let outcome = self.lock_session().complete_upi_verification(ticket, result);
        match outcome {
            VerifyOutcome::Verified => {}
            VerifyOutcome::Rejected(error) => {
                self.notifications
                    .publish(Notification::error(error.to_string()));
            }
            VerifyOutcome::Stale => {
                debug!("discarding stale UPI verification result");
            }
        }
        Ok(self.step())
    }

    /// Submit the UPI PIN and run the payment.
    pub async fn submit_upi_pin(&self, pin: &str) -> Result<PaymentStep, SessionError> {
        let ticket = self.lock_session().submit_upi_pin(pin)?;
        self.run_payment(ticket).await;
        Ok(self.step())
    }

    /// Submit card details and run the payment.
    pub async fn submit_card(&self, details: CardDetails) -> Result<PaymentStep, SessionError> {
        let ticket = self.lock_session().submit_card(details)?;
        self.run_payment(ticket).await;
        Ok(self.step())
    }

    async fn run_payment(&self, ticket: PaymentTicket) {
        tokio::time::sleep(self.timing.payment_delay).await;
        let result = self
            .gateway
            .simulate_payment(&ticket.repayment_id, &ticket.method_label);
        let paid_on = Local::now().date_naive();

        let outcome = self
            .lock_session()
            .complete_payment(ticket, result, paid_on);
        match outcome {
            PaymentOutcome::Succeeded { receipt, countdown } => {
                self.notifications.publish(Notification::success(format!(
                    "Payment successful via {}. Txn ID: {}",
                    receipt.payment_method, receipt.transaction_id
                )));
                self.spawn_countdown(countdown);
            }
            PaymentOutcome::Failed { reason, countdown } => {
                self.notifications.publish(Notification::error(reason));
                self.spawn_countdown(countdown);
            }
            PaymentOutcome::Stale => {
                debug!("discarding stale payment result");
            }
        }
    }

    fn spawn_countdown(&self, ticket: CountdownTicket) {
        let session = Arc::clone(&self.session);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(COUNTDOWN_TICK).await;
                let outcome = session
                    .lock()
                    .expect("payment session mutex poisoned")
                    .countdown_tick(ticket);
                if !matches!(outcome, TickOutcome::Continue(_)) {
                    break;
                }
            }
        });

        if let Some(previous) = self.lock_countdown_task().replace(handle) {
            previous.abort();
        }
    }

    fn abort_countdown(&self) {
        if let Some(handle) = self.lock_countdown_task().take() {
            handle.abort();
        }
    }

    pub fn retry(&self) -> Result<PaymentStep, SessionError> {
        let mut session = self.lock_session();
        session.retry()?;
        Ok(session.step())
    }

    pub fn change_method(&self) -> Result<PaymentStep, SessionError> {
        let mut session = self.lock_session();
        session.change_method()?;
        Ok(session.step())
    }

    pub fn back_to_list(&self) -> Result<PaymentStep, SessionError> {
        let mut session = self.lock_session();
        session.back_to_list()?;
        Ok(session.step())
    }

    pub fn set_mode(&self, mode: PaymentMode) -> Result<PaymentStep, SessionError> {
        let step = {
            let mut session = self.lock_session();
            session.set_mode(mode)?;
            session.step()
        };
        self.abort_countdown();
        Ok(step)
    }

    /// Close the dialog. Outstanding work becomes stale and the countdown
    /// task is stopped.
    pub fn close(&self) {
        self.lock_session().close();
        self.abort_countdown();
    }

    pub fn step(&self) -> PaymentStep {
        self.lock_session().step()
    }

    pub fn mode(&self) -> PaymentMode {
        self.lock_session().mode()
    }

    pub fn rows(&self) -> Vec<InstallmentRow> {
        self.lock_session().rows()
    }

    pub fn selected_installment(&self) -> Option<Installment> {
        self.lock_session().selected_installment().cloned()
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.lock_session().failure_reason().map(str::to_string)
    }

    pub fn countdown_remaining(&self) -> u8 {
        self.lock_session().countdown_remaining()
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, PaymentSession> {
        self.session.lock().expect("payment session mutex poisoned")
    }

    fn lock_countdown_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.countdown_task
            .lock()
            .expect("countdown task mutex poisoned")
    }

    fn lock_fetch_error(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.fetch_error.lock().expect("fetch error mutex poisoned")
    }
}
