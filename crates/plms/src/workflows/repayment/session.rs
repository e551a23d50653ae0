use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use super::domain::{
    CardDetails, Installment, PaidAttempt, PaymentAttempt, PaymentMode, RepaymentId,
    TransactionReceipt,
};
use super::gateway::{PaymentError, VerificationError};
use super::methods::{self, PaymentMethodKind, ProviderDescriptor};
use super::schedule::{self, EffectiveStatus, InstallmentRow};

/// Seconds the success and failure screens stay up before auto-returning
/// to the list.
pub const COUNTDOWN_SECONDS: u8 = 5;

/// Screen the payment dialog is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStep {
    List,
    Method,
    Bank,
    UpiVerify,
    UpiPin,
    Card,
    Processing,
    Success,
    Failure,
}

impl PaymentStep {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStep::List => "list",
            PaymentStep::Method => "method",
            PaymentStep::Bank => "bank",
            PaymentStep::UpiVerify => "upi_verify",
            PaymentStep::UpiPin => "upi_pin",
            PaymentStep::Card => "card",
            PaymentStep::Processing => "processing",
            PaymentStep::Success => "success",
            PaymentStep::Failure => "failure",
        }
    }
}

/// Generation marker for asynchronous work started by the session.
///
/// Every reset advances the token, so results carrying an old token are
/// recognized as stale and discarded instead of mutating a session the
/// borrower has since closed or restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken(u64);

/// Authorization to run UPI verification for the current session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyTicket {
    pub upi_id: String,
    token: SessionToken,
}

/// Authorization to run a payment submission for the current session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTicket {
    pub repayment_id: RepaymentId,
    /// Value sent as the `method` parameter: the provider name for UPI,
    /// otherwise the method id.
    pub method_label: String,
    token: SessionToken,
}

/// Authorization for the auto-return countdown armed by a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTicket {
    token: SessionToken,
}

/// Where a chosen method leads next.
#[derive(Debug)]
pub enum MethodRoute {
    /// UPI: a provider must be picked first.
    CollectProvider,
    /// Card: card details must be collected.
    CollectCard,
    /// Net banking submits right away.
    Submit(PaymentTicket),
}

/// Result of applying a finished UPI verification to the session.
#[derive(Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Rejected(VerificationError),
    /// The session was reset while the verification ran; nothing changed.
    Stale,
}

/// Result of applying a finished payment to the session.
#[derive(Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded {
        receipt: TransactionReceipt,
        countdown: CountdownTicket,
    },
    Failed {
        reason: String,
        countdown: CountdownTicket,
    },
    /// The session was reset while the payment ran; nothing changed.
    Stale,
}

/// Result of one countdown tick.
#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Seconds left on the result screen.
    Continue(u8),
    /// Countdown expired and the session returned to the list.
    Finished,
    /// The session moved on; the ticking task should stop.
    Stale,
}

/// State machine behind the EMI payment dialog.
///
/// The session is purely synchronous: it validates events, moves between
/// steps, and hands out tickets for the work that must happen elsewhere
/// (verification, payment, the result-screen countdown). Completions are
/// applied back with their ticket, which is how results that outlived a
/// reset get discarded.
///
/// While a ticket is outstanding the session is busy: every event except
/// `close` is rejected until the completion lands.
pub struct PaymentSession {
    step: PaymentStep,
    mode: PaymentMode,
    default_mode: PaymentMode,
    installments: Vec<Installment>,
    attempts: BTreeMap<RepaymentId, PaymentAttempt>,
    selected: Option<RepaymentId>,
    method: Option<PaymentMethodKind>,
    provider: Option<&'static ProviderDescriptor>,
    upi_id: String,
    upi_verified: bool,
    failure_reason: Option<String>,
    countdown_remaining: u8,
    token: SessionToken,
    in_flight: bool,
}

impl PaymentSession {
    pub fn new(default_mode: PaymentMode) -> Self {
        Self {
            step: PaymentStep::List,
            mode: default_mode,
            default_mode,
            installments: Vec::new(),
            attempts: BTreeMap::new(),
            selected: None,
            method: None,
            provider: None,
            upi_id: String::new(),
            upi_verified: false,
            failure_reason: None,
            countdown_remaining: COUNTDOWN_SECONDS,
            token: SessionToken(0),
            in_flight: false,
        }
    }

    /// Replace the schedule with a freshly fetched one.
    ///
    /// Local attempts the fetch confirmed or orphaned are pruned. If the
    /// selected installment vanished from the schedule the dialog resets
    /// to the list.
    pub fn sync_installments(
        &mut self,
        installments: Vec<Installment>,
    ) -> Result<(), SessionError> {
        self.ensure_idle()?;

        schedule::reconcile(&mut self.attempts, &installments);
        if let Some(selected) = &self.selected {
            if !installments.iter().any(|row| &row.repayment_id == selected) {
                self.return_to_list();
            }
        }
        self.installments = installments;
        Ok(())
    }

    /// Pick an installment from the list and move to method selection.
    pub fn select_installment(&mut self, id: &RepaymentId) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.expect_step(PaymentStep::List)?;

        let row = self
            .installments
            .iter()
            .find(|row| &row.repayment_id == id)
            .ok_or_else(|| SessionError::UnknownInstallment(id.clone()))?;

        if schedule::effective_status(row, &self.attempts) == EffectiveStatus::Paid {
            return Err(SessionError::AlreadyPaid(id.clone()));
        }

        let offered = schedule::payable(&self.installments, &self.attempts, self.mode);
        if !offered.iter().any(|candidate| &candidate.repayment_id == id) {
            return Err(SessionError::NotUpNext(id.clone()));
        }

        self.selected = Some(id.clone());
        self.step = PaymentStep::Method;
        Ok(())
    }

    /// Choose a payment method and route to its next screen.
    ///
    /// Net banking needs no further input, so it returns a submission
    /// ticket immediately and the dialog shows the processing screen.
    pub fn choose_method(&mut self, kind: PaymentMethodKind) -> Result<MethodRoute, SessionError> {
        self.ensure_idle()?;
        self.expect_step(PaymentStep::Method)?;

        self.method = Some(kind);
        match kind {
            PaymentMethodKind::Upi => {
                self.step = PaymentStep::Bank;
                Ok(MethodRoute::CollectProvider)
            }
            PaymentMethodKind::Card => {
                self.step = PaymentStep::Card;
                Ok(MethodRoute::CollectCard)
            }
            PaymentMethodKind::NetBanking => {
                let ticket = self.begin_submission(PaymentMethodKind::NetBanking.id().to_string())?;
                Ok(MethodRoute::Submit(ticket))
            }
        }
    }

    /// Pick the UPI app the collect request should route through.
    pub fn choose_provider(&mut self, name: &str) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.expect_step(PaymentStep::Bank)?;

        let provider = methods::provider_named(name)
            .ok_or_else(|| SessionError::UnknownProvider(name.to_string()))?;
        self.provider = Some(provider);
        self.step = PaymentStep::UpiVerify;
        Ok(())
    }

    /// Accept the typed UPI identifier and hand out a verification ticket.
    ///
    /// The dialog stays on the verification screen until the completion
    /// is applied.
    pub fn submit_upi_id(&mut self, raw: &str) -> Result<VerifyTicket, SessionError> {
        self.ensure_idle()?;
        self.expect_step(PaymentStep::UpiVerify)?;

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptyUpiId);
        }

        self.upi_id = trimmed.to_string();
        self.in_flight = true;
        Ok(VerifyTicket {
            upi_id: self.upi_id.clone(),
            token: self.token,
        })
    }

    /// Apply the result of a UPI verification.
    pub fn complete_upi_verification(
        &mut self,
        ticket: VerifyTicket,
        result: Result<(), VerificationError>,
    ) -> VerifyOutcome {
        if ticket.token != self.token {
            return VerifyOutcome::Stale;
        }

        self.in_flight = false;
        match result {
            Ok(()) => {
                self.upi_verified = true;
                self.step = PaymentStep::UpiPin;
                VerifyOutcome::Verified
            }
            Err(error) => VerifyOutcome::Rejected(error),
        }
    }

    /// Accept the UPI PIN and hand out the payment ticket.
    pub fn submit_upi_pin(&mut self, pin: &str) -> Result<PaymentTicket, SessionError> {
        self.ensure_idle()?;
        self.expect_step(PaymentStep::UpiPin)?;

        if pin.len() != 4 || !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SessionError::InvalidPin);
        }

        let provider = match self.provider {
            Some(provider) => provider,
            None => return Err(SessionError::WrongStep { step: self.step }),
        };
        self.begin_submission(provider.name.to_string())
    }

    /// Accept completed card details and hand out the payment ticket.
    pub fn submit_card(&mut self, details: CardDetails) -> Result<PaymentTicket, SessionError> {
        self.ensure_idle()?;
        self.expect_step(PaymentStep::Card)?;

        if !details.has_all_fields() {
            return Err(SessionError::IncompleteCard);
        }

        self.begin_submission(PaymentMethodKind::Card.id().to_string())
    }

    fn begin_submission(&mut self, method_label: String) -> Result<PaymentTicket, SessionError> {
        let repayment_id = self
            .selected
            .clone()
            .ok_or(SessionError::NoInstallmentSelected)?;

        self.step = PaymentStep::Processing;
        self.in_flight = true;
        Ok(PaymentTicket {
            repayment_id,
            method_label,
            token: self.token,
        })
    }

    /// Apply the result of a payment submission.
    ///
    /// Success and failure both record a local attempt, show the matching
    /// result screen, and arm the auto-return countdown. The returned
    /// countdown ticket belongs to whoever drives the clock.
    pub fn complete_payment(
        &mut self,
        ticket: PaymentTicket,
        result: Result<TransactionReceipt, PaymentError>,
        paid_on: NaiveDate,
    ) -> PaymentOutcome {
        if ticket.token != self.token {
            return PaymentOutcome::Stale;
        }

        self.in_flight = false;
        match result {
            Ok(receipt) => {
                self.attempts.insert(
                    ticket.repayment_id,
                    PaymentAttempt::Paid(PaidAttempt {
                        transaction_id: receipt.transaction_id.clone(),
                        payment_method: receipt.payment_method.clone(),
                        paid_on,
                    }),
                );
                self.failure_reason = None;
                self.step = PaymentStep::Success;
                let countdown = self.arm_countdown();
                PaymentOutcome::Succeeded { receipt, countdown }
            }
            Err(error) => {
                let reason = error.to_string();
                self.attempts.insert(
                    ticket.repayment_id,
                    PaymentAttempt::Failed {
                        reason: reason.clone(),
                    },
                );
                self.failure_reason = Some(reason.clone());
                self.step = PaymentStep::Failure;
                let countdown = self.arm_countdown();
                PaymentOutcome::Failed { reason, countdown }
            }
        }
    }

    fn arm_countdown(&mut self) -> CountdownTicket {
        self.countdown_remaining = COUNTDOWN_SECONDS;
        self.token.0 += 1;
        CountdownTicket { token: self.token }
    }

    /// Advance the result-screen countdown by one second.
    ///
    /// Leaving the result screen by any other event makes outstanding
    /// ticks stale, so an old clock can never drain a newly armed
    /// countdown.
    pub fn countdown_tick(&mut self, ticket: CountdownTicket) -> TickOutcome {
        if ticket.token != self.token
            || !matches!(self.step, PaymentStep::Success | PaymentStep::Failure)
        {
            return TickOutcome::Stale;
        }

        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining == 0 {
            self.return_to_list();
            TickOutcome::Finished
        } else {
            TickOutcome::Continue(self.countdown_remaining)
        }
    }

    /// Leave the failure screen and pick a method again for the same
    /// installment.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.expect_step(PaymentStep::Failure)?;

        self.failure_reason = None;
        self.clear_path_inputs();
        self.step = PaymentStep::Method;
        Ok(())
    }

    /// Abandon the current method path and return to method selection.
    pub fn change_method(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if !matches!(
            self.step,
            PaymentStep::Bank | PaymentStep::UpiVerify | PaymentStep::UpiPin | PaymentStep::Card
        ) {
            return Err(SessionError::WrongStep { step: self.step });
        }

        self.clear_path_inputs();
        self.step = PaymentStep::Method;
        Ok(())
    }

    /// Back out of method selection to the list.
    pub fn back_to_list(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.expect_step(PaymentStep::Method)?;

        self.selected = None;
        self.clear_path_inputs();
        self.step = PaymentStep::List;
        Ok(())
    }

    /// Close the dialog: full reset including recorded attempts and mode.
    ///
    /// Always allowed. Any outstanding completion or countdown becomes
    /// stale.
    pub fn close(&mut self) {
        self.step = PaymentStep::List;
        self.selected = None;
        self.clear_path_inputs();
        self.failure_reason = None;
        self.attempts.clear();
        self.mode = self.default_mode;
        self.countdown_remaining = COUNTDOWN_SECONDS;
        self.in_flight = false;
        self.token.0 += 1;
    }

    /// Switch payment mode, resetting to the list if mid-flow.
    pub fn set_mode(&mut self, mode: PaymentMode) -> Result<(), SessionError> {
        self.ensure_idle()?;

        if self.step != PaymentStep::List {
            self.step = PaymentStep::List;
            self.selected = None;
            self.clear_path_inputs();
            self.failure_reason = None;
            self.token.0 += 1;
        }
        self.mode = mode;
        Ok(())
    }

    fn return_to_list(&mut self) {
        self.step = PaymentStep::List;
        self.selected = None;
        self.clear_path_inputs();
        self.failure_reason = None;
    }

    fn clear_path_inputs(&mut self) {
        self.method = None;
        self.provider = None;
        self.upi_id.clear();
        self.upi_verified = false;
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.in_flight {
            Err(SessionError::Busy)
        } else {
            Ok(())
        }
    }

    fn expect_step(&self, expected: PaymentStep) -> Result<(), SessionError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(SessionError::WrongStep { step: self.step })
        }
    }

    pub fn step(&self) -> PaymentStep {
        self.step
    }

    pub fn mode(&self) -> PaymentMode {
        self.mode
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn selected(&self) -> Option<&RepaymentId> {
        self.selected.as_ref()
    }

    pub fn selected_installment(&self) -> Option<&Installment> {
        let selected = self.selected.as_ref()?;
        self.installments
            .iter()
            .find(|row| &row.repayment_id == selected)
    }

    pub fn method(&self) -> Option<PaymentMethodKind> {
        self.method
    }

    pub fn provider(&self) -> Option<&'static ProviderDescriptor> {
        self.provider
    }

    pub fn upi_verified(&self) -> bool {
        self.upi_verified
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn countdown_remaining(&self) -> u8 {
        self.countdown_remaining
    }

    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    pub fn attempts(&self) -> &BTreeMap<RepaymentId, PaymentAttempt> {
        &self.attempts
    }

    /// Rows to render for the current mode, attempts folded in.
    pub fn rows(&self) -> Vec<InstallmentRow> {
        schedule::rows(&self.installments, &self.attempts, self.mode)
    }

    /// Installments currently offered for payment.
    pub fn payable(&self) -> Vec<&Installment> {
        schedule::payable(&self.installments, &self.attempts, self.mode)
    }
}

/// Rejected session events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("action not available on the '{}' screen", .step.label())]
    WrongStep { step: PaymentStep },
    #[error("another request is already in flight")]
    Busy,
    #[error("installment '{0}' is not part of this schedule")]
    UnknownInstallment(RepaymentId),
    #[error("installment '{0}' is already paid")]
    AlreadyPaid(RepaymentId),
    #[error("installment '{0}' is not the next one due")]
    NotUpNext(RepaymentId),
    #[error("no installment is selected")]
    NoInstallmentSelected,
    #[error("'{0}' is not a supported UPI provider")]
    UnknownProvider(String),
    #[error("UPI ID is required")]
    EmptyUpiId,
    #[error("UPI PIN must be exactly 4 digits")]
    InvalidPin,
    #[error("card number, expiry, CVV, and cardholder name are all required")]
    IncompleteCard,
}
