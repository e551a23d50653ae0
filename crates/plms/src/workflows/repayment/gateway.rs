use thiserror::Error;

use super::domain::{ApplicationId, Installment, RepaymentId, TransactionReceipt};

/// Boundary to the repayment backend.
///
/// The dialog flow talks to the schedule and the payment rail only
/// through this trait, so tests and demos can swap in scripted
/// implementations. Calls are synchronous; the flow layer owns the
/// simulated latency around them.
pub trait RepaymentGateway: Send + Sync {
    fn fetch_schedule(&self, application_id: &ApplicationId) -> Result<Vec<Installment>, FetchError>;
    fn verify_upi(&self, upi_id: &str) -> Result<(), VerificationError>;
    fn simulate_payment(
        &self,
        repayment_id: &RepaymentId,
        method_label: &str,
    ) -> Result<TransactionReceipt, PaymentError>;
}

/// Schedule fetch failure. Non-fatal: the dialog empties the list,
/// keeps the error, and offers a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("failed to load the EMI schedule: {0}")]
    Unavailable(String),
}

/// UPI identifier verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Invalid UPI ID. Please try again.")]
    Rejected,
    #[error("verification service unavailable: {0}")]
    Unavailable(String),
}

/// Payment submission failure.
///
/// `Declined` carries the rail's reason and is shown to the borrower
/// verbatim. `Unreachable` stands in for transport errors with no usable
/// response body and displays the generic fallback text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Declined(String),
    #[error("Payment failed due to an unexpected error.")]
    Unreachable,
}
