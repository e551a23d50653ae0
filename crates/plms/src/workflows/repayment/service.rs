use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::domain::{ApplicationId, Installment, InstallmentStatus, RepaymentId, TransactionReceipt};

/// Storage seam for installment records.
pub trait InstallmentRepository: Send + Sync {
    fn schedule_for(&self, application_id: &ApplicationId) -> Result<Vec<Installment>, StoreError>;

    fn fetch(&self, id: &RepaymentId) -> Result<Option<Installment>, StoreError>;

    fn mark_paid(
        &self,
        id: &RepaymentId,
        receipt: &TransactionReceipt,
        paid_on: NaiveDate,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("repayment record not found")]
    NotFound,
    #[error("repayment store unavailable: {0}")]
    Unavailable(String),
}

static TRANSACTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_transaction_id() -> String {
    let id = TRANSACTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("TXN{id:06}")
}

/// Server half of the repayment rail: hands out schedules and settles
/// simulated payments against the installment store.
pub struct RepaymentService<R> {
    repository: Arc<R>,
}

impl<R> RepaymentService<R>
where
    R: InstallmentRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// EMI schedule for one application, ordered by installment number.
    ///
    /// Pending installments past their due date are reported as overdue;
    /// the stored record is not rewritten.
    pub fn schedule(
        &self,
        application_id: &ApplicationId,
        today: NaiveDate,
    ) -> Result<Vec<Installment>, RepaymentError> {
        let mut installments = self.repository.schedule_for(application_id)?;
        installments.sort_by_key(|installment| installment.emi_number);
        for installment in &mut installments {
            if installment.status == InstallmentStatus::Pending && installment.due_date < today {
                installment.status = InstallmentStatus::Overdue;
            }
        }
        Ok(installments)
    }

    /// Settle one installment through the simulated rail.
    pub fn simulate_pay(
        &self,
        id: &RepaymentId,
        method_label: &str,
        today: NaiveDate,
    ) -> Result<TransactionReceipt, RepaymentError> {
        let installment = self
            .repository
            .fetch(id)?
            .ok_or(RepaymentError::NotFound)?;
        if installment.is_paid() {
            return Err(RepaymentError::AlreadyPaid);
        }

        let receipt = TransactionReceipt {
            transaction_id: next_transaction_id(),
            payment_method: method_label.to_string(),
        };
        self.repository.mark_paid(id, &receipt, today)?;
        info!(
            repayment_id = %id,
            transaction_id = %receipt.transaction_id,
            method = %receipt.payment_method,
            "installment settled"
        );
        Ok(receipt)
    }

    /// Settle one installment without going through a payment method.
    pub fn pay(&self, id: &RepaymentId, today: NaiveDate) -> Result<TransactionReceipt, RepaymentError> {
        self.simulate_pay(id, "direct", today)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepaymentError {
    #[error("Repayment not found")]
    NotFound,
    #[error("EMI is already paid")]
    AlreadyPaid,
    #[error(transparent)]
    Store(#[from] StoreError),
}
