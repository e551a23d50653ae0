use chrono::{Local, Months, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use plms::workflows::loans::{LoanApplicationRecord, LoanApplicationRepository, LoanStoreError};
use plms::workflows::repayment::{
    ApplicationId, FetchError, Installment, InstallmentRepository, InstallmentStatus, Notification,
    NotificationSink, PaymentError, RepaymentError, RepaymentGateway, RepaymentId,
    RepaymentService, Severity, StoreError, TransactionReceipt, VerificationError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryInstallmentRepository {
    records: Arc<Mutex<HashMap<RepaymentId, Installment>>>,
}

impl InMemoryInstallmentRepository {
    /// Seed a monthly EMI schedule for one application.
    pub(crate) fn seed_schedule(
        &self,
        application_id: &ApplicationId,
        first_due: NaiveDate,
        emi_amount: u32,
        count: u32,
    ) -> Vec<RepaymentId> {
        let mut guard = self.records.lock().expect("installment store mutex poisoned");
        let mut ids = Vec::with_capacity(count as usize);
        for number in 1..=count {
            let id = RepaymentId(format!("{}-emi-{number:02}", application_id.0));
            let due_date = first_due
                .checked_add_months(Months::new(number - 1))
                .unwrap_or(first_due);
            guard.insert(
                id.clone(),
                Installment {
                    repayment_id: id.clone(),
                    application_id: application_id.clone(),
                    emi_number: number,
                    emi_amount,
                    due_date,
                    status: InstallmentStatus::Pending,
                    paid_date: None,
                    transaction_id: None,
                    payment_method: None,
                },
            );
            ids.push(id);
        }
        ids
    }
}

impl InstallmentRepository for InMemoryInstallmentRepository {
    fn schedule_for(&self, application_id: &ApplicationId) -> Result<Vec<Installment>, StoreError> {
        let guard = self.records.lock().expect("installment store mutex poisoned");
        Ok(guard
            .values()
            .filter(|row| &row.application_id == application_id)
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &RepaymentId) -> Result<Option<Installment>, StoreError> {
        let guard = self.records.lock().expect("installment store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn mark_paid(
        &self,
        id: &RepaymentId,
        receipt: &TransactionReceipt,
        paid_on: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("installment store mutex poisoned");
        let row = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        row.status = InstallmentStatus::Paid;
        row.paid_date = Some(paid_on);
        row.transaction_id = Some(receipt.transaction_id.clone());
        row.payment_method = Some(receipt.payment_method.clone());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLoanRepository {
    records: Arc<Mutex<HashMap<ApplicationId, LoanApplicationRecord>>>,
}

impl LoanApplicationRepository for InMemoryLoanRepository {
    fn insert(&self, record: LoanApplicationRecord) -> Result<(), LoanStoreError> {
        let mut guard = self.records.lock().expect("loan store mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(LoanStoreError::Duplicate(record.id.clone()));
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplicationRecord>, LoanStoreError> {
        let guard = self.records.lock().expect("loan store mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Payment rail riding directly on the repayment service.
///
/// Stands in for the bank: UPI handles verify by shape, and a settlement
/// call lands in the installment store unless armed to decline.
pub(crate) struct SimulatedBankGateway<R> {
    service: Arc<RepaymentService<R>>,
    decline_next: AtomicBool,
}

impl<R> SimulatedBankGateway<R> {
    pub(crate) fn new(service: Arc<RepaymentService<R>>) -> Self {
        Self {
            service,
            decline_next: AtomicBool::new(false),
        }
    }

    /// Arm the rail to decline the next settlement attempt.
    pub(crate) fn decline_next_payment(&self) {
        self.decline_next.store(true, Ordering::SeqCst);
    }
}

impl<R> RepaymentGateway for SimulatedBankGateway<R>
where
    R: InstallmentRepository,
{
    fn fetch_schedule(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Installment>, FetchError> {
        self.service
            .schedule(application_id, Local::now().date_naive())
            .map_err(|error| FetchError::Unavailable(error.to_string()))
    }

    fn verify_upi(&self, upi_id: &str) -> Result<(), VerificationError> {
        if upi_id.contains('@') {
            Ok(())
        } else {
            Err(VerificationError::Rejected)
        }
    }

    fn simulate_payment(
        &self,
        repayment_id: &RepaymentId,
        method_label: &str,
    ) -> Result<TransactionReceipt, PaymentError> {
        if self.decline_next.swap(false, Ordering::SeqCst) {
            return Err(PaymentError::Declined("Insufficient funds".to_string()));
        }

        self.service
            .simulate_pay(repayment_id, method_label, Local::now().date_naive())
            .map_err(|error| match error {
                RepaymentError::NotFound | RepaymentError::AlreadyPaid => {
                    PaymentError::Declined(error.to_string())
                }
                RepaymentError::Store(_) => PaymentError::Unreachable,
            })
    }
}

/// Prints payment toasts for the CLI demo.
#[derive(Default, Clone)]
pub(crate) struct ConsoleNotificationSink;

impl NotificationSink for ConsoleNotificationSink {
    fn publish(&self, notification: Notification) {
        let tag = match notification.severity {
            Severity::Success => "success",
            Severity::Error => "error",
        };
        println!("  [{tag}] {}", notification.message);
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
