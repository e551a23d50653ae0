use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;

use crate::workflows::repayment::domain::{
    ApplicationId, Installment, InstallmentStatus, PaymentMode, RepaymentId, TransactionReceipt,
};
use crate::workflows::repayment::flow::{FlowTiming, PaymentFlow};
use crate::workflows::repayment::gateway::{
    FetchError, PaymentError, RepaymentGateway, VerificationError,
};
use crate::workflows::repayment::notify::{Notification, NotificationSink};
use crate::workflows::repayment::service::{InstallmentRepository, StoreError};

pub(super) const APPLICATION_ID: &str = "loan-000001";

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub(super) fn installment(number: u32, status: InstallmentStatus) -> Installment {
    let paid = status == InstallmentStatus::Paid;
    Installment {
        repayment_id: RepaymentId(format!("r{number}")),
        application_id: ApplicationId(APPLICATION_ID.to_string()),
        emi_number: number,
        emi_amount: 12_500,
        due_date: date(2025, number, 5),
        status,
        paid_date: paid.then(|| date(2025, number, 6)),
        transaction_id: paid.then(|| format!("txn-srv-{number:06}")),
        payment_method: paid.then(|| "upi".to_string()),
    }
}

/// Four-EMI schedule: first settled on the server, second overdue, rest
/// pending.
pub(super) fn sample_schedule() -> Vec<Installment> {
    vec![
        installment(1, InstallmentStatus::Paid),
        installment(2, InstallmentStatus::Overdue),
        installment(3, InstallmentStatus::Pending),
        installment(4, InstallmentStatus::Pending),
    ]
}

pub(super) fn rid(raw: &str) -> RepaymentId {
    RepaymentId(raw.to_string())
}

/// Scriptable payment rail double.
///
/// Flags flip one behavior for the next call; settled payments are
/// written back into the held schedule so a refetch sees them.
pub(super) struct MemoryGateway {
    schedule: Mutex<Vec<Installment>>,
    pub(super) fail_fetch: AtomicBool,
    pub(super) reject_upi: AtomicBool,
    pub(super) decline_next: AtomicBool,
    sequence: AtomicU64,
    payments: Mutex<Vec<(RepaymentId, String)>>,
}

impl MemoryGateway {
    pub(super) fn new(schedule: Vec<Installment>) -> Self {
        Self {
            schedule: Mutex::new(schedule),
            fail_fetch: AtomicBool::new(false),
            reject_upi: AtomicBool::new(false),
            decline_next: AtomicBool::new(false),
            sequence: AtomicU64::new(1),
            payments: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn payments(&self) -> Vec<(RepaymentId, String)> {
        self.payments.lock().unwrap().clone()
    }
}

impl RepaymentGateway for MemoryGateway {
    fn fetch_schedule(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Installment>, FetchError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("backend offline".to_string()));
        }
        let schedule = self.schedule.lock().unwrap();
        Ok(schedule
            .iter()
            .filter(|row| &row.application_id == application_id)
            .cloned()
            .collect())
    }

    fn verify_upi(&self, _upi_id: &str) -> Result<(), VerificationError> {
        if self.reject_upi.load(Ordering::SeqCst) {
            Err(VerificationError::Rejected)
        } else {
            Ok(())
        }
    }

    fn simulate_payment(
        &self,
        repayment_id: &RepaymentId,
        method_label: &str,
    ) -> Result<TransactionReceipt, PaymentError> {
        self.payments
            .lock()
            .unwrap()
            .push((repayment_id.clone(), method_label.to_string()));
        if self.decline_next.swap(false, Ordering::SeqCst) {
            return Err(PaymentError::Declined("Insufficient funds".to_string()));
        }

        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let receipt = TransactionReceipt {
            transaction_id: format!("txn-test-{id:04}"),
            payment_method: method_label.to_string(),
        };
        let mut schedule = self.schedule.lock().unwrap();
        if let Some(row) = schedule
            .iter_mut()
            .find(|row| &row.repayment_id == repayment_id)
        {
            row.status = InstallmentStatus::Paid;
            row.paid_date = Some(date(2025, 6, 15));
            row.transaction_id = Some(receipt.transaction_id.clone());
            row.payment_method = Some(receipt.payment_method.clone());
        }
        Ok(receipt)
    }
}

#[derive(Default)]
pub(super) struct MemorySink {
    events: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for MemorySink {
    fn publish(&self, notification: Notification) {
        self.events.lock().unwrap().push(notification);
    }
}

pub(super) fn build_flow(
    schedule: Vec<Installment>,
    mode: PaymentMode,
) -> (
    PaymentFlow<MemoryGateway, MemorySink>,
    Arc<MemoryGateway>,
    Arc<MemorySink>,
) {
    let gateway = Arc::new(MemoryGateway::new(schedule));
    let sink = Arc::new(MemorySink::default());
    let flow = PaymentFlow::new(
        ApplicationId(APPLICATION_ID.to_string()),
        mode,
        Arc::clone(&gateway),
        Arc::clone(&sink),
        FlowTiming::immediate(),
    );
    (flow, gateway, sink)
}

/// Installment store double backed by a map.
pub(super) struct MemoryRepository {
    records: Mutex<BTreeMap<RepaymentId, Installment>>,
}

impl MemoryRepository {
    pub(super) fn new(schedule: Vec<Installment>) -> Self {
        let records = schedule
            .into_iter()
            .map(|row| (row.repayment_id.clone(), row))
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }
}

impl InstallmentRepository for MemoryRepository {
    fn schedule_for(&self, application_id: &ApplicationId) -> Result<Vec<Installment>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .filter(|row| &row.application_id == application_id)
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &RepaymentId) -> Result<Option<Installment>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records.get(id).cloned())
    }

    fn mark_paid(
        &self,
        id: &RepaymentId,
        receipt: &TransactionReceipt,
        paid_on: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let row = records.get_mut(id).ok_or(StoreError::NotFound)?;
        row.status = InstallmentStatus::Paid;
        row.paid_date = Some(paid_on);
        row.transaction_id = Some(receipt.transaction_id.clone());
        row.payment_method = Some(receipt.payment_method.clone());
        Ok(())
    }
}

/// Store double whose every operation fails.
pub(super) struct UnavailableRepository;

impl InstallmentRepository for UnavailableRepository {
    fn schedule_for(&self, _: &ApplicationId) -> Result<Vec<Installment>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _: &RepaymentId) -> Result<Option<Installment>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn mark_paid(
        &self,
        _: &RepaymentId,
        _: &TransactionReceipt,
        _: NaiveDate,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
