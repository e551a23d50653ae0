use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::domain::{Installment, InstallmentStatus, PaymentAttempt, PaymentMode, RepaymentId};

/// Status of an installment once local payment attempts are overlaid on
/// the fetched schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveStatus {
    Pending,
    Paid,
    Overdue,
    Failed,
}

impl EffectiveStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EffectiveStatus::Pending => "PENDING",
            EffectiveStatus::Paid => "PAID",
            EffectiveStatus::Overdue => "OVERDUE",
            EffectiveStatus::Failed => "FAILED",
        }
    }
}

/// Overlay a local attempt on a fetched installment.
///
/// A paid verdict from either side wins: once the server or a local
/// attempt says PAID, a stale FAILED record cannot resurrect the row.
pub fn effective_status(
    installment: &Installment,
    attempts: &BTreeMap<RepaymentId, PaymentAttempt>,
) -> EffectiveStatus {
    if installment.is_paid() {
        return EffectiveStatus::Paid;
    }

    match attempts.get(&installment.repayment_id) {
        Some(PaymentAttempt::Paid(_)) => EffectiveStatus::Paid,
        Some(PaymentAttempt::Failed { .. }) => EffectiveStatus::Failed,
        None => match installment.status {
            InstallmentStatus::Pending => EffectiveStatus::Pending,
            InstallmentStatus::Overdue => EffectiveStatus::Overdue,
            InstallmentStatus::Paid => EffectiveStatus::Paid,
        },
    }
}

/// Drop attempts that a fresh fetch has made redundant.
///
/// An attempt is pruned when its installment is no longer in the schedule
/// or when the server has confirmed the payment it recorded. Failed
/// attempts stay until close since the server never learns about them.
pub fn reconcile(
    attempts: &mut BTreeMap<RepaymentId, PaymentAttempt>,
    installments: &[Installment],
) {
    attempts.retain(|id, attempt| {
        match installments.iter().find(|row| &row.repayment_id == id) {
            None => false,
            Some(row) => !(row.is_paid() && matches!(attempt, PaymentAttempt::Paid(_))),
        }
    });
}

/// The installments currently offered for payment, in schedule order.
///
/// `All` offers every row that is not effectively paid. `Sequential`
/// offers only the first such row, so installments must be cleared in
/// order. A failed row stays payable in both modes.
pub fn payable<'a>(
    installments: &'a [Installment],
    attempts: &BTreeMap<RepaymentId, PaymentAttempt>,
    mode: PaymentMode,
) -> Vec<&'a Installment> {
    let mut unpaid = installments
        .iter()
        .filter(|row| effective_status(row, attempts) != EffectiveStatus::Paid);

    match mode {
        PaymentMode::All => unpaid.collect(),
        PaymentMode::Sequential => unpaid.next().into_iter().collect(),
    }
}

/// A schedule row prepared for display, with attempt data folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallmentRow {
    pub repayment_id: RepaymentId,
    pub emi_number: u32,
    pub emi_amount: u32,
    pub due_date: NaiveDate,
    pub status: EffectiveStatus,
    pub paid_date: Option<NaiveDate>,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub failure_reason: Option<String>,
    pub payable: bool,
}

/// Build the rows the dialog renders for the current mode.
///
/// `All` lists the entire schedule; `Sequential` lists only the next
/// installment due (or nothing once everything is paid).
pub fn rows(
    installments: &[Installment],
    attempts: &BTreeMap<RepaymentId, PaymentAttempt>,
    mode: PaymentMode,
) -> Vec<InstallmentRow> {
    let offered = payable(installments, attempts, mode);

    let listed: Vec<&Installment> = match mode {
        PaymentMode::All => installments.iter().collect(),
        PaymentMode::Sequential => offered.clone(),
    };

    listed
        .into_iter()
        .map(|row| {
            let status = effective_status(row, attempts);
            let attempt = attempts.get(&row.repayment_id);

            let (paid_date, transaction_id, payment_method, failure_reason) = match attempt {
                Some(PaymentAttempt::Paid(paid)) => (
                    Some(paid.paid_on),
                    Some(paid.transaction_id.clone()),
                    Some(paid.payment_method.clone()),
                    None,
                ),
                Some(PaymentAttempt::Failed { reason }) => {
                    (row.paid_date, None, None, Some(reason.clone()))
                }
                None => (
                    row.paid_date,
                    row.transaction_id.clone(),
                    row.payment_method.clone(),
                    None,
                ),
            };

            InstallmentRow {
                repayment_id: row.repayment_id.clone(),
                emi_number: row.emi_number,
                emi_amount: row.emi_amount,
                due_date: row.due_date,
                status,
                paid_date,
                transaction_id,
                payment_method,
                failure_reason,
                payable: offered
                    .iter()
                    .any(|candidate| candidate.repayment_id == row.repayment_id),
            }
        })
        .collect()
}
