use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of the loan application a repayment schedule belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single EMI installment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepaymentId(pub String);

impl fmt::Display for RepaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side status of an installment.
///
/// `Overdue` is derived at read time for pending installments whose due
/// date has passed; nothing ever stores it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
}

impl InstallmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "PENDING",
            InstallmentStatus::Paid => "PAID",
            InstallmentStatus::Overdue => "OVERDUE",
        }
    }
}

/// One EMI row of a repayment schedule as served over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub repayment_id: RepaymentId,
    pub application_id: ApplicationId,
    pub emi_number: u32,
    /// Amount due for this installment, in whole rupees.
    pub emi_amount: u32,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl Installment {
    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }
}

/// Confirmation returned by the payment rail for a settled installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_id: String,
    pub payment_method: String,
}

/// Locally recorded outcome of a payment attempt.
///
/// Attempts overlay the fetched schedule until the next refetch confirms
/// them (or the dialog closes and they are discarded). A `Failed` attempt
/// keeps the decline reason for display on the schedule row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentAttempt {
    Paid(PaidAttempt),
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidAttempt {
    pub transaction_id: String,
    pub payment_method: String,
    pub paid_on: NaiveDate,
}

/// Controls which installments are offered for payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Every unpaid installment can be paid, in any order.
    #[default]
    All,
    /// Only the earliest unpaid installment is offered.
    Sequential,
}

impl PaymentMode {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMode::All => "all",
            PaymentMode::Sequential => "sequential",
        }
    }
}

/// Card form input. Validation only requires every field to be present;
/// the rail is simulated and never charges a real card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    pub cvv: String,
    pub name: String,
}

impl CardDetails {
    pub fn has_all_fields(&self) -> bool {
        !(self.number.trim().is_empty()
            || self.expiry.trim().is_empty()
            || self.cvv.trim().is_empty()
            || self.name.trim().is_empty())
    }
}

/// Reformat a typed card number into space-separated groups of four.
///
/// Keeps at most sixteen digits and drops everything else. Input with
/// fewer than four digits comes back unchanged so partial typing is not
/// mangled.
pub fn format_card_number(raw: &str) -> String {
    let digits: Vec<char> = raw
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(16)
        .collect();
    if digits.len() < 4 {
        return raw.to_string();
    }

    let mut formatted = String::with_capacity(digits.len() + digits.len() / 4);
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && index % 4 == 0 {
            formatted.push(' ');
        }
        formatted.push(*digit);
    }
    formatted
}
