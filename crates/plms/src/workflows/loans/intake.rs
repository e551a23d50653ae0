use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::workflows::credit::gate::EligibilityGate;
use crate::workflows::credit::score::{self, CreditCheckError};
use crate::workflows::credit::store::CreditProfileStore;
use crate::workflows::repayment::domain::ApplicationId;

/// Smallest principal the product offers, in whole rupees.
pub const MINIMUM_LOAN_AMOUNT: u32 = 100_000;

pub fn professions() -> &'static [&'static str] {
    &[
        "Doctor",
        "Lawyer",
        "Chartered Accountant",
        "Architect",
        "Engineer",
        "Company Secretary",
        "Dentist",
        "Other Professional",
    ]
}

pub fn loan_purposes() -> &'static [&'static str] {
    &[
        "Home Renovation",
        "Medical Emergency",
        "Debt Consolidation",
        "Travel or Vacation",
        "Electronic Gadgets Purchase",
        "Vehicle Down Payment",
        "Children's School Fees",
        "Advance Rent or Deposit",
    ]
}

/// Offered tenures, in months.
pub fn loan_tenures() -> &'static [u8] {
    &[12, 24, 36, 48, 60, 72, 84]
}

/// An application as the borrower typed it, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDraft {
    pub full_name: String,
    pub profession: String,
    pub purpose: String,
    pub amount: u32,
    pub tenure_months: u8,
    pub pan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("applicant name is required")]
    MissingName,
    #[error("'{0}' is not a recognized profession")]
    UnknownProfession(String),
    #[error("'{0}' is not a recognized loan purpose")]
    UnknownPurpose(String),
    #[error("loan amount must be at least {MINIMUM_LOAN_AMOUNT}, got {0}")]
    AmountBelowMinimum(u32),
    #[error("{0} months is not an offered tenure")]
    InvalidTenure(u8),
    #[error(transparent)]
    InvalidPan(#[from] CreditCheckError),
}

/// Validate a draft and return the canonical PAN it carries.
pub fn validate(draft: &LoanDraft) -> Result<String, IntakeError> {
    if draft.full_name.trim().is_empty() {
        return Err(IntakeError::MissingName);
    }
    if !professions().contains(&draft.profession.as_str()) {
        return Err(IntakeError::UnknownProfession(draft.profession.clone()));
    }
    if !loan_purposes().contains(&draft.purpose.as_str()) {
        return Err(IntakeError::UnknownPurpose(draft.purpose.clone()));
    }
    if draft.amount < MINIMUM_LOAN_AMOUNT {
        return Err(IntakeError::AmountBelowMinimum(draft.amount));
    }
    if !loan_tenures().contains(&draft.tenure_months) {
        return Err(IntakeError::InvalidTenure(draft.tenure_months));
    }
    Ok(score::normalize_pan(&draft.pan)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Disbursed,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Approved => "APPROVED",
            LoanStatus::Rejected => "REJECTED",
            LoanStatus::Disbursed => "DISBURSED",
        }
    }
}

/// An accepted application as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanApplicationRecord {
    pub id: ApplicationId,
    pub full_name: String,
    pub profession: String,
    pub purpose: String,
    pub amount: u32,
    pub tenure_months: u8,
    pub pan: String,
    /// Score the deterministic model assigns the applicant's PAN.
    pub score_preview: u16,
    pub status: LoanStatus,
    pub submitted_on: NaiveDate,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("loan-{id:06}"))
}

/// Storage seam for accepted applications.
pub trait LoanApplicationRepository: Send + Sync {
    fn insert(&self, record: LoanApplicationRecord) -> Result<(), LoanStoreError>;

    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplicationRecord>, LoanStoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoanStoreError {
    #[error("an application with id '{0}' already exists")]
    Duplicate(ApplicationId),
    #[error("loan application store unavailable: {0}")]
    Unavailable(String),
}

/// What became of a submitted draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Accepted(LoanApplicationRecord),
    /// The borrower must pass the credit gate before applying.
    RedirectToCreditCheck { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoanIntakeError {
    #[error(transparent)]
    Validation(#[from] IntakeError),
    #[error(transparent)]
    Store(#[from] LoanStoreError),
}

/// Takes in loan applications behind the credit eligibility gate.
pub struct LoanIntakeService<S, L> {
    gate: Arc<EligibilityGate<S>>,
    repository: Arc<L>,
}

impl<S, L> LoanIntakeService<S, L>
where
    S: CreditProfileStore,
    L: LoanApplicationRepository,
{
    pub fn new(gate: Arc<EligibilityGate<S>>, repository: Arc<L>) -> Self {
        Self { gate, repository }
    }

    /// Submit a draft application.
    ///
    /// The eligibility gate is consulted before any field validation, so
    /// an unchecked borrower is redirected rather than corrected.
    pub fn submit(
        &self,
        draft: LoanDraft,
        today: NaiveDate,
    ) -> Result<IntakeOutcome, LoanIntakeError> {
        if let Some(reason) = self.gate.check().block_reason() {
            return Ok(IntakeOutcome::RedirectToCreditCheck {
                reason: reason.to_string(),
            });
        }

        let pan = validate(&draft)?;
        let record = LoanApplicationRecord {
            id: next_application_id(),
            full_name: draft.full_name.trim().to_string(),
            profession: draft.profession,
            purpose: draft.purpose,
            amount: draft.amount,
            tenure_months: draft.tenure_months,
            score_preview: score::score_for(&pan),
            pan,
            status: LoanStatus::Pending,
            submitted_on: today,
        };
        self.repository.insert(record.clone())?;
        info!(
            application_id = %record.id,
            amount = record.amount,
            tenure_months = record.tenure_months,
            "loan application received"
        );
        Ok(IntakeOutcome::Accepted(record))
    }

    pub fn fetch(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<LoanApplicationRecord>, LoanStoreError> {
        self.repository.fetch(id)
    }
}
