//! Loan application intake, gated on the credit check.

pub mod intake;
pub mod router;

pub use intake::{
    loan_purposes, loan_tenures, professions, validate, IntakeError, IntakeOutcome,
    LoanApplicationRecord, LoanApplicationRepository, LoanDraft, LoanIntakeError,
    LoanIntakeService, LoanStatus, LoanStoreError, MINIMUM_LOAN_AMOUNT,
};
pub use router::loans_router;
