//! Borrower-facing workflow modules.

pub mod credit;
pub mod loans;
pub mod repayment;
