//! Core library for the personal loan management service.
//!
//! The `workflows` tree hosts the borrower-facing flows: credit score
//! checks and the eligibility gate, loan application intake, and the EMI
//! repayment workflow with its simulated payment rail.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
