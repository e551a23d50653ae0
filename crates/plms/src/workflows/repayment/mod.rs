//! EMI repayment workflow.
//!
//! [`session`] holds the dialog state machine that walks a borrower from
//! the installment list through method selection to a result screen.
//! [`flow`] drives it asynchronously against a [`gateway`] rail, and
//! [`service`] plus [`router`] form the server half that the simulated
//! rail settles against. [`schedule`] folds local payment attempts over
//! the server schedule into the rows both halves agree on.

pub mod domain;
pub mod flow;
pub mod gateway;
pub mod methods;
pub mod notify;
pub mod router;
pub mod schedule;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use domain::{
    format_card_number, ApplicationId, CardDetails, Installment, InstallmentStatus, PaidAttempt,
    PaymentAttempt, PaymentMode, RepaymentId, TransactionReceipt,
};
pub use flow::{FlowTiming, PaymentFlow};
pub use gateway::{FetchError, PaymentError, RepaymentGateway, VerificationError};
pub use methods::{
    available_methods, method_descriptor, provider_named, providers_for, MethodDescriptor,
    NotApplicableError, PaymentMethodKind, ProviderDescriptor,
};
pub use notify::{Notification, NotificationSink, Severity};
pub use router::{repayment_router, SimulatePayParams};
pub use schedule::{effective_status, EffectiveStatus, InstallmentRow};
pub use service::{InstallmentRepository, RepaymentError, RepaymentService, StoreError};
pub use session::{PaymentSession, PaymentStep, SessionError, COUNTDOWN_SECONDS};
