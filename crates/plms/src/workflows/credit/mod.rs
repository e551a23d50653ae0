//! Credit score checks and the loan eligibility gate.
//!
//! Borrowers must run a (simulated) credit check before they can open a
//! loan application. The score is derived deterministically from the PAN
//! identifier, persisted through [`store::CreditProfileStore`], and
//! judged by [`gate::EligibilityGate`] wherever the application flow is
//! entered.

pub mod gate;
pub mod router;
pub mod score;
pub mod store;

pub use gate::{EligibilityDecision, EligibilityGate, MINIMUM_QUALIFYING_SCORE};
pub use router::{credit_router, CreditScoreRequest};
pub use score::{check, normalize_pan, score_for, CreditCheckError, SCORE_CEILING, SCORE_FLOOR};
pub use store::{
    CreditCheckState, CreditProfileStore, InMemoryProfileStore, HAS_CHECKED_KEY, SCORE_KEY,
};
