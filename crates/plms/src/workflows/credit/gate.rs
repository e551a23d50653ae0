use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use super::score::{self, CreditCheckError};
use super::store::{CreditCheckState, CreditProfileStore};

/// Scores at or below this threshold do not qualify for a loan application.
pub const MINIMUM_QUALIFYING_SCORE: u16 = 600;

/// Outcome of an eligibility check against the persisted credit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EligibilityDecision {
    pub has_checked: bool,
    pub score: Option<u16>,
    pub eligible: bool,
}

impl EligibilityDecision {
    pub fn from_state(state: CreditCheckState) -> Self {
        let eligible = state.has_checked
            && state
                .score
                .map(|score| score > MINIMUM_QUALIFYING_SCORE)
                .unwrap_or(false);

        Self {
            has_checked: state.has_checked,
            score: state.score,
            eligible,
        }
    }

    /// Message shown when the borrower is turned away, `None` when eligible.
    pub fn block_reason(&self) -> Option<&'static str> {
        if self.eligible {
            None
        } else if !self.has_checked {
            Some("Please check your credit score first!")
        } else {
            Some("Your credit score is too low to apply for a loan.")
        }
    }
}

/// Guards entry into the loan application flow.
///
/// Scoring an identifier and reading the persisted verdict both go through
/// the gate so that every caller applies the same threshold.
pub struct EligibilityGate<S> {
    store: Arc<S>,
}

impl<S> EligibilityGate<S>
where
    S: CreditProfileStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Evaluate the current persisted state.
    pub fn check(&self) -> EligibilityDecision {
        EligibilityDecision::from_state(self.store.load())
    }

    /// Validate and score an identifier, persisting the result.
    ///
    /// Nothing is written when validation fails, so a rejected identifier
    /// never flips the checked flag.
    pub fn record_credit_check(&self, raw: &str) -> Result<u16, CreditCheckError> {
        let score = score::check(raw)?;
        self.store.store(CreditCheckState {
            has_checked: true,
            score: Some(score),
        });
        Ok(score)
    }

    /// Forget the persisted check, e.g. when the borrower signs out.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Change feed of the underlying store.
    pub fn subscribe(&self) -> watch::Receiver<CreditCheckState> {
        self.store.subscribe()
    }
}
