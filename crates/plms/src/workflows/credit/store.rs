use std::collections::BTreeMap;
use std::sync::Mutex;

use tokio::sync::watch;

/// Storage key recording that a credit check has been completed.
pub const HAS_CHECKED_KEY: &str = "hasCheckedCreditScore";
/// Storage key holding the most recent score.
pub const SCORE_KEY: &str = "creditScore";

/// Snapshot of the persisted credit-check result.
///
/// `score` is only meaningful while `has_checked` is true; readers must
/// treat a bare score without the flag as not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreditCheckState {
    pub has_checked: bool,
    pub score: Option<u16>,
}

/// Persistence seam for the credit-check result.
///
/// `subscribe` exposes a change feed so interested components (navigation
/// gates, dashboards) can react when the state is written or cleared from
/// elsewhere, mirroring cross-tab storage notifications.
pub trait CreditProfileStore: Send + Sync {
    fn load(&self) -> CreditCheckState;
    fn store(&self, state: CreditCheckState);
    fn clear(&self);
    fn subscribe(&self) -> watch::Receiver<CreditCheckState>;
}

/// Key-value backed store with a broadcast channel for updates.
pub struct InMemoryProfileStore {
    values: Mutex<BTreeMap<String, String>>,
    updates: watch::Sender<CreditCheckState>,
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        let (updates, _) = watch::channel(CreditCheckState::default());
        Self {
            values: Mutex::new(BTreeMap::new()),
            updates,
        }
    }
}

impl CreditProfileStore for InMemoryProfileStore {
    fn load(&self) -> CreditCheckState {
        let guard = self.values.lock().expect("profile store mutex poisoned");
        let has_checked = guard.get(HAS_CHECKED_KEY).map(String::as_str) == Some("true");
        let score = guard.get(SCORE_KEY).and_then(|raw| raw.parse::<u16>().ok());
        CreditCheckState { has_checked, score }
    }

    fn store(&self, state: CreditCheckState) {
        {
            let mut guard = self.values.lock().expect("profile store mutex poisoned");
            if state.has_checked {
                guard.insert(HAS_CHECKED_KEY.to_string(), "true".to_string());
            } else {
                guard.remove(HAS_CHECKED_KEY);
            }
            match state.score {
                Some(score) => guard.insert(SCORE_KEY.to_string(), score.to_string()),
                None => guard.remove(SCORE_KEY),
            };
        }
        self.updates.send_replace(state);
    }

    fn clear(&self) {
        {
            let mut guard = self.values.lock().expect("profile store mutex poisoned");
            guard.remove(HAS_CHECKED_KEY);
            guard.remove(SCORE_KEY);
        }
        self.updates.send_replace(CreditCheckState::default());
    }

    fn subscribe(&self) -> watch::Receiver<CreditCheckState> {
        self.updates.subscribe()
    }
}
