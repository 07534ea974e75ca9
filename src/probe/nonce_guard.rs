//! Duplicate-submission guard keyed on the account nonce
//!
//! The account nonce only advances once the previous probe transaction is
//! visible to the RPC endpoint. An unchanged nonce between ticks means the
//! previous submission is still pending, and resubmitting with the same
//! nonce would conflict with it. This is a best-effort guard, it does not
//! check block inclusion.
//!
//! Nothing is persisted: the first nonce observed after startup always
//! counts as changed, including nonce 0 for a fresh account.

use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct NonceGuard {
    previous_nonce: Mutex<Option<u64>>,
}

impl NonceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `observed` equals the last stored nonce, otherwise
    /// stores it and returns `true`. The first call always proceeds.
    ///
    /// Compare and store happen under one lock so that overlapping attempts
    /// observing the same nonce cannot both proceed.
    pub fn should_proceed(&self, observed: u64) -> bool {
        let mut previous = self.previous_nonce.lock();
        if *previous == Some(observed) {
            tracing::debug!(nonce = observed, "Nonce unchanged");
            return false;
        }
        tracing::debug!(nonce = observed, previous = ?*previous, "Nonce advanced");
        *previous = Some(observed);
        true
    }

    /// Last nonce that was allowed through, `None` before the first one
    pub fn previous_nonce(&self) -> Option<u64> {
        *self.previous_nonce.lock()
    }
}
