use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::account::AccountNumber;
use super::error::Error;

/// One mutex per account number.
///
/// A transaction runs its whole check-then-act sequence while holding the
/// locks of every account it touches. Locks are always taken in sorted
/// order with duplicates removed, so a transfer A→B racing B→A cannot
/// deadlock and a self-transfer locks once.
///
/// Entries only live while some caller holds or waits on them, so unknown
/// or closed account numbers leave nothing behind.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<AccountNumber, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the locks of all `accounts`.
    pub fn with_locked<T>(
        &self,
        accounts: &[&AccountNumber],
        f: impl FnOnce() -> T,
    ) -> Result<T, Error> {
        let mut ordered: Vec<&AccountNumber> = accounts.to_vec();
        ordered.sort();
        ordered.dedup();

        let handles = self.handles(&ordered)?;
        let result = handles
            .iter()
            .map(|handle| handle.lock().map_err(|_| Error::LockPoisoned))
            .collect::<Result<Vec<_>, _>>()
            .map(|_guards| f());
        drop(handles);

        self.release(&ordered)?;
        result
    }

    fn handles(&self, ordered: &[&AccountNumber]) -> Result<Vec<Arc<Mutex<()>>>, Error> {
        let mut locks = self.locks.lock().map_err(|_| Error::LockPoisoned)?;
        Ok(ordered
            .iter()
            .map(|account| Arc::clone(locks.entry((*account).clone()).or_default()))
            .collect())
    }

    /// Drop entries nobody else holds. Handles are only cloned under the map
    /// lock, so a count of one means no other caller can be waiting.
    fn release(&self, ordered: &[&AccountNumber]) -> Result<(), Error> {
        let mut locks = self.locks.lock().map_err(|_| Error::LockPoisoned)?;
        for account in ordered {
            if locks
                .get(*account)
                .is_some_and(|handle| Arc::strong_count(handle) == 1)
            {
                locks.remove(*account);
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().map_or(0, |locks| locks.len())
    }
}
