//! Atomic reservation of document numbers.
//!
//! `(serie, numero)` must be unique and gap-free per issuer. Reservation is
//! a single atomic increment behind one lock, so two concurrent emissions
//! can never receive the same number. A database-backed implementation
//! should use a transactional increment (`UPDATE .. RETURNING` or
//! equivalent) with the same contract.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reserve-next semantics for per-issuer-series counters.
pub trait SequenceStore: Send + Sync {
    /// Atomically reserve and return the next document number for
    /// `(cnpj, serie)`. The first reservation returns 1 unless seeded.
    fn reserve(&self, cnpj: &str, serie: u16) -> u64;

    /// Last reserved number, if any.
    fn last(&self, cnpj: &str, serie: u16) -> Option<u64>;
}

/// In-memory counter map for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct InMemorySequences {
    counters: Mutex<HashMap<(String, u16), u64>>,
}

impl InMemorySequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the counter so the next reservation returns `last + 1`.
    pub fn seed(&self, cnpj: &str, serie: u16, last: u64) {
        let mut counters = locked(&self.counters);
        counters.insert((cnpj.to_string(), serie), last);
    }
}

impl SequenceStore for InMemorySequences {
    fn reserve(&self, cnpj: &str, serie: u16) -> u64 {
        let mut counters = locked(&self.counters);
        let counter = counters.entry((cnpj.to_string(), serie)).or_insert(0);
        *counter += 1;
        *counter
    }

    fn last(&self, cnpj: &str, serie: u16) -> Option<u64> {
        let counters = locked(&self.counters);
        counters.get(&(cnpj.to_string(), serie)).copied()
    }
}
