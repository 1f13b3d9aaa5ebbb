//! Storage-agnostic record shapes and traits.
//!
//! The pipeline never talks to a database directly; it goes through these
//! traits, which carry exactly the record shapes needed to reproduce the
//! regulatory invariants. The in-memory implementations back the test
//! suite and single-process embedding.

use std::ops::RangeInclusive;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::access_key::AccessKey;
use super::types::{EventKind, EventRecord, InvalidatedRange};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Operation kinds keying the transmission audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Autorizacao,
    ConsultaRecibo,
    ConsultaProtocolo,
    StatusServico,
    Evento,
    Inutilizacao,
}

/// One request/response pair, appended independent of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub operation: OperationKind,
    pub request: String,
    pub response: String,
    /// cStat of the response, when one was obtained.
    pub status_code: Option<u16>,
    pub at: DateTime<Utc>,
}

/// Append-only audit log of every SEFAZ round-trip.
pub trait TransmissionLog: Send + Sync {
    fn append(&self, entry: LogEntry);
}

/// In-memory audit log; `entries()` exposes the history to tests.
#[derive(Debug, Default)]
pub struct InMemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        locked(&self.entries).clone()
    }
}

impl TransmissionLog for InMemoryLog {
    fn append(&self, entry: LogEntry) {
        locked(&self.entries).push(entry);
    }
}

/// Accepted lifecycle events per document.
///
/// Only *accepted* events are recorded; sequence numbers are derived from
/// the recorded maximum, so a failed attempt re-uses its number and an
/// accepted sequence is never duplicated.
pub trait EventStore: Send + Sync {
    fn max_accepted_sequence(&self, key: &AccessKey, kind: EventKind) -> u32;
    fn record(&self, event: EventRecord);
    fn events_for(&self, key: &AccessKey) -> Vec<EventRecord>;
}

#[derive(Debug, Default)]
pub struct InMemoryEvents {
    events: Mutex<Vec<EventRecord>>,
}

impl InMemoryEvents {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEvents {
    fn max_accepted_sequence(&self, key: &AccessKey, kind: EventKind) -> u32 {
        locked(&self.events)
            .iter()
            .filter(|e| &e.access_key == key && e.kind == kind)
            .map(|e| e.sequence)
            .max()
            .unwrap_or(0)
    }

    fn record(&self, event: EventRecord) {
        locked(&self.events).push(event);
    }

    fn events_for(&self, key: &AccessKey) -> Vec<EventRecord> {
        locked(&self.events)
            .iter()
            .filter(|e| &e.access_key == key)
            .cloned()
            .collect()
    }
}

/// Issued document numbers, queried by the range invalidation checks.
///
/// Numbering never resets across years, so these queries carry no year:
/// an issued number stays burned for its issuer and series forever.
pub trait DocumentStore: Send + Sync {
    /// Any issued number inside the range for this issuer and series.
    fn issued_number_in(&self, cnpj: &str, serie: u16, range: RangeInclusive<u64>)
    -> Option<u64>;

    /// Highest issued number for this issuer and series.
    fn max_issued(&self, cnpj: &str, serie: u16) -> Option<u64>;
}

#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    issued: Mutex<Vec<(String, u16, u64)>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_issued(&self, cnpj: &str, serie: u16, numero: u64) {
        locked(&self.issued).push((cnpj.to_string(), serie, numero));
    }
}

impl DocumentStore for InMemoryDocuments {
    fn issued_number_in(
        &self,
        cnpj: &str,
        serie: u16,
        range: RangeInclusive<u64>,
    ) -> Option<u64> {
        locked(&self.issued)
            .iter()
            .filter(|(c, s, n)| c == cnpj && *s == serie && range.contains(n))
            .map(|(_, _, n)| *n)
            .min()
    }

    fn max_issued(&self, cnpj: &str, serie: u16) -> Option<u64> {
        locked(&self.issued)
            .iter()
            .filter(|(c, s, _)| c == cnpj && *s == serie)
            .map(|(_, _, n)| *n)
            .max()
    }
}

/// Previously homologated invalidated ranges, keyed by issuer, numbering
/// year and series.
pub trait InvalidationStore: Send + Sync {
    /// The first recorded range for this issuer/year/series overlapping
    /// `[start, end]`.
    fn overlapping(
        &self,
        cnpj: &str,
        year: u16,
        serie: u16,
        start: u64,
        end: u64,
    ) -> Option<(u64, u64)>;

    fn record(&self, range: InvalidatedRange);

    /// Highest invalidated number for this issuer and series, any year.
    fn max_invalidated(&self, cnpj: &str, serie: u16) -> Option<u64>;
}

#[derive(Debug, Default)]
pub struct InMemoryInvalidations {
    ranges: Mutex<Vec<InvalidatedRange>>,
}

impl InMemoryInvalidations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> Vec<InvalidatedRange> {
        locked(&self.ranges).clone()
    }
}

impl InvalidationStore for InMemoryInvalidations {
    fn overlapping(
        &self,
        cnpj: &str,
        year: u16,
        serie: u16,
        start: u64,
        end: u64,
    ) -> Option<(u64, u64)> {
        locked(&self.ranges)
            .iter()
            .filter(|r| {
                r.cnpj == cnpj
                    && r.year == year
                    && r.serie == serie
                    && r.start <= end
                    && start <= r.end
            })
            .map(|r| (r.start, r.end))
            .next()
    }

    fn record(&self, range: InvalidatedRange) {
        locked(&self.ranges).push(range);
    }

    fn max_invalidated(&self, cnpj: &str, serie: u16) -> Option<u64> {
        locked(&self.ranges)
            .iter()
            .filter(|r| r.cnpj == cnpj && r.serie == serie)
            .map(|r| r.end)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn key() -> AccessKey {
        AccessKey::parse("35240611222333000181550010000000421123456789").unwrap()
    }

    fn event(seq: u32, kind: EventKind) -> EventRecord {
        EventRecord {
            access_key: key(),
            kind,
            sequence: seq,
            justification: "justificativa de teste valida".into(),
            protocol: format!("13524000000{seq:04}"),
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn event_sequences_are_per_kind() {
        let store = InMemoryEvents::new();
        store.record(event(1, EventKind::CartaCorrecao));
        store.record(event(2, EventKind::CartaCorrecao));
        store.record(event(1, EventKind::Cancelamento));

        assert_eq!(
            store.max_accepted_sequence(&key(), EventKind::CartaCorrecao),
            2
        );
        assert_eq!(
            store.max_accepted_sequence(&key(), EventKind::Cancelamento),
            1
        );
        assert_eq!(store.events_for(&key()).len(), 3);
    }

    const CNPJ: &str = "11222333000181";

    #[test]
    fn issued_lookup_finds_lowest_conflict() {
        let docs = InMemoryDocuments::new();
        docs.record_issued(CNPJ, 1, 120);
        docs.record_issued(CNPJ, 1, 130);
        docs.record_issued(CNPJ, 2, 125);
        docs.record_issued("04252011000110", 1, 140);

        assert_eq!(docs.issued_number_in(CNPJ, 1, 100..=150), Some(120));
        assert_eq!(docs.issued_number_in(CNPJ, 1, 131..=150), None);
        assert_eq!(docs.issued_number_in("04252011000110", 1, 100..=150), Some(140));
        assert_eq!(docs.max_issued(CNPJ, 1), Some(130));
    }

    #[test]
    fn overlap_detection_is_inclusive() {
        let store = InMemoryInvalidations::new();
        store.record(InvalidatedRange {
            uf: crate::core::Uf::Sp,
            cnpj: CNPJ.into(),
            year: 2024,
            serie: 1,
            start: 220,
            end: 230,
            justification: "faixa pulada por erro de sistema".into(),
            protocol: "135240000000001".into(),
            homologated_at: Utc::now(),
        });

        assert_eq!(store.overlapping(CNPJ, 2024, 1, 200, 250), Some((220, 230)));
        assert_eq!(store.overlapping(CNPJ, 2024, 1, 230, 240), Some((220, 230)));
        assert_eq!(store.overlapping(CNPJ, 2024, 1, 231, 240), None);
        assert_eq!(store.overlapping(CNPJ, 2024, 2, 200, 250), None);
    }

    #[test]
    fn overlap_is_scoped_to_issuer_and_year() {
        let store = InMemoryInvalidations::new();
        store.record(InvalidatedRange {
            uf: crate::core::Uf::Sp,
            cnpj: CNPJ.into(),
            year: 2024,
            serie: 1,
            start: 100,
            end: 150,
            justification: "faixa pulada por erro de sistema".into(),
            protocol: "135240000000001".into(),
            homologated_at: Utc::now(),
        });

        assert_eq!(store.overlapping(CNPJ, 2025, 1, 100, 150), None);
        assert_eq!(store.overlapping("04252011000110", 2024, 1, 100, 150), None);
        // The suggestion query spans years for the issuer.
        assert_eq!(store.max_invalidated(CNPJ, 1), Some(150));
        assert_eq!(store.max_invalidated("04252011000110", 1), None);
    }
}
