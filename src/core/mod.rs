//! Core domain model: document types, access key, tax computation,
//! number sequences, storage traits, and the signing contract.

pub mod access_key;
pub mod builder;
pub mod error;
pub mod regions;
pub mod sequence;
pub mod signer;
pub mod store;
pub mod text;
pub mod tributos;
pub mod types;

pub use access_key::{AccessKey, AccessKeyParts, check_digit, random_numeric_code};
pub use builder::{ItemDraft, NfeBuilder};
pub use error::{NfeError, ValidationIssue};
pub use regions::Uf;
pub use sequence::{InMemorySequences, SequenceStore};
pub use signer::Signer;
pub use store::{
    DocumentStore, EventStore, InMemoryDocuments, InMemoryEvents, InMemoryInvalidations,
    InMemoryLog, InvalidationStore, LogEntry, OperationKind, TransmissionLog,
};
pub use text::normalize_text;
pub use tributos::{TaxProfile, compute_item_tax, compute_totals, item_total, round_money};
pub use types::*;
