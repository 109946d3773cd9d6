//! papertrend-store: persisted paper corpus
//!
//! Paper model, the pure snapshot merge, the on-disk corpus with its
//! index, and build provenance.

pub mod dates;
pub mod hash;
pub mod json;
pub mod merge;
pub mod paper;
pub mod provenance;
pub mod snapshot;

pub use dates::{format_date, parse_date, to_date_string};
pub use merge::merge;
pub use paper::{Author, Links, Metrics, Paper, Provenance, Rationale, TopicTag, Version};
pub use provenance::{RunRecord, append_ledger_entry, write_provenance};
pub use snapshot::{Corpus, PaperIndexEntry, Snapshot, SnapshotStore};
