//! # albumin-core
//!
//! Capture-date reconciliation for photographs in a content-addressed store.
//!
//! This crate determines one canonical capture date per content key from
//! evidence of varying trust, and keeps it in a key-addressed metadata record
//! maintained by an external service process.
//!
//! ## Components (leaves first)
//!
//! - `evidence` - ranked `(method, instant)` observations
//! - `session` - the metadata service process and its line channel
//! - `record` - per-key typed field access with diff-based writes
//! - `reconcile` - merge per key, compare, update, classify
//!
//! ## Architectural Constraints
//!
//! - Single-threaded: one request in flight per session, enforced by `&mut`
//! - Evidence extraction and content addressing are injected collaborators
//! - No partial passes: conflicts abort before anything is written

// =============================================================================
// MODULES
// =============================================================================

pub mod evidence;
pub mod memory;
pub mod primitives;
pub mod protocol;
pub mod reconcile;
pub mod record;
pub mod session;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{AlbuminError, ContentKey};

// =============================================================================
// RE-EXPORTS: Components
// =============================================================================

pub use evidence::{Evidence, EvidenceMap, Method, Moment, RawEvidence, gather_evidence};
pub use memory::MemoryService;
pub use protocol::{MetadataService, Request, Response};
pub use reconcile::{
    Classification, ContentAddresser, EvidenceSource, KeyMap, MergedMap, ReconcileReport,
    Reconciler, RecordedMap, Update, UpdateMap, apply_updates, classify, compute_updates,
    merge_by_key,
};
pub use record::{
    CalendarFields, FieldValue, FieldValues, MetadataClient, Record, calendar_fields,
    decode_timestamp, encode_timestamp,
};
pub use session::{ProtocolSession, SessionConfig, SessionState};

/// Re-exported so callers name zones with the same type the core uses.
pub use chrono_tz::Tz;
