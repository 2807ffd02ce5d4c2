//! Domain records shared by the collector and its clients
//!
//! All records serialize with camelCase field names; timestamps are epoch
//! milliseconds.

mod constituency;
mod report;
mod review;
mod system;

pub use constituency::{
    normalize_candidates, win_margin, Candidate, ConstituencyRecord, ConstituencyStatus,
};
pub use report::{ReportedConstituency, SourceReport, SourceTier, StatedConfidence};
pub use review::{
    new_id, AuditAction, AuditEntry, ConflictResolution, ConflictSeverity, ConflictSide,
    ConflictType, DataConflict, PendingStatus, PendingUpdate,
};
pub use system::{
    CollectionPhase, ElectionSummary, ElectionUpdate, NewsCategory, NewsItem, PartyStanding,
    ReferendumState, ReferendumStatus, SourceHealth, SystemError, SystemErrorKind,
    SystemErrorStatus, SystemStatus, UpdateKind,
};
