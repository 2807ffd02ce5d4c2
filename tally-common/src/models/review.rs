//! Conflict, pending-review and audit records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::report::{ReportedConstituency, SourceTier};

/// Kind of disagreement between two sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    VoteMismatch,
    WinnerDisagreement,
    StatusRegression,
    CandidateNameMismatch,
}

/// Conflict severity, ordered `Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// How (or whether) a conflict was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    AutoConsensus,
    AdminOverride,
    Pending,
}

/// One side of a conflict, snapshotted at detection time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSide {
    pub name: String,
    pub tier: SourceTier,
    pub data: ReportedConstituency,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConflict {
    pub id: String,
    pub constituency_id: String,
    pub constituency_name: String,
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub source_a: ConflictSide,
    pub source_b: ConflictSide,
    pub resolved_by: ConflictResolution,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<i64>,
    pub created_at: i64,
}

impl DataConflict {
    pub fn is_resolved(&self) -> bool {
        self.resolved_by != ConflictResolution::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    Pending,
    Approved,
    Rejected,
    Merged,
}

impl PendingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PendingStatus::Pending => "pending",
            PendingStatus::Approved => "approved",
            PendingStatus::Rejected => "rejected",
            PendingStatus::Merged => "merged",
        }
    }
}

/// A report held back from canonical state awaiting review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpdate {
    pub id: String,
    pub constituency_id: String,
    pub constituency_name: String,
    pub source: String,
    pub source_tier: SourceTier,
    pub data: ReportedConstituency,
    pub timestamp: i64,
    pub trust_score: u8,
    pub status: PendingStatus,
    #[serde(default)]
    pub conflict_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    ConflictResolve,
    ManualOverride,
    AutoPublish,
}

/// Write-once record of one canonical write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub constituency_id: String,
    pub constituency_name: String,
    pub action: AuditAction,
    pub source: String,
    #[serde(default)]
    pub previous_data: Option<serde_json::Value>,
    pub new_data: serde_json::Value,
    pub timestamp: i64,
    pub trust_score: u8,
}

/// Fresh random identifier for stored documents
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
