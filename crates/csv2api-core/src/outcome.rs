use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed classification of a record's terminal processing result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Created,
    Updated,
    Replaced,
    SkippedInvalid,
    ExistsConflict,
    NotFoundConflict,
    RemoteError,
    UnknownStatus,
    DryRun,
}

impl OutcomeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Replaced => "replaced",
            Self::SkippedInvalid => "skipped_invalid",
            Self::ExistsConflict => "exists_conflict",
            Self::NotFoundConflict => "not_found_conflict",
            Self::RemoteError => "remote_error",
            Self::UnknownStatus => "unknown_status",
            Self::DryRun => "dry_run",
        }
    }

    /// Created, updated or replaced: the only kinds that carry a latency.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Replaced)
    }
}

impl Display for OutcomeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub key: String,
    pub kind: OutcomeKind,
    pub remote_id: Option<String>,
    pub latency: Option<Duration>,
    pub detail: Option<String>,
}

impl RecordOutcome {
    pub fn new(key: impl Into<String>, kind: OutcomeKind) -> Self {
        Self {
            key: key.into(),
            kind,
            remote_id: None,
            latency: None,
            detail: None,
        }
    }

    pub fn with_remote_id(mut self, remote_id: Option<String>) -> Self {
        self.remote_id = remote_id;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
