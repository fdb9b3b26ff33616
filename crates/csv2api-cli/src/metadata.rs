use std::fmt::{Display, Formatter};

use csv2api_core::EntityKind;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::CliError;

/// Run identifier (UUID v4) attached to the log span and the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Header of every JSON report.
///
/// Field order is fixed to keep deterministic JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub run_id: RunId,
    pub command: String,
    pub entity: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub started_at: String,
}

impl Metadata {
    pub fn new(command: &str, entity: EntityKind) -> Result<Self, CliError> {
        let started_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|error| CliError::Command(format!("failed to format timestamp: {error}")))?;

        Ok(Self {
            run_id: RunId::new_v4(),
            command: command.to_owned(),
            entity,
            strategy: None,
            started_at,
        })
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }
}

/// Report envelope: metadata plus the command's results.
#[derive(Debug, Serialize)]
pub struct Report<T> {
    pub meta: Metadata,
    pub results: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_uuid_v4() {
        let run_id = RunId::new_v4();
        assert_eq!(run_id.0.get_version_num(), 4);
    }

    #[test]
    fn started_at_is_rfc3339() {
        let metadata = Metadata::new("import", EntityKind::Device).expect("metadata");

        assert!(OffsetDateTime::parse(&metadata.started_at, &Rfc3339).is_ok());
    }

    #[test]
    fn strategy_is_omitted_when_unset() {
        let metadata = Metadata::new("ping", EntityKind::Guest).expect("metadata");
        let value = serde_json::to_value(&metadata).expect("serializes");

        assert!(value.get("strategy").is_none());
        assert_eq!(value["entity"], "guest");
    }
}
