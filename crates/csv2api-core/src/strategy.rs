//! Reconciliation strategies and their verb plans.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::outcome::OutcomeKind;
use crate::ValidationError;

/// Remote write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Update,
    Replace,
}

impl Verb {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
        }
    }

    /// Status a successful call of this verb must return.
    pub const fn expected_status(self) -> u16 {
        match self {
            Self::Create => 201,
            Self::Update | Self::Replace => 200,
        }
    }

    /// Outcome recorded when the call returns [`Self::expected_status`].
    pub const fn success_outcome(self) -> OutcomeKind {
        match self {
            Self::Create => OutcomeKind::Created,
            Self::Update => OutcomeKind::Updated,
            Self::Replace => OutcomeKind::Replaced,
        }
    }

    pub const fn progressive(self) -> &'static str {
        match self {
            Self::Create => "Creating",
            Self::Update => "Updating",
            Self::Replace => "Replacing",
        }
    }

    pub const fn past(self) -> &'static str {
        match self {
            Self::Create => "Created",
            Self::Update => "Updated",
            Self::Replace => "Replaced",
        }
    }
}

impl Display for Verb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared primary/fallback verb policy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CreateOnly,
    CreateOrReplace,
    CreateOrUpdate,
    UpdateOnly,
    UpdateOrCreate,
    ReplaceOnly,
    ReplaceOrCreate,
}

impl Strategy {
    pub const ALL: [Self; 7] = [
        Self::CreateOnly,
        Self::CreateOrReplace,
        Self::CreateOrUpdate,
        Self::UpdateOnly,
        Self::UpdateOrCreate,
        Self::ReplaceOnly,
        Self::ReplaceOrCreate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateOnly => "create-only",
            Self::CreateOrReplace => "create-or-replace",
            Self::CreateOrUpdate => "create-or-update",
            Self::UpdateOnly => "update-only",
            Self::UpdateOrCreate => "update-or-create",
            Self::ReplaceOnly => "replace-only",
            Self::ReplaceOrCreate => "replace-or-create",
        }
    }

    pub const fn plan(self) -> StrategyPlan {
        match self {
            Self::CreateOnly => StrategyPlan::single(Verb::Create),
            Self::CreateOrReplace => StrategyPlan::with_fallback(Verb::Create, Verb::Replace),
            Self::CreateOrUpdate => StrategyPlan::with_fallback(Verb::Create, Verb::Update),
            Self::UpdateOnly => StrategyPlan::single(Verb::Update),
            Self::UpdateOrCreate => StrategyPlan::with_fallback(Verb::Update, Verb::Create),
            Self::ReplaceOnly => StrategyPlan::single(Verb::Replace),
            Self::ReplaceOrCreate => StrategyPlan::with_fallback(Verb::Replace, Verb::Create),
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or(ValidationError::InvalidStrategy {
                value: value.to_owned(),
            })
    }
}

/// Secondary verb and the outcome that triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fallback {
    pub verb: Verb,
    pub trigger: OutcomeKind,
}

/// Primary verb plus at most one fallback hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyPlan {
    pub primary: Verb,
    pub fallback: Option<Fallback>,
}

impl StrategyPlan {
    const fn single(primary: Verb) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    const fn with_fallback(primary: Verb, fallback: Verb) -> Self {
        // create falls back when the entity exists, update/replace when it is missing
        let trigger = match primary {
            Verb::Create => OutcomeKind::ExistsConflict,
            Verb::Update | Verb::Replace => OutcomeKind::NotFoundConflict,
        };
        Self {
            primary,
            fallback: Some(Fallback {
                verb: fallback,
                trigger,
            }),
        }
    }

    /// Fallback verb to dispatch after the primary call was classified as `kind`.
    pub fn fallback_for(&self, kind: OutcomeKind) -> Option<Verb> {
        self.fallback
            .filter(|fallback| fallback.trigger == kind)
            .map(|fallback| fallback.verb)
    }
}

/// Parses a strategy identifier and returns its plan.
pub fn resolve(identifier: &str) -> Result<StrategyPlan, ValidationError> {
    identifier.parse::<Strategy>().map(Strategy::plan)
}
