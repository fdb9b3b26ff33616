use csv2api_core::{CoreError, InputError, MissingHeaders, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Headers(#[from] MissingHeaders),

    #[error("{problems} problem(s) found in the CSV")]
    CheckFailed { problems: usize },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("remote check failed: {0}")]
    Remote(String),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Output(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for CliError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation(error) => Self::Validation(error),
            CoreError::Headers(error) => Self::Headers(error),
            CoreError::Input(error) => Self::Input(error),
            CoreError::Output(error) => Self::Output(error),
            CoreError::Serialization(error) => Self::Serialization(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Headers(_) => 3,
            Self::CheckFailed { .. } => 3,
            Self::Serialization(_) => 4,
            Self::Input(_) => 5,
            Self::Remote(_) => 6,
            Self::Output(_) => 10,
            Self::Io(_) => 10,
        }
    }
}
