use thiserror::Error;

/// Configuration and contract errors raised before any record is processed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "invalid strategy '{value}', expected one of create-only, create-or-replace, \
         create-or-update, update-only, update-or-create, replace-only, replace-or-create"
    )]
    InvalidStrategy { value: String },

    #[error("invalid entity type '{value}', expected one of device, guest")]
    InvalidEntity { value: String },

    #[error("expected 'key=value' pair: '{value}'")]
    MalformedExtraField { value: String },
    #[error("key can only contain letters, numbers and underscore: '{key}'")]
    InvalidExtraKey { key: String },

    #[error("concurrency limit must be a positive integer")]
    ZeroConcurrency,

    #[error("count must be between 1 and {max}, got {value}")]
    InvalidCount { value: u64, max: u64 },

    #[error("host cannot be empty")]
    EmptyHost,
    #[error("either a bearer token or a client id and secret are required")]
    MissingCredentials,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Headers(#[from] crate::validate::MissingHeaders),

    #[error(transparent)]
    Input(#[from] crate::input::InputError),

    #[error("failed to write output: {0}")]
    Output(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
