//! # csv2api Core
//!
//! Reconciles a batch of tabular records against a ClearPass-style REST API.
//!
//! ## Overview
//!
//! For every input record the engine picks an API verb from the run's
//! [`Strategy`], dispatches it with bounded concurrency, interprets conflict
//! and not-found responses to decide on a single fallback verb, classifies the
//! result and folds it into [`RunStatistics`].
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | ClearPass REST client |
//! | [`api`] | Remote capability traits consumed by the engine |
//! | [`classify`] | Failure-to-outcome classification |
//! | [`contract`] | Entity contracts (device, guest) |
//! | [`engine`] | Bounded-concurrency reconciliation driver |
//! | [`error`] | Core error types |
//! | [`generate`] | Synthetic sample input |
//! | [`http_client`] | HTTP client abstraction |
//! | [`input`] | CSV input |
//! | [`normalize`] | Field exclusion, injection and boolean coercion |
//! | [`outcome`] | Per-record outcome taxonomy |
//! | [`record`] | Ordered field map for one input row |
//! | [`stats`] | Run statistics |
//! | [`strategy`] | Strategies and verb plans |
//! | [`validate`] | Header and record validation |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use csv2api_core::{
//!     ClearPassClient, Credentials, CsvSource, EntityKind, Normalizer, Reconciler,
//!     ReqwestHttpClient, RunOptions, Strategy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let batch = CsvSource::open("devices.csv")?.read_all()?;
//!     let client = ClearPassClient::new(
//!         "192.0.2.10",
//!         Credentials::resolve(Some("Bearer abc"), None, None)?,
//!         Arc::new(ReqwestHttpClient::new(false)?),
//!     )?;
//!
//!     let stats = Reconciler::new(
//!         Arc::new(client),
//!         EntityKind::Device.contract(),
//!         Strategy::UpdateOrCreate,
//!         Normalizer::new(),
//!         RunOptions::default(),
//!     )
//!     .reconcile(&batch.headers, batch.records)
//!     .await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&stats)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  CsvSource  │────▶│  Normalizer  │────▶│  Validator  │
//! └─────────────┘     └──────────────┘     └──────┬──────┘
//!                                                 │
//!                                                 ▼
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Statistics  │◀────│  Classifier  │◀────│ Reconciler  │
//! └─────────────┘     └──────────────┘     └──────┬──────┘
//!                                                 │
//!                                                 ▼
//!                                          ┌─────────────┐
//!                                          │  RecordApi  │
//!                                          │ (ClearPass) │
//!                                          └─────────────┘
//! ```

pub mod adapters;
pub mod api;
pub mod classify;
pub mod contract;
pub mod engine;
pub mod error;
pub mod generate;
pub mod http_client;
pub mod input;
pub mod normalize;
pub mod outcome;
pub mod record;
pub mod stats;
pub mod strategy;
pub mod validate;

// Adapter implementations
pub use adapters::{ClearPassClient, Credentials};

// Remote capabilities
pub use api::{ApiFailure, ApiFuture, ApiResponse, IdentityApi, RecordApi};

// Classification
pub use classify::{classify, Classification};

// Entity contracts
pub use contract::{EntityContract, EntityKind, PrivilegeCheck, DEVICE, GUEST};

// Engine
pub use engine::{Reconciler, RunOptions, DEFAULT_CALL_TIMEOUT};

// Error types
pub use error::{CoreError, ValidationError};

// Sample input
pub use generate::{Generator, MAX_GENERATED};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Input
pub use input::{CsvBatch, CsvSource, InputError};

// Records and normalization
pub use normalize::{coerce_bool, ExtraField, Normalizer, BOOLEAN_FIELDS};
pub use outcome::{OutcomeKind, RecordOutcome};
pub use record::Record;

// Statistics
pub use stats::{RunStatistics, StatisticsTracker};

// Strategies
pub use strategy::{resolve, Fallback, Strategy, StrategyPlan, Verb};

// Validation
pub use validate::{
    check_batch, validate_headers, validate_record, BatchCheck, MissingFields, MissingHeaders,
};
