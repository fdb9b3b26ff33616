//! CLI argument definitions for csv2api.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `import` | Reconcile a CSV file against ClearPass |
//! | `testcsv` | Validate a CSV file offline |
//! | `ping` | Check connectivity, authentication and privileges |
//! | `generate` | Write a random sample CSV to stdout |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--importing` | `device` | Entity type (device, guest) |
//! | `--verbose` | `false` | Debug logging, full records and responses |
//! | `--pretty` | `false` | Pretty-print JSON reports |
//!
//! # Examples
//!
//! ```bash
//! csv2api ping --host 192.0.2.10 --client-id Client1 --client-secret s3cret
//! csv2api import --host 192.0.2.10 --token "$TOKEN" --strategy update-or-create devices.csv
//! csv2api --importing guest testcsv -x role_id=2 --exclude id,region guests.csv
//! csv2api generate 100 -x "notes=Import from ACME" > devices-100.csv
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use csv2api_core::{EntityKind, ExtraField, Strategy};

/// csv2api - bulk import CSV files into ClearPass through its REST API.
#[derive(Debug, Parser)]
#[command(
    name = "csv2api",
    author,
    version,
    about = "Bulk import CSV files into ClearPass through its REST API",
    long_about = "csv2api reads a CSV file and creates, updates or replaces the matching \
entities in ClearPass according to a strategy.\n\
\n\
The ClearPass API client needs an operator profile with sufficient privileges \
and the client credentials grant type. Either pass --client-id and --client-secret \
or a short-lived access token via --token.\n\
\n\
Use 'csv2api <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Entity type being imported. Plural aliases such as `devices` or
    /// `guestusers` are accepted.
    #[arg(long, global = true, default_value = "device")]
    pub importing: EntityKind,

    /// Log every record and full API responses.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Pretty-print JSON reports.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import a CSV of items into ClearPass.
    ///
    /// # Examples
    ///
    ///   csv2api import --host 192.0.2.10 --client-id Client1 --client-secret s3cret devices.csv
    ///   csv2api import --strategy update-or-create --sessions 4 devices-sync.csv
    ///   csv2api import --exclude id,region -x "notes=Import from ACME" devices.csv
    Import(ImportArgs),

    /// Confirm the CSV seems valid without contacting ClearPass.
    ///
    /// Prints the first record as it would be sent, then SUCCESS or the
    /// problems found followed by FAILURE.
    #[command(name = "testcsv")]
    TestCsv(TestCsvArgs),

    /// Test connectivity, authentication and privileges.
    Ping(PingArgs),

    /// Generate a random CSV for load testing.
    ///
    /// # Examples
    ///
    ///   csv2api generate 100 > devices-100.csv
    ///   csv2api generate 100 -x role_id=1 -x "notes=Import from ACME" > devices-acme.csv
    ///   csv2api --importing guest generate 100 > guests-100.csv
    Generate(GenerateArgs),
}

/// ClearPass connection settings.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// IP address or hostname of ClearPass; append `:<port>` to override the port.
    #[arg(long, env = "CSV2API_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Disable TLS certificate validation.
    #[arg(long, default_value_t = false)]
    pub insecure: bool,

    /// Pre-generated access token. A leading `Bearer ` is ignored.
    #[arg(long, env = "CSV2API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// API client id.
    #[arg(long, alias = "client_id", env = "CSV2API_CLIENT_ID", default_value = "Client1")]
    pub client_id: String,

    /// API client secret.
    #[arg(long, alias = "client_secret", env = "CSV2API_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

/// Field rewriting applied to every row.
#[derive(Debug, Clone, Default, Args)]
pub struct FieldArgs {
    /// Extra `key=value` field added to every row; overrides CSV columns.
    /// May be repeated.
    #[arg(short = 'x', long = "extra", value_name = "KEY=VALUE")]
    pub extra: Vec<ExtraField>,

    /// Comma-separated list of columns to drop.
    #[arg(long, value_delimiter = ',', value_name = "COLUMNS")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// CSV file to import.
    pub csv_file: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub fields: FieldArgs,

    /// Maximum simultaneous API sessions.
    #[arg(long, default_value_t = 1)]
    pub sessions: usize,

    /// How existing and missing entities are handled.
    ///
    /// create-only: create new items only, existing ones are reported.
    /// create-or-replace: create new items or replace existing ones.
    /// create-or-update: create new items or update existing ones.
    /// update-only: update existing items only.
    /// update-or-create: update existing items, create missing ones.
    /// replace-only: replace existing items only.
    /// replace-or-create: replace existing items, create missing ones.
    #[arg(long, default_value = "create-only", verbatim_doc_comment)]
    pub strategy: Strategy,

    /// Ask ClearPass to send RADIUS change of authorization for each item.
    #[arg(long, default_value_t = false)]
    pub change_of_authorization: bool,

    /// Validate and count records without sending any API call.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct TestCsvArgs {
    /// CSV file to check.
    pub csv_file: PathBuf,

    #[command(flatten)]
    pub fields: FieldArgs,
}

#[derive(Debug, Args)]
pub struct PingArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Number of rows to generate.
    pub count: u64,

    /// Extra `key=value` column added to every row. May be repeated.
    #[arg(short = 'x', long = "extra", value_name = "KEY=VALUE")]
    pub extra: Vec<ExtraField>,
}
