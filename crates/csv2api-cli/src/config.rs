//! Turns parsed arguments into typed core configuration.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use csv2api_core::{
    ClearPassClient, Credentials, Normalizer, ReqwestHttpClient, RunOptions, ValidationError,
};

use crate::cli::{ConnectionArgs, FieldArgs, ImportArgs};
use crate::error::CliError;

/// Validated ClearPass connection settings.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub credentials: Credentials,
    pub insecure: bool,
    pub timeout: Duration,
}

impl ConnectionSettings {
    pub fn from_args(args: &ConnectionArgs) -> Result<Self, ValidationError> {
        if args.host.trim().is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        let credentials = Credentials::resolve(
            args.token.as_deref(),
            Some(args.client_id.as_str()),
            args.client_secret.as_deref(),
        )?;

        Ok(Self {
            host: args.host.trim().to_owned(),
            credentials,
            insecure: args.insecure,
            timeout: Duration::from_secs(args.timeout_secs.max(1)),
        })
    }

    pub fn client(&self) -> Result<ClearPassClient, CliError> {
        let http_client = ReqwestHttpClient::new(self.insecure)
            .map_err(|error| CliError::Remote(error.to_string()))?;
        let client = ClearPassClient::new(&self.host, self.credentials.clone(), Arc::new(http_client))?
            .with_timeout(self.timeout);
        Ok(client)
    }
}

pub fn normalizer(fields: &FieldArgs) -> Normalizer {
    Normalizer::new()
        .with_exclude(fields.exclude.iter().map(|field| field.trim().to_owned()))
        .with_extra(fields.extra.iter().cloned())
}

pub fn run_options(args: &ImportArgs) -> Result<RunOptions, ValidationError> {
    let concurrency = NonZeroUsize::new(args.sessions).ok_or(ValidationError::ZeroConcurrency)?;
    Ok(RunOptions {
        concurrency,
        dry_run: args.dry_run,
        change_of_authorization: args.change_of_authorization,
        call_timeout: Duration::from_secs(args.connection.timeout_secs.max(1)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Command};

    fn import_args(extra: &[&str]) -> ImportArgs {
        let mut argv = vec!["csv2api", "import", "--client-secret", "s3cret"];
        argv.extend_from_slice(extra);
        argv.push("devices.csv");
        match Cli::try_parse_from(argv).expect("arguments parse").command {
            Command::Import(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn zero_sessions_is_rejected() {
        let args = import_args(&["--sessions", "0"]);
        assert_eq!(run_options(&args), Err(ValidationError::ZeroConcurrency));
    }

    #[test]
    fn token_takes_precedence_and_loses_bearer_prefix() {
        let args = import_args(&["--token", "Bearer abc123"]);
        let settings = ConnectionSettings::from_args(&args.connection).expect("valid settings");

        assert_eq!(settings.credentials, Credentials::Token(String::from("abc123")));
    }

    #[test]
    fn exclusions_are_trimmed() {
        let args = import_args(&["--exclude", "id, region"]);
        let normalizer = normalizer(&args.fields);

        assert_eq!(normalizer.excluded().collect::<Vec<_>>(), vec!["id", "region"]);
    }
}
