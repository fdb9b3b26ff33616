use csv2api_core::{ApiFailure, EntityContract, IdentityApi, PrivilegeCheck};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, Instrument};

use crate::cli::PingArgs;
use crate::config::ConnectionSettings;
use crate::error::CliError;
use crate::metadata::{Metadata, Report};
use crate::output;

#[derive(Debug, Serialize)]
struct PingResults {
    identity: Value,
    can_create: bool,
    can_edit: bool,
}

pub async fn run(
    args: &PingArgs,
    contract: &'static EntityContract,
    pretty: bool,
) -> Result<(), CliError> {
    let settings = ConnectionSettings::from_args(&args.connection)?;
    let client = settings.client()?;
    let meta = Metadata::new("ping", contract.kind)?;

    let span = tracing::info_span!("run", run_id = %meta.run_id);
    async move {
        let identity = client.me().await.map_err(failed)?;
        info!(host = %client.base_url(), "authenticated");

        let privileges = client.privileges().await.map_err(failed)?;
        let (can_create, can_edit) = match contract.check_privileges(&privileges.body) {
            PrivilegeCheck::Listed { create, edit } => (create, edit),
            PrivilegeCheck::Unavailable => {
                return Err(CliError::Remote(String::from("Missing 'privileges'")));
            }
        };

        output::render(
            &Report {
                meta,
                results: PingResults {
                    identity: identity.body,
                    can_create,
                    can_edit,
                },
            },
            pretty,
        )?;

        let mut missing = Vec::new();
        if !can_create {
            missing.push(contract.create_privilege);
        }
        if !can_edit {
            missing.push(contract.edit_privilege);
        }
        if missing.is_empty() {
            info!("operator has create and edit privileges for {}", contract.kind);
            Ok(())
        } else {
            Err(CliError::Remote(format!(
                "operator lacks privilege(s) for {}: {}",
                contract.kind,
                missing.join(", ")
            )))
        }
    }
    .instrument(span)
    .await
}

/// Appends the body's `detail` when ClearPass explains the failure.
fn failed(failure: ApiFailure) -> CliError {
    let detail = failure
        .response()
        .and_then(|response| response.body.get("detail"))
        .and_then(Value::as_str);
    match detail {
        Some(detail) => CliError::Remote(format!("{} ({detail})", failure.message())),
        None => CliError::Remote(failure.message().to_owned()),
    }
}
