use std::sync::Arc;

use csv2api_core::{CsvSource, EntityContract, Reconciler};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::cli::ImportArgs;
use crate::config::{self, ConnectionSettings};
use crate::error::CliError;
use crate::metadata::{Metadata, Report};
use crate::output;

pub async fn run(
    args: &ImportArgs,
    contract: &'static EntityContract,
    pretty: bool,
) -> Result<(), CliError> {
    let options = config::run_options(args)?;
    let normalizer = config::normalizer(&args.fields);
    let client = ConnectionSettings::from_args(&args.connection)?.client()?;
    let meta = Metadata::new("import", contract.kind)?.with_strategy(args.strategy.as_str());

    let span = tracing::info_span!("run", run_id = %meta.run_id);
    async move {
        // structural faults abort before any remote call
        let batch = CsvSource::open(&args.csv_file)?.read_all()?;
        info!(
            file = %args.csv_file.display(),
            records = batch.records.len(),
            "loaded input"
        );

        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, waiting for in-flight records");
                    cancel.cancel();
                }
            }
        });

        let reconciler = Reconciler::new(
            Arc::new(client),
            contract,
            args.strategy,
            normalizer,
            options,
        )
        .with_cancellation(cancel);
        let result = reconciler.reconcile(&batch.headers, batch.records).await;
        interrupt.abort();

        let stats = result?;
        output::render(&Report { meta, results: stats }, pretty)
    }
    .instrument(span)
    .await
}
