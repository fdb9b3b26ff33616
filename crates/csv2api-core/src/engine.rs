//! Bounded-concurrency reconciliation driver.
//!
//! Each admitted record runs through normalization and validation, then one
//! unit of work: the strategy's primary verb, classification on failure and
//! at most one fallback verb. A semaphore permit is held for the whole unit,
//! so no more than `concurrency` records ever have a call outstanding.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::api::{ApiFailure, RecordApi};
use crate::classify::{classify, Classification};
use crate::contract::EntityContract;
use crate::normalize::Normalizer;
use crate::outcome::{OutcomeKind, RecordOutcome};
use crate::record::Record;
use crate::stats::{RunStatistics, StatisticsTracker};
use crate::strategy::{Strategy, StrategyPlan, Verb};
use crate::validate::{validate_headers, validate_record, MissingFields, MissingHeaders};

/// Per-call timeout applied when none is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Run-level switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub concurrency: NonZeroUsize,
    /// Account for records without issuing remote calls.
    pub dry_run: bool,
    /// Forwarded to every remote call.
    pub change_of_authorization: bool,
    /// Calls exceeding this are recorded as remote errors.
    pub call_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::MIN,
            dry_run: false,
            change_of_authorization: false,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Drives one reconciliation run.
pub struct Reconciler {
    api: Arc<dyn RecordApi>,
    contract: &'static EntityContract,
    strategy: Strategy,
    normalizer: Normalizer,
    options: RunOptions,
    cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(
        api: Arc<dyn RecordApi>,
        contract: &'static EntityContract,
        strategy: Strategy,
        normalizer: Normalizer,
        options: RunOptions,
    ) -> Self {
        Self {
            api,
            contract,
            strategy,
            normalizer,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Once `cancel` fires no further records are admitted; records already
    /// dispatched run to completion or time out.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Checks the header row, then processes every record.
    ///
    /// Headers are checked as they look after normalization: an extra field
    /// can supply a missing column and an excluded column counts as absent.
    /// A header mismatch aborts before any record is touched.
    pub async fn reconcile<S, I>(
        &self,
        headers: &[S],
        records: I,
    ) -> Result<RunStatistics, MissingHeaders>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = Record>,
    {
        let effective = self.normalizer.effective_headers(headers);
        if let Err(error) = validate_headers(&effective, self.contract) {
            error!(%error, "header validation failed");
            return Err(error);
        }
        Ok(self.run(records).await)
    }

    /// Processes records whose headers were already checked.
    pub async fn run<I>(&self, records: I) -> RunStatistics
    where
        I: IntoIterator<Item = Record>,
    {
        let span = tracing::info_span!(
            "reconcile",
            entity = %self.contract.kind,
            strategy = %self.strategy,
            concurrency = self.options.concurrency.get(),
            dry_run = self.options.dry_run,
        );
        self.run_records(records).instrument(span).await
    }

    async fn run_records<I>(&self, records: I) -> RunStatistics
    where
        I: IntoIterator<Item = Record>,
    {
        let tracker = Arc::new(StatisticsTracker::new());
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.get()));
        let dispatch = Arc::new(Dispatch {
            api: Arc::clone(&self.api),
            contract: self.contract,
            plan: self.strategy.plan(),
            change_of_authorization: self.options.change_of_authorization,
            call_timeout: self.options.call_timeout,
        });
        let mut tasks = JoinSet::new();

        info!("starting reconciliation");

        for record in records {
            let permit = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    warn!("cancellation requested, no further records admitted");
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            tracker.record_attempt();
            let record = self.normalizer.normalize(record);

            if let Err(skip) = validate_record(&record, self.contract) {
                warn!(key = %skip.key, "{skip}");
                tracker.record_outcome(
                    &RecordOutcome::new(skip.key.clone(), OutcomeKind::SkippedInvalid)
                        .with_detail(skip.to_string()),
                );
                continue;
            }

            let Some(key) = record.key(self.contract).map(str::to_owned) else {
                let skip = MissingFields {
                    key: String::from("?"),
                    missing: vec![self.contract.key_field.to_owned()],
                };
                warn!("{skip}");
                tracker.record_outcome(
                    &RecordOutcome::new(skip.key.clone(), OutcomeKind::SkippedInvalid)
                        .with_detail(skip.to_string()),
                );
                continue;
            };

            info!(key = %key, "{key} - {}...", dispatch.plan.primary.progressive());
            debug!(key = %key, record = %record, "record payload");

            if self.options.dry_run {
                info!(key = %key, "{key} - Dry run, no call issued");
                tracker.record_outcome(&RecordOutcome::new(key, OutcomeKind::DryRun));
                continue;
            }

            let dispatch = Arc::clone(&dispatch);
            let tracker = Arc::clone(&tracker);
            tasks.spawn(
                async move {
                    let _permit = permit;
                    let outcome = dispatch.process(key, record).await;
                    log_outcome(&outcome);
                    tracker.record_outcome(&outcome);
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(join_error) = joined {
                error!(error = %join_error, "record task failed");
                tracker.record_outcome(
                    &RecordOutcome::new("?", OutcomeKind::RemoteError)
                        .with_detail(join_error.to_string()),
                );
            }
        }

        let stats = tracker.snapshot();
        info!(
            attempts = stats.attempts,
            created = stats.created,
            updated = stats.updated,
            replaced = stats.replaced,
            skipped = stats.skipped,
            errors = stats.errors,
            duration_ms = stats.duration_ms,
            "reconciliation finished"
        );
        stats
    }
}

/// Shared, immutable state for spawned record tasks.
struct Dispatch {
    api: Arc<dyn RecordApi>,
    contract: &'static EntityContract,
    plan: StrategyPlan,
    change_of_authorization: bool,
    call_timeout: Duration,
}

impl Dispatch {
    async fn process(&self, key: String, record: Record) -> RecordOutcome {
        let classification = match self.attempt(self.plan.primary, &key, &record).await {
            Ok(outcome) => return outcome,
            Err(classification) => classification,
        };

        let Some(verb) = self.plan.fallback_for(classification.kind) else {
            return into_outcome(key, classification);
        };

        info!(key = %key, "{key} - {}, {}...", classification.detail, verb.progressive());
        match self.attempt(verb, &key, &record).await {
            Ok(outcome) => outcome,
            Err(classification) => into_outcome(key, classification),
        }
    }

    /// One remote call with its own latency timer.
    async fn attempt(
        &self,
        verb: Verb,
        key: &str,
        record: &Record,
    ) -> Result<RecordOutcome, Classification> {
        let coa = self.change_of_authorization;
        let call = match verb {
            Verb::Create => self.api.create(self.contract, record, coa),
            Verb::Update => self.api.update(self.contract, key, record, coa),
            Verb::Replace => self.api.replace(self.contract, key, record, coa),
        };

        let start = Instant::now();
        let result = tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or_else(|_| Err(ApiFailure::timeout(self.call_timeout)));

        match result {
            Ok(response) if response.status == verb.expected_status() => {
                Ok(RecordOutcome::new(key, verb.success_outcome())
                    .with_remote_id(response.remote_id())
                    .with_latency(start.elapsed()))
            }
            Ok(response) => Ok(RecordOutcome::new(key, OutcomeKind::UnknownStatus).with_detail(
                format!("Unknown status: {} after {verb}", response.status),
            )),
            Err(failure) => Err(classify(&failure)),
        }
    }
}

fn into_outcome(key: String, classification: Classification) -> RecordOutcome {
    RecordOutcome::new(key, classification.kind).with_detail(classification.detail)
}

fn log_outcome(outcome: &RecordOutcome) {
    let key = outcome.key.as_str();
    let detail = outcome.detail.as_deref().unwrap_or_default();
    let latency_ms = outcome
        .latency
        .map(|latency| u64::try_from(latency.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default();

    match outcome.kind {
        OutcomeKind::Created | OutcomeKind::Updated | OutcomeKind::Replaced => {
            let remote_id = outcome.remote_id.as_deref().unwrap_or("?");
            info!(
                key,
                outcome = %outcome.kind,
                remote_id,
                latency_ms,
                "{key} - {}: {remote_id} in {latency_ms}ms",
                past_tense(outcome.kind),
            );
        }
        OutcomeKind::ExistsConflict | OutcomeKind::NotFoundConflict => {
            warn!(key, outcome = %outcome.kind, "{key} - ERROR: {detail}");
        }
        _ => {
            error!(key, outcome = %outcome.kind, "{key} - ERROR: {detail}");
        }
    }
}

fn past_tense(kind: OutcomeKind) -> &'static str {
    match kind {
        OutcomeKind::Created => Verb::Create.past(),
        OutcomeKind::Updated => Verb::Update.past(),
        _ => Verb::Replace.past(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiFuture, ApiResponse};
    use crate::contract::DEVICE;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    /// Every verb answers with a fixed status; 2xx statuses succeed.
    struct FixedApi {
        create: u16,
        update: u16,
        creates: AtomicUsize,
        updates: AtomicUsize,
    }

    impl FixedApi {
        fn new(create: u16, update: u16) -> Self {
            Self {
                create,
                update,
                creates: AtomicUsize::new(0),
                updates: AtomicUsize::new(0),
            }
        }
    }

    fn answer(status: u16) -> ApiFuture<'static> {
        let body = match status {
            404 => json!({ "title": "Not Found" }),
            422 => json!({ "result": { "user_exists": true } }),
            _ => json!({ "id": 9 }),
        };
        let response = ApiResponse::new(status, body);
        Box::pin(async move {
            if response.is_success() {
                Ok(response)
            } else {
                Err(ApiFailure::status(response))
            }
        })
    }

    impl RecordApi for FixedApi {
        fn create<'a>(
            &'a self,
            _contract: &'a EntityContract,
            _record: &'a Record,
            _coa: bool,
        ) -> ApiFuture<'a> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            answer(self.create)
        }

        fn update<'a>(
            &'a self,
            _contract: &'a EntityContract,
            _key: &'a str,
            _record: &'a Record,
            _coa: bool,
        ) -> ApiFuture<'a> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            answer(self.update)
        }

        fn replace<'a>(
            &'a self,
            _contract: &'a EntityContract,
            _key: &'a str,
            _record: &'a Record,
            _coa: bool,
        ) -> ApiFuture<'a> {
            answer(200)
        }
    }

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl LogCapture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("log lock")).into_owned()
        }
    }

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn device(mac: &str) -> Record {
        Record::from_row(["mac", "role_id"], [mac, "3"])
    }

    fn reconciler(api: &Arc<FixedApi>, strategy: Strategy) -> Reconciler {
        Reconciler::new(
            api.clone(),
            &DEVICE,
            strategy,
            Normalizer::new(),
            RunOptions::default(),
        )
    }

    #[tokio::test]
    async fn exists_conflict_falls_back_to_update_once() {
        let api = Arc::new(FixedApi::new(422, 200));

        let stats = reconciler(&api, Strategy::CreateOrUpdate)
            .run(vec![device("AA-01")])
            .await;

        assert_eq!(api.creates.load(Ordering::SeqCst), 1);
        assert_eq!(api.updates.load(Ordering::SeqCst), 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.exists, 0);
        assert!(stats.is_consistent());
    }

    #[tokio::test]
    async fn failed_fallback_is_not_retried() {
        let api = Arc::new(FixedApi::new(422, 404));

        let stats = reconciler(&api, Strategy::CreateOrUpdate)
            .run(vec![device("AA-01")])
            .await;

        assert_eq!(api.creates.load(Ordering::SeqCst), 1);
        assert_eq!(api.updates.load(Ordering::SeqCst), 1);
        assert_eq!(stats.not_exists, 1);
        assert!(stats.is_consistent());
    }

    #[tokio::test]
    async fn conflict_without_fallback_is_counted() {
        let api = Arc::new(FixedApi::new(422, 200));

        let stats = reconciler(&api, Strategy::CreateOnly)
            .run(vec![device("AA-01"), device("AA-02")])
            .await;

        assert_eq!(stats.exists, 2);
        assert_eq!(api.updates.load(Ordering::SeqCst), 0);
        assert_eq!(stats.min_latency_ms, -1);
    }

    #[tokio::test]
    async fn unexpected_success_status_is_unknown() {
        let api = Arc::new(FixedApi::new(200, 200));

        let stats = reconciler(&api, Strategy::CreateOrUpdate)
            .run(vec![device("AA-01")])
            .await;

        assert_eq!(stats.unknowns, 1);
        assert_eq!(stats.created, 0);
        assert_eq!(api.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_run_admits_nothing() {
        let api = Arc::new(FixedApi::new(422, 200));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = reconciler(&api, Strategy::CreateOrUpdate)
            .with_cancellation(cancel)
            .run(vec![device("AA-01"), device("AA-02")])
            .await;

        assert_eq!(stats.attempts, 0);
        assert_eq!(api.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn record_without_key_is_skipped() {
        let api = Arc::new(FixedApi::new(201, 200));

        let stats = reconciler(&api, Strategy::CreateOnly)
            .run(vec![Record::from_row(["role_id"], ["3"])])
            .await;

        assert_eq!(stats.skipped, 1);
        assert_eq!(api.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dry_run_still_logs_progress_line() {
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        let api = Arc::new(FixedApi::new(201, 200));
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let stats = Reconciler::new(
            api.clone(),
            &DEVICE,
            Strategy::CreateOnly,
            Normalizer::new(),
            options,
        )
        .run(vec![device("AA-01")])
        .await;

        let logs = capture.contents();
        assert_eq!(stats.dry_run, 1);
        assert!(logs.contains("AA-01 - Creating..."), "logs were: {logs}");
        assert!(logs.contains("AA-01 - Dry run, no call issued"), "logs were: {logs}");
        assert_eq!(api.creates.load(Ordering::SeqCst), 0);
    }
}
