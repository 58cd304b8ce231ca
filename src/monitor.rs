use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

use crate::config::SchedulerConfig;
use crate::extraction::Page;
use crate::models::{ExtractionResult, NewTarget, PriceObservation, ScheduleContinuation, TrackedTarget};
use crate::plugins::adapters::{select_adapter, AdapterKind};
use crate::plugins::{NotificationDispatcher, NotificationEvent};
use crate::scheduler::{DelayQueue, JobInfo, JobRegistry, Jitter, SchedulerStats};
use crate::scraper::PageFetcher;
use crate::storage::{PriceLedger, TargetStore};
use crate::threshold::{derive_initial_threshold, should_notify};
use crate::utils::error::{AppError, PersistenceError, Result};
use crate::utils::telemetry::metric;

const DEFAULT_CONCURRENCY: usize = 3;

/// One classified failure inside a cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleFailure {
    pub kind: String,
    pub message: String,
}

/// What a single cycle did. Never carries an error out of the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub target_id: String,
    pub adapter: Option<AdapterKind>,
    pub extraction: ExtractionResult,
    /// Threshold in force after the cycle, if known.
    pub threshold: Option<f64>,
    pub observation: Option<PriceObservation>,
    pub notified: bool,
    pub target_missing: bool,
    pub failures: Vec<CycleFailure>,
    pub total_time_ms: u64,
}

impl CycleReport {
    fn new(continuation: &ScheduleContinuation) -> Self {
        Self {
            target_id: continuation.target_id.clone(),
            adapter: None,
            extraction: ExtractionResult::not_found(),
            threshold: continuation.target_price,
            observation: None,
            notified: false,
            target_missing: false,
            failures: Vec::new(),
            total_time_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn first_error(&self) -> Option<String> {
        self.failures.first().map(|f| format!("{}: {}", f.kind, f.message))
    }

    /// Logs and counts the failure once, then keeps it on the report.
    fn fail(&mut self, url: &str, kind: &str, message: String) {
        tracing::error!(target_id = %self.target_id, url, kind, "Cycle step failed: {}", message);
        metrics::counter!(metric::CYCLE_ERRORS, "kind" => kind.to_string()).increment(1);
        self.failures.push(CycleFailure {
            kind: kind.to_string(),
            message,
        });
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckSummary {
    pub checked: usize,
    pub notified: usize,
    pub failed: usize,
}

/// Runs monitoring cycles and reschedules each target after every cycle.
pub struct Monitor {
    store: Arc<dyn TargetStore>,
    ledger: Arc<dyn PriceLedger>,
    fetcher: Arc<dyn PageFetcher>,
    dispatcher: NotificationDispatcher,
    queue: Arc<dyn DelayQueue>,
    jitter: Jitter,
    jobs: JobRegistry,
    max_concurrent_checks: usize,
}

impl Monitor {
    pub fn new(
        store: Arc<dyn TargetStore>,
        ledger: Arc<dyn PriceLedger>,
        fetcher: Arc<dyn PageFetcher>,
        dispatcher: NotificationDispatcher,
        queue: Arc<dyn DelayQueue>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            fetcher,
            dispatcher,
            queue,
            jitter: Jitter::new(config),
            jobs: JobRegistry::new(),
            max_concurrent_checks: DEFAULT_CONCURRENCY,
        }
    }

    /// Bounds the parallelism of [`Monitor::check_all`].
    pub fn with_concurrency(mut self, max_concurrent_checks: usize) -> Self {
        self.max_concurrent_checks = max_concurrent_checks.max(1);
        self
    }

    /// Enqueues the first cycle for a target, to run immediately.
    pub async fn start_monitoring(&self, target_id: &str, url: &str, target_price: Option<f64>) -> Result<()> {
        let continuation = ScheduleContinuation::immediate(target_id, url, target_price);
        self.jobs.register(&continuation).await;
        self.queue.enqueue(continuation).await?;
        tracing::info!(target_id, url, "Monitoring started");
        Ok(())
    }

    /// Inserts a target and starts monitoring it.
    pub async fn track(&self, owner_id: &str, url: &str, target_price: Option<f64>) -> Result<TrackedTarget> {
        let parsed = Url::parse(url).map_err(|e| AppError::Validation(format!("Invalid URL '{}': {}", url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AppError::Validation(format!("Unsupported URL scheme: {}", parsed.scheme())));
        }
        if let Some(price) = target_price {
            if !price.is_finite() || price < 0.0 {
                return Err(AppError::Validation(format!("Invalid target price: {}", price)));
            }
        }

        let target = self
            .store
            .insert_target(NewTarget {
                owner_id: owner_id.to_string(),
                url: url.to_string(),
                target_price,
            })
            .await?;

        self.start_monitoring(&target.id, &target.url, target.target_price).await?;
        Ok(target)
    }

    /// Deletes a target. Continuations already queued for it still fire.
    pub async fn untrack(&self, target_id: &str) -> Result<bool> {
        let removed = self.store.delete_target(target_id).await?;
        if removed {
            self.jobs.remove(target_id).await;
            tracing::info!(target_id, "Target deleted");
        }
        Ok(removed)
    }

    /// Gives every persisted target a first continuation, spread over the jitter window.
    pub async fn resume_all(&self) -> Result<usize> {
        let targets = self.store.list_targets().await?;
        for target in &targets {
            let continuation = ScheduleContinuation::immediate(target.id.as_str(), target.url.as_str(), target.target_price)
                .after(self.jitter.initial_spread(), target.target_price);
            self.jobs.register(&continuation).await;
            self.queue.enqueue(continuation).await?;
        }
        tracing::info!(count = targets.len(), "Resumed monitoring");
        Ok(targets.len())
    }

    /// Handles one delivered continuation: runs the cycle, then always reschedules.
    pub async fn handle(&self, continuation: ScheduleContinuation) {
        self.jobs.begin(&continuation).await;
        let report = self.guarded_cycle(&continuation).await;
        let mut error = report.first_error();

        let next = continuation.after(self.jitter.next_delay(), report.threshold.or(continuation.target_price));
        let enqueued = match self.queue.enqueue(next.clone()).await {
            Ok(()) => {
                metrics::counter!(metric::CONTINUATIONS).increment(1);
                tracing::debug!(target_id = %next.target_id, delay_secs = next.delay_seconds, "Next cycle enqueued");
                true
            }
            Err(e) => {
                tracing::error!(target_id = %next.target_id, kind = "scheduling", "Failed to enqueue next cycle: {}", e);
                metrics::counter!(metric::CYCLE_ERRORS, "kind" => "scheduling").increment(1);
                error = Some(format!("scheduling: {}", e));
                false
            }
        };

        self.jobs.finish(&continuation.target_id, error).await;
        if enqueued {
            self.jobs.rescheduled(&next).await;
        }
    }

    /// Runs one cycle, converting a panic anywhere inside it into a `panic` failure.
    async fn guarded_cycle(&self, continuation: &ScheduleContinuation) -> CycleReport {
        match AssertUnwindSafe(self.run_cycle(continuation)).catch_unwind().await {
            Ok(report) => report,
            Err(panic) => {
                let mut report = CycleReport::new(continuation);
                report.fail(&continuation.url, "panic", panic_message(panic.as_ref()));
                report
            }
        }
    }

    /// Runs one cycle: fetch, extract, record, evaluate, notify.
    pub async fn run_cycle(&self, continuation: &ScheduleContinuation) -> CycleReport {
        let start_time = Instant::now();
        let mut report = CycleReport::new(continuation);
        self.execute(continuation, &mut report).await;
        report.total_time_ms = start_time.elapsed().as_millis() as u64;

        tracing::info!(
            target_id = %report.target_id,
            adapter = report.adapter.map(|a| a.name()).unwrap_or("none"),
            price = %report.extraction.price_text,
            notified = report.notified,
            failures = report.failures.len(),
            elapsed_ms = report.total_time_ms,
            "Cycle finished"
        );
        report
    }

    async fn execute(&self, continuation: &ScheduleContinuation, report: &mut CycleReport) {
        let url = continuation.url.as_str();

        let rendered = match self.fetcher.fetch(url).await {
            Ok(rendered) => rendered,
            Err(e) => {
                report.fail(url, e.kind(), e.to_string());
                return;
            }
        };

        let adapter = select_adapter(url);
        report.adapter = Some(adapter);
        report.extraction = {
            let page = Page::parse(&rendered.final_url, &rendered.html);
            adapter.extract(&page)
        };
        metrics::counter!(metric::CYCLES, "adapter" => adapter.name()).increment(1);

        let Some(price) = report.extraction.normalized_price else {
            report.fail(url, "extraction", format!("No usable price from {} adapter", adapter));
            return;
        };

        let target = match self.store.lookup_target(&continuation.target_id).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                tracing::warn!(target_id = %continuation.target_id, url, "Target no longer exists, skipping cycle");
                metrics::counter!(metric::MISSING_TARGETS).increment(1);
                report.target_missing = true;
                return;
            }
            Err(e) => {
                report.fail(url, "persistence", e.to_string());
                return;
            }
        };

        let threshold = match target.target_price.or(continuation.target_price) {
            Some(threshold) => threshold,
            None => match self.derive_threshold(&target.id, price).await {
                Ok(threshold) => threshold,
                Err(e) => {
                    report.fail(url, "persistence", e.to_string());
                    return;
                }
            },
        };
        report.threshold = Some(threshold);

        match self.ledger.append(&target.id, price).await {
            Ok(observation) => {
                metrics::counter!(metric::OBSERVATIONS).increment(1);
                report.observation = Some(observation);
            }
            Err(e) => {
                report.fail(url, "persistence", e.to_string());
                return;
            }
        }

        if !should_notify(price, threshold) {
            tracing::debug!(target_id = %target.id, price, threshold, "Price above threshold");
            return;
        }

        let event = NotificationEvent {
            target_id: target.id.clone(),
            title: report.extraction.title.clone(),
            current_price: report.extraction.price_text.clone(),
            threshold,
            url: target.url.clone(),
        };
        match self.dispatcher.dispatch(&event).await {
            Ok(()) => {
                tracing::info!(target_id = %target.id, price, threshold, "Price drop notification sent");
                report.notified = true;
            }
            Err(e) => report.fail(url, "notification", e.to_string()),
        }
    }

    /// Derives and stores the initial threshold; if another cycle got there
    /// first, the stored value wins.
    async fn derive_threshold(&self, target_id: &str, first_price: f64) -> std::result::Result<f64, PersistenceError> {
        let derived = derive_initial_threshold(first_price);
        if self.store.set_initial_threshold(target_id, derived).await? {
            tracing::info!(target_id, threshold = derived, "Initial threshold set to 90% of first price");
            return Ok(derived);
        }

        let stored = self
            .store
            .lookup_target(target_id)
            .await?
            .and_then(|t| t.target_price)
            .unwrap_or(derived);
        Ok(stored)
    }

    /// Runs one cycle for a target now, without enqueuing a continuation.
    pub async fn check_now(&self, target_id: &str) -> Result<CycleReport> {
        let target = self
            .store
            .lookup_target(target_id)
            .await?
            .ok_or_else(|| PersistenceError::NotFound {
                resource: format!("target {}", target_id),
            })?;
        Ok(self.check_target(&target).await)
    }

    async fn check_target(&self, target: &TrackedTarget) -> CycleReport {
        let continuation = ScheduleContinuation::immediate(target.id.as_str(), target.url.as_str(), target.target_price);
        self.jobs.begin(&continuation).await;
        let report = self.guarded_cycle(&continuation).await;
        self.jobs.finish(&target.id, report.first_error()).await;
        report
    }

    /// Manual sweep over every tracked target.
    pub async fn check_all(&self) -> Result<CheckSummary> {
        let targets = self.store.list_targets().await?;

        let reports: Vec<CycleReport> = stream::iter(targets.iter())
            .map(|target| self.check_target(target))
            .buffer_unordered(self.max_concurrent_checks)
            .collect()
            .await;

        let summary = CheckSummary {
            checked: reports.len(),
            notified: reports.iter().filter(|r| r.notified).count(),
            failed: reports.iter().filter(|r| !r.is_success()).count(),
        };
        tracing::info!(
            checked = summary.checked,
            notified = summary.notified,
            failed = summary.failed,
            "Manual sweep finished"
        );
        Ok(summary)
    }

    pub async fn get_job_info(&self, target_id: &str) -> Option<JobInfo> {
        self.jobs.get(target_id).await
    }

    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        self.jobs.list().await
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        self.jobs.stats().await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
