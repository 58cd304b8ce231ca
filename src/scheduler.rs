use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::SchedulerConfig;
use crate::models::ScheduleContinuation;
use crate::monitor::Monitor;
use crate::utils::error::{AppError, Result};

/// "Run after delay" primitive the monitor reschedules itself through.
#[async_trait]
pub trait DelayQueue: Send + Sync {
    async fn enqueue(&self, continuation: ScheduleContinuation) -> Result<()>;
}

/// Delay queue backed by one-shot `tokio-cron-scheduler` jobs.
///
/// Due continuations are delivered over an unbounded channel drained by a
/// [`Worker`]. Nothing is persisted; pending continuations are lost on restart
/// and rebuilt by `Monitor::resume_all`.
pub struct CronDelayQueue {
    scheduler: JobScheduler,
    sender: mpsc::UnboundedSender<ScheduleContinuation>,
}

impl CronDelayQueue {
    pub async fn new() -> Result<(Self, mpsc::UnboundedReceiver<ScheduleContinuation>)> {
        let scheduler = JobScheduler::new().await?;
        let (sender, receiver) = mpsc::unbounded_channel();
        Ok((Self { scheduler, sender }, receiver))
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler.start().await?;
        tracing::info!("Delay queue started");
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        tracing::info!("Delay queue shutdown");
        Ok(())
    }

    fn deliver(
        sender: &mpsc::UnboundedSender<ScheduleContinuation>,
        continuation: ScheduleContinuation,
    ) -> Result<()> {
        sender
            .send(continuation)
            .map_err(|e| AppError::Scheduling(format!("Worker channel closed, dropping {}", e.0.target_id)))
    }
}

#[async_trait]
impl DelayQueue for CronDelayQueue {
    async fn enqueue(&self, continuation: ScheduleContinuation) -> Result<()> {
        if continuation.delay_seconds == 0 {
            return Self::deliver(&self.sender, continuation);
        }

        let delay = Duration::from_secs(continuation.delay_seconds);
        let target_id = continuation.target_id.clone();
        let sender = self.sender.clone();

        let job = Job::new_one_shot_async(delay, move |_uuid, _l| {
            let sender = sender.clone();
            let continuation = continuation.clone();
            Box::pin(async move {
                if let Err(e) = Self::deliver(&sender, continuation) {
                    tracing::error!("{}", e);
                }
            })
        })?;
        self.scheduler.add(job).await?;

        tracing::debug!(target_id = %target_id, delay_secs = delay.as_secs(), "Continuation scheduled");
        Ok(())
    }
}

/// Draws reschedule delays of `base ± jitter` seconds.
#[derive(Debug, Clone)]
pub struct Jitter {
    base_secs: u64,
    jitter_secs: u64,
}

impl Jitter {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            base_secs: config.base_interval_secs,
            jitter_secs: config.jitter_secs.min(config.base_interval_secs),
        }
    }

    /// Inclusive bounds of [`Jitter::next_delay`].
    pub fn bounds(&self) -> (u64, u64) {
        (self.base_secs - self.jitter_secs, self.base_secs + self.jitter_secs)
    }

    pub fn next_delay(&self) -> u64 {
        let (low, high) = self.bounds();
        rand::rng().random_range(low..=high)
    }

    /// Spread for first cycles after a restart, uniform in `[0, jitter]`.
    pub fn initial_spread(&self) -> u64 {
        rand::rng().random_range(0..=self.jitter_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub target_id: String,
    pub url: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
}

/// Per-target cycle state. There is no terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Running,
    Rescheduled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub total_jobs: usize,
    pub running_jobs: usize,
    pub rescheduled_jobs: usize,
    pub completed_runs: u64,
    pub failed_runs: u64,
    pub uptime_seconds: u64,
}

/// In-memory bookkeeping of every target the process has seen a cycle for.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, JobInfo>>>, // target_id -> JobInfo
    start_time: DateTime<Utc>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            start_time: Utc::now(),
        }
    }

    pub async fn register(&self, continuation: &ScheduleContinuation) {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .entry(continuation.target_id.clone())
            .or_insert_with(|| JobInfo {
                target_id: continuation.target_id.clone(),
                url: continuation.url.clone(),
                status: JobStatus::Idle,
                created_at: Utc::now(),
                last_run: None,
                next_run: None,
                run_count: 0,
                success_count: 0,
                error_count: 0,
                last_error: None,
            });
        job.next_run = Some(due_at(continuation.delay_seconds));
    }

    pub async fn begin(&self, continuation: &ScheduleContinuation) {
        self.register(continuation).await;
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&continuation.target_id) {
            job.status = JobStatus::Running;
            job.last_run = Some(Utc::now());
            job.next_run = None;
        }
    }

    /// Records a finished cycle. `error` is the first failure message, if any.
    pub async fn finish(&self, target_id: &str, error: Option<String>) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(target_id) {
            job.run_count += 1;
            job.status = JobStatus::Idle;
            match error {
                None => {
                    job.success_count += 1;
                    job.last_error = None;
                }
                Some(message) => {
                    job.error_count += 1;
                    job.last_error = Some(message);
                }
            }
        }
    }

    pub async fn rescheduled(&self, continuation: &ScheduleContinuation) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&continuation.target_id) {
            job.status = JobStatus::Rescheduled;
            job.next_run = Some(due_at(continuation.delay_seconds));
        }
    }

    pub async fn remove(&self, target_id: &str) -> Option<JobInfo> {
        self.jobs.write().await.remove(target_id)
    }

    pub async fn get(&self, target_id: &str) -> Option<JobInfo> {
        self.jobs.read().await.get(target_id).cloned()
    }

    pub async fn list(&self) -> Vec<JobInfo> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub async fn stats(&self) -> SchedulerStats {
        let jobs = self.jobs.read().await;
        let uptime = Utc::now().signed_duration_since(self.start_time);

        SchedulerStats {
            total_jobs: jobs.len(),
            running_jobs: jobs.values().filter(|j| j.status == JobStatus::Running).count(),
            rescheduled_jobs: jobs.values().filter(|j| j.status == JobStatus::Rescheduled).count(),
            completed_runs: jobs.values().map(|j| j.success_count).sum(),
            failed_runs: jobs.values().map(|j| j.error_count).sum(),
            uptime_seconds: uptime.num_seconds().max(0) as u64,
        }
    }
}

fn due_at(delay_seconds: u64) -> DateTime<Utc> {
    let delay = i64::try_from(delay_seconds).unwrap_or(i64::MAX);
    Utc::now() + ChronoDuration::seconds(delay.min(i64::from(i32::MAX)))
}

/// Drains due continuations and runs each on its own task, bounded by a semaphore.
pub struct Worker {
    monitor: Arc<Monitor>,
    permits: Arc<Semaphore>,
}

impl Worker {
    pub fn new(monitor: Arc<Monitor>, max_concurrent_checks: usize) -> Self {
        Self {
            monitor,
            permits: Arc::new(Semaphore::new(max_concurrent_checks.max(1))),
        }
    }

    /// Runs until the channel closes.
    pub async fn run(self, mut receiver: mpsc::UnboundedReceiver<ScheduleContinuation>) {
        tracing::info!(permits = self.permits.available_permits(), "Worker started");

        while let Some(continuation) = receiver.recv().await {
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let monitor = Arc::clone(&self.monitor);
            tokio::spawn(async move {
                monitor.handle(continuation).await;
                drop(permit);
            });
        }

        tracing::info!("Worker stopped");
    }
}
