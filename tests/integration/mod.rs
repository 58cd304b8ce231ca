// Shared fakes and builders for the integration tests

pub mod extraction_tests;
pub mod monitor_tests;
pub mod storage_tests;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use dealwatch::config::SchedulerConfig;
use dealwatch::models::{NewTarget, PriceObservation, ScheduleContinuation, TrackedTarget};
use dealwatch::plugins::{NotificationDispatcher, Notifier};
use dealwatch::scheduler::DelayQueue;
use dealwatch::scraper::{PageFetcher, RenderedPage};
use dealwatch::storage::{MemoryStore, PriceLedger, StoreResult, TargetStore};
use dealwatch::utils::error::{ExtractionError, NotificationError, PersistenceError, ResourceError};
use dealwatch::{Monitor, Result};

pub const PRODUCT_URL: &str = "https://example.com/product";

/// Minimal product page carrying a title and price as JSON-LD.
pub fn product_page(title: &str, price: &str) -> String {
    format!(
        r#"<html><head><script type="application/ld+json">
            {{"@context":"https://schema.org","@type":"Product","name":"{title}","offers":{{"@type":"Offer","price":"{price}"}}}}
        </script></head><body><h1>{title}</h1></body></html>"#
    )
}

/// Serves the given pages in order; the last one repeats.
pub struct SequenceFetcher {
    pages: Mutex<VecDeque<String>>,
}

impl SequenceFetcher {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
        }
    }
}

#[async_trait]
impl PageFetcher for SequenceFetcher {
    async fn fetch(&self, url: &str) -> Result<RenderedPage> {
        let mut pages = self.pages.lock().await;
        let html = if pages.len() > 1 {
            pages.pop_front().unwrap_or_default()
        } else {
            pages.front().cloned().unwrap_or_default()
        };
        Ok(RenderedPage {
            requested_url: url.to_string(),
            final_url: url.to_string(),
            html,
        })
    }
}

pub enum FetchFailure {
    Timeout,
    SessionStart,
    Panic,
}

pub struct FailingFetcher(pub FetchFailure);

#[async_trait]
impl PageFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> Result<RenderedPage> {
        match self.0 {
            FetchFailure::Timeout => Err(ExtractionError::Timeout {
                url: url.to_string(),
                seconds: 45,
            }
            .into()),
            FetchFailure::SessionStart => Err(ResourceError::SessionStart("chrome not found".to_string()).into()),
            FetchFailure::Panic => panic!("renderer crashed"),
        }
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    pub enqueued: Mutex<Vec<ScheduleContinuation>>,
}

impl RecordingQueue {
    pub async fn take(&self) -> Vec<ScheduleContinuation> {
        std::mem::take(&mut *self.enqueued.lock().await)
    }
}

#[async_trait]
impl DelayQueue for RecordingQueue {
    async fn enqueue(&self, continuation: ScheduleContinuation) -> Result<()> {
        self.enqueued.lock().await.push(continuation);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, destination: &str, message: &str) -> std::result::Result<(), NotificationError> {
        self.sent
            .lock()
            .await
            .push((destination.to_string(), message.to_string()));
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn notify(&self, _destination: &str, _message: &str) -> std::result::Result<(), NotificationError> {
        Err(NotificationError::Transport("signal-cli exited with 1".to_string()))
    }
}

/// Ledger whose writes always fail.
pub struct FailingLedger;

#[async_trait]
impl PriceLedger for FailingLedger {
    async fn append(&self, _target_id: &str, _price: f64) -> StoreResult<PriceObservation> {
        Err(PersistenceError::Unavailable("disk full".to_string()))
    }

    async fn latest(&self, _target_id: &str) -> StoreResult<Option<PriceObservation>> {
        Ok(None)
    }

    async fn history(&self, _target_id: &str, _limit: usize) -> StoreResult<Vec<PriceObservation>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StoreFailure {
    Lookup,
    Threshold,
}

/// Target store over a `MemoryStore` with one operation that always fails.
pub struct FailingTargetStore {
    inner: Arc<MemoryStore>,
    failure: StoreFailure,
}

impl FailingTargetStore {
    fn unavailable() -> PersistenceError {
        PersistenceError::Unavailable("database is locked".to_string())
    }
}

#[async_trait]
impl TargetStore for FailingTargetStore {
    async fn lookup_target(&self, target_id: &str) -> StoreResult<Option<TrackedTarget>> {
        match self.failure {
            StoreFailure::Lookup => Err(Self::unavailable()),
            StoreFailure::Threshold => self.inner.lookup_target(target_id).await,
        }
    }

    async fn set_initial_threshold(&self, target_id: &str, threshold: f64) -> StoreResult<bool> {
        match self.failure {
            StoreFailure::Threshold => Err(Self::unavailable()),
            StoreFailure::Lookup => self.inner.set_initial_threshold(target_id, threshold).await,
        }
    }

    async fn insert_target(&self, new_target: NewTarget) -> StoreResult<TrackedTarget> {
        self.inner.insert_target(new_target).await
    }

    async fn delete_target(&self, target_id: &str) -> StoreResult<bool> {
        self.inner.delete_target(target_id).await
    }

    async fn list_targets(&self) -> StoreResult<Vec<TrackedTarget>> {
        self.inner.list_targets().await
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<RecordingQueue>,
    pub monitor: Monitor,
}

pub struct HarnessBuilder {
    store: Arc<MemoryStore>,
    ledger: Option<Arc<dyn PriceLedger>>,
    store_failure: Option<StoreFailure>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn Notifier>,
    destination: Option<String>,
}

impl HarnessBuilder {
    pub fn new(fetcher: impl PageFetcher + 'static) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            ledger: None,
            store_failure: None,
            fetcher: Arc::new(fetcher),
            notifier: Arc::new(RecordingNotifier::default()),
            destination: Some("group-1".to_string()),
        }
    }

    pub fn ledger(mut self, ledger: Arc<dyn PriceLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Wraps the target store so `failure` always errors; the ledger stays healthy.
    pub fn store_failure(mut self, failure: StoreFailure) -> Self {
        self.store_failure = Some(failure);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn destination(mut self, destination: Option<&str>) -> Self {
        self.destination = destination.map(str::to_string);
        self
    }

    pub fn build(self) -> Harness {
        let queue = Arc::new(RecordingQueue::default());
        let store: Arc<dyn TargetStore> = match self.store_failure {
            Some(failure) => Arc::new(FailingTargetStore {
                inner: self.store.clone(),
                failure,
            }),
            None => self.store.clone(),
        };
        let ledger = self
            .ledger
            .unwrap_or_else(|| self.store.clone() as Arc<dyn PriceLedger>);
        let monitor = Monitor::new(
            store,
            ledger,
            self.fetcher,
            NotificationDispatcher::new(self.notifier, self.destination),
            queue.clone(),
            &SchedulerConfig::default(),
        );
        Harness {
            store: self.store,
            queue,
            monitor,
        }
    }
}
