use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::ScraperConfig;
use crate::utils::error::{AppError, ExtractionError, ResourceError, Result};
use crate::utils::telemetry::metric;

/// Fully rendered DOM of a product page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub requested_url: String,
    /// URL after redirects.
    pub final_url: String,
    pub html: String,
}

/// Turns a URL into rendered HTML.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RenderedPage>;
}

/// Renders pages in a fresh headless Chrome per request.
pub struct ChromeFetcher {
    config: ScraperConfig,
}

/// Tab and browser for one render; both are released on drop, on every exit path.
struct RenderSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(true) {
            tracing::debug!("Failed to close tab: {}", e);
        }
    }
}

/// Hands the open session between the blocking render and the awaiting cycle,
/// so whichever side finishes first can release it.
struct SessionSlot<S> {
    state: Mutex<SlotState<S>>,
}

struct SlotState<S> {
    session: Option<S>,
    abandoned: bool,
}

impl<S> SessionSlot<S> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                session: None,
                abandoned: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parks a freshly opened session. Hands it back if the caller already gave up.
    fn install(&self, session: S) -> std::result::Result<(), S> {
        let mut state = self.lock();
        if state.abandoned {
            return Err(session);
        }
        state.session = Some(session);
        Ok(())
    }

    fn take(&self) -> Option<S> {
        self.lock().session.take()
    }

    /// Marks the render abandoned and takes whatever session it opened.
    fn abandon(&self) -> Option<S> {
        let mut state = self.lock();
        state.abandoned = true;
        state.session.take()
    }
}

/// Runs a blocking render with a deadline. On timeout the session parked in
/// the slot is dropped before this returns; a late render finds the slot
/// abandoned and drops its own session.
async fn render_within<S, F>(timeout: Duration, url: &str, render: F) -> Result<RenderedPage>
where
    S: Send + 'static,
    F: FnOnce(&SessionSlot<S>) -> Result<RenderedPage> + Send + 'static,
{
    let slot = Arc::new(SessionSlot::new());
    let render_slot = Arc::clone(&slot);
    let task = tokio::task::spawn_blocking(move || {
        let outcome = render(&render_slot);
        drop(render_slot.take());
        outcome
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => Err(AppError::Resource(ResourceError::TaskAborted(join_error.to_string()))),
        Err(_) => {
            if let Some(session) = slot.abandon() {
                // Closing the tab talks to Chrome; keep it off the async workers.
                if let Err(e) = tokio::task::spawn_blocking(move || drop(session)).await {
                    tracing::warn!(url, "Failed to release timed out session: {}", e);
                }
            }
            Err(ExtractionError::Timeout {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            }
            .into())
        }
    }
}

impl ChromeFetcher {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    fn launch_options(config: &ScraperConfig) -> std::result::Result<LaunchOptions<'static>, ResourceError> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(config.render_timeout() + Duration::from_secs(30))
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-background-timer-throttling"),
                OsStr::new("--disable-renderer-backgrounding"),
            ])
            .build()
            .map_err(|e| ResourceError::SessionStart(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        Ok(launch_options)
    }

    fn open_session(config: &ScraperConfig) -> std::result::Result<RenderSession, ResourceError> {
        let browser = Browser::new(Self::launch_options(config)?)
            .map_err(|e| ResourceError::SessionStart(format!("Failed to launch browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ResourceError::SessionStart(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(config.render_timeout());
        Ok(RenderSession { _browser: browser, tab })
    }

    /// Blocking render; runs on the blocking pool. The session lives in `slot`
    /// so a timed out fetch can kill the browser while this is still blocked.
    fn render(config: &ScraperConfig, url: &str, slot: &SessionSlot<RenderSession>) -> Result<RenderedPage> {
        let session = Self::open_session(config)?;
        let tab = Arc::clone(&session.tab);
        if let Err(session) = slot.install(session) {
            drop(session);
            return Err(ExtractionError::Timeout {
                url: url.to_string(),
                seconds: config.render_timeout().as_secs(),
            }
            .into());
        }

        let navigation_error = |e: anyhow::Error| ExtractionError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(navigation_error)?;
        tab.navigate_to(url).map_err(navigation_error)?;
        tab.wait_until_navigated().map_err(navigation_error)?;

        let html = tab.get_content().map_err(navigation_error)?;
        let final_url = match tab.get_url() {
            current if current.is_empty() => url.to_string(),
            current => current,
        };

        Ok(RenderedPage {
            requested_url: url.to_string(),
            final_url,
            html,
        })
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &str) -> Result<RenderedPage> {
        let started = Instant::now();
        let timeout = self.config.render_timeout();
        let config = self.config.clone();
        let target = url.to_string();

        let outcome = render_within(timeout, url, move |slot: &SessionSlot<RenderSession>| {
            Self::render(&config, &target, slot)
        }).await;
        metrics::histogram!(metric::RENDER_SECONDS).record(started.elapsed().as_secs_f64());

        let page = outcome?;
        tracing::debug!(url, final_url = %page.final_url, bytes = page.html.len(), "Page rendered");
        Ok(page)
    }
}
