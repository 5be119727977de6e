//! Capture of a single URL.
//!
//! [`PageCapture::run`] drives one page through its whole lifecycle:
//!
//! 1. write a warcinfo record
//! 2. open an isolated browser session
//! 3. enable events and navigate, correlating events as they arrive
//! 4. wait for the main frame's load event
//! 5. settle (fixed delay, optionally cut short by network idleness)
//! 6. wait for every spawned body fetch to write its record pair
//! 7. write redirect compensation records if the document moved
//! 8. close the session
//!
//! Steps 2 to 7 share one deadline. The session is closed whatever happens,
//! including when it finishes opening after the deadline. Failures never
//! escape: they are logged and reported in [`PageOutcome`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, info, trace, warn};

use crate::browser::{BrowserSession, CaptureBrowser, OpenedSession};
use crate::config::ArchiverConfig;
use crate::error::{Error, Result};
use crate::protocol::{NetworkEvent, SessionEvent};
use crate::warc::RecordWriter;

use super::correlator::{NetworkEventCorrelator, RedirectObservation};
use super::exchange::{CapturedExchange, CompletedLoad};
use super::redirect::RedirectArchiver;

// ============================================================================
// Types
// ============================================================================

/// Result of one body fetch task: the resource URL and what happened.
type FetchResult = (String, Result<Option<CapturedExchange>>);

/// What a finished page capture produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    /// URL as requested.
    pub url: String,
    /// Resolved top-level document URL, if a document loaded.
    pub final_url: Option<String>,
    /// Resources written as request/response pairs.
    pub archived: usize,
    /// Resources whose body could not be fetched or written.
    pub failed: usize,
    /// Set when redirect compensation records were written.
    pub redirect: Option<RedirectObservation>,
}

/// Outcome of [`PageCapture::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was captured, possibly with some failed resources.
    Captured(PageSummary),
    /// The page failed; records written before the failure remain.
    Failed {
        /// URL as requested.
        url: String,
        /// Human-readable failure.
        reason: String,
    },
}

impl PageOutcome {
    /// Returns `true` if the page was captured.
    #[inline]
    #[must_use]
    pub fn is_captured(&self) -> bool {
        matches!(self, Self::Captured(_))
    }
}

/// Timing knobs of a page capture.
#[derive(Debug, Clone, Copy)]
struct Timings {
    page_timeout: Duration,
    settle_delay: Duration,
    network_idle: Option<Duration>,
}

impl From<&ArchiverConfig> for Timings {
    fn from(config: &ArchiverConfig) -> Self {
        Self {
            page_timeout: config.page_timeout,
            settle_delay: config.settle_delay,
            network_idle: config.network_idle,
        }
    }
}

// ============================================================================
// PageCapture
// ============================================================================

/// Captures single pages into a shared archive stream.
#[derive(Clone)]
pub struct PageCapture {
    browser: Arc<dyn CaptureBrowser>,
    writer: RecordWriter,
    timings: Timings,
}

impl fmt::Debug for PageCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCapture")
            .field("writer", &self.writer)
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl PageCapture {
    /// Creates a page capture using the timings of `config`.
    #[must_use]
    pub fn new(browser: Arc<dyn CaptureBrowser>, writer: RecordWriter, config: &ArchiverConfig) -> Self {
        Self {
            browser,
            writer,
            timings: Timings::from(config),
        }
    }

    /// Captures `url`, logging instead of returning failures.
    pub async fn run(&self, url: &str) -> PageOutcome {
        info!(url = %url, "Page capture started");

        match self.capture(url).await {
            Ok(summary) => {
                info!(
                    url = %url,
                    archived = summary.archived,
                    failed = summary.failed,
                    redirected = summary.redirect.is_some(),
                    "Page capture finished"
                );
                PageOutcome::Captured(summary)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Page capture failed");
                PageOutcome::Failed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn capture(&self, url: &str) -> Result<PageSummary> {
        self.writer.write_info()?;

        let timeout_ms = self.timings.page_timeout.as_millis() as u64;
        let deadline = Instant::now() + self.timings.page_timeout;

        let opened = self.open_session(url, deadline, timeout_ms).await?;

        let session = Arc::clone(&opened.session);
        let result = match timeout_at(deadline, self.drive(url, opened)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!("capture of {url}"), timeout_ms)),
        };

        session.close().await;
        result
    }

    /// Opens a session in its own task so that a session finishing after
    /// the deadline is still closed.
    async fn open_session(&self, url: &str, deadline: Instant, timeout_ms: u64) -> Result<OpenedSession> {
        let browser = Arc::clone(&self.browser);
        let mut opening = tokio::spawn(async move { browser.open_session().await });

        let waited = timeout_at(deadline, &mut opening).await;
        match waited {
            Ok(joined) => joined?,
            Err(_) => {
                let late_url = url.to_string();
                tokio::spawn(async move {
                    if let Ok(Ok(late)) = opening.await {
                        debug!(url = %late_url, "Session opened after the page deadline, closing it");
                        late.session.close().await;
                    }
                });
                Err(Error::timeout(format!("open session for {url}"), timeout_ms))
            }
        }
    }

    async fn drive(&self, url: &str, opened: OpenedSession) -> Result<PageSummary> {
        let OpenedSession { session, mut events } = opened;
        let mut correlator = NetworkEventCorrelator::new(url);
        let mut fetches: JoinSet<FetchResult> = JoinSet::new();

        session.enable_events().await?;

        let mut loaded = false;
        let navigation = {
            let navigate = session.navigate(url);
            tokio::pin!(navigate);

            loop {
                tokio::select! {
                    result = &mut navigate => break result?,
                    Some(event) = events.recv() => match event {
                        SessionEvent::Network(event) => {
                            self.on_event(&mut correlator, event, &session, &mut fetches);
                        }
                        SessionEvent::Loaded => loaded = true,
                    },
                }
            }
        };

        if let Some(loader_id) = navigation.loader_id {
            correlator.set_main_loader(loader_id);
        }

        if !loaded {
            self.await_load(&mut correlator, &mut events, &session, &mut fetches)
                .await;
        }

        self.settle(&mut correlator, &mut events, &session, &mut fetches)
            .await;
        drop(events);

        let mut summary = PageSummary {
            url: url.to_string(),
            final_url: correlator.final_url().map(str::to_string),
            archived: 0,
            failed: 0,
            redirect: None,
        };

        let mut document: Option<CapturedExchange> = None;
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((_, Ok(exchange))) => {
                    summary.archived += 1;
                    if let Some(exchange) = exchange
                        && correlator.document_request_id() == Some(&exchange.request_id)
                    {
                        document = Some(exchange);
                    }
                }
                Ok((resource, Err(e))) => {
                    summary.failed += 1;
                    warn!(url = %resource, error = %e, "Resource not archived");
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(error = %e, "Body fetch task failed");
                }
            }
        }

        if let Some(observation) = correlator.redirect_observation() {
            match document {
                Some(ref document) => {
                    RedirectArchiver::new(self.writer.clone()).archive(&observation, document)?;
                    summary.redirect = Some(observation);
                }
                None => warn!(
                    original = %observation.original_url,
                    final_url = %observation.final_url,
                    "Document body missing, redirect compensation skipped"
                ),
            }
        }

        Ok(summary)
    }

    /// Keeps correlating events until the main frame has loaded.
    ///
    /// Bounded only by the page deadline around the caller.
    async fn await_load(
        &self,
        correlator: &mut NetworkEventCorrelator,
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
        session: &Arc<dyn BrowserSession>,
        fetches: &mut JoinSet<FetchResult>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Network(event) => self.on_event(correlator, event, session, fetches),
                SessionEvent::Loaded => {
                    debug!("Load event fired");
                    return;
                }
            }
        }
        debug!("Event stream ended before the load event");
    }

    /// Keeps correlating events until the page has settled.
    async fn settle(
        &self,
        correlator: &mut NetworkEventCorrelator,
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
        session: &Arc<dyn BrowserSession>,
        fetches: &mut JoinSet<FetchResult>,
    ) {
        let settle_deadline = Instant::now() + self.timings.settle_delay;
        let mut last_activity = Instant::now();

        loop {
            let wake = match self.timings.network_idle {
                Some(window) => (last_activity + window).min(settle_deadline),
                None => settle_deadline,
            };

            tokio::select! {
                () = sleep_until(wake) => {
                    if Instant::now() >= settle_deadline {
                        debug!("Settle delay elapsed");
                        return;
                    }
                    if correlator.in_flight() == 0 {
                        debug!("Network idle, settling early");
                        return;
                    }
                    last_activity = Instant::now();
                }
                event = events.recv() => match event {
                    Some(SessionEvent::Network(event)) => {
                        last_activity = Instant::now();
                        self.on_event(correlator, event, session, fetches);
                    }
                    Some(SessionEvent::Loaded) => {}
                    None => {
                        debug!("Event stream ended while settling");
                        return;
                    }
                },
            }
        }
    }

    fn on_event(
        &self,
        correlator: &mut NetworkEventCorrelator,
        event: NetworkEvent,
        session: &Arc<dyn BrowserSession>,
        fetches: &mut JoinSet<FetchResult>,
    ) {
        let Some(load) = correlator.handle(event) else {
            return;
        };

        trace!(url = %load.url, request_id = %load.request_id, "Resource finished, fetching body");

        let session = Arc::clone(session);
        let writer = self.writer.clone();
        fetches.spawn(async move {
            let url = load.url.clone();
            (url, fetch_and_write(session, writer, load).await)
        });
    }
}

/// Fetches a body and writes the record pair.
///
/// Encoding and the locked write run on the blocking pool, since bodies can
/// be tens of megabytes and the archive lock may be contended.
///
/// Returns the exchange only for top-level documents, which redirect
/// compensation may need.
async fn fetch_and_write(
    session: Arc<dyn BrowserSession>,
    writer: RecordWriter,
    load: CompletedLoad,
) -> Result<Option<CapturedExchange>> {
    let body = session.response_body(&load.request_id).await?;
    let exchange = load.into_exchange(body);

    let pair = exchange.to_record_pair();
    tokio::task::spawn_blocking(move || writer.write_pair(&pair)).await??;
    trace!(url = %exchange.url, status = exchange.response_status, "Record pair written");

    Ok(exchange.is_top_level_document.then_some(exchange))
}

// ============================================================================
// Tests
// ============================================================================
