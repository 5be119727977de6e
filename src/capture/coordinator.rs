//! Archive sessions over a batch of URLs.
//!
//! [`SessionCoordinator::archive`] is the crate's entry point: one call, one
//! session id, one archive file. The call fails only when no archive can be
//! produced at all (invalid session id, unreachable browser, uncreatable
//! file). Everything below that is best effort.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::browser::{CaptureBrowser, CdpBrowser};
use crate::config::ArchiverConfig;
use crate::error::{Error, Result};
use crate::warc::{FileWarcWriter, RecordWriter};

use super::page::{PageCapture, PageOutcome};

// ============================================================================
// Types
// ============================================================================

/// What one archive session produced.
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    /// Path of the archive file.
    pub path: PathBuf,
    /// One outcome per input URL, in input order.
    pub pages: Vec<PageOutcome>,
}

impl ArchiveReport {
    /// Returns the number of captured pages.
    #[must_use]
    pub fn captured(&self) -> usize {
        self.pages.iter().filter(|p| p.is_captured()).count()
    }
}

// ============================================================================
// SessionCoordinator
// ============================================================================

/// Runs archive sessions against a remote browser.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    config: Arc<ArchiverConfig>,
}

impl SessionCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(config: ArchiverConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    /// Archives `urls` into one file named after `session_id`.
    ///
    /// Discovers and connects to the configured browser, captures every URL
    /// concurrently and returns the archive path once all captures are done.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSessionId`] if the id is not a plain file name
    /// - [`Error::Discovery`] / [`Error::Connection`] if the browser is unreachable
    /// - [`Error::Io`] if the archive file cannot be created or flushed
    pub async fn archive(&self, urls: &[String], session_id: &str) -> Result<PathBuf> {
        self.config.archive_path(session_id)?;

        let browser = CdpBrowser::connect(&self.config).await?;
        let result = self
            .archive_with(Arc::new(browser.clone()), urls, session_id)
            .await;
        browser.shutdown();

        result.map(|report| report.path)
    }

    /// Archives `urls` using an already connected browser.
    ///
    /// # Errors
    ///
    /// Same as [`archive`](Self::archive), minus browser discovery.
    pub async fn archive_with(
        &self,
        browser: Arc<dyn CaptureBrowser>,
        urls: &[String],
        session_id: &str,
    ) -> Result<ArchiveReport> {
        let path = self.config.archive_path(session_id)?;
        tokio::fs::create_dir_all(self.config.archive_dir()).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let writer = RecordWriter::new(FileWarcWriter::create(&path, self.config.compression)?)
            .with_filename(file_name)
            .with_is_part_of(session_id);

        info!(session_id, path = %path.display(), urls = urls.len(), "Archive session started");

        let capture = PageCapture::new(browser, writer.clone(), &self.config);
        let mut pages: Vec<Option<PageOutcome>> = vec![None; urls.len()];
        let mut tasks = JoinSet::new();

        for (index, raw) in urls.iter().enumerate() {
            let target = match parse_target(raw) {
                Ok(target) => target,
                Err(e) => {
                    warn!(url = %raw, error = %e, "Skipping URL");
                    pages[index] = Some(PageOutcome::Failed {
                        url: raw.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let capture = capture.clone();
            tasks.spawn(async move { (index, capture.run(&target).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => pages[index] = Some(outcome),
                Err(e) => error!(error = %e, "Page capture task panicked"),
            }
        }

        writer.finish()?;

        let pages: Vec<PageOutcome> = pages
            .into_iter()
            .zip(urls)
            .map(|(outcome, url)| {
                outcome.unwrap_or_else(|| PageOutcome::Failed {
                    url: url.clone(),
                    reason: "capture task aborted".to_string(),
                })
            })
            .collect();

        let report = ArchiveReport { path, pages };
        info!(
            session_id,
            captured = report.captured(),
            total = report.pages.len(),
            "Archive session finished"
        );
        Ok(report)
    }
}

/// Parses a target URL, accepting only `http` and `https`.
///
/// Returns the trimmed input, which is what gets navigated and recorded.
fn parse_target(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| Error::invalid_url(raw, e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {
            debug!(url = %trimmed, "URL accepted");
            Ok(trimmed.to_string())
        }
        other => Err(Error::invalid_url(raw, format!("unsupported scheme {other:?}"))),
    }
}

// ============================================================================
// Tests
// ============================================================================
