//! Archiver configuration.
//!
//! [`ArchiverConfig`] is handed to the [`SessionCoordinator`] explicitly;
//! nothing in the crate reads the process environment except
//! [`ArchiverConfig::from_env`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use warc_capture::ArchiverConfig;
//!
//! let config = ArchiverConfig::builder()
//!     .browser("127.0.0.1", 9222)
//!     .data_dir("/var/lib/warcs")
//!     .settle_delay(Duration::from_secs(3))
//!     .network_idle(Duration::from_millis(800))
//!     .build();
//! ```
//!
//! [`SessionCoordinator`]: crate::SessionCoordinator

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default browser host (the service name in the reference deployment).
pub const DEFAULT_BROWSER_HOST: &str = "chrome";

/// Default browser debugging port.
pub const DEFAULT_BROWSER_PORT: u16 = 9222;

/// Default root content directory.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Sub-directory of the data directory holding session archives.
pub const ARCHIVE_SUBDIR: &str = "warc-temp";

/// Wall-clock budget of one page capture.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Time allowed after navigation for the page to issue its requests.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Timeout for a single CDP command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Compression
// ============================================================================

/// Compression of the archive container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Plain `.warc`.
    None,
    /// One gzip member per record, `.warc.gz`.
    #[default]
    Gzip,
}

impl Compression {
    /// Returns the archive file extension.
    #[inline]
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::None => "warc",
            Self::Gzip => "warc.gz",
        }
    }
}

// ============================================================================
// ArchiverConfig
// ============================================================================

/// Settings for archive sessions.
#[derive(Debug, Clone)]
pub struct ArchiverConfig {
    /// Browser debugging host.
    pub browser_host: String,
    /// Browser debugging port.
    pub browser_port: u16,
    /// Root content directory.
    pub data_dir: PathBuf,
    /// Deadline of one page capture, including session setup and teardown.
    pub page_timeout: Duration,
    /// Maximum settle time after navigation.
    pub settle_delay: Duration,
    /// Quiet window that ends settling early, if set.
    pub network_idle: Option<Duration>,
    /// Container compression.
    pub compression: Compression,
    /// Timeout for a single CDP command.
    pub command_timeout: Duration,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            browser_host: DEFAULT_BROWSER_HOST.to_string(),
            browser_port: DEFAULT_BROWSER_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            network_idle: None,
            compression: Compression::default(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl ArchiverConfig {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ArchiverConfigBuilder {
        ArchiverConfigBuilder::default()
    }

    /// Reads `CHROME_HOST`, `CHROME_PORT` and `DATA_DIR` over the defaults.
    ///
    /// Empty variables count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `CHROME_PORT` is not a port number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(host) = get("CHROME_HOST") {
            config.browser_host = host;
        }
        if let Some(port) = get("CHROME_PORT") {
            config.browser_port = port
                .parse()
                .map_err(|_| Error::config(format!("CHROME_PORT is not a port: {port:?}")))?;
        }
        if let Some(dir) = get("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Returns the archive path of a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSessionId`] unless the id is a single plain
    /// file name component.
    pub fn archive_path(&self, session_id: &str) -> Result<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id != "."
            && session_id != ".."
            && !session_id.contains(['/', '\\', '\0']);
        if !valid {
            return Err(Error::invalid_session_id(session_id));
        }

        Ok(self.archive_dir().join(format!(
            "{session_id}.{}",
            self.compression.extension()
        )))
    }

    /// Returns the directory holding session archives.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join(ARCHIVE_SUBDIR)
    }
}

// ============================================================================
// ArchiverConfigBuilder
// ============================================================================

/// Builder for [`ArchiverConfig`].
#[derive(Debug, Default, Clone)]
pub struct ArchiverConfigBuilder {
    config: ArchiverConfig,
}

impl ArchiverConfigBuilder {
    /// Sets the browser debugging host and port.
    #[inline]
    #[must_use]
    pub fn browser(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.browser_host = host.into();
        self.config.browser_port = port;
        self
    }

    /// Sets the root content directory.
    #[inline]
    #[must_use]
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the per-page deadline.
    #[inline]
    #[must_use]
    pub fn page_timeout(mut self, timeout: Duration) -> Self {
        self.config.page_timeout = timeout;
        self
    }

    /// Sets the maximum settle time after navigation.
    #[inline]
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    /// Ends settling early after this long without network activity.
    #[inline]
    #[must_use]
    pub fn network_idle(mut self, window: Duration) -> Self {
        self.config.network_idle = Some(window);
        self
    }

    /// Sets the container compression.
    #[inline]
    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    /// Sets the timeout for a single CDP command.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Returns the finished configuration.
    #[inline]
    #[must_use]
    pub fn build(self) -> ArchiverConfig {
        self.config
    }
}

// ============================================================================
// Tests
// ============================================================================
