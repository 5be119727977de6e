//! Browser debugging endpoint discovery.
//!
//! Chrome exposes its browser-level WebSocket URL at `/json/version`.
//! Chrome rejects `Host` headers that are not an IP or `localhost`, so the
//! host name is resolved first and the request is made against the address.

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;
use tokio::net::lookup_host;
use tracing::{debug, info};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for the `/json/version` request.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Subset of the `/json/version` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    /// Browser product string, e.g. `HeadlessChrome/120.0`.
    #[serde(rename = "Browser", default)]
    pub browser: String,

    /// Browser-level debugging WebSocket URL.
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

// ============================================================================
// Discovery
// ============================================================================

/// Discovers the debugging WebSocket URL of a remote browser.
///
/// # Errors
///
/// Returns [`Error::Discovery`] if the host cannot be resolved, the endpoint
/// does not answer, or the payload has no WebSocket URL.
pub async fn discover_ws_url(host: &str, port: u16) -> Result<String> {
    let endpoint = format!("{host}:{port}");
    let ip = resolve_host(host, port)
        .await
        .map_err(|e| Error::discovery(&endpoint, e.to_string()))?;

    let version_url = format!("http://{}/json/version", authority(&ip, port));
    debug!(url = %version_url, "Querying browser version endpoint");

    let client = reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .build()?;

    let info = client
        .get(&version_url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| Error::discovery(&endpoint, e.to_string()))?
        .json::<VersionInfo>()
        .await
        .map_err(|e| Error::discovery(&endpoint, format!("invalid version payload: {e}")))?;

    if info.web_socket_debugger_url.is_empty() {
        return Err(Error::discovery(&endpoint, "empty webSocketDebuggerUrl"));
    }

    info!(browser = %info.browser, ws_url = %info.web_socket_debugger_url, "Discovered browser endpoint");

    Ok(info.web_socket_debugger_url)
}

/// Resolves a host to the address used in the version request.
///
/// `localhost` and literal addresses are used as-is.
async fn resolve_host(host: &str, port: u16) -> Result<String> {
    if host == "localhost" || host.parse::<IpAddr>().is_ok() {
        return Ok(host.to_string());
    }

    let addr = lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| Error::connection(format!("hostname lookup returned no address for {host}")))?;

    debug!(host = %host, ip = %addr.ip(), "Resolved browser host");

    Ok(addr.ip().to_string())
}

/// Formats `host:port`, bracketing IPv6 literals.
fn authority(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]:{port}"),
        _ => format!("{host}:{port}"),
    }
}

// ============================================================================
// Tests
// ============================================================================
