//! Network event correlation for one page load.
//!
//! [`NetworkEventCorrelator`] is a plain state machine advanced one event at
//! a time. Each request id moves through:
//!
//! ```text
//! requestWillBeSent        responseReceived         loadingFinished
//! ─────────────────► Requested ─────────────► Responded ─────────────► CompletedLoad
//!                                                                     (pending body)
//! ```
//!
//! A `responseReceived` for an id never seen before starts directly in
//! `Responded`. `loadingFinished` without a response, and `loadingFailed`,
//! drop the id. Once a [`CompletedLoad`] is handed out its id is forgotten,
//! so a duplicate `loadingFinished` is ignored.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tracing::{debug, info, trace};
use url::Url;

use crate::browser::network::{Headers, NetworkRequest, NetworkResponse, ResourceType};
use crate::identifiers::{LoaderId, NetworkRequestId};
use crate::protocol::NetworkEvent;

use super::exchange::CompletedLoad;

// ============================================================================
// Types
// ============================================================================

/// Method and headers remembered from `requestWillBeSent`.
#[derive(Debug, Clone)]
struct RequestSnapshot {
    method: String,
    headers: Headers,
}

/// Per-request correlation state.
#[derive(Debug)]
enum Tracked {
    /// Request sent, response not yet received.
    Requested(RequestSnapshot),
    /// Response metadata received, waiting for the body to finish loading.
    Responded {
        request: Option<RequestSnapshot>,
        response: NetworkResponse,
        loader_id: LoaderId,
        resource_type: ResourceType,
    },
}

/// A document response seen during the load.
#[derive(Debug, Clone)]
struct DocumentCandidate {
    request_id: NetworkRequestId,
    loader_id: LoaderId,
    url: String,
}

/// One observed redirect hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectHop {
    /// URL that answered with a redirect.
    pub from: String,
    /// URL the browser went to next.
    pub to: String,
    /// Redirect status code.
    pub status: u16,
}

/// The requested URL and the URL the top-level document resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectObservation {
    /// URL as requested by the caller.
    pub original_url: String,
    /// Resolved top-level document URL.
    pub final_url: String,
}

// ============================================================================
// NetworkEventCorrelator
// ============================================================================

/// Pairs network lifecycle events of one navigation into completed loads.
#[derive(Debug)]
pub struct NetworkEventCorrelator {
    requested_url: String,
    requested: Option<Url>,
    tracked: FxHashMap<NetworkRequestId, Tracked>,
    documents: Vec<DocumentCandidate>,
    main_loader: Option<LoaderId>,
    redirect_hops: Vec<RedirectHop>,
}

impl NetworkEventCorrelator {
    /// Creates a correlator for a navigation to `requested_url`.
    #[must_use]
    pub fn new(requested_url: impl Into<String>) -> Self {
        let requested_url = requested_url.into();
        let requested = normalize(&requested_url);
        Self {
            requested_url,
            requested,
            tracked: FxHashMap::default(),
            documents: Vec::new(),
            main_loader: None,
            redirect_hops: Vec::new(),
        }
    }

    /// Records the loader id reported by the navigation command.
    ///
    /// Document responses from other loaders (iframes) stop counting as the
    /// top-level document.
    pub fn set_main_loader(&mut self, loader_id: LoaderId) {
        debug!(%loader_id, "Main navigation loader set");
        self.main_loader = Some(loader_id);
    }

    /// Advances the state machine by one event.
    ///
    /// Returns a [`CompletedLoad`] when the event finishes a resource that
    /// has response metadata; its body still has to be fetched.
    pub fn handle(&mut self, event: NetworkEvent) -> Option<CompletedLoad> {
        match event {
            NetworkEvent::RequestWillBeSent {
                request_id,
                request,
                redirect_response,
                ..
            } => {
                if let Some(redirect) = redirect_response {
                    self.observe_redirect(&redirect, &request);
                }
                self.tracked
                    .insert(request_id, Tracked::Requested(RequestSnapshot::from(request)));
                None
            }

            NetworkEvent::ResponseReceived {
                request_id,
                loader_id,
                resource_type,
                response,
            } => {
                if resource_type == ResourceType::Document && !response.url.is_empty() {
                    trace!(%request_id, url = %response.url, "Document response");
                    self.documents.push(DocumentCandidate {
                        request_id: request_id.clone(),
                        loader_id: loader_id.clone(),
                        url: response.url.clone(),
                    });
                }

                let request = match self.tracked.remove(&request_id) {
                    Some(Tracked::Requested(snapshot)) => Some(snapshot),
                    Some(Tracked::Responded { request, .. }) => request,
                    None => None,
                };
                self.tracked.insert(
                    request_id,
                    Tracked::Responded {
                        request,
                        response,
                        loader_id,
                        resource_type,
                    },
                );
                None
            }

            NetworkEvent::LoadingFinished { request_id } => match self.tracked.remove(&request_id) {
                Some(Tracked::Responded {
                    request,
                    response,
                    loader_id,
                    resource_type,
                }) => Some(self.complete(request_id, request, response, &loader_id, resource_type)),
                Some(Tracked::Requested(_)) | None => {
                    trace!(%request_id, "Loading finished without response, ignored");
                    None
                }
            },

            NetworkEvent::LoadingFailed {
                request_id,
                error_text,
            } => {
                if self.tracked.remove(&request_id).is_some() {
                    debug!(%request_id, error = %error_text, "Loading failed");
                }
                None
            }
        }
    }

    /// Returns the number of requests still waiting for a response or body.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracked.len()
    }

    /// Returns the URL the top-level document resolved to, if one loaded.
    #[must_use]
    pub fn final_url(&self) -> Option<&str> {
        self.top_level_document().map(|d| d.url.as_str())
    }

    /// Returns the request id of the top-level document, if one loaded.
    #[must_use]
    pub fn document_request_id(&self) -> Option<&NetworkRequestId> {
        self.top_level_document().map(|d| &d.request_id)
    }

    /// Returns every redirect hop observed from the requested URL onward.
    #[inline]
    #[must_use]
    pub fn redirect_hops(&self) -> &[RedirectHop] {
        &self.redirect_hops
    }

    /// Returns the redirect observation when the document resolved elsewhere.
    ///
    /// URLs are compared after parsing, ignoring fragments, so
    /// `https://a.com` and `https://a.com/` are the same address.
    #[must_use]
    pub fn redirect_observation(&self) -> Option<RedirectObservation> {
        let final_url = self.final_url()?;
        if self.is_requested(final_url) {
            return None;
        }

        Some(RedirectObservation {
            original_url: self.requested_url.clone(),
            final_url: final_url.to_string(),
        })
    }

    fn top_level_document(&self) -> Option<&DocumentCandidate> {
        match self.main_loader {
            Some(ref main) => self.documents.iter().rev().find(|d| &d.loader_id == main),
            None => self.documents.first(),
        }
    }

    fn is_top_level_loader(&self, loader_id: &LoaderId) -> bool {
        match self.main_loader {
            Some(ref main) => main == loader_id,
            None => true,
        }
    }

    fn is_requested(&self, url: &str) -> bool {
        match (&self.requested, normalize(url)) {
            (Some(requested), Some(candidate)) => *requested == candidate,
            _ => self.requested_url == url,
        }
    }

    fn observe_redirect(&mut self, redirect: &NetworkResponse, next: &NetworkRequest) {
        let from_requested = self.is_requested(&redirect.url);
        let continues_chain = self.redirect_hops.iter().any(|hop| hop.to == redirect.url);
        if !from_requested && !continues_chain {
            return;
        }

        info!(
            from = %redirect.url,
            to = %next.url,
            status = redirect.status,
            "Redirect detected"
        );
        self.redirect_hops.push(RedirectHop {
            from: redirect.url.clone(),
            to: next.url.clone(),
            status: redirect.status,
        });
    }

    fn complete(
        &self,
        request_id: NetworkRequestId,
        request: Option<RequestSnapshot>,
        response: NetworkResponse,
        loader_id: &LoaderId,
        resource_type: ResourceType,
    ) -> CompletedLoad {
        let wire_headers = response.request_headers.filter(|h| !h.is_empty());

        let method = request
            .as_ref()
            .map(|r| r.method.clone())
            .filter(|m| !m.is_empty())
            .or_else(|| {
                wire_headers
                    .as_ref()
                    .and_then(|h| h.get_str(":method"))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "GET".to_string());

        let request_headers = wire_headers
            .or_else(|| request.map(|r| r.headers))
            .unwrap_or_default();

        CompletedLoad {
            is_top_level_document: resource_type == ResourceType::Document
                && self.is_top_level_loader(loader_id),
            request_id,
            url: response.url,
            method,
            request_headers,
            status: response.status,
            status_text: response.status_text,
            response_headers: response.headers,
        }
    }
}

impl From<NetworkRequest> for RequestSnapshot {
    fn from(request: NetworkRequest) -> Self {
        Self {
            method: request.method,
            headers: request.headers,
        }
    }
}

/// Parses a URL for comparison, dropping the fragment.
fn normalize(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw).ok()?;
    url.set_fragment(None);
    Some(url)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(id: &str, loader: &str, url: &str, method: &str) -> NetworkEvent {
        NetworkEvent::RequestWillBeSent {
            request_id: NetworkRequestId::new(id),
            loader_id: LoaderId::new(loader),
            request: NetworkRequest {
                url: url.to_string(),
                method: method.to_string(),
                headers: [("Accept", "*/*")].into_iter().collect(),
            },
            redirect_response: None,
            resource_type: ResourceType::Other,
        }
    }

    fn redirected(id: &str, from: &str, to: &str, status: u16) -> NetworkEvent {
        NetworkEvent::RequestWillBeSent {
            request_id: NetworkRequestId::new(id),
            loader_id: LoaderId::new(id),
            request: NetworkRequest {
                url: to.to_string(),
                method: "GET".to_string(),
                headers: Headers::new(),
            },
            redirect_response: Some(NetworkResponse {
                url: from.to_string(),
                status,
                ..NetworkResponse::default()
            }),
            resource_type: ResourceType::Document,
        }
    }

    fn received(id: &str, loader: &str, url: &str, resource_type: ResourceType) -> NetworkEvent {
        NetworkEvent::ResponseReceived {
            request_id: NetworkRequestId::new(id),
            loader_id: LoaderId::new(loader),
            resource_type,
            response: NetworkResponse {
                url: url.to_string(),
                status: 200,
                status_text: "OK".to_string(),
                headers: [("Content-Type", "text/html")].into_iter().collect(),
                ..NetworkResponse::default()
            },
        }
    }

    fn finished(id: &str) -> NetworkEvent {
        NetworkEvent::LoadingFinished {
            request_id: NetworkRequestId::new(id),
        }
    }

    #[test]
    fn test_pairs_response_with_finish() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com/");

        assert!(correlator.handle(sent("1", "1", "https://example.com/", "GET")).is_none());
        assert!(correlator
            .handle(received("1", "1", "https://example.com/", ResourceType::Document))
            .is_none());
        assert_eq!(correlator.in_flight(), 1);

        let load = correlator.handle(finished("1")).expect("completed");
        assert_eq!(load.url, "https://example.com/");
        assert_eq!(load.method, "GET");
        assert_eq!(load.request_headers.get_str("accept"), Some("*/*"));
        assert!(load.is_top_level_document);
        assert_eq!(correlator.in_flight(), 0);
    }

    #[test]
    fn test_interleaved_resources() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com/");

        correlator.handle(sent("a", "L", "https://example.com/a.css", "GET"));
        correlator.handle(sent("b", "L", "https://example.com/b.js", "GET"));
        correlator.handle(received("b", "L", "https://example.com/b.js", ResourceType::Other));
        correlator.handle(received("a", "L", "https://example.com/a.css", ResourceType::Other));

        let b = correlator.handle(finished("b")).expect("b");
        let a = correlator.handle(finished("a")).expect("a");
        assert_eq!(b.url, "https://example.com/b.js");
        assert_eq!(a.url, "https://example.com/a.css");
        assert!(!a.is_top_level_document);
    }

    #[test]
    fn test_duplicate_finish_ignored() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com/");
        correlator.handle(received("1", "1", "https://example.com/", ResourceType::Document));

        assert!(correlator.handle(finished("1")).is_some());
        assert!(correlator.handle(finished("1")).is_none());
    }

    #[test]
    fn test_finish_without_response_ignored() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com/");
        correlator.handle(sent("1", "1", "https://example.com/ping", "POST"));

        assert!(correlator.handle(finished("1")).is_none());
        assert!(correlator.handle(finished("unknown")).is_none());
        assert_eq!(correlator.in_flight(), 0);
    }

    #[test]
    fn test_loading_failed_drops_entry() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com/");
        correlator.handle(received("1", "1", "https://example.com/x", ResourceType::Other));
        correlator.handle(NetworkEvent::LoadingFailed {
            request_id: NetworkRequestId::new("1"),
            error_text: "net::ERR_ABORTED".to_string(),
        });

        assert_eq!(correlator.in_flight(), 0);
        assert!(correlator.handle(finished("1")).is_none());
    }

    #[test]
    fn test_response_without_request_defaults_get() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com/");
        correlator.handle(received("1", "1", "https://example.com/img.png", ResourceType::Other));

        let load = correlator.handle(finished("1")).expect("completed");
        assert_eq!(load.method, "GET");
        assert!(load.request_headers.is_empty());
    }

    #[test]
    fn test_wire_request_headers_preferred() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com/");
        correlator.handle(sent("1", "1", "https://example.com/", ""));

        let mut response = NetworkResponse {
            url: "https://example.com/".to_string(),
            status: 200,
            ..NetworkResponse::default()
        };
        response.request_headers = Some(
            [(":method", "HEAD"), ("user-agent", "Chrome")]
                .into_iter()
                .collect(),
        );
        correlator.handle(NetworkEvent::ResponseReceived {
            request_id: NetworkRequestId::new("1"),
            loader_id: LoaderId::new("1"),
            resource_type: ResourceType::Other,
            response,
        });

        let load = correlator.handle(finished("1")).expect("completed");
        assert_eq!(load.method, "HEAD");
        assert_eq!(load.request_headers.get_str("user-agent"), Some("Chrome"));
        assert!(load.request_headers.get("accept").is_none());
    }

    #[test]
    fn test_no_redirect() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com");
        correlator.handle(received("1", "1", "https://example.com/", ResourceType::Document));

        assert_eq!(correlator.final_url(), Some("https://example.com/"));
        assert!(correlator.redirect_observation().is_none());
    }

    #[test]
    fn test_redirect_chain_observed() {
        let mut correlator = NetworkEventCorrelator::new("http://example.com/old");

        correlator.handle(sent("1", "1", "http://example.com/old", "GET"));
        correlator.handle(redirected("1", "http://example.com/old", "https://example.com/old", 301));
        correlator.handle(redirected("1", "https://example.com/old", "https://example.com/new", 302));
        correlator.handle(redirected("9", "https://ads.example/x", "https://ads.example/y", 302));
        correlator.handle(received("1", "1", "https://example.com/new", ResourceType::Document));

        let hops = correlator.redirect_hops();
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[1].to, "https://example.com/new");

        let observation = correlator.redirect_observation().expect("redirect");
        assert_eq!(observation.original_url, "http://example.com/old");
        assert_eq!(observation.final_url, "https://example.com/new");
    }

    #[test]
    fn test_iframe_document_not_top_level() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com/");
        correlator.set_main_loader(LoaderId::new("MAIN"));

        correlator.handle(received("1", "MAIN", "https://example.com/", ResourceType::Document));
        correlator.handle(received("2", "FRAME", "https://widgets.example/", ResourceType::Document));

        assert_eq!(correlator.final_url(), Some("https://example.com/"));
        assert_eq!(correlator.document_request_id(), Some(&NetworkRequestId::new("1")));

        let iframe = correlator.handle(finished("2")).expect("iframe");
        assert!(!iframe.is_top_level_document);
        let main = correlator.handle(finished("1")).expect("main");
        assert!(main.is_top_level_document);
    }

    #[test]
    fn test_empty_document_url_ignored() {
        let mut correlator = NetworkEventCorrelator::new("https://example.com/");
        correlator.handle(received("1", "1", "", ResourceType::Document));
        assert!(correlator.final_url().is_none());
        assert!(correlator.redirect_observation().is_none());
    }
}
