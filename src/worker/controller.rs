//! Offline cache controller: intercepts outbound requests and applies a
//! caching strategy per request class.
//!
//! Lifecycle mirrors a background worker generation: `install` precaches
//! the application shell, `activate` garbage-collects caches left behind
//! by earlier generations and starts serving. A waiting generation can be
//! pushed into activation by a `SKIP_WAITING` client message.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

use super::cache::{CacheStore, StoredResponse};
use super::classify::{FetchRequest, RequestClass, classify};
use super::messages::{ClientMessage, WorkerEvent};

/// Current static cache generation
pub const STATIC_CACHE: &str = "scribe-static-v1";
/// Current dynamic cache generation
pub const DYNAMIC_CACHE: &str = "scribe-dynamic-v1";

/// The minimal asset set needed to boot the application offline
pub const APP_SHELL: &[&str] = &[
    "/",
    "/index.html",
    "/styles.css",
    "/app.js",
    "/manifest.json",
    "/icons/icon-192x192.png",
    "/icons/icon-512x512.png",
];

/// Shell entry served when a navigation request fails entirely
const SHELL_DOCUMENT: &str = "/index.html";

/// Network seam for the worker context
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse>;
}

/// Production fetcher backed by reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteFetch for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = response.bytes().await?.to_vec();

        Ok(StoredResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Worker generation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, shell not yet cached
    New,
    /// Shell cached, waiting to take over request handling
    Waiting,
    /// Handling requests
    Active,
}

/// Intercepts requests and serves them from cache, network, or a
/// synthesized offline response
pub struct OfflineController {
    cache: CacheStore,
    fetcher: Arc<dyn RemoteFetch>,
    api_host: String,
    shell: Vec<String>,
    state: Mutex<WorkerState>,
    events: Option<broadcast::Sender<WorkerEvent>>,
}

impl OfflineController {
    pub fn new(cache: CacheStore, fetcher: Arc<dyn RemoteFetch>, api_host: impl Into<String>) -> Self {
        Self {
            cache,
            fetcher,
            api_host: api_host.into(),
            shell: APP_SHELL.iter().map(|s| s.to_string()).collect(),
            state: Mutex::new(WorkerState::New),
            events: None,
        }
    }

    /// Replace the default application-shell manifest
    pub fn with_shell(mut self, shell: Vec<String>) -> Self {
        self.shell = shell;
        self
    }

    /// Broadcast informational events to application contexts
    pub fn with_events(mut self, events: broadcast::Sender<WorkerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// The cache store this controller serves from
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Precache the application shell. The worker may not activate until
    /// every manifest entry is cached; any failure fails the install.
    pub async fn install(&self) -> Result<()> {
        info!("Installing worker: caching {} shell assets", self.shell.len());

        for asset in &self.shell {
            let response = self.fetcher.fetch(&FetchRequest::get(asset.clone())).await?;
            if !response.is_success() {
                return Err(Error::Cache(format!(
                    "Failed to cache shell asset {}: HTTP {}",
                    asset, response.status
                )));
            }
            self.cache.put(STATIC_CACHE, asset, &response)?;
        }

        *self.state.lock() = WorkerState::Waiting;
        info!("Static files cached, worker waiting");
        Ok(())
    }

    /// Take over request handling: drop every cache generation that is
    /// not the current static or dynamic cache, then mark active.
    /// Returns the number of caches removed.
    pub fn activate(&self) -> Result<usize> {
        let mut deleted = 0;
        for name in self.cache.cache_names()? {
            if name != STATIC_CACHE && name != DYNAMIC_CACHE {
                info!("Deleting old cache: {}", name);
                self.cache.delete_cache(&name)?;
                deleted += 1;
            }
        }

        *self.state.lock() = WorkerState::Active;
        info!("Worker activated");
        Ok(deleted)
    }

    /// Handle a message from an application context
    pub fn handle_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::SkipWaiting => {
                if self.state() == WorkerState::Waiting {
                    if let Err(e) = self.activate() {
                        error!("Skip-waiting activation failed: {e}");
                    }
                }
            }
        }
    }

    /// Intercept one request and resolve it.
    ///
    /// Never fails: cache faults degrade to a network pass-through, and
    /// network faults resolve to a synthesized offline response.
    pub async fn handle_fetch(&self, request: FetchRequest) -> StoredResponse {
        match classify(&request, &self.api_host) {
            RequestClass::Api => self.handle_api(request).await,
            RequestClass::Static => self.handle_static(request).await,
            RequestClass::Bypass => match self.fetcher.fetch(&request).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Pass-through request failed: {e}");
                    offline_static_response()
                }
            },
        }
    }

    /// Network-first strategy for provider calls. Successful capability
    /// listings are copied into the dynamic cache as a degraded fallback.
    async fn handle_api(&self, request: FetchRequest) -> StoredResponse {
        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_success() && is_models_request(&request.url) {
                    match self.cache.put(DYNAMIC_CACHE, &request.url, &response) {
                        Ok(()) => self.emit(WorkerEvent::CacheUpdate),
                        Err(e) => warn!("Failed to cache model listing: {e}"),
                    }
                }
                response
            }
            Err(e) => {
                error!("API request failed: {e}");

                if is_models_request(&request.url) {
                    match self.cache.lookup(&request.url, &[STATIC_CACHE, DYNAMIC_CACHE]) {
                        Ok(Some(cached)) => {
                            debug!("Serving model listing from cache");
                            return cached;
                        }
                        Ok(None) => {}
                        Err(e) => warn!("Cache lookup failed: {e}"),
                    }
                }

                offline_api_response()
            }
        }
    }

    /// Cache-first strategy for static assets, with the cached shell as a
    /// last resort for navigations.
    async fn handle_static(&self, request: FetchRequest) -> StoredResponse {
        match self.cache.lookup(&request.url, &[STATIC_CACHE, DYNAMIC_CACHE]) {
            Ok(Some(cached)) => {
                debug!("Serving from cache: {}", request.url);
                return cached;
            }
            Ok(None) => {}
            Err(e) => warn!("Cache lookup failed: {e}"),
        }

        debug!("Fetching from network: {}", request.url);
        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_success() {
                    match self.cache.put(DYNAMIC_CACHE, &request.url, &response) {
                        Ok(()) => self.emit(WorkerEvent::CacheUpdate),
                        Err(e) => warn!("Failed to cache {}: {e}", request.url),
                    }
                }
                response
            }
            Err(e) => {
                error!("Request failed: {e}");

                if request.navigation {
                    if let Ok(Some(shell)) =
                        self.cache.lookup(SHELL_DOCUMENT, &[STATIC_CACHE, DYNAMIC_CACHE])
                    {
                        return shell;
                    }
                }

                offline_static_response()
            }
        }
    }

    fn emit(&self, event: WorkerEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Whether a provider URL targets the capability-listing endpoint
fn is_models_request(url: &str) -> bool {
    url.contains("/models")
}

/// Synthesized response for provider calls made while offline
fn offline_api_response() -> StoredResponse {
    StoredResponse {
        status: 503,
        content_type: "application/json".to_string(),
        body: br#"{"error":"Network unavailable","message":"Please check your internet connection"}"#
            .to_vec(),
    }
}

/// Synthesized response for asset fetches made while offline
fn offline_static_response() -> StoredResponse {
    StoredResponse {
        status: 503,
        content_type: "text/plain".to_string(),
        body: b"Offline - Content not available".to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_request_detection() {
        assert!(is_models_request("https://api.groq.com/openai/v1/models"));
        assert!(!is_models_request(
            "https://api.groq.com/openai/v1/audio/transcriptions"
        ));
    }

    #[test]
    fn test_offline_api_response_shape() {
        let response = offline_api_response();
        assert_eq!(response.status, 503);

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "Network unavailable");
    }
}
