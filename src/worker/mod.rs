//! Background worker context: request interception with per-class cache
//! strategies, and reconnect-triggered replay of failed transcription
//! requests.
//!
//! The worker shares nothing with the application context except the
//! durable store and the message protocol in [`messages`].
mod cache;
mod classify;
mod controller;
mod messages;
mod retry;

pub use cache::{CacheStore, StoredResponse};
pub use classify::{FetchRequest, RequestClass, classify};
pub use controller::{
    APP_SHELL, DYNAMIC_CACHE, HttpFetcher, OfflineController, RemoteFetch, STATIC_CACHE,
    WorkerState,
};
pub use messages::{ClientMessage, WorkerEvent};
pub use retry::RetryQueue;
