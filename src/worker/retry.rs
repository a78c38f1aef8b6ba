//! Durable replay of transcription requests that failed while offline.
//!
//! Entries wait in the failed-request collection until a reconnect signal
//! arrives; a drain pass then replays them oldest first. There is no
//! backoff and no retry cap: an entry stays queued until a replay
//! succeeds or the queue is cleared.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use crate::providers::TranscriptionResponse;
use crate::service::StorageService;
use crate::types::{NewTranscription, RequestDescriptor, now_millis};

use super::classify::FetchRequest;
use super::controller::RemoteFetch;
use super::messages::WorkerEvent;

/// Replays queued transcription requests once connectivity returns
pub struct RetryQueue {
    storage: Arc<StorageService>,
    fetcher: Arc<dyn RemoteFetch>,
    events: broadcast::Sender<WorkerEvent>,
}

impl RetryQueue {
    pub fn new(storage: Arc<StorageService>, fetcher: Arc<dyn RemoteFetch>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            storage,
            fetcher,
            events,
        }
    }

    /// Listen for events emitted on successful replays
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Sender half of the event channel, for sharing with the controller
    pub fn events(&self) -> broadcast::Sender<WorkerEvent> {
        self.events.clone()
    }

    /// Persist a failed request for later replay. Returns the queue id.
    pub fn enqueue(&self, descriptor: RequestDescriptor, body: Vec<u8>) -> Option<String> {
        self.storage.enqueue_failed_request(descriptor, body)
    }

    /// Replay every queued entry once, oldest first. Entries whose replay
    /// fails stay queued for the next pass. Returns the number of entries
    /// replayed successfully.
    pub async fn drain(&self) -> usize {
        let pending = self.storage.pending_failed_requests();
        if pending.is_empty() {
            return 0;
        }
        info!("Replaying {} queued transcription request(s)", pending.len());

        let mut replayed = 0;
        for entry in pending {
            let mut request = FetchRequest::post(entry.descriptor.url.clone(), entry.body.clone());
            request.headers = entry.descriptor.headers.clone();

            let response = match self.fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => response,
                Ok(response) => {
                    warn!("Replay of {} failed: HTTP {}", entry.id, response.status);
                    continue;
                }
                Err(e) => {
                    warn!("Replay of {} failed: {e}", entry.id);
                    continue;
                }
            };

            let result: TranscriptionResponse = match serde_json::from_slice(&response.body) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Replay of {} returned an unreadable body: {e}", entry.id);
                    continue;
                }
            };

            let stored = self.storage.store_transcription(NewTranscription {
                id: Some(entry.id.clone()),
                filename: format!("transcription-{}.txt", now_millis()),
                original_name: entry.descriptor.original_name.clone(),
                text: result.text.clone(),
                model: entry.descriptor.model.clone(),
                language: entry.descriptor.language.clone(),
                duration: None,
                file_size: entry.descriptor.file_size,
            });
            if stored.is_none() {
                warn!("Replay of {} succeeded but the result was not stored", entry.id);
                continue;
            }

            self.storage.remove_failed_request(&entry.id);
            let _ = self.events.send(WorkerEvent::TranscriptionCompleted {
                id: entry.id.clone(),
                data: result,
            });
            replayed += 1;
        }

        replayed
    }

    /// Drain once per reconnect signal until the channel closes
    pub async fn run(&self, mut reconnect: mpsc::Receiver<()>) {
        while reconnect.recv().await.is_some() {
            self.drain().await;
        }
    }
}
