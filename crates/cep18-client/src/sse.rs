//! Node event stream.
//!
//! [`listener`] connects to the SSE endpoint and yields decoded [`SseEvent`]s in arrival order.
//! Payload decoding runs off the connection task so a large `Step` event does not stall the
//! stream.
pub mod config;
pub mod event;

use std::path::{Path, PathBuf};

use async_stream::stream;
use futures::{Stream, StreamExt};
use reqwest_eventsource::{Event, EventSource};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::sse::{config::ListenerConfig, event::SseEvent};

const CHANNEL_CAPACITY: usize = 256;
const START_FROM_PARAM: &str = "start_from";

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("unexpected SSE event type: {0}")]
    UnexpectedEventType(String),
    #[error("failed to decode SSE event payload: {head}")]
    Decode {
        head: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("event source error: {0}")]
    EventSource(#[from] reqwest_eventsource::Error),
    #[error("blocking task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Opens the event stream described by `config`.
///
/// Dropping the returned stream stops both background tasks.
pub async fn listener(
    config: ListenerConfig,
) -> Result<impl Stream<Item = Result<SseEvent, ListenerError>>, ListenerError> {
    info!("Starting listener for {}", config.endpoint());

    let resume_path = config.resume_path().map(PathBuf::from);
    let mut url = config.endpoint().clone();
    if let Some(path) = resume_path.as_deref()
        && let Some(last_id) = read_last_event_id(path).await
    {
        debug!("Resuming after event {last_id}");
        url.query_pairs_mut().append_pair(START_FROM_PARAM, &last_id);
    }

    let (tx, mut rx) = mpsc::channel::<Result<SseEvent, ListenerError>>(CHANNEL_CAPACITY);
    let (raw_tx, raw_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    tokio::spawn(decode_events(raw_rx, tx.clone()));
    tokio::spawn(receive_events(url, resume_path, raw_tx, tx));

    Ok(stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
    })
}

async fn read_last_event_id(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let last_id = content.trim();
            if last_id.is_empty() {
                debug!("Resume file is empty, starting from the live tip");
                None
            } else {
                Some(last_id.to_string())
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("Resume file not found at {}", path.display());
            None
        }
        Err(err) => {
            warn!("Failed to read resume file at {}: {:?}", path.display(), err);
            None
        }
    }
}

fn decode(data: String) -> Result<SseEvent, ListenerError> {
    serde_json::from_str::<SseEvent>(&data).map_err(|source| ListenerError::Decode {
        head: data.chars().take(100).collect(),
        source,
    })
}

async fn decode_events(
    mut raw_rx: mpsc::Receiver<String>,
    tx: mpsc::Sender<Result<SseEvent, ListenerError>>,
) {
    while let Some(data) = raw_rx.recv().await {
        let decoded = tokio::task::spawn_blocking(move || decode(data))
            .await
            .unwrap_or_else(|err| Err(ListenerError::TaskJoin(err)));
        if tx.send(decoded).await.is_err() {
            break;
        }
    }
}

async fn receive_events(
    url: Url,
    resume_path: Option<PathBuf>,
    raw_tx: mpsc::Sender<String>,
    tx: mpsc::Sender<Result<SseEvent, ListenerError>>,
) {
    let mut source = EventSource::get(url.as_str());
    trace!("Starting to receive events");

    while let Some(event) = source.next().await {
        match event {
            Ok(Event::Open) => info!("Connection opened"),
            Ok(Event::Message(message)) => {
                if message.event != "message" {
                    let _ = tx
                        .send(Err(ListenerError::UnexpectedEventType(message.event)))
                        .await;
                    break;
                }

                if let Some(path) = resume_path.as_deref() {
                    if message.id.is_empty() {
                        debug!("Event has no id, resume file left unchanged");
                    } else if let Err(err) = tokio::fs::write(path, &message.id).await {
                        error!("Failed to write event id to resume file: {:?}", err);
                    }
                }

                // Order is kept by the single decoder task.
                if raw_tx.send(message.data).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                error!("Error receiving event: {:?}", err);
                let _ = tx.send(Err(ListenerError::EventSource(err))).await;
                break;
            }
        }
    }

    source.close();
    trace!("Event stream ended");
}
