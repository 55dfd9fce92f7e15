//! Streaming question answering over the loaded graph's summary statistics.

mod events;
mod provider;
mod relay;

use std::io::BufReader;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::community::GraphSummary;
use crate::config::AssistantConfig;

pub use events::StreamEvent;
use provider::{AssistantError, ChatRequest, Provider};
pub use relay::CANCELLED_MESSAGE;
use relay::relay_stream;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Longest silence tolerated from upstream, per read, before the reply fails.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Receiving end of one in-flight reply.
pub struct ChatHandle {
    rx: Receiver<StreamEvent>,
    cancel: Arc<AtomicBool>,
    finished: bool,
}

impl ChatHandle {
    /// Events received so far, in order. Stops at the terminal event.
    pub fn drain(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while !self.finished {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.finished = event.is_terminal();
                    events.push(event);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.finished = true;
                    events.push(StreamEvent::error("assistant worker disconnected"));
                }
            }
        }
        events
    }

    /// Blocks until the next event; `None` once the reply has finished.
    pub fn next_blocking(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        let event = self
            .rx
            .recv()
            .unwrap_or_else(|_| StreamEvent::error("assistant worker disconnected"));
        self.finished = event.is_terminal();
        Some(event)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// A handle fed by the returned sender instead of a worker thread.
    #[cfg(test)]
    pub(crate) fn detached() -> (Sender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        let handle = Self {
            rx,
            cancel: Arc::new(AtomicBool::new(false)),
            finished: false,
        };
        (tx, handle)
    }
}

fn open_stream(
    provider: &Provider,
    request: &ChatRequest,
) -> Result<reqwest::blocking::Response, AssistantError> {
    let api_key = provider.api_key()?;
    let client = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(READ_TIMEOUT)
        .build()?;

    let response = client
        .post(provider.url)
        .bearer_auth(api_key)
        .json(request)
        .send()?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(AssistantError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn run_chat(
    config: &AssistantConfig,
    summary: Option<&GraphSummary>,
    question: &str,
    cancel: &AtomicBool,
    tx: &Sender<StreamEvent>,
) {
    let emit = |event: StreamEvent| tx.send(event).is_ok();

    let provider = match Provider::resolve(config) {
        Ok(provider) => provider,
        Err(error) => {
            emit(StreamEvent::error(error.to_string()));
            return;
        }
    };

    log::info!("assistant request via {} ({})", provider.name, provider.model);
    log::debug!("assistant question: {question}");
    if !emit(StreamEvent::Init {
        provider: provider.name.to_owned(),
        model: provider.model.to_owned(),
    }) {
        return;
    }

    let request = ChatRequest::new(&provider, config, summary, question);
    match open_stream(&provider, &request) {
        Ok(response) => relay_stream(BufReader::new(response), cancel, emit),
        Err(error) => {
            log::warn!("assistant request failed: {error}");
            emit(StreamEvent::error(error.to_string()));
        }
    }
}

/// Starts a reply on a worker thread.
pub fn spawn_chat(
    config: AssistantConfig,
    summary: Option<GraphSummary>,
    question: String,
) -> ChatHandle {
    let (tx, rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = Arc::clone(&cancel);

    thread::spawn(move || {
        run_chat(&config, summary.as_ref(), &question, &worker_cancel, &tx);
    });

    ChatHandle {
        rx,
        cancel,
        finished: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_fails_with_a_single_error() {
        let config = AssistantConfig {
            provider: Some("nobody".to_owned()),
            ..AssistantConfig::default()
        };
        let mut handle = spawn_chat(config, None, "hi".to_owned());

        let event = handle.next_blocking().unwrap();
        assert!(matches!(&event, StreamEvent::Error { message } if message.contains("nobody")));
        assert!(handle.is_finished());
        assert!(handle.next_blocking().is_none());
        assert!(handle.drain().is_empty());
    }

    #[test]
    fn dropped_handle_stops_the_sender() {
        let (tx, mut handle) = ChatHandle::detached();
        assert!(handle.drain().is_empty());
        handle.cancel();
        assert!(handle.cancel.load(Ordering::Relaxed));
        drop(handle);
        assert!(tx.send(StreamEvent::Done).is_err());
    }
}
