use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

use super::events::StreamEvent;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";
pub const CANCELLED_MESSAGE: &str = "request cancelled";

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

fn chunk_content(payload: &str) -> Result<Option<String>, serde_json::Error> {
    let chunk: Chunk = serde_json::from_str(payload)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

/// Turns an upstream completion stream into typed events.
///
/// Emits exactly one terminal event. Returns early, without reading further, when
/// `cancel` is raised or `emit` reports that nobody is listening.
pub fn relay_stream<R: BufRead>(
    reader: R,
    cancel: &AtomicBool,
    mut emit: impl FnMut(StreamEvent) -> bool,
) {
    for line in reader.lines() {
        if cancel.load(Ordering::Relaxed) {
            emit(StreamEvent::error(CANCELLED_MESSAGE));
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(error) => {
                log::warn!("assistant stream read failed: {error}");
                emit(StreamEvent::error(format!("stream read failed: {error}")));
                return;
            }
        };

        let Some(payload) = line.trim().strip_prefix(DATA_PREFIX) else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            continue;
        }
        if payload == DONE_MARKER {
            emit(StreamEvent::Done);
            return;
        }

        match chunk_content(payload) {
            Ok(Some(content)) => {
                if !emit(StreamEvent::Content { content }) {
                    return;
                }
            }
            Ok(None) => {}
            Err(error) => log::debug!("skipping unparseable chunk: {error}"),
        }
    }

    if cancel.load(Ordering::Relaxed) {
        emit(StreamEvent::error(CANCELLED_MESSAGE));
    } else {
        emit(StreamEvent::Done);
    }
}
