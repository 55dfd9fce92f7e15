use serde::{Deserialize, Serialize};

/// One server-push frame of an assistant reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Init { provider: String, model: String },
    Content { content: String },
    Done,
    Error { message: String },
}

impl StreamEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }

    /// `data: <json>` followed by a blank line.
    pub fn encode_frame(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("data: {json}\n\n"),
            Err(error) => {
                log::error!("failed to encode stream event: {error}");
                "data: {\"type\":\"error\",\"message\":\"encoding failed\"}\n\n".to_owned()
            }
        }
    }
}
