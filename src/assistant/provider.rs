use serde::Serialize;
use thiserror::Error;

use crate::community::GraphSummary;
use crate::config::AssistantConfig;

pub const DEFAULT_PROVIDER: &str = "deepseek";
pub const PROVIDER_ENV: &str = "AI_PROVIDER";
const DEFAULT_MAX_TOKENS: u32 = 800;
const DEFAULT_TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You analyse community event networks. Members initiate and \
participate in events, and spaces host them. Trace how initiators grow the community, \
which participants become connectors, and which spaces and times matter most. Answer \
concisely and cite the figures below when the user asks about the data.";

const NO_DATA_PROMPT: &str = "No graph is loaded yet. Ask the user to load an event table first.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("unsupported assistant provider: {0}")]
    UnknownProvider(String),

    #[error("missing API key for {provider}, set {env}")]
    MissingKey { provider: String, env: &'static str },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Provider {
    pub name: &'static str,
    pub url: &'static str,
    pub model: &'static str,
    pub key_env: &'static str,
}

pub const PROVIDERS: [Provider; 2] = [
    Provider {
        name: "deepseek",
        url: "https://api.deepseek.com/chat/completions",
        model: "deepseek-chat",
        key_env: "DEEPSEEK_API_KEY",
    },
    Provider {
        name: "gemini",
        url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
        model: "gemini-2.0-flash",
        key_env: "GEMINI_API_KEY",
    },
];

impl Provider {
    pub fn by_name(name: &str) -> Result<Self, AssistantError> {
        let wanted = name.trim().to_ascii_lowercase();
        PROVIDERS
            .iter()
            .copied()
            .find(|provider| provider.name == wanted)
            .ok_or_else(|| AssistantError::UnknownProvider(name.to_owned()))
    }

    /// Config wins over `AI_PROVIDER`, which wins over the default.
    pub fn resolve(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let name = config
            .provider
            .clone()
            .or_else(|| std::env::var(PROVIDER_ENV).ok())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_owned());
        Self::by_name(&name)
    }

    pub fn api_key(&self) -> Result<String, AssistantError> {
        std::env::var(self.key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AssistantError::MissingKey {
                provider: self.name.to_owned(),
                env: self.key_env,
            })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// OpenAI-compatible streaming chat body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: &'static str,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(
        provider: &Provider,
        config: &AssistantConfig,
        summary: Option<&GraphSummary>,
        question: &str,
    ) -> Self {
        let context = match summary {
            Some(summary) if summary.node_count() > 0 => summary.to_context(),
            _ => NO_DATA_PROMPT.to_owned(),
        };

        Self {
            model: provider.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: format!("{SYSTEM_PROMPT}\n\n{context}"),
                },
                ChatMessage {
                    role: "user",
                    content: question.to_owned(),
                },
            ],
            stream: true,
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::sample_graph;

    #[test]
    fn looks_up_known_providers() {
        assert_eq!(Provider::by_name("Gemini").unwrap().model, "gemini-2.0-flash");
        assert!(matches!(
            Provider::by_name("openai"),
            Err(AssistantError::UnknownProvider(name)) if name == "openai"
        ));
    }

    #[test]
    fn configured_provider_wins() {
        let config = AssistantConfig {
            provider: Some("gemini".to_owned()),
            ..AssistantConfig::default()
        };
        assert_eq!(Provider::resolve(&config).unwrap().name, "gemini");
    }

    #[test]
    fn request_body_carries_defaults_and_context() {
        let summary = GraphSummary::from_graph(&sample_graph().unwrap());
        let provider = Provider::by_name("deepseek").unwrap();
        let request = ChatRequest::new(&provider, &AssistantConfig::default(), Some(&summary), "who?");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 800);
        assert_eq!(body["messages"][1]["content"], "who?");
        assert!(
            body["messages"][0]["content"]
                .as_str()
                .unwrap()
                .contains("Events per space")
        );
    }

    #[test]
    fn empty_graph_asks_for_data() {
        let provider = Provider::by_name("deepseek").unwrap();
        let request = ChatRequest::new(&provider, &AssistantConfig::default(), None, "hello");
        assert!(request.messages[0].content.contains("No graph is loaded"));
    }
}
