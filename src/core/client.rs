//! Client for the Gemini content-generation API with a relay fallback.
//!
//! One [`AiClient`] is built at start-up and shared by reference. When no API
//! credential is configured every request goes to the credential-free relay
//! instead of the provider.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::api::relay::{extract_relay_answer, relay_request_url};
use crate::api::transport::{HttpTransport, ReqwestTransport, TransportError};
use crate::api::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::core::chat_stream::{format_api_error, parse_sse_line, SseLineDecoder, StreamEvent};
use crate::core::config::Config;
use crate::core::constants::{
    EMPTY_ANSWER_DIAGNOSTIC, RELAY_DIAGNOSTIC, SYSTEM_INSTRUCTION, TEMPERATURE, TOP_K, TOP_P,
};
use crate::core::message::{HistoryTurn, Role};
use crate::utils::url::construct_api_url;

const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// The API key, resolved once from the environment.
#[derive(Clone, Default)]
pub struct Credential(Option<String>);

impl Credential {
    pub fn from_env() -> Self {
        Self::resolve(API_KEY_VARS.iter().map(|var| std::env::var(var).ok()))
    }

    /// First non-blank candidate wins.
    pub fn resolve(candidates: impl IntoIterator<Item = Option<String>>) -> Self {
        Self(
            candidates
                .into_iter()
                .flatten()
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty()),
        )
    }

    pub fn new(key: impl Into<String>) -> Self {
        Self::resolve([Some(key.into())])
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    fn key(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Credential(<redacted>)"),
            None => f.write_str("Credential(None)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub model: String,
    pub base_url: String,
    pub relay_url: String,
    pub relay_param: String,
    /// Longest silence tolerated between two chunks of a streamed answer.
    pub stream_idle_timeout: Duration,
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model().to_string(),
            base_url: config.base_url().to_string(),
            relay_url: config.relay_url().to_string(),
            relay_param: config.relay_param().to_string(),
            stream_idle_timeout: config.request_timeout(),
        }
    }
}

#[derive(Debug)]
pub enum ClientError {
    /// The request never produced a response.
    Transport(TransportError),
    /// The provider answered with an error status or error payload.
    Provider { status: u16, message: String },
    /// The provider response could not be decoded.
    Decode(String),
    /// The provider answered, but with no text.
    EmptyAnswer,
    /// A streamed answer went silent for longer than the idle timeout.
    Stalled(Duration),
    /// The relay fallback failed.
    Relay(String),
}

impl ClientError {
    /// Text shown in the transcript in place of an answer.
    pub fn diagnostic(&self) -> String {
        match self {
            ClientError::Transport(err) => {
                format!("The model could not be reached ({err}). Please try again.")
            }
            ClientError::Provider { message, .. } => message.clone(),
            ClientError::Decode(detail) => {
                format!("The model sent a response that could not be read: {detail}")
            }
            ClientError::EmptyAnswer => EMPTY_ANSWER_DIAGNOSTIC.to_string(),
            ClientError::Stalled(after) => format!(
                "The answer stream stalled for {}s and was abandoned. Please try again.",
                after.as_secs()
            ),
            ClientError::Relay(_) => RELAY_DIAGNOSTIC.to_string(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(err) => write!(f, "transport error: {err}"),
            ClientError::Provider { status, message } => {
                write!(f, "provider error (status {status}): {message}")
            }
            ClientError::Decode(detail) => write!(f, "undecodable response: {detail}"),
            ClientError::EmptyAnswer => f.write_str("empty answer"),
            ClientError::Stalled(after) => write!(f, "stream idle for {after:?}"),
            ClientError::Relay(detail) => write!(f, "relay error: {detail}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

pub struct AiClient {
    settings: ClientSettings,
    credential: Credential,
    transport: Arc<dyn HttpTransport>,
}

impl AiClient {
    pub fn new(
        settings: ClientSettings,
        credential: Credential,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            settings,
            credential,
            transport,
        }
    }

    /// Production client over reqwest.
    pub fn from_config(config: &Config, credential: Credential) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::new(
            ClientSettings::from_config(config),
            credential,
            Arc::new(transport),
        ))
    }

    pub fn uses_relay(&self) -> bool {
        !self.credential.is_configured()
    }

    /// Prior turns in order, the new prompt last, plus the fixed persona and
    /// sampling parameters.
    pub fn build_request(&self, prompt: &str, history: &[HistoryTurn]) -> GenerateContentRequest {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content::turn(turn.role.to_api_role(), turn.text.clone()))
            .collect();
        contents.push(Content::turn(Role::User.to_api_role(), prompt));

        GenerateContentRequest {
            contents,
            system_instruction: Content::instruction(SYSTEM_INSTRUCTION),
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                top_k: TOP_K,
            },
        }
    }

    fn endpoint(&self, method: &str) -> String {
        construct_api_url(
            &self.settings.base_url,
            &format!("models/{}:{}", self.settings.model, method),
        )
    }

    fn request_body(
        &self,
        prompt: &str,
        history: &[HistoryTurn],
    ) -> Result<serde_json::Value, ClientError> {
        serde_json::to_value(self.build_request(prompt, history))
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Generate an answer for display. Failures come back as a diagnostic
    /// string rather than an error.
    pub async fn generate(&self, prompt: &str, history: &[HistoryTurn]) -> String {
        match self.try_generate(prompt, history).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, relay = self.uses_relay(), "Generation failed");
                err.diagnostic()
            }
        }
    }

    pub async fn try_generate(
        &self,
        prompt: &str,
        history: &[HistoryTurn],
    ) -> Result<String, ClientError> {
        let Some(key) = self.credential.key() else {
            return self.ask_relay(prompt).await;
        };

        let url = self.endpoint("generateContent");
        let body = self.request_body(prompt, history)?;
        let headers = [("x-goog-api-key", key.to_string())];
        debug!(model = %self.settings.model, turns = history.len() + 1, "Sending generateContent");

        let reply = self
            .transport
            .post_json(&url, &headers, &body)
            .await
            .map_err(ClientError::Transport)?;

        if !reply.is_success() {
            return Err(ClientError::Provider {
                status: reply.status,
                message: format_api_error(&reply.body),
            });
        }

        let response: GenerateContentResponse =
            serde_json::from_str(&reply.body).map_err(|e| ClientError::Decode(e.to_string()))?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(ClientError::EmptyAnswer);
        }
        Ok(text)
    }

    /// Generate an answer incrementally, handing each text delta to
    /// `on_chunk` in arrival order. Returns the full answer.
    pub async fn stream_generate<F>(
        &self,
        prompt: &str,
        history: &[HistoryTurn],
        mut on_chunk: F,
    ) -> Result<String, ClientError>
    where
        F: FnMut(&str) + Send,
    {
        let Some(key) = self.credential.key() else {
            let answer = self.ask_relay(prompt).await?;
            on_chunk(&answer);
            return Ok(answer);
        };

        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let body = self.request_body(prompt, history)?;
        let headers = [("x-goog-api-key", key.to_string())];
        debug!(model = %self.settings.model, turns = history.len() + 1, "Sending streamGenerateContent");

        // The idle bound also covers the wait for response headers.
        let idle = self.settings.stream_idle_timeout;
        let reply = tokio::time::timeout(
            idle,
            self.transport.post_json_streaming(&url, &headers, &body),
        )
        .await
        .map_err(|_| ClientError::Stalled(idle))?
        .map_err(ClientError::Transport)?;

        if !reply.is_success() {
            let status = reply.status;
            let error_text = tokio::time::timeout(idle, reply.into_text())
                .await
                .map_err(|_| ClientError::Stalled(idle))?;
            return Err(ClientError::Provider {
                status,
                message: format_api_error(&error_text),
            });
        }

        let mut stream = reply.body;
        let mut decoder = SseLineDecoder::default();
        let mut full = String::new();

        loop {
            let next = tokio::time::timeout(idle, stream.next())
                .await
                .map_err(|_| ClientError::Stalled(idle))?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(ClientError::Transport)?;
            for line in decoder.push(&chunk) {
                apply_sse_line(&line, &mut full, &mut on_chunk)?;
            }
        }
        if let Some(line) = decoder.finish() {
            apply_sse_line(&line, &mut full, &mut on_chunk)?;
        }

        if full.trim().is_empty() {
            return Err(ClientError::EmptyAnswer);
        }
        Ok(full)
    }

    async fn ask_relay(&self, prompt: &str) -> Result<String, ClientError> {
        let url = relay_request_url(&self.settings.relay_url, &self.settings.relay_param, prompt)
            .map_err(ClientError::Relay)?;
        debug!(relay = %self.settings.relay_url, "No API key configured, asking relay");

        let reply = self
            .transport
            .get(url.as_str())
            .await
            .map_err(|e| ClientError::Relay(e.to_string()))?;

        if !reply.is_success() {
            return Err(ClientError::Relay(format!(
                "relay answered with status {}",
                reply.status
            )));
        }

        extract_relay_answer(&reply.body)
            .ok_or_else(|| ClientError::Relay("relay returned an empty body".to_string()))
    }
}

fn apply_sse_line<F>(line: &str, full: &mut String, on_chunk: &mut F) -> Result<(), ClientError>
where
    F: FnMut(&str),
{
    match parse_sse_line(line) {
        Some(StreamEvent::Text(text)) if !text.is_empty() => {
            on_chunk(&text);
            full.push_str(&text);
            Ok(())
        }
        Some(StreamEvent::Error(message)) => Err(ClientError::Provider {
            status: 200,
            message,
        }),
        _ => Ok(()),
    }
}
