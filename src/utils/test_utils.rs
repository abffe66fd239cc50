use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::api::transport::{
    ByteStream, Headers, HttpReply, HttpTransport, StreamingReply, TransportError,
};
use crate::core::client::{AiClient, ClientSettings, Credential};
use crate::core::message::Message;
use crate::core::session::Session;

pub const TEST_BASE_URL: &str = "https://api.test.com/v1beta";
pub const TEST_RELAY_URL: &str = "https://relay.test.com/ask";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

enum StreamScript {
    Reply(u16, Vec<Vec<u8>>),
    /// Sends `chunks`, then holds the body open without another byte.
    StallBody(u16, Vec<Vec<u8>>),
    /// Never answers with headers.
    StallHeaders,
    Fail(TransportError),
}

/// Transport that replays queued replies and records every request.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    post_replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    stream_replies: Mutex<VecDeque<StreamScript>>,
    get_replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(self, status: u16, body: &str) -> Self {
        self.post_replies.lock().unwrap().push_back(Ok(HttpReply {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn with_post_error(self, message: &str) -> Self {
        self.post_replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError(message.to_string())));
        self
    }

    pub fn with_get(self, status: u16, body: &str) -> Self {
        self.get_replies.lock().unwrap().push_back(Ok(HttpReply {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn with_get_error(self, message: &str) -> Self {
        self.get_replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError(message.to_string())));
        self
    }

    pub fn with_stream(self, status: u16, chunks: &[&str]) -> Self {
        let chunks = chunks.iter().map(|c| c.as_bytes().to_vec()).collect();
        self.stream_replies
            .lock()
            .unwrap()
            .push_back(StreamScript::Reply(status, chunks));
        self
    }

    pub fn with_stalled_stream(self, status: u16, chunks: &[&str]) -> Self {
        let chunks = chunks.iter().map(|c| c.as_bytes().to_vec()).collect();
        self.stream_replies
            .lock()
            .unwrap()
            .push_back(StreamScript::StallBody(status, chunks));
        self
    }

    pub fn with_silent_server(self) -> Self {
        self.stream_replies
            .lock()
            .unwrap()
            .push_back(StreamScript::StallHeaders);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    fn record(
        &self,
        method: &'static str,
        url: &str,
        headers: Headers<'_>,
        body: Option<&serde_json::Value>,
    ) {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
            body: body.cloned(),
        });
    }

    fn unscripted() -> TransportError {
        TransportError("no reply scripted".to_string())
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: Headers<'_>,
        body: &serde_json::Value,
    ) -> Result<HttpReply, TransportError> {
        self.record("POST", url, headers, Some(body));
        self.post_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn post_json_streaming(
        &self,
        url: &str,
        headers: Headers<'_>,
        body: &serde_json::Value,
    ) -> Result<StreamingReply, TransportError> {
        self.record("POST_STREAM", url, headers, Some(body));
        let script = self
            .stream_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| StreamScript::Fail(Self::unscripted()));
        let (status, body): (u16, ByteStream) = match script {
            StreamScript::Reply(status, chunks) => {
                (status, Box::pin(stream::iter(chunks.into_iter().map(Ok))))
            }
            StreamScript::StallBody(status, chunks) => (
                status,
                Box::pin(stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending())),
            ),
            StreamScript::StallHeaders => std::future::pending().await,
            StreamScript::Fail(err) => return Err(err),
        };
        Ok(StreamingReply { status, body })
    }

    async fn get(&self, url: &str) -> Result<HttpReply, TransportError> {
        self.record("GET", url, &[], None);
        self.get_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted()))
    }
}

pub fn test_settings() -> ClientSettings {
    ClientSettings {
        model: "test-model".to_string(),
        base_url: TEST_BASE_URL.to_string(),
        relay_url: TEST_RELAY_URL.to_string(),
        relay_param: "q".to_string(),
        stream_idle_timeout: Duration::from_secs(5),
    }
}

pub fn create_test_client(transport: Arc<RecordingTransport>, with_key: bool) -> AiClient {
    let credential = if with_key {
        Credential::new("test-key")
    } else {
        Credential::none()
    };
    AiClient::new(test_settings(), credential, transport)
}

/// A successful non-streaming provider body carrying `text`.
pub fn gemini_reply(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

/// One SSE event line carrying `text`.
pub fn gemini_sse_line(text: &str) -> String {
    format!(
        "data: {}\r\n\r\n",
        serde_json::json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
    )
}

pub fn create_test_session(title: &str, turns: &[(&str, &str)]) -> Session {
    let mut session = Session::titled_from(title);
    for (question, answer) in turns {
        session.push(Message::user(*question));
        session.push(Message::assistant(*answer));
    }
    session.title = title.to_string();
    session
}
