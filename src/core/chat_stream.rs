use std::sync::Arc;

use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::GenerateContentResponse;
use crate::core::client::AiClient;
use crate::core::message::HistoryTurn;

#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// What a single SSE `data:` payload carried.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Text(String),
    Error(String),
}

/// Splits an SSE byte stream into complete, trimmed lines.
#[derive(Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(line) => lines.push(line.trim().to_string()),
                Err(e) => debug!(error = %e, "Skipping invalid UTF-8 line in stream"),
            }
            self.buffer.drain(..=newline_pos);
        }
        lines
    }

    /// Flush a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn parse_data_payload(payload: &str) -> Option<StreamEvent> {
    if payload.trim().is_empty() || payload == "[DONE]" {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(_) => return Some(StreamEvent::Error(format_api_error(payload))),
    };

    if value.get("error").is_some() {
        return Some(StreamEvent::Error(format_api_error(payload)));
    }

    match serde_json::from_value::<GenerateContentResponse>(value) {
        Ok(response) => Some(StreamEvent::Text(response.text())),
        Err(_) => Some(StreamEvent::Error(format_api_error(payload))),
    }
}

/// Interpret one SSE line. Comments, event names and blank keep-alives
/// yield `None`.
pub fn parse_sse_line(line: &str) -> Option<StreamEvent> {
    extract_data_payload(line).and_then(parse_data_payload)
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// Render a provider error body as a readable diagnostic.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    // Gemini wraps errors in a one-element array on some endpoints.
    let parsed = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .map(|value| match value {
            serde_json::Value::Array(mut items) if items.len() == 1 => items.remove(0),
            other => other,
        });

    if let Some(json_value) = parsed {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                if !summary.is_empty() {
                    return format!("API Error: {}\n```json\n{}\n```", summary, pretty_json);
                }
            }
            return format!("API Error:\n```json\n{}\n```", pretty_json);
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{}\n```", trimmed)
    } else {
        format!("API Error:\n```\n{}\n```", trimmed)
    }
}

pub struct StreamParams {
    pub client: Arc<AiClient>,
    pub prompt: String,
    pub history: Vec<HistoryTurn>,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
    /// Deliver text as it arrives; otherwise the whole answer is one chunk.
    pub incremental: bool,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                prompt,
                history,
                cancel_token,
                stream_id,
                incremental,
            } = params;

            let request = async {
                if incremental {
                    client
                        .stream_generate(&prompt, &history, |chunk| {
                            let _ = tx_clone
                                .send((StreamMessage::Chunk(chunk.to_string()), stream_id));
                        })
                        .await
                        .map(|_| ())
                } else {
                    let reply = client.generate(&prompt, &history).await;
                    let _ = tx_clone.send((StreamMessage::Chunk(reply), stream_id));
                    Ok(())
                }
            };

            tokio::select! {
                result = request => {
                    if let Err(err) = result {
                        let _ = tx_clone.send((StreamMessage::Error(err.diagnostic()), stream_id));
                    }
                    let _ = tx_clone.send((StreamMessage::End, stream_id));
                }
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "Stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{
        create_test_client, gemini_reply, gemini_sse_line, RecordingTransport,
    };

    #[test]
    fn parse_sse_line_handles_spacing_variants() {
        let variants = [
            r#"data: {"candidates":[{"content":{"parts":[{"text":"Hello"}]}}]}"#,
            r#"data:{"candidates":[{"content":{"parts":[{"text":"Hello"}]}}]}"#,
        ];
        for line in variants {
            assert_eq!(
                parse_sse_line(line),
                Some(StreamEvent::Text("Hello".to_string()))
            );
        }
    }

    #[test]
    fn parse_sse_line_ignores_non_data_lines() {
        assert_eq!(parse_sse_line(""), None);
        assert_eq!(parse_sse_line(": keep-alive"), None);
        assert_eq!(parse_sse_line("event: message"), None);
        assert_eq!(parse_sse_line("data: [DONE]"), None);
    }

    #[test]
    fn parse_sse_line_routes_stream_errors() {
        let line = r#"data: {"error":{"code":500,"message":"internal server error"}}"#;
        match parse_sse_line(line) {
            Some(StreamEvent::Error(text)) => {
                assert!(text.starts_with("API Error: internal server error\n```json\n"));
            }
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[test]
    fn decoder_joins_lines_split_across_chunks() {
        let mut decoder = SseLineDecoder::default();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        let lines = decoder.push(b":1}\r\n\r\ndata: second\n");
        assert_eq!(lines, vec!["data: {\"a\":1}", "", "data: second"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_flushes_unterminated_tail() {
        let mut decoder = SseLineDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("data: tail"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_handles_multibyte_split() {
        let mut decoder = SseLineDecoder::default();
        let text = "data: né\n".as_bytes();
        let (head, tail) = text.split_at(8);
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail), vec!["data: né"]);
    }

    #[test]
    fn format_api_error_prettifies_json_with_summary() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let formatted = format_api_error(raw);

        let expected = r#"API Error: API key not valid
```json
{
  "error": {
    "code": 400,
    "message": "API key not valid",
    "status": "INVALID_ARGUMENT"
  }
}
```"#;
        assert_eq!(formatted, expected);
    }

    #[test]
    fn format_api_error_unwraps_single_element_arrays() {
        let raw = r#"[{"error":{"message":"quota exceeded"}}]"#;
        assert!(format_api_error(raw).starts_with("API Error: quota exceeded\n"));
    }

    #[test]
    fn format_api_error_handles_json_without_summary() {
        let raw = r#"{"status":"failed"}"#;
        let expected = "API Error:\n```json\n{\n  \"status\": \"failed\"\n}\n```";
        assert_eq!(format_api_error(raw), expected);
    }

    #[test]
    fn format_api_error_handles_xml_plaintext_and_empty() {
        assert_eq!(
            format_api_error("<error>bad</error>"),
            "API Error:\n```xml\n<error>bad</error>\n```"
        );
        assert_eq!(
            format_api_error("api failure"),
            "API Error:\n```\napi failure\n```"
        );
        assert_eq!(format_api_error("  "), "API Error:\n```\n<empty>\n```");
    }

    async fn collect(rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>) -> Vec<StreamMessage> {
        let mut seen = Vec::new();
        while let Some((message, id)) = rx.recv().await {
            assert_eq!(id, 3);
            let done = message == StreamMessage::End;
            seen.push(message);
            if done {
                break;
            }
        }
        seen
    }

    fn params(client: AiClient, incremental: bool) -> StreamParams {
        StreamParams {
            client: Arc::new(client),
            prompt: "hi".to_string(),
            history: Vec::new(),
            cancel_token: CancellationToken::new(),
            stream_id: 3,
            incremental,
        }
    }

    #[tokio::test]
    async fn incremental_stream_reports_chunks_then_end() {
        let first = gemini_sse_line("Hel");
        let second = gemini_sse_line("lo");
        let transport =
            Arc::new(RecordingTransport::new().with_stream(200, &[first.as_str(), second.as_str()]));
        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(create_test_client(transport, true), true));

        assert_eq!(
            collect(&mut rx).await,
            vec![
                StreamMessage::Chunk("Hel".into()),
                StreamMessage::Chunk("lo".into()),
                StreamMessage::End,
            ]
        );
    }

    #[tokio::test]
    async fn buffered_request_reports_single_chunk() {
        let transport = Arc::new(RecordingTransport::new().with_post(200, &gemini_reply("whole")));
        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(create_test_client(transport.clone(), true), false));

        assert_eq!(
            collect(&mut rx).await,
            vec![StreamMessage::Chunk("whole".into()), StreamMessage::End]
        );
        assert_eq!(transport.calls_to("POST"), 1);
        assert_eq!(transport.calls_to("POST_STREAM"), 0);
    }

    #[tokio::test]
    async fn failed_stream_reports_error_before_end() {
        let transport = Arc::new(RecordingTransport::new().with_stream(
            500,
            &[r#"{"error":{"message":"boom"}}"#],
        ));
        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(create_test_client(transport, true), true));

        let seen = collect(&mut rx).await;
        assert_eq!(seen.len(), 2);
        assert!(matches!(&seen[0], StreamMessage::Error(text) if text.contains("boom")));
        assert_eq!(seen[1], StreamMessage::End);
    }

    #[test]
    fn send_for_test_reaches_receiver() {
        let (service, mut rx) = ChatStreamService::new();
        service.send_for_test(StreamMessage::Chunk("x".into()), 7);
        assert_eq!(rx.try_recv().unwrap(), (StreamMessage::Chunk("x".into()), 7));
    }
}
