//! Payload handling for the credential-free relay endpoint.
//!
//! Relays answer a `GET` whose query carries the raw prompt. Their bodies are
//! not standardized: some return JSON with the answer under one of a few
//! well-known keys, others return plain text.

use reqwest::Url;

/// Keys checked, in order, when the relay answers with a JSON object.
pub const RELAY_ANSWER_FIELDS: [&str; 4] = ["results", "answer", "response", "content"];

/// Build the relay request URL with the prompt URL-encoded as `param`.
pub fn relay_request_url(relay_url: &str, param: &str, prompt: &str) -> Result<Url, String> {
    Url::parse_with_params(relay_url, &[(param, prompt)])
        .map_err(|e| format!("invalid relay url {relay_url}: {e}"))
}

/// Pull the answer text out of a relay response body.
///
/// Returns `None` when the body carries nothing displayable.
pub fn extract_relay_answer(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => {
            let field = RELAY_ANSWER_FIELDS.iter().find_map(|key| {
                map.get(*key)
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
            });
            Some(field.unwrap_or(trimmed).to_string())
        }
        Ok(serde_json::Value::String(text)) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => Some(trimmed.to_string()),
    }
}
