use serde_json::Value;

use crate::config::ClientConfig;
use crate::models::{CompletionRequest, Message};

/// Outgoing context: the system prompt, the given history, then the new turn.
pub fn build_messages(system_prompt: &str, history: &[Message], user_input: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if !system_prompt.is_empty() {
        messages.push(Message::system(system_prompt));
    }
    messages.extend(history.iter().cloned());
    messages.push(Message::user(user_input));
    messages
}

pub fn completion_request(config: &ClientConfig, model: &str, messages: Vec<Message>) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        messages,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        stream: true,
    }
}

pub fn request_headers(config: &ClientConfig, credential: &str) -> Vec<(String, String)> {
    let mut headers = vec![
        ("Authorization".to_string(), format!("Bearer {credential}")),
        ("Content-Type".to_string(), "application/json".to_string()),
        ("X-Title".to_string(), config.client_title.clone()),
    ];
    if let Some(origin) = config.referer() {
        headers.push(("HTTP-Referer".to_string(), origin.to_string()));
    }
    headers
}

/// Human-readable message out of an error response body.
///
/// Prefers `error.message`; any other JSON is returned re-serialized. Returns
/// `None` when the body is not JSON at all.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    Some(message.unwrap_or_else(|| value.to_string()))
}
