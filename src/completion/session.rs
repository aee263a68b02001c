use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::completion::request::{completion_request, error_message, request_headers};
use crate::completion::transport::{HttpRequest, Transport};
use crate::config::ClientConfig;
use crate::errors::{SessionError, StopReason, TransportError};
use crate::models::{CompletionRequest, Message, Settings};
use crate::stream::token_stream;
use crate::timer;

/// One request/response cycle against the completion endpoint.
///
/// A session ends in exactly one of: the trimmed reply text, a user stop, a
/// timeout, or a transport/API failure. Tokens handed to the callback before
/// the session ends stay delivered whatever the outcome.
#[derive(Debug)]
pub struct CompletionSession {
    id: u64,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
    accumulated: String,
    credential: String,
    request: CompletionRequest,
    config: ClientConfig,
}

impl CompletionSession {
    pub fn new(id: u64, config: &ClientConfig, settings: &Settings, messages: Vec<Message>) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
            accumulated: String::new(),
            credential: settings.api_key.trim().to_string(),
            request: completion_request(config, &settings.model, messages),
            config: config.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Handle that stops this session from outside. Stopping is idempotent.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Everything received so far, untrimmed.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn request(&self) -> &CompletionRequest {
        &self.request
    }

    pub fn http_request(&self) -> Result<HttpRequest, SessionError> {
        let body = serde_json::to_string(&self.request)
            .map_err(|e| TransportError::new(format!("Failed to encode request: {e}")))?;
        Ok(HttpRequest {
            url: self.config.endpoint.clone(),
            headers: request_headers(&self.config, &self.credential),
            body,
        })
    }

    /// Runs the request to completion, calling `on_token` for every token in
    /// stream order.
    pub async fn run<T, F>(&mut self, transport: &T, mut on_token: F) -> Result<String, SessionError>
    where
        T: Transport + ?Sized,
        F: FnMut(&str),
    {
        if self.credential.is_empty() {
            return Err(SessionError::BadCredential);
        }
        let request = self.http_request()?;

        info!(
            session = self.id,
            model = %self.request.model,
            messages = self.request.messages.len(),
            "Starting completion session"
        );
        self.started_at = Utc::now();

        let cancel = self.cancel.clone();
        let deadline = timer::sleep(self.config.request_timeout);
        tokio::pin!(deadline);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Err(SessionError::CancelledOrTimedOut { reason: StopReason::User })
            }
            _ = &mut deadline => {
                cancel.cancel();
                Err(SessionError::CancelledOrTimedOut { reason: StopReason::Timeout })
            }
            result = exchange(transport, &request, &cancel, &mut self.accumulated, &mut on_token) => result,
        };

        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();
        match &result {
            Ok(text) => info!(session = self.id, elapsed_ms, chars = text.len(), "Completion finished"),
            Err(e) if e.is_cancellation() => {
                info!(session = self.id, elapsed_ms, timeout = e.is_timeout(), "Completion stopped")
            }
            Err(e) => warn!(session = self.id, elapsed_ms, "Completion failed: {e}"),
        }
        result
    }
}

async fn exchange<T, F>(
    transport: &T,
    request: &HttpRequest,
    cancel: &CancellationToken,
    accumulated: &mut String,
    on_token: &mut F,
) -> Result<String, SessionError>
where
    T: Transport + ?Sized,
    F: FnMut(&str),
{
    let response = transport.post(request).await?;

    if !response.is_success() {
        let status = response.status;
        let fallback = format!("{status} {}", response.status_text).trim_end().to_string();
        let message = match response.text().await {
            Ok(body) => error_message(&body).unwrap_or(fallback),
            Err(e) => {
                debug!("Failed to read error body: {e}");
                fallback
            }
        };
        return Err(SessionError::api(status, message));
    }

    let Some(body) = response.body else {
        return Err(SessionError::StreamUnavailable);
    };

    let tokens = token_stream(body);
    tokio::pin!(tokens);

    let mut count = 0usize;
    while let Some(token) = tokens.next().await {
        let token = token?;
        if cancel.is_cancelled() {
            return Err(SessionError::CancelledOrTimedOut { reason: StopReason::User });
        }
        accumulated.push_str(&token);
        on_token(&token);
        count += 1;
    }

    debug!("Stream exhausted after {count} tokens");
    Ok(accumulated.trim().to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::completion::scripted::{ScriptedReply, ScriptedTransport};
    use crate::completion::request::build_messages;

    fn session(config: &ClientConfig, key: &str) -> CompletionSession {
        let settings = Settings::new(key, "vendor/model");
        let messages = build_messages(&config.system_prompt, &[], "hello");
        CompletionSession::new(7, config, &settings, messages)
    }

    #[tokio::test]
    async fn streams_tokens_and_returns_trimmed_text() {
        let transport = ScriptedTransport::new().with_reply(ScriptedReply::tokens(&["Hi", " there", " \n"]));
        let mut s = session(&ClientConfig::default(), "sk-1");

        let mut seen = Vec::new();
        let text = s.run(&transport, |t| seen.push(t.to_string())).await.unwrap();

        assert_eq!(seen, vec!["Hi", " there", " \n"]);
        assert_eq!(text, "Hi there");
        assert_eq!(s.accumulated(), "Hi there \n");
    }

    #[tokio::test]
    async fn request_carries_payload_and_headers() {
        let transport = ScriptedTransport::new().with_reply(ScriptedReply::tokens(&["ok"]));
        let config = ClientConfig::default().with_origin("https://chat.example");
        let mut s = session(&config, "  sk-1  ");
        s.run(&transport, |_| {}).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.url, config.endpoint);
        assert_eq!(request.header("Authorization"), Some("Bearer sk-1"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("HTTP-Referer"), Some("https://chat.example"));

        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["model"], "vendor/model");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 800);
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1], serde_json::json!({"role": "user", "content": "hello"}));
    }

    #[tokio::test]
    async fn blank_credential_never_hits_the_network() {
        let transport = ScriptedTransport::new();
        let mut s = session(&ClientConfig::default(), "   ");
        let err = s.run(&transport, |_| {}).await.unwrap_err();
        assert!(matches!(err, SessionError::BadCredential));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn api_error_uses_server_message() {
        let transport = ScriptedTransport::new().with_reply(ScriptedReply::status(
            401,
            "Unauthorized",
            r#"{"error":{"message":"bad key"}}"#,
        ));
        let err = session(&ClientConfig::default(), "sk-1").run(&transport, |_| {}).await.unwrap_err();
        assert!(matches!(&err, SessionError::Api { status: 401, .. }));
        assert_eq!(err.to_string(), "bad key");
    }

    #[tokio::test]
    async fn api_error_falls_back_to_status_line() {
        let transport = ScriptedTransport::new()
            .with_reply(ScriptedReply::status(502, "Bad Gateway", "<html>upstream</html>"));
        let err = session(&ClientConfig::default(), "sk-1").run(&transport, |_| {}).await.unwrap_err();
        assert_eq!(err.to_string(), "502 Bad Gateway");
    }

    #[tokio::test]
    async fn missing_body_is_stream_unavailable() {
        let transport = ScriptedTransport::new().with_reply(ScriptedReply::no_body());
        let err = session(&ClientConfig::default(), "sk-1").run(&transport, |_| {}).await.unwrap_err();
        assert!(matches!(err, SessionError::StreamUnavailable));
    }

    #[tokio::test]
    async fn connect_and_midstream_failures_are_network_failures() {
        let transport = ScriptedTransport::new().with_reply(ScriptedReply::connect_error("dns failure"));
        let err = session(&ClientConfig::default(), "sk-1").run(&transport, |_| {}).await.unwrap_err();
        assert!(matches!(err, SessionError::NetworkFailure(_)));

        let reply = ScriptedReply::stream(&["data: {\"choices\":[{\"text\":\"part\"}]}\n"]).then_error("reset");
        let transport = ScriptedTransport::new().with_reply(reply);
        let mut s = session(&ClientConfig::default(), "sk-1");
        let mut seen = Vec::new();
        let err = s.run(&transport, |t| seen.push(t.to_string())).await.unwrap_err();
        assert_eq!(err.to_string(), "reset");
        assert_eq!(seen, vec!["part"]);
    }

    #[tokio::test]
    async fn cancel_before_start_delivers_nothing() {
        let transport = ScriptedTransport::new().with_reply(ScriptedReply::tokens(&["late"]));
        let mut s = session(&ClientConfig::default(), "sk-1");
        s.cancel_handle().cancel();

        let mut seen = 0;
        let err = s.run(&transport, |_| seen += 1).await.unwrap_err();
        assert!(err.is_cancellation() && !err.is_timeout());
        assert_eq!(seen, 0);
    }

    #[tokio::test]
    async fn cancel_inside_a_chunk_stops_further_tokens() {
        let transport = ScriptedTransport::new().with_reply(ScriptedReply::tokens(&["a", "b", "c"]));
        let mut s = session(&ClientConfig::default(), "sk-1");
        let handle = s.cancel_handle();

        let mut seen = Vec::new();
        let err = s
            .run(&transport, |t| {
                seen.push(t.to_string());
                handle.cancel();
            })
            .await
            .unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(seen, vec!["a"]);
        assert_eq!(s.accumulated(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_times_out_a_stalled_stream() {
        let reply = ScriptedReply::stream(&["data: {\"choices\":[{\"text\":\"slow\"}]}\n"]).then_hang();
        let transport = ScriptedTransport::new().with_reply(reply);
        let config = ClientConfig::default().with_request_timeout(Duration::from_secs(90));
        let mut s = session(&config, "sk-1");
        let handle = s.cancel_handle();

        let mut seen = Vec::new();
        let err = s.run(&transport, |t| seen.push(t.to_string())).await.unwrap_err();

        assert!(err.is_timeout());
        assert!(handle.is_cancelled());
        assert_eq!(seen, vec!["slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_covers_waiting_for_headers() {
        let transport = ScriptedTransport::new().with_reply(ScriptedReply::never_respond());
        let err = session(&ClientConfig::default(), "sk-1").run(&transport, |_| {}).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
