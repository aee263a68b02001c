use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::completion::transport::{HttpRequest, HttpResponse, Transport};
use crate::errors::TransportError;

/// Canned reply for [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    status: u16,
    status_text: String,
    body: Option<Vec<Result<Vec<u8>, TransportError>>>,
    connect_error: Option<TransportError>,
    /// Body never ends after the scripted chunks.
    hang_body: bool,
    /// Response headers never arrive.
    hang_headers: bool,
}

impl ScriptedReply {
    /// `200 OK` whose body arrives as the given chunks.
    pub fn stream<S: AsRef<[u8]>>(chunks: &[S]) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            body: Some(chunks.iter().map(|c| Ok(c.as_ref().to_vec())).collect()),
            connect_error: None,
            hang_body: false,
            hang_headers: false,
        }
    }

    /// A complete `data:` stream for `tokens`, terminated by `[DONE]`.
    pub fn tokens(tokens: &[&str]) -> Self {
        let mut lines: Vec<String> = tokens
            .iter()
            .map(|t| {
                let chunk = serde_json::json!({ "choices": [{ "delta": { "content": t } }] });
                format!("data: {chunk}\n\n")
            })
            .collect();
        lines.push("data: [DONE]\n\n".to_string());
        Self::stream(&lines[..])
    }

    pub fn status(status: u16, status_text: &str, body: &str) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            ..Self::stream(&[body])
        }
    }

    pub fn no_body() -> Self {
        Self { body: None, ..Self::stream::<&str>(&[]) }
    }

    pub fn connect_error(message: &str) -> Self {
        Self { connect_error: Some(TransportError::new(message)), ..Self::stream::<&str>(&[]) }
    }

    /// Appends a mid-stream transport failure after the scripted chunks.
    pub fn then_error(mut self, message: &str) -> Self {
        if let Some(body) = self.body.as_mut() {
            body.push(Err(TransportError::new(message)));
        }
        self
    }

    /// Keeps the body open forever after the scripted chunks.
    pub fn then_hang(mut self) -> Self {
        self.hang_body = true;
        self
    }

    /// Never delivers response headers.
    pub fn never_respond() -> Self {
        Self { hang_headers: true, ..Self::stream::<&str>(&[]) }
    }
}

/// In-memory [`Transport`] that replays queued replies and records every
/// request it receives.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    replies: Rc<RefCell<VecDeque<ScriptedReply>>>,
    requests: Rc<RefCell<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        self.push_reply(reply);
        self
    }

    pub fn push_reply(&self, reply: ScriptedReply) {
        self.replies.borrow_mut().push_back(reply);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

#[async_trait(?Send)]
impl Transport for ScriptedTransport {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| TransportError::new("no scripted reply left"))?;

        if reply.hang_headers {
            std::future::pending::<()>().await;
        }
        if let Some(e) = reply.connect_error {
            return Err(e);
        }

        let hang = reply.hang_body;
        let body = reply.body.map(|chunks| {
            let scripted = stream::iter(chunks);
            if hang {
                scripted.chain(stream::pending()).boxed_local()
            } else {
                scripted.boxed_local()
            }
        });

        Ok(HttpResponse { status: reply.status, status_text: reply.status_text, body })
    }
}
