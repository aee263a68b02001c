use async_trait::async_trait;
use futures_util::stream::{LocalBoxStream, StreamExt};

use crate::errors::TransportError;

/// Response body as a sequence of raw byte chunks.
pub type ByteStream = LocalBoxStream<'static, Result<Vec<u8>, TransportError>>;

/// A fully prepared POST request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response head plus the still-unread body.
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    /// `None` when the platform gives no readable body.
    pub body: Option<ByteStream>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drains the body into a string, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String, TransportError> {
        let Some(mut body) = self.body else {
            return Ok(String::new());
        };
        let mut bytes = Vec::new();
        while let Some(chunk) = body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// The HTTP seam of a completion session.
///
/// Futures are not required to be `Send`: in the browser every request runs on
/// the single UI thread. Dropping the returned future (or the body stream)
/// must abort the underlying request.
#[async_trait(?Send)]
pub trait Transport {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest`. In the browser this goes through `fetch`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body.clone()).send().await?;

        let status = response.status();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TransportError::from))
            .boxed_local();

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: Some(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn header_lookup_ignores_case() {
        let request = HttpRequest {
            url: "http://x".into(),
            headers: vec![("Authorization".into(), "Bearer k".into())],
            body: String::new(),
        };
        assert_eq!(request.header("authorization"), Some("Bearer k"));
        assert_eq!(request.header("X-Title"), None);
    }

    #[tokio::test]
    async fn text_concatenates_chunks() {
        let body = stream::iter(vec![Ok(b"{\"err".to_vec()), Ok(b"or\":1}".to_vec())]).boxed_local();
        let response = HttpResponse { status: 500, status_text: "Internal Server Error".into(), body: Some(body) };
        assert!(!response.is_success());
        assert_eq!(response.text().await.unwrap(), "{\"error\":1}");
    }
}
