use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openrouter/free";
pub const CLIENT_TITLE: &str = "AI Chat App";
pub const SYSTEM_PROMPT: &str = "You are a helpful, concise assistant. \
                                 You provide descriptive responses.";
pub const GREETING: &str =
    "Hello. I am ready. Add your API key in the left panel, then ask anything.";

pub const MAX_SAVED_MESSAGES: usize = 200;
pub const HISTORY_WINDOW: usize = 20;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Static client configuration. Everything here has a sensible default; the
/// browser shell only overrides the referer origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub client_title: String,
    pub system_prompt: String,
    pub default_model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    /// Number of stored messages replayed as context per request.
    pub history_window: usize,
    /// Retention cap for the persisted conversation.
    pub max_saved_messages: usize,
    /// Origin of the page hosting the client, if any.
    pub origin: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client_title: CLIENT_TITLE.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 800,
            request_timeout: REQUEST_TIMEOUT,
            history_window: HISTORY_WINDOW,
            max_saved_messages: MAX_SAVED_MESSAGES,
            origin: None,
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_saved_messages(mut self, max: usize) -> Self {
        self.max_saved_messages = max;
        self
    }

    /// The origin to send as `HTTP-Referer`, only for http(s) pages.
    /// `file://` and extension origins are not sent.
    pub fn referer(&self) -> Option<&str> {
        self.origin
            .as_deref()
            .filter(|origin| origin.starts_with("http"))
    }
}
