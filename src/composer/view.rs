use crate::models::Message;

/// Status line shown under the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Generating,
    Stopping,
    Stopped,
    Failed,
    SettingsSaved,
    ChatCleared,
    CredentialRequired,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ready => "Ready",
            Status::Generating => "Generating…",
            Status::Stopping => "Stopping…",
            Status::Stopped => "Stopped",
            Status::Failed => "Failed",
            Status::SettingsSaved => "Settings saved",
            Status::ChatCleared => "Chat cleared",
            Status::CredentialRequired => "Add API key first",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The assistant message being streamed into. It exists only while a session
/// is live and is either committed or removed when the session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveMessage {
    id: u64,
    text: String,
}

impl LiveMessage {
    pub fn new(id: u64) -> Self {
        Self { id, text: String::new() }
    }

    /// Same as the id of the session feeding it.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True until the first token arrives.
    pub fn is_waiting(&self) -> bool {
        self.text.is_empty()
    }

    pub(crate) fn push(&mut self, token: &str) {
        self.text.push_str(token);
    }
}

/// Rendering side of the chat. Implemented by the DOM layer in the browser and
/// by recording fakes in tests.
pub trait ChatView {
    fn render_message(&mut self, message: &Message);

    /// Shows an empty assistant bubble with a typing indicator.
    fn show_placeholder(&mut self, live: &LiveMessage);

    /// `live.text()` already includes `token`.
    fn append_token(&mut self, live: &LiveMessage, token: &str);

    /// Replaces the live bubble's text with its committed content.
    fn finalize_message(&mut self, live: &LiveMessage, content: &str);

    fn remove_message(&mut self, live: &LiveMessage);

    fn clear_messages(&mut self);

    fn set_status(&mut self, status: Status);

    /// Toggles the composer between "Send" and "Stop".
    fn set_sending(&mut self, sending: bool);
}
