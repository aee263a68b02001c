use ai_chat::composer::{ChatView, LiveMessage, Status};
use ai_chat::{Message, MessageRole};
use leptos::prelude::*;

/// One bubble in the message list.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayMessage {
    pub key: String,
    pub role: MessageRole,
    pub content: String,
    /// Shows the typing indicator instead of `content`.
    pub typing: bool,
}

/// [`ChatView`] that renders by writing Leptos signals.
pub struct SignalView {
    messages: WriteSignal<Vec<DisplayMessage>>,
    status: WriteSignal<String>,
    sending: WriteSignal<bool>,
    next_key: u64,
}

impl SignalView {
    pub fn new(
        messages: WriteSignal<Vec<DisplayMessage>>,
        status: WriteSignal<String>,
        sending: WriteSignal<bool>,
    ) -> Self {
        Self { messages, status, sending, next_key: 0 }
    }

    fn set_live_text(&self, live: &LiveMessage, content: &str) {
        let key = live_key(live);
        self.messages.update(|msgs| {
            if let Some(msg) = msgs.iter_mut().find(|m| m.key == key) {
                msg.content = content.to_string();
                msg.typing = false;
            }
        });
    }
}

fn live_key(live: &LiveMessage) -> String {
    format!("live-{}", live.id())
}

impl ChatView for SignalView {
    fn render_message(&mut self, message: &Message) {
        self.next_key += 1;
        let shown = DisplayMessage {
            key: format!("msg-{}", self.next_key),
            role: message.role,
            content: message.content.clone(),
            typing: false,
        };
        self.messages.update(|msgs| msgs.push(shown));
    }

    fn show_placeholder(&mut self, live: &LiveMessage) {
        let shown = DisplayMessage {
            key: live_key(live),
            role: MessageRole::Assistant,
            content: String::new(),
            typing: true,
        };
        self.messages.update(|msgs| msgs.push(shown));
    }

    fn append_token(&mut self, live: &LiveMessage, _token: &str) {
        self.set_live_text(live, live.text());
    }

    fn finalize_message(&mut self, live: &LiveMessage, content: &str) {
        self.set_live_text(live, content);
    }

    fn remove_message(&mut self, live: &LiveMessage) {
        let key = live_key(live);
        self.messages.update(|msgs| msgs.retain(|m| m.key != key));
    }

    fn clear_messages(&mut self) {
        self.messages.set(Vec::new());
    }

    fn set_status(&mut self, status: Status) {
        self.status.set(status.to_string());
    }

    fn set_sending(&mut self, sending: bool) {
        self.sending.set(sending);
    }
}
