//! Input/send/stop lifecycle of the chat composer.
//!
//! The composer owns the conversation and at most one live completion session.
//! Submitting while a session is live never starts another one; it asks the
//! live one to stop.

pub mod view;

use std::cell::RefCell;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::completion::{CompletionSession, Transport, build_messages};
use crate::config::{ClientConfig, GREETING};
use crate::errors::{SessionError, StorageError, ValidationError};
use crate::models::{Message, Settings};
use crate::storage::{ConversationStore, KeyValueStore, SettingsRepository};

pub use view::{ChatView, LiveMessage, Status};

const EMPTY_REPLY: &str = "No response received.";
const STOPPED_MARKER: &str = "[stopped]";

/// Bookkeeping for the session currently owned by the composer.
#[derive(Debug)]
pub struct ActiveTurn {
    session_id: u64,
    cancel: CancellationToken,
    live: LiveMessage,
}

impl ActiveTurn {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn live(&self) -> &LiveMessage {
        &self.live
    }

    pub fn stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug, Default)]
pub enum ComposerState {
    #[default]
    Idle,
    Sending(ActiveTurn),
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Nothing was sent.
    Rejected(ValidationError),
    /// A session was created; the caller drives it, typically via [`run_turn`].
    Started(CompletionSession),
    /// A session was already live and has been asked to stop.
    StopRequested,
}

pub struct Composer<S, V> {
    config: ClientConfig,
    conversation: ConversationStore<S>,
    settings: SettingsRepository<S>,
    view: V,
    state: ComposerState,
    next_session_id: u64,
}

impl<S: KeyValueStore, V: ChatView> Composer<S, V> {
    pub fn new(store: S, config: ClientConfig, view: V) -> Self {
        let conversation = ConversationStore::new(store.clone(), config.max_saved_messages);
        let settings = SettingsRepository::new(store, config.default_model.clone());
        Self {
            config,
            conversation,
            settings,
            view,
            state: ComposerState::Idle,
            next_session_id: 0,
        }
    }

    /// Restores the saved conversation, or greets when there is none.
    pub fn init(&mut self) {
        if self.conversation.load() == 0 {
            self.add_greeting();
        } else {
            for message in self.conversation.messages() {
                self.view.render_message(message);
            }
        }
        self.view.set_sending(false);
    }

    pub fn submit(&mut self, input: &str, settings: &Settings) -> SubmitOutcome {
        if self.stop() {
            return SubmitOutcome::StopRequested;
        }

        let text = input.trim();
        if text.is_empty() {
            return SubmitOutcome::Rejected(ValidationError::EmptyInput);
        }
        if !settings.has_credential() {
            self.view.set_status(Status::CredentialRequired);
            return SubmitOutcome::Rejected(ValidationError::MissingCredential);
        }

        // Context is taken before the new turn is recorded.
        let history = self.conversation.recent(self.config.history_window);
        let messages = build_messages(&self.config.system_prompt, history, text);

        let user_message = Message::user(text);
        self.view.render_message(&user_message);
        self.conversation.push(user_message);
        self.persist();

        self.next_session_id += 1;
        let session = CompletionSession::new(self.next_session_id, &self.config, settings, messages);
        let live = LiveMessage::new(session.id());

        self.view.set_sending(true);
        self.view.set_status(Status::Generating);
        self.view.show_placeholder(&live);

        debug!(session = session.id(), "Composer is now sending");
        self.state = ComposerState::Sending(ActiveTurn {
            session_id: session.id(),
            cancel: session.cancel_handle(),
            live,
        });
        SubmitOutcome::Started(session)
    }

    /// Asks the live session to stop. Returns `false` when idle.
    pub fn stop(&mut self) -> bool {
        let ComposerState::Sending(turn) = &self.state else {
            return false;
        };
        if !turn.cancel.is_cancelled() {
            info!(session = turn.session_id, "Stop requested");
            turn.cancel.cancel();
        }
        self.view.set_status(Status::Stopping);
        true
    }

    pub fn on_token(&mut self, session_id: u64, token: &str) {
        match &mut self.state {
            ComposerState::Sending(turn) if turn.session_id == session_id => {
                turn.live.push(token);
                self.view.append_token(&turn.live, token);
            }
            _ => debug!(session = session_id, "Dropping token for a session that is not live"),
        }
    }

    /// Commits the terminal outcome of the live session and returns to idle.
    pub fn complete(&mut self, session_id: u64, result: Result<String, SessionError>) {
        let turn = match std::mem::take(&mut self.state) {
            ComposerState::Sending(turn) if turn.session_id == session_id => turn,
            other => {
                warn!(session = session_id, "Ignoring outcome of a session that is not live");
                self.state = other;
                return;
            }
        };

        match result {
            Ok(text) => {
                let text = text.trim();
                let content = if text.is_empty() { EMPTY_REPLY } else { text };
                self.commit(&turn.live, content.to_string());
                self.view.set_status(Status::Ready);
            }
            Err(e) if e.is_cancellation() => {
                let partial = turn.live.text().trim();
                if partial.is_empty() {
                    self.view.remove_message(&turn.live);
                } else {
                    self.commit(&turn.live, format!("{partial}\n\n{STOPPED_MARKER}"));
                }
                self.view.set_status(Status::Stopped);
            }
            Err(e) => {
                self.commit(&turn.live, format!("Error: {e}"));
                self.view.set_status(Status::Failed);
            }
        }

        self.view.set_sending(false);
    }

    /// Empties the conversation and greets again. Refused while sending.
    pub fn clear(&mut self) -> bool {
        if self.is_sending() {
            return false;
        }
        self.conversation.clear();
        self.view.clear_messages();
        self.persist();
        self.add_greeting();
        self.view.set_status(Status::ChatCleared);
        true
    }

    pub fn settings(&self) -> Settings {
        self.settings.load()
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        self.settings.save(settings)?;
        self.view.set_status(Status::SettingsSaved);
        Ok(())
    }

    pub fn is_sending(&self) -> bool {
        matches!(self.state, ComposerState::Sending(_))
    }

    pub fn state(&self) -> &ComposerState {
        &self.state
    }

    /// Text streamed so far into the live message, if any.
    pub fn live_text(&self) -> Option<&str> {
        match &self.state {
            ComposerState::Sending(turn) => Some(turn.live.text()),
            ComposerState::Idle => None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    fn commit(&mut self, live: &LiveMessage, content: String) {
        self.view.finalize_message(live, &content);
        self.conversation.push(Message::assistant(content));
        self.persist();
    }

    fn add_greeting(&mut self) {
        let greeting = Message::assistant(GREETING);
        self.view.render_message(&greeting);
        self.conversation.push(greeting);
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(e) = self.conversation.persist() {
            warn!("Failed to persist conversation: {e}");
        }
    }
}

/// Drives a started session to its end, streaming tokens into the composer
/// and committing the outcome.
///
/// The composer is only borrowed for the duration of each callback, so stop
/// requests can reach it while the request is in flight.
pub async fn run_turn<S, V, T>(composer: &RefCell<Composer<S, V>>, transport: &T, mut session: CompletionSession)
where
    S: KeyValueStore,
    V: ChatView,
    T: Transport + ?Sized,
{
    let id = session.id();
    let result = session
        .run(transport, |token| composer.borrow_mut().on_token(id, token))
        .await;
    composer.borrow_mut().complete(id, result);
}
