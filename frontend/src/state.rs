use std::cell::RefCell;
use std::rc::Rc;

use ai_chat::composer::Status;
use ai_chat::config::DEFAULT_MODEL;
use ai_chat::{ClientConfig, Composer, ReqwestTransport, Settings, SubmitOutcome, run_turn};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::storage::BrowserStore;
use crate::view::{DisplayMessage, SignalView};

/// Models offered in the settings panel.
pub const MODEL_OPTIONS: &[(&str, &str)] = &[
    ("openrouter/free", "OpenRouter free router"),
    ("openai/gpt-4o-mini", "GPT-4o mini"),
    ("anthropic/claude-3.5-haiku", "Claude 3.5 Haiku"),
    ("google/gemini-2.0-flash-001", "Gemini 2.0 Flash"),
    ("meta-llama/llama-3.3-70b-instruct", "Llama 3.3 70B"),
];

type AppComposer = Composer<BrowserStore, SignalView>;

/// Non-`Send` half of the app: the composer and the HTTP client it drives.
struct Controller {
    composer: RefCell<AppComposer>,
    transport: ReqwestTransport,
}

/// Shared application state, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct AppState {
    // --- Rendered by the composer's view ---
    pub messages: ReadSignal<Vec<DisplayMessage>>,
    pub status: ReadSignal<String>,
    pub is_sending: ReadSignal<bool>,

    // --- Settings form ---
    pub api_key: RwSignal<String>,
    pub model: RwSignal<String>,

    pub sidebar_open: RwSignal<bool>,

    controller: StoredValue<Rc<Controller>, LocalStorage>,
}

impl AppState {
    /// Create a new `AppState`, restore the saved chat, and provide it in the
    /// current Leptos context.
    pub fn provide() -> Self {
        let (messages, set_messages) = signal(Vec::<DisplayMessage>::new());
        let (status, set_status) = signal(Status::Ready.to_string());
        let (is_sending, set_is_sending) = signal(false);

        let mut config = ClientConfig::default();
        if let Some(origin) = page_origin() {
            config = config.with_origin(origin);
        }

        let view = SignalView::new(set_messages, set_status, set_is_sending);
        let mut composer = Composer::new(BrowserStore::open(), config, view);
        composer.init();

        let mut settings = composer.settings();
        if !MODEL_OPTIONS.iter().any(|(id, _)| *id == settings.model) {
            settings.model = DEFAULT_MODEL.to_string();
        }

        let controller = Rc::new(Controller {
            composer: RefCell::new(composer),
            transport: ReqwestTransport::new(),
        });

        let state = Self {
            messages,
            status,
            is_sending,
            api_key: RwSignal::new(settings.api_key),
            model: RwSignal::new(settings.model),
            sidebar_open: RwSignal::new(false),
            controller: StoredValue::new_local(controller),
        };

        provide_context(state);
        state
    }

    /// Send `text`, or stop the reply in progress. Returns `true` when a new
    /// request was started and the input box should be cleared.
    pub fn submit(&self, text: String) -> bool {
        let controller = self.controller.get_value();
        let outcome = controller.composer.borrow_mut().submit(&text, &self.current_settings());

        match outcome {
            SubmitOutcome::Started(session) => {
                spawn_local(async move {
                    run_turn(&controller.composer, &controller.transport, session).await;
                });
                true
            }
            SubmitOutcome::StopRequested => false,
            SubmitOutcome::Rejected(reason) => {
                log::debug!("Submit rejected: {reason}");
                false
            }
        }
    }

    pub fn save_settings(&self) {
        let controller = self.controller.get_value();
        let result = controller.composer.borrow_mut().save_settings(&self.current_settings());
        if let Err(e) = result {
            log::error!("Failed to save settings: {e}");
        }
    }

    pub fn clear_chat(&self) {
        let controller = self.controller.get_value();
        let cleared = controller.composer.borrow_mut().clear();
        if !cleared {
            log::debug!("Clear ignored while a reply is streaming");
        }
    }

    fn current_settings(&self) -> Settings {
        Settings::new(self.api_key.get_untracked(), self.model.get_untracked())
    }
}

fn page_origin() -> Option<String> {
    web_sys::window().and_then(|w| w.location().origin().ok())
}
