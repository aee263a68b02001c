use ai_chat::MessageRole;
use leptos::ev;
use leptos::prelude::*;

use crate::state::AppState;
use crate::view::DisplayMessage;

/// Main chat area with message history, status line, and input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <main class="chat-area">
            <div class="chat-header">
                <button class="icon-btn open-sidebar" on:click=move |_| state.sidebar_open.set(true)>
                    "☰"
                </button>
                <span class="status-text">{move || state.status.get()}</span>
            </div>

            <div class="messages-container">
                // Content is part of the key so streamed text re-renders the bubble.
                <For
                    each=move || state.messages.get()
                    key=|m| (m.key.clone(), m.content.clone(), m.typing)
                    let:msg
                >
                    <MessageBubble message=msg />
                </For>
            </div>

            <ChatInput />
        </main>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(message: DisplayMessage) -> impl IntoView {
    let css_class = if message.role == MessageRole::User {
        "message user"
    } else {
        "message assistant"
    };
    let label = message.role.display_name();

    let body = if message.typing {
        view! {
            <span class="typing">
                <span class="typing-dot"></span>
                <span class="typing-dot"></span>
                <span class="typing-dot"></span>
            </span>
        }
        .into_any()
    } else {
        view! { <div class="bubble">{message.content}</div> }.into_any()
    };

    view! {
        <div class=css_class>
            <div class="role">{label}</div>
            {body}
        </div>
    }
}

/// Chat input form. The button sends when idle and stops while streaming.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());

    let is_sending = move || state.is_sending.get();

    let send = move || {
        if state.submit(input.get_untracked()) {
            set_input.set(String::new());
        }
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="1"
                    placeholder="Type a message… (Enter to send, Shift+Enter for newline)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button class="send-btn" class:btn-danger=is_sending on:click=move |_| send()>
                    {move || if is_sending() { "Stop" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}
