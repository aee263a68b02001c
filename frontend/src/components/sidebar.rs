use leptos::ev;
use leptos::prelude::*;

use crate::state::{AppState, MODEL_OPTIONS};

/// Settings panel: API key, model, and chat reset.
#[component]
pub fn Sidebar() -> impl IntoView {
    let state = expect_context::<AppState>();
    let close = move |_: ev::MouseEvent| state.sidebar_open.set(false);

    view! {
        <div class="sidebar-overlay" on:click=close></div>
        <aside class="sidebar">
            <div class="sidebar-header">
                <h2>"AI Chat"</h2>
                <button class="icon-btn close-sidebar" on:click=close>"×"</button>
            </div>

            <label for="apiKey">"API key"</label>
            <input
                id="apiKey"
                type="password"
                autocomplete="off"
                prop:value=move || state.api_key.get()
                on:input=move |ev| state.api_key.set(event_target_value(&ev))
                on:change=move |_| state.save_settings()
            />

            <label for="model">"Model"</label>
            <select
                id="model"
                prop:value=move || state.model.get()
                on:change=move |ev| {
                    state.model.set(event_target_value(&ev));
                    state.save_settings();
                }
            >
                {MODEL_OPTIONS
                    .iter()
                    .map(|(id, label)| view! { <option value=*id>{*label}</option> })
                    .collect_view()}
            </select>

            <button class="btn" on:click=move |_| state.save_settings()>
                "Save settings"
            </button>
            <button class="btn btn-secondary" on:click=move |_| state.clear_chat()>
                "Clear chat"
            </button>
        </aside>
    }
}
