//! Browser-first chat client for streaming chat-completion endpoints.
//!
//! The crate is platform neutral: persistence, HTTP and rendering are traits
//! ([`storage::KeyValueStore`], [`completion::Transport`],
//! [`composer::ChatView`]) so the same state machine runs under the Leptos
//! frontend in the browser and under tokio in tests.

pub mod completion;
pub mod composer;
pub mod config;
pub mod errors;
pub mod models;
pub mod storage;
pub mod stream;

mod timer;

pub use completion::{CompletionSession, ReqwestTransport, Transport};
pub use composer::{ChatView, Composer, SubmitOutcome, run_turn};
pub use config::ClientConfig;
pub use errors::{SessionError, StorageError, TransportError, ValidationError};
pub use models::{Message, MessageRole, Settings};
