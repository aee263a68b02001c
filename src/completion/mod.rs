//! Streaming chat completion requests.

pub mod request;
pub mod scripted;
pub mod session;
pub mod transport;

pub use request::build_messages;
pub use scripted::{ScriptedReply, ScriptedTransport};
pub use session::CompletionSession;
pub use transport::{ByteStream, HttpRequest, HttpResponse, ReqwestTransport, Transport};
