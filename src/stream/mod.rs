//! Decoding of the `data: <json>` event stream returned by streaming chat
//! completion endpoints.

pub mod sse;
pub mod utf8;

use std::collections::VecDeque;

use futures_util::stream::{self, Stream, StreamExt};

use crate::errors::TransportError;

pub use sse::{SseDecoder, parse_line};
pub use utf8::Utf8Decoder;

/// Adapts a body of raw byte chunks into a lazy stream of content tokens.
///
/// The stream ends when the body ends. A transport error is yielded once and
/// then the stream ends too.
pub fn token_stream<S>(body: S) -> impl Stream<Item = Result<String, TransportError>>
where
    S: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin,
{
    struct State<S> {
        body: S,
        decoder: SseDecoder,
        ready: VecDeque<String>,
        done: bool,
    }

    let state = State { body, decoder: SseDecoder::new(), ready: VecDeque::new(), done: false };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(token) = state.ready.pop_front() {
                return Some((Ok(token), state));
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.decoder.push(&chunk)),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.decoder.finish();
                    state.done = true;
                }
            }
        }
    })
}
