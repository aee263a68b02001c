//! End-to-end turns against a local fake of the completion endpoint.

use std::cell::RefCell;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_chat::composer::{LiveMessage, Status};
use ai_chat::storage::MemoryStore;
use ai_chat::{ChatView, ClientConfig, Composer, Message, ReqwestTransport, Settings, SubmitOutcome, run_turn};
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::{StreamExt, stream};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
}

async fn completions(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    rec.bodies.lock().unwrap().push(body);
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    rec.headers.lock().unwrap().push(headers);

    if auth != "Bearer sk-good" {
        let error = json!({ "error": { "message": "bad key", "code": 401 } });
        return (StatusCode::UNAUTHORIZED, Json(error)).into_response();
    }

    // Records deliberately split mid-line and mid-JSON.
    let pieces = [
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: {\"choi",
        "ces\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
        ": keep-alive\n\n",
        "data: [DONE]\n\n",
    ];
    let body = Body::from_stream(stream::iter(pieces.map(Ok::<_, std::io::Error>)));
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn stalled() -> Response {
    let first = stream::iter([Ok::<_, std::io::Error>("data: {\"choices\":[{\"text\":\"partial\"}]}\n")]);
    Body::from_stream(first.chain(stream::pending())).into_response()
}

async fn serve(rec: Recorded) -> anyhow::Result<SocketAddr> {
    let app = Router::new()
        .route("/api/v1/chat/completions", post(completions))
        .route("/stalled", post(stalled))
        .with_state(rec);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(addr)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ai_chat=debug".into()))
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct TestView {
    tokens: Vec<String>,
    statuses: Vec<Status>,
}

impl ChatView for TestView {
    fn render_message(&mut self, _message: &Message) {}
    fn show_placeholder(&mut self, _live: &LiveMessage) {}
    fn append_token(&mut self, _live: &LiveMessage, token: &str) {
        self.tokens.push(token.to_string());
    }
    fn finalize_message(&mut self, _live: &LiveMessage, _content: &str) {}
    fn remove_message(&mut self, _live: &LiveMessage) {}
    fn clear_messages(&mut self) {}
    fn set_status(&mut self, status: Status) {
        self.statuses.push(status);
    }
    fn set_sending(&mut self, _sending: bool) {}
}

async fn one_turn(config: ClientConfig, api_key: &str) -> Composer<MemoryStore, TestView> {
    let composer = RefCell::new(Composer::new(MemoryStore::new(), config, TestView::default()));
    composer.borrow_mut().init();

    let outcome = composer
        .borrow_mut()
        .submit("hello", &Settings::new(api_key, "openrouter/free"));
    let session = match outcome {
        SubmitOutcome::Started(session) => session,
        other => panic!("expected a started session, got {other:?}"),
    };
    // Bypass any proxy configured in the environment.
    let client = reqwest::Client::builder().no_proxy().build().expect("client");
    run_turn(&composer, &ReqwestTransport::with_client(client), session).await;
    composer.into_inner()
}

#[tokio::test]
async fn streams_a_reply_over_http() -> anyhow::Result<()> {
    init_tracing();
    let rec = Recorded::default();
    let addr = serve(rec.clone()).await?;
    let config = ClientConfig::default()
        .with_endpoint(format!("http://{addr}/api/v1/chat/completions"))
        .with_origin("http://localhost:8080");

    let composer = one_turn(config, "sk-good").await;

    assert_eq!(composer.messages().last(), Some(&Message::assistant("Hi there")));
    assert_eq!(composer.view().tokens, vec!["Hi", " there"]);
    assert_eq!(composer.view().statuses.last(), Some(&Status::Ready));

    let bodies = rec.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], "openrouter/free");
    assert_eq!(bodies[0]["stream"], true);
    assert_eq!(bodies[0]["messages"][0]["role"], "system");
    assert_eq!(bodies[0]["messages"].as_array().map(Vec::len), Some(3));

    let headers = rec.headers.lock().unwrap();
    assert_eq!(headers[0]["x-title"], "AI Chat App");
    assert_eq!(headers[0]["http-referer"], "http://localhost:8080");
    Ok(())
}

#[tokio::test]
async fn unauthorized_reply_becomes_an_error_message() -> anyhow::Result<()> {
    init_tracing();
    let addr = serve(Recorded::default()).await?;
    let config = ClientConfig::default().with_endpoint(format!("http://{addr}/api/v1/chat/completions"));

    let composer = one_turn(config, "sk-wrong").await;

    assert_eq!(composer.messages().last(), Some(&Message::assistant("Error: bad key")));
    assert_eq!(composer.view().statuses.last(), Some(&Status::Failed));
    Ok(())
}

#[tokio::test]
async fn stalled_stream_times_out_keeping_partial_text() -> anyhow::Result<()> {
    init_tracing();
    let addr = serve(Recorded::default()).await?;
    let config = ClientConfig::default()
        .with_endpoint(format!("http://{addr}/stalled"))
        .with_request_timeout(Duration::from_millis(300));

    let composer = one_turn(config, "sk-good").await;

    assert_eq!(
        composer.messages().last(),
        Some(&Message::assistant("partial\n\n[stopped]"))
    );
    assert_eq!(composer.view().statuses.last(), Some(&Status::Stopped));
    Ok(())
}

#[tokio::test]
async fn refused_connection_is_reported() -> anyhow::Result<()> {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    let config = ClientConfig::default().with_endpoint(format!("http://{addr}/api/v1/chat/completions"));

    let composer = one_turn(config, "sk-good").await;

    let last = composer.messages().last().map(|m| m.content.clone()).unwrap_or_default();
    assert!(last.starts_with("Error: "), "unexpected reply {last:?}");
    assert_eq!(composer.view().statuses.last(), Some(&Status::Failed));
    Ok(())
}
