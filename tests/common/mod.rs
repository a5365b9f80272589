//! Shared fixtures: an in-process HTTP server, a fake renderer and a log
//! capture helper.

#![allow(dead_code)]

use axum::{
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::future::BoxFuture;
use pib_pdfs::{PdfRenderer, RenderFailure};
use serde_json::Value;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ── HTTP server ──────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct AppState {
    hooks: Arc<Mutex<Vec<Value>>>,
    index_html: Arc<Mutex<String>>,
}

/// Routes:
/// * `GET /pdf/:name`  → a tiny PDF, `application/pdf`
/// * `GET /page/:name` → an HTML page
/// * `GET /missing`    → 404
/// * `GET /index.html` → whatever [`TestServer::set_index`] last stored
/// * `POST /hook`      → records the JSON body, 200
/// * `POST /hook-500`  → records the JSON body, 500
pub struct TestServer {
    pub base: String,
    state: AppState,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let state = AppState::default();
        let app = Router::new()
            .route("/pdf/:name", get(pdf))
            .route("/page/:name", get(page))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route("/index.html", get(index))
            .route("/hook", post(hook_ok))
            .route("/hook-500", post(hook_500))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Webhook bodies received so far, oldest first.
    pub fn hooks(&self) -> Vec<Value> {
        self.state.hooks.lock().unwrap().clone()
    }

    pub fn set_index(&self, html: impl Into<String>) {
        *self.state.index_html.lock().unwrap() = html.into();
    }
}

pub fn pdf_bytes(name: &str) -> Vec<u8> {
    format!("%PDF-1.4\n% {name}\n%%EOF\n").into_bytes()
}

async fn pdf(UrlPath(name): UrlPath<String>) -> Response {
    ([(header::CONTENT_TYPE, "application/pdf")], pdf_bytes(&name)).into_response()
}

async fn page(UrlPath(name): UrlPath<String>) -> Html<String> {
    Html(format!("<html><body><h1>{name}</h1></body></html>"))
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.index_html.lock().unwrap().clone())
}

async fn hook_ok(State(state): State<AppState>, Json(body): Json<Value>) -> StatusCode {
    state.hooks.lock().unwrap().push(body);
    StatusCode::OK
}

async fn hook_500(State(state): State<AppState>, Json(body): Json<Value>) -> StatusCode {
    state.hooks.lock().unwrap().push(body);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// A URL on a port nothing listens on.
pub fn refused_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}{path}")
}

// ── Fake renderer ────────────────────────────────────────────────────────────

/// Writes a small PDF for every URL except those containing `broken`.
pub struct FakeRenderer;

impl PdfRenderer for FakeRenderer {
    fn render<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, Result<(), RenderFailure>> {
        Box::pin(async move {
            if url.contains("broken") {
                return Err(RenderFailure::Failed("page crashed".into()));
            }
            tokio::fs::write(dest, pdf_bytes(url))
                .await
                .map_err(|e| RenderFailure::Failed(e.to_string()))
        })
    }
}

// ── Log capture ──────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route INFO-and-above events on this thread into a buffer until the guard
/// is dropped.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buf = LogBuffer::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buf, guard)
}
