//! Stub display application and an HTTP-backed browser driver

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::get;
use axum::Router;
use regex::Regex;
use serde_json::{json, Value};

use navy_display_e2e::{BrowserConfig, BrowserDriver, BrowserLauncher, E2eError, E2eResult, Viewport};

pub const DISPLAY_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Navy Display</title><style>.hidden { display: none }</style></head>
<body>
  <header><h1>Marinha do Brasil</h1><span class="text-xl font-mono">12:00:00</span></header>
  <main><div class="pdf-viewer" data-doc="plasa.pdf"></div></main>
</body>
</html>"#;

pub const ADMIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
  <nav><button>Documentos</button><button>Avisos</button></nav>
  <form>
    <input name="title" type="text">
    <textarea name="content"></textarea>
    <button type="submit">Criar</button>
  </form>
</body>
</html>"#;

/// Page with none of the display markers
pub const BARE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body><main><p>Carregando...</p></main></body>
</html>"#;

const SOFT_MISSING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body><h1>Página não encontrada</h1></body>
</html>"#;

/// Request header carrying the driver's viewport width
pub const VIEWPORT_HEADER: &str = "x-viewport-width";

const MOBILE_BREAKPOINT: u32 = 768;

/// How `/api/health` behaves
#[derive(Debug, Clone, Copy)]
pub enum Health {
    Ready,
    After(Duration),
    Never,
}

/// How routes nobody registered are answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownRoute {
    NotFound,
    RedirectHome,
    /// 200 with a page that never says 404
    SoftOk,
}

#[derive(Debug, Clone)]
pub struct StubOptions {
    pub health: Health,
    /// Body served by a ready `/api/health`
    pub health_body: Value,
    pub display_page: &'static str,
    pub admin_page: &'static str,
    pub unknown_route: UnknownRoute,
    /// Serve [`BARE_PAGE`] at `/` below the mobile breakpoint
    pub marker_hidden_on_mobile: bool,
    /// Accept records that fail validation
    pub lax_validation: bool,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            health: Health::Ready,
            health_body: json!({ "status": "ok" }),
            display_page: DISPLAY_PAGE,
            admin_page: ADMIN_PAGE,
            unknown_route: UnknownRoute::NotFound,
            marker_hidden_on_mobile: false,
            lax_validation: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Notice,
    Document,
}

impl Kind {
    fn valid(self, record: &Value) -> bool {
        let field = |name: &str| record.get(name).and_then(Value::as_str).unwrap_or_default();
        let title_ok = !field("title").is_empty();
        match self {
            Kind::Notice => title_ok && ["high", "medium", "low"].contains(&field("priority")),
            Kind::Document => title_ok && ["plasa", "bono", "escala", "cardapio"].contains(&field("type")),
        }
    }

    /// Notices answer in an envelope, documents answer bare
    fn list_body(self, records: Vec<Value>) -> Value {
        match self {
            Kind::Notice => json!({ "success": true, "count": records.len(), "notices": records }),
            Kind::Document => Value::Array(records),
        }
    }

    fn item_body(self, record: Value) -> Value {
        match self {
            Kind::Notice => json!({ "success": true, "notice": record }),
            Kind::Document => record,
        }
    }
}

#[derive(Default)]
struct Store {
    next_id: u64,
    notices: BTreeMap<u64, Value>,
    documents: BTreeMap<u64, Value>,
}

impl Store {
    fn table(&mut self, kind: Kind) -> &mut BTreeMap<u64, Value> {
        match kind {
            Kind::Notice => &mut self.notices,
            Kind::Document => &mut self.documents,
        }
    }
}

struct StubState {
    started: Instant,
    options: StubOptions,
    store: Mutex<Store>,
}

type Shared = State<Arc<StubState>>;
type Reply = (StatusCode, Json<Value>);

async fn health(State(state): Shared) -> Reply {
    let healthy = match state.options.health {
        Health::Ready => true,
        Health::After(delay) => state.started.elapsed() >= delay,
        Health::Never => false,
    };

    if healthy {
        (StatusCode::OK, Json(state.options.health_body.clone()))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "starting" })))
    }
}

async fn display(State(state): Shared, headers: HeaderMap) -> Html<&'static str> {
    let width = headers
        .get(VIEWPORT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok());

    match width {
        Some(width) if state.options.marker_hidden_on_mobile && width < MOBILE_BREAKPOINT => Html(BARE_PAGE),
        _ => Html(state.options.display_page),
    }
}

async fn unknown(State(state): Shared) -> Response {
    match state.options.unknown_route {
        UnknownRoute::NotFound => {
            (StatusCode::NOT_FOUND, Html("<html><body><h1>404 Not Found</h1></body></html>")).into_response()
        }
        UnknownRoute::RedirectHome => Redirect::temporary("/").into_response(),
        UnknownRoute::SoftOk => Html(SOFT_MISSING_PAGE).into_response(),
    }
}

fn missing(kind: Kind) -> Reply {
    (StatusCode::NOT_FOUND, Json(json!({ "success": false, "error": format!("{:?} not found", kind) })))
}

fn rejected() -> Reply {
    (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "error": "Invalid data" })))
}

async fn list_records(state: Arc<StubState>, kind: Kind) -> Reply {
    let mut store = state.store.lock().unwrap();
    let records = store.table(kind).values().cloned().collect();
    (StatusCode::OK, Json(kind.list_body(records)))
}

async fn create_record(state: Arc<StubState>, kind: Kind, mut record: Value) -> Reply {
    if !state.options.lax_validation && !kind.valid(&record) {
        return rejected();
    }

    let mut store = state.store.lock().unwrap();
    store.next_id += 1;
    let id = store.next_id;
    record["id"] = json!(id);
    store.table(kind).insert(id, record.clone());
    (StatusCode::CREATED, Json(kind.item_body(record)))
}

async fn read_record(state: Arc<StubState>, kind: Kind, id: u64) -> Reply {
    let mut store = state.store.lock().unwrap();
    match store.table(kind).get(&id) {
        Some(record) => (StatusCode::OK, Json(kind.item_body(record.clone()))),
        None => missing(kind),
    }
}

async fn update_record(state: Arc<StubState>, kind: Kind, id: u64, mut record: Value) -> Reply {
    if !state.options.lax_validation && !kind.valid(&record) {
        return rejected();
    }

    let mut store = state.store.lock().unwrap();
    match store.table(kind).get_mut(&id) {
        Some(slot) => {
            record["id"] = json!(id);
            *slot = record.clone();
            (StatusCode::OK, Json(kind.item_body(record)))
        }
        None => missing(kind),
    }
}

async fn delete_record(state: Arc<StubState>, kind: Kind, id: u64) -> Reply {
    let mut store = state.store.lock().unwrap();
    match store.table(kind).remove(&id) {
        Some(_) => (StatusCode::OK, Json(json!({ "success": true }))),
        None => missing(kind),
    }
}

fn resource_routes(kind: Kind) -> Router<Arc<StubState>> {
    Router::new()
        .route(
            "/",
            get(move |State(state): Shared| list_records(state, kind))
                .post(move |State(state): Shared, Json(body): Json<Value>| create_record(state, kind, body)),
        )
        .route(
            "/:id",
            get(move |State(state): Shared, Path(id): Path<u64>| read_record(state, kind, id))
                .put(move |State(state): Shared, Path(id): Path<u64>, Json(body): Json<Value>| {
                    update_record(state, kind, id, body)
                })
                .delete(move |State(state): Shared, Path(id): Path<u64>| delete_record(state, kind, id)),
        )
}

/// Running stub application
pub struct StubApp {
    pub addr: SocketAddr,
    state: Arc<StubState>,
    task: tokio::task::JoinHandle<()>,
}

impl StubApp {
    pub async fn start(health_mode: Health) -> Self {
        Self::with_options(StubOptions {
            health: health_mode,
            ..Default::default()
        })
        .await
    }

    pub async fn with_options(options: StubOptions) -> Self {
        let state = Arc::new(StubState {
            started: Instant::now(),
            options,
            store: Mutex::new(Store::default()),
        });

        let app = Router::new()
            .route("/", get(display))
            .route("/admin", get(|State(state): Shared| async move { Html(state.options.admin_page) }))
            .route("/api/health", get(health))
            .nest("/api/notices", resource_routes(Kind::Notice))
            .nest("/api/documents", resource_routes(Kind::Document))
            .fallback(unknown)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Records currently stored as (notices, documents)
    pub fn record_counts(&self) -> (usize, usize) {
        let store = self.state.store.lock().unwrap();
        (store.notices.len(), store.documents.len())
    }
}

impl Drop for StubApp {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Fetches pages over plain HTTP and answers DOM queries with regexes
pub struct HttpDriver {
    client: reqwest::Client,
    url: String,
    body: String,
    viewport: Viewport,
    closes: Arc<AtomicUsize>,
}

impl HttpDriver {
    fn text(&self) -> String {
        let scripts = Regex::new(r"(?s)<(script|style)[^>]*>.*?</(script|style)>").unwrap();
        let tags = Regex::new(r"<[^>]*>").unwrap();
        let without_scripts = scripts.replace_all(&self.body, " ");
        tags.replace_all(&without_scripts, " ").into_owned()
    }

    fn matches(&self, selector: &str) -> usize {
        selector
            .split(',')
            .map(|alt| selector_regex(alt.trim()).find_iter(&self.body).count())
            .sum()
    }
}

fn selector_regex(selector: &str) -> Regex {
    let attr = Regex::new(r#"^\[(\w+)(\*?)='([^']*)'\]$"#).unwrap();

    let pattern = if let Some(class) = selector.strip_prefix('.') {
        format!(r#"class="(?:[^"]*\s)?{}(?:\s[^"]*)?""#, regex::escape(class))
    } else if let Some(caps) = attr.captures(selector) {
        let value = regex::escape(&caps[3]);
        if &caps[2] == "*" {
            format!(r#"{}="[^"]*{}[^"]*""#, &caps[1], value)
        } else {
            format!(r#"{}="{}""#, &caps[1], value)
        }
    } else {
        format!("<{}[\\s>]", regex::escape(selector))
    };

    Regex::new(&pattern).unwrap()
}

#[async_trait]
impl BrowserDriver for HttpDriver {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        let response = self
            .client
            .get(url)
            .header(VIEWPORT_HEADER, self.viewport.width.to_string())
            .send()
            .await
            .map_err(|e| E2eError::Browser(e.to_string()))?;
        self.url = response.url().to_string();
        self.body = response.text().await.map_err(|e| E2eError::Browser(e.to_string()))?;
        Ok(())
    }

    async fn content(&mut self) -> E2eResult<String> {
        Ok(self.body.clone())
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        Ok(self.url.clone())
    }

    async fn has_text(&mut self, text: &str) -> E2eResult<bool> {
        Ok(self.text().contains(text))
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        Ok(self.matches(selector))
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> E2eResult<()> {
        self.viewport = viewport;
        Ok(())
    }

    async fn click_text(&mut self, _tag: &str, text: &str) -> E2eResult<()> {
        if self.text().contains(text) {
            Ok(())
        } else {
            Err(E2eError::Browser(format!("nothing to click with text {:?}", text)))
        }
    }

    async fn fill(&mut self, selector: &str, _value: &str) -> E2eResult<()> {
        if self.matches(selector) > 0 {
            Ok(())
        } else {
            Err(E2eError::Browser(format!("no element matches {}", selector)))
        }
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher for [`HttpDriver`], counting launches and closes
#[derive(Default)]
pub struct HttpLauncher {
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl HttpLauncher {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self, config: &BrowserConfig) -> E2eResult<Box<dyn BrowserDriver>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HttpDriver {
            client: reqwest::Client::new(),
            url: "about:blank".to_string(),
            body: String::new(),
            viewport: config.viewport,
            closes: self.closes.clone(),
        }))
    }
}
