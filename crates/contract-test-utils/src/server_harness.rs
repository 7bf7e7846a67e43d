//! Fake restaurant collection server for exercising the harness.
//!
//! Serves `/api` (collection) and `/api/:id` (single resource) from memory. The
//! [`ServerBehavior`] switches between the two addressing styles and can inject
//! specific contract violations so tests can check the harness reports them.

use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How created resources are advertised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Addressing {
    /// Clients find the new record's `uuid` by listing the collection.
    #[default]
    IdentifierInList,

    /// `POST` answers with a `Location` header.
    LocationHeader,
}

/// Server behavior, including deliberate contract violations.
#[derive(Debug, Clone, Copy)]
pub struct ServerBehavior {
    pub addressing: Addressing,

    /// Answer `OPTIONS` with the CORS headers.
    pub cors: bool,

    /// `PATCH` replaces the whole record instead of merging.
    pub lossy_patch: bool,

    /// `DELETE` on a single resource answers 204 without removing it.
    pub ignore_single_delete: bool,

    /// `PUT` and `PATCH` answer with the merged record but never store it.
    pub drop_updates: bool,

    /// `GET` on a single resource answers 200 with an empty body.
    pub empty_single_reads: bool,
}

impl Default for ServerBehavior {
    fn default() -> Self {
        Self {
            addressing: Addressing::IdentifierInList,
            cors: true,
            lossy_patch: false,
            ignore_single_delete: false,
            drop_updates: false,
            empty_single_reads: false,
        }
    }
}

impl ServerBehavior {
    pub fn with_location_header() -> Self {
        Self {
            addressing: Addressing::LocationHeader,
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct Store {
    records: Vec<Value>,
    requests: Vec<String>,
}

#[derive(Clone)]
struct AppState {
    behavior: ServerBehavior,
    store: Arc<Mutex<Store>>,
}

impl AppState {
    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Test harness for spawning a fake collection server.
///
/// # Example
/// ```rust,ignore
/// let server = TestCrudServer::spawn(ServerBehavior::with_location_header()).await?;
/// let config = HarnessConfig::for_url(server.url())?;
/// ```
pub struct TestCrudServer {
    addr: SocketAddr,
    store: Arc<Mutex<Store>>,
    _handle: JoinHandle<()>,
}

impl TestCrudServer {
    /// Spawn a server on a random local port.
    pub async fn spawn(behavior: ServerBehavior) -> Result<Self, anyhow::Error> {
        let store = Arc::new(Mutex::new(Store::default()));
        let state = AppState {
            behavior,
            store: store.clone(),
        };

        let app = Router::new()
            .route(
                "/api",
                get(list).post(create).delete(clear).options(preflight),
            )
            .route(
                "/api/:id",
                get(read)
                    .put(replace)
                    .patch(patch)
                    .delete(remove)
                    .options(preflight),
            )
            .layer(middleware::from_fn_with_state(state.clone(), record_request))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            store,
            _handle: handle,
        })
    }

    /// Collection URL, e.g. `http://127.0.0.1:40123/api`.
    pub fn url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Records currently stored.
    pub fn records(&self) -> Vec<Value> {
        self.lock().records.clone()
    }

    /// Requests received so far, as `"METHOD /path"`.
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Insert a record directly, bypassing the API. Returns its `uuid`.
    pub fn seed(&self, record: Value) -> String {
        let id = Uuid::new_v4().to_string();
        let mut record = into_object(record);
        record.insert("uuid".to_string(), Value::String(id.clone()));
        self.lock().records.push(Value::Object(record));
        id
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for TestCrudServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

async fn record_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let line = format!("{} {}", request.method(), request.uri().path());
    state.lock().requests.push(line);
    next.run(request).await
}

async fn preflight(State(state): State<AppState>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    if state.behavior.cors {
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET,HEAD,PUT,PATCH,POST,DELETE"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Accept"),
        );
    }
    response
}

async fn list(State(state): State<AppState>) -> Json<Value> {
    Json(Value::Array(state.lock().records.clone()))
}

async fn create(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(_) => vec![payload],
        _ => return not_acceptable("body must be an object or an array of objects"),
    };
    if items.iter().any(|item| !item.is_object()) {
        return not_acceptable("body must be an object or an array of objects");
    }

    let mut created = Vec::with_capacity(items.len());
    {
        let mut store = state.lock();
        for item in items {
            let mut record = into_object(item);
            record.insert(
                "uuid".to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
            let record = Value::Object(record);
            store.records.push(record.clone());
            created.push(record);
        }
    }

    let location = created
        .first()
        .and_then(|r| r.get("uuid"))
        .and_then(Value::as_str)
        .map(|id| format!("/api/{}", id));

    let body = if created.len() == 1 {
        created.pop().unwrap_or(Value::Null)
    } else {
        Value::Array(created)
    };

    let mut response = (StatusCode::CREATED, Json(body)).into_response();
    if state.behavior.addressing == Addressing::LocationHeader {
        if let Some(value) = location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            response.headers_mut().insert(header::LOCATION, value);
        }
    }
    response
}

async fn clear(State(state): State<AppState>) -> StatusCode {
    state.lock().records.clear();
    StatusCode::NO_CONTENT
}

async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let store = state.lock();
    match find(&store.records, &id) {
        Some(_) if state.behavior.empty_single_reads => StatusCode::OK.into_response(),
        Some(index) => Json(store.records[index].clone()).into_response(),
        None => not_found(),
    }
}

async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Response {
    update(&state, &id, payload, false)
}

async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Response {
    let lossy = state.behavior.lossy_patch;
    update(&state, &id, payload, lossy)
}

fn update(state: &AppState, id: &str, payload: Value, discard_existing: bool) -> Response {
    let Value::Object(changes) = payload else {
        return not_acceptable("body must be an object");
    };

    let mut store = state.lock();
    let Some(index) = find(&store.records, id) else {
        return not_found();
    };

    let record = &mut store.records[index];
    let mut merged = if discard_existing {
        Map::new()
    } else {
        into_object(record.clone())
    };
    for (key, value) in changes {
        merged.insert(key, value);
    }
    merged.insert("uuid".to_string(), Value::String(id.to_string()));
    let merged = Value::Object(merged);
    if !state.behavior.drop_updates {
        *record = merged.clone();
    }

    Json(merged).into_response()
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut store = state.lock();
    let Some(index) = find(&store.records, &id) else {
        return not_found();
    };
    if !state.behavior.ignore_single_delete {
        store.records.remove(index);
    }
    StatusCode::NO_CONTENT.into_response()
}

fn find(records: &[Value], id: &str) -> Option<usize> {
    records
        .iter()
        .position(|r| r.get("uuid").and_then(Value::as_str) == Some(id))
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not Found"}))).into_response()
}

fn not_acceptable(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}
