//! Test support: an in-process mock of the sensor platform API
//!
//! Routes are canned `(status, json)` answers keyed by method and path
//! (without the `/api` prefix). Every request is recorded.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::ApiClient;
use crate::config::ApiConfig;
use crate::session::SessionStore;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct Canned {
    status: u16,
    body: Value,
    delay: Option<Duration>,
}

#[derive(Default)]
struct MockState {
    routes: Mutex<HashMap<String, Canned>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct MockApi {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: tokio::task::JoinHandle<()>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url(),
            request_timeout_secs: 5,
        }
    }

    pub fn client(&self, session: SessionStore) -> ApiClient {
        ApiClient::new(&self.config(), session).unwrap()
    }

    /// Answer `method path` with `status` and `body`
    pub fn on(&self, method: &str, path: &str, status: u16, body: Value) {
        self.install(method, path, status, body, None);
    }

    /// Same as `on`, but the answer is held back for `delay`
    pub fn on_delayed(&self, method: &str, path: &str, status: u16, body: Value, delay: Duration) {
        self.install(method, path, status, body, Some(delay));
    }

    fn install(&self, method: &str, path: &str, status: u16, body: Value, delay: Option<Duration>) {
        self.state.routes.lock().unwrap().insert(
            format!("{} {}", method, path),
            Canned {
                status,
                body,
                delay,
            },
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().trim_start_matches("/api").to_string();
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body: serde_json::from_slice(&body).ok(),
    });

    let canned = state
        .routes
        .lock()
        .unwrap()
        .get(&format!("{} {}", method, path))
        .cloned();

    match canned {
        Some(canned) => {
            if let Some(delay) = canned.delay {
                tokio::time::sleep(delay).await;
            }
            (StatusCode::from_u16(canned.status).unwrap(), Json(canned.body)).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"}))).into_response(),
    }
}

/// Readings newest first, as the API returns them, one `object.<field>` each.
///
/// `values` are given oldest first; timestamps are one minute apart.
pub fn readings_json(field: &str, values: &[f64]) -> Value {
    let readings: Vec<Value> = values
        .iter()
        .enumerate()
        .rev()
        .map(|(i, v)| {
            json!({
                "time": format!("2024-03-01T10:{:02}:00Z", i % 60),
                "object": { field: v },
            })
        })
        .collect();
    Value::Array(readings)
}

/// A login response for the given role
pub fn login_json(token: &str, role: &str) -> Value {
    json!({
        "token": token,
        "user": {
            "id": 1,
            "username": "operador",
            "full_name": "Operador de Prueba",
            "role": role,
            "email": "operador@example.org"
        }
    })
}
