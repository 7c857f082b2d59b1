//! Shared test fixtures: an in-process mock of the device backend.
//!
//! The mock mirrors the real service's routes, status codes and error
//! bodies, and records what the client sent so tests can assert on it.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{NaiveDateTime, Utc};
use serde_json::{Value, json};

use devinv::api::ApiClient;
use devinv::models::Device;
use devinv::notify::{MemoryNotifier, Notifier};
use devinv::shell::RefreshTrigger;

#[derive(Default)]
struct BackendState {
    devices: Vec<Device>,
    next_id: i64,
    list_calls: usize,
    create_calls: usize,
    last_create: Option<Value>,
    deleted: Vec<String>,
    create_response: Option<(StatusCode, Value)>,
    list_failure: Option<StatusCode>,
    delete_failure: Option<StatusCode>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    pub fn with_devices(devices: Vec<Device>) -> Self {
        let next_id = devices.iter().map(|d| d.id).max().unwrap_or(0);
        let backend = Self::default();
        {
            let mut state = backend.lock();
            state.devices = devices;
            state.next_id = next_id;
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn last_create(&self) -> Option<Value> {
        self.lock().last_create.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.lock().devices.iter().map(|d| d.device_id.clone()).collect()
    }

    /// Answer every create with this status and body instead of storing.
    pub fn respond_to_create(&self, status: StatusCode, body: Value) {
        self.lock().create_response = Some((status, body));
    }

    pub fn fail_lists(&self, status: Option<StatusCode>) {
        self.lock().list_failure = status;
    }

    pub fn fail_deletes(&self, status: StatusCode) {
        self.lock().delete_failure = Some(status);
    }

    fn router(self) -> Router {
        Router::new()
            .route("/devices/", get(list_devices).post(create_device))
            .route("/devices/{device_id}", get(get_device).delete(delete_device))
            .with_state(self)
    }
}

/// Devices as the real backend emits them: offset-less UTC timestamps.
fn to_wire(device: &Device) -> Value {
    json!({
        "id": device.id,
        "device_id": device.device_id,
        "name": device.name,
        "type": device.device_type,
        "ip_address": device.ip_address,
        "location": device.location,
        "status": device.status,
        "created_at": device.created_at.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    })
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

async fn list_devices(State(backend): State<MockBackend>) -> Response {
    let mut state = backend.lock();
    state.list_calls += 1;

    if let Some(status) = state.list_failure {
        return detail(status, "Failed to fetch devices: database is locked");
    }

    let mut devices = state.devices.clone();
    devices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(devices.iter().map(to_wire).collect::<Vec<_>>()).into_response()
}

async fn create_device(State(backend): State<MockBackend>, Json(body): Json<Value>) -> Response {
    let mut state = backend.lock();
    state.create_calls += 1;
    state.last_create = Some(body.clone());

    if let Some((status, response)) = state.create_response.clone() {
        return (status, Json(response)).into_response();
    }

    let text = |key: &str| body[key].as_str().map(String::from);
    let device_id = text("device_id").unwrap_or_default();
    let name = text("name").unwrap_or_default();

    let mut problems = Vec::new();
    for (field, value) in [("device_id", &device_id), ("name", &name)] {
        if value.is_empty() {
            problems.push(json!({
                "loc": ["body", field],
                "msg": "String should have at least 1 character",
                "type": "string_too_short",
            }));
        }
    }
    if !problems.is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": problems }))).into_response();
    }

    if state.devices.iter().any(|d| d.device_id == device_id) {
        return detail(
            StatusCode::CONFLICT,
            format!("Device with device_id '{}' already exists", device_id),
        );
    }

    state.next_id += 1;
    let device = Device {
        id: state.next_id,
        device_id,
        name,
        device_type: text("type"),
        ip_address: text("ip_address"),
        location: text("location"),
        status: text("status").unwrap_or_else(|| "active".to_string()),
        created_at: Utc::now(),
    };
    state.devices.push(device.clone());

    (
        StatusCode::CREATED,
        Json(json!({ "message": "Device created successfully", "device": to_wire(&device) })),
    )
        .into_response()
}

async fn get_device(State(backend): State<MockBackend>, Path(device_id): Path<String>) -> Response {
    let state = backend.lock();
    match state.devices.iter().find(|d| d.device_id == device_id) {
        Some(device) => Json(to_wire(device)).into_response(),
        None => detail(
            StatusCode::NOT_FOUND,
            format!("Device with device_id '{}' not found", device_id),
        ),
    }
}

async fn delete_device(
    State(backend): State<MockBackend>,
    Path(device_id): Path<String>,
) -> Response {
    let mut state = backend.lock();

    if let Some(status) = state.delete_failure {
        return detail(status, "Failed to delete device: database is locked");
    }

    let Some(index) = state.devices.iter().position(|d| d.device_id == device_id) else {
        return detail(
            StatusCode::NOT_FOUND,
            format!("Device with device_id '{}' not found", device_id),
        );
    };
    state.devices.remove(index);
    state.deleted.push(device_id);
    StatusCode::NO_CONTENT.into_response()
}

/// Serve `backend` on an ephemeral port and return its base URL.
pub async fn serve(backend: MockBackend) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = backend.router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub struct Harness {
    pub backend: MockBackend,
    pub api: ApiClient,
    pub notifier: Arc<MemoryNotifier>,
    pub trigger: RefreshTrigger,
}

impl Harness {
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    pub fn last_message(&self) -> Option<String> {
        self.notifier.last().map(|n| n.message)
    }
}

pub async fn start(devices: Vec<Device>) -> Harness {
    let backend = MockBackend::with_devices(devices);
    let base_url = serve(backend.clone()).await;
    Harness {
        backend,
        api: ApiClient::new(base_url),
        notifier: Arc::new(MemoryNotifier::new()),
        trigger: RefreshTrigger::new(),
    }
}

/// Build a device; `created_at` is an offset-less UTC timestamp.
pub fn device(id: i64, device_id: &str, name: &str, status: &str, created_at: &str) -> Device {
    Device {
        id,
        device_id: device_id.to_string(),
        name: name.to_string(),
        device_type: None,
        ip_address: None,
        location: None,
        status: status.to_string(),
        created_at: NaiveDateTime::parse_from_str(created_at, "%Y-%m-%dT%H:%M:%S")
            .unwrap()
            .and_utc(),
    }
}

/// DEV-001 (active) and DEV-002 (maintenance)
pub fn two_devices() -> Vec<Device> {
    vec![
        device(1, "DEV-001", "Main Server", "active", "2024-03-01T09:00:00"),
        device(2, "DEV-002", "Core Switch", "maintenance", "2024-01-15T12:30:00"),
    ]
}
