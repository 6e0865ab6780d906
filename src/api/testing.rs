//! Recording transport double for catalog tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone)]
enum Reply {
    Respond(ApiResponse),
    Fail(String),
}

/// Records every request and answers from a fixed route table.
/// Unscripted routes answer 404.
#[derive(Default)]
pub struct RecordingTransport {
    routes: Mutex<HashMap<(Method, String), Reply>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.routes.lock().insert(
            (method, path.to_string()),
            Reply::Respond(ApiResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.routes.lock().insert(
            (method, path.to_string()),
            Reply::Respond(ApiResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.routes
            .lock()
            .insert((method, path.to_string()), Reply::Fail(message.to_string()));
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let reply = self
            .routes
            .lock()
            .get(&(request.method, request.path.clone()))
            .cloned();
        self.calls.lock().push(request);

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(CatalogError::Transport { message }),
            None => Ok(ApiResponse {
                status: 404,
                body: serde_json::json!({"detail": "Not Found"}).to_string(),
            }),
        }
    }
}

pub fn gear_json(id: &str, name: &str, category: &str, created_at: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "nickname": format!("{} nick", name),
        "gear_id": format!("{}-gid", id),
        "image_url": format!("https://img.example/{}.png", id),
        "description": format!("{} description", name),
        "category": category,
        "created_at": created_at,
    })
}

pub fn suggestion_json(id: &str, name: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "nickname": "nick",
        "gear_id": "999",
        "image_url": "https://img.example/s.png",
        "description": "suggested",
        "category": "joueurs",
        "created_at": "2024-05-01T10:00:00",
        "status": status,
    })
}
