//! Typed calls against the gear catalog API.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::transport::{ApiRequest, ApiResponse, Method, SharedTransport};
use crate::error::{CatalogError, Result};
use crate::models::{
    CreateUserRequest, Gear, GearDraft, LoginRequest, Suggestion, TokenResponse, User,
};

/// Thin wrapper over a transport. Holds no identity of its own: every
/// authorized call takes the bearer token explicitly.
#[derive(Clone)]
pub struct ApiClient {
    transport: SharedTransport,
}

impl ApiClient {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<TokenResponse> {
        let req = ApiRequest::new(Method::Post, "/api/auth/login").json(to_json(request)?);
        let response = self.execute(req, "login").await?;
        decode(&response, "login")
    }

    pub async fn create_user(&self, token: &str, request: &CreateUserRequest) -> Result<()> {
        let req = ApiRequest::new(Method::Post, "/api/auth/create-user")
            .bearer(token)
            .json(to_json(request)?);
        self.execute(req, &format!("user {}", request.username))
            .await
            .map(|_| ())
    }

    pub async fn me(&self, token: &str) -> Result<User> {
        let req = ApiRequest::new(Method::Get, "/api/me").bearer(token);
        let response = self.execute(req, "current user").await?;
        decode(&response, "current user")
    }

    pub async fn list_gears(&self) -> Result<Vec<Gear>> {
        let response = self
            .execute(ApiRequest::new(Method::Get, "/api/gears"), "gears")
            .await?;
        decode(&response, "gears")
    }

    pub async fn create_gear(&self, token: &str, draft: &GearDraft) -> Result<Gear> {
        let req = ApiRequest::new(Method::Post, "/api/gears")
            .bearer(token)
            .json(to_json(draft)?);
        let response = self.execute(req, "gear").await?;
        decode(&response, "created gear")
    }

    pub async fn update_gear(&self, token: &str, gear: &Gear) -> Result<()> {
        let req = ApiRequest::new(Method::Put, format!("/api/gears/{}", segment(&gear.id)))
            .bearer(token)
            .json(to_json(gear)?);
        self.execute(req, &format!("gear {}", gear.id))
            .await
            .map(|_| ())
    }

    pub async fn delete_gear(&self, token: &str, gear_id: &str) -> Result<()> {
        let req = ApiRequest::new(Method::Delete, format!("/api/gears/{}", segment(gear_id)))
            .bearer(token);
        self.execute(req, &format!("gear {}", gear_id))
            .await
            .map(|_| ())
    }

    pub async fn list_suggestions(&self, token: &str) -> Result<Vec<Suggestion>> {
        let req = ApiRequest::new(Method::Get, "/api/suggestions").bearer(token);
        let response = self.execute(req, "suggestions").await?;
        decode(&response, "suggestions")
    }

    /// Anyone may propose a gear; no credentials are sent.
    pub async fn create_suggestion(&self, draft: &GearDraft) -> Result<Suggestion> {
        let req = ApiRequest::new(Method::Post, "/api/suggestions").json(to_json(draft)?);
        let response = self.execute(req, "suggestion").await?;
        decode(&response, "created suggestion")
    }

    pub async fn approve_suggestion(&self, token: &str, suggestion_id: &str) -> Result<()> {
        self.moderate(token, suggestion_id, "approve").await
    }

    pub async fn reject_suggestion(&self, token: &str, suggestion_id: &str) -> Result<()> {
        self.moderate(token, suggestion_id, "reject").await
    }

    pub async fn list_users(&self, token: &str) -> Result<Vec<User>> {
        let req = ApiRequest::new(Method::Get, "/api/users").bearer(token);
        let response = self.execute(req, "users").await?;
        decode(&response, "users")
    }

    async fn moderate(&self, token: &str, suggestion_id: &str, action: &str) -> Result<()> {
        let req = ApiRequest::new(
            Method::Put,
            format!("/api/suggestions/{}/{}", segment(suggestion_id), action),
        )
        .bearer(token);
        self.execute(req, &format!("suggestion {}", suggestion_id))
            .await
            .map(|_| ())
    }

    async fn execute(&self, request: ApiRequest, resource: &str) -> Result<ApiResponse> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        debug!("{} {} -> {}", method, path, response.status);

        if response.is_success() {
            Ok(response)
        } else {
            Err(CatalogError::from_status(
                response.status,
                resource,
                error_detail(&response.body),
            ))
        }
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| CatalogError::Decode {
        context: "request body".to_string(),
        source: e,
    })
}

fn decode<T: DeserializeOwned>(response: &ApiResponse, context: &str) -> Result<T> {
    serde_json::from_str(&response.body).map_err(|e| CatalogError::Decode {
        context: context.to_string(),
        source: e,
    })
}

/// Pull `detail` out of an error body, falling back to the raw text
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| body.trim().to_string())
}
