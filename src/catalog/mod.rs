//! Catalog client
//!
//! Turns user intents into API calls and keeps read-through copies of the
//! gear, suggestion and user lists for rendering. The caches are never
//! authoritative: every successful mutation is followed by a re-fetch, and
//! no local record is ever patched in place.
//!
//! Failures follow one policy everywhere: log, keep the current state (and
//! the form contents, for writes), hand the typed error back. One attempt per
//! action, no retries.

mod forms;

pub use forms::{SuggestionForm, UserForm, ViewState};

use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::error::{CatalogError, Result};
use crate::models::{Gear, GearDraft, Suggestion, User};
use crate::permissions::{authorize, Action};
use crate::session::Session;
use crate::view;

pub struct Catalog {
    api: ApiClient,
    gears: Vec<Gear>,
    suggestions: Vec<Suggestion>,
    users: Vec<User>,
    pub view: ViewState,
}

impl Catalog {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            gears: Vec::new(),
            suggestions: Vec::new(),
            users: Vec::new(),
            view: ViewState::default(),
        }
    }

    pub fn gears(&self) -> &[Gear] {
        &self.gears
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Gears for the current category, search and sort
    pub fn visible_gears(&self) -> Vec<&Gear> {
        view::visible_gears(
            &self.gears,
            self.view.selected_category,
            &self.view.search,
            self.view.sort,
        )
    }

    pub fn pending_count(&self) -> usize {
        view::pending_count(&self.suggestions)
    }

    pub fn status_counts(&self) -> view::StatusCounts {
        view::status_counts(&self.suggestions)
    }

    /// Drop everything fetched or typed under the session that just ended.
    /// The public gear list stays.
    pub fn forget_session(&mut self) {
        self.suggestions.clear();
        self.users.clear();
        self.view.user_form.reset();
        self.view.editing = None;
        self.view.active_tab = view::Tab::Gears;
        debug!("Cleared session-scoped catalog data");
    }

    // ----- reads -----

    pub async fn refresh_gears(&mut self) -> Result<usize> {
        match self.api.list_gears().await {
            Ok(gears) => {
                debug!("Loaded {} gears", gears.len());
                self.gears = gears;
                Ok(self.gears.len())
            }
            Err(e) => {
                warn!("Error fetching gears: {}", e);
                Err(e)
            }
        }
    }

    pub async fn refresh_suggestions(&mut self, session: Option<&Session>) -> Result<usize> {
        let session = authorize(session, Action::ListSuggestions)?;
        match self.api.list_suggestions(&session.token).await {
            Ok(suggestions) => {
                debug!("Loaded {} suggestions", suggestions.len());
                self.suggestions = suggestions;
                Ok(self.suggestions.len())
            }
            Err(e) => {
                warn!("Error fetching suggestions: {}", e);
                Err(e)
            }
        }
    }

    pub async fn refresh_users(&mut self, session: Option<&Session>) -> Result<usize> {
        let session = authorize(session, Action::ListUsers)?;
        match self.api.list_users(&session.token).await {
            Ok(users) => {
                debug!("Loaded {} users", users.len());
                self.users = users;
                Ok(self.users.len())
            }
            Err(e) => {
                warn!("Error fetching users: {}", e);
                Err(e)
            }
        }
    }

    /// Startup load: gears always, suggestions with a session, users for
    /// créateur. Only the gear load can fail the call.
    pub async fn refresh_all(&mut self, session: Option<&Session>) -> Result<()> {
        let gears = self.refresh_gears().await;

        if let Some(session) = session {
            let _ = self.refresh_suggestions(Some(session)).await;
            if session.role.can_manage_users() {
                let _ = self.refresh_users(Some(session)).await;
            }
        }

        gears.map(|_| ())
    }

    pub async fn current_user(&self, session: Option<&Session>) -> Result<User> {
        let session = authorize(session, Action::CurrentUser)?;
        self.api.me(&session.token).await.map_err(|e| {
            warn!("Error fetching current user: {}", e);
            e
        })
    }

    // ----- writes -----

    /// Post the suggestion form. Anyone may suggest. On success the form is
    /// emptied and closed; on failure it stays as the user left it.
    pub async fn submit_suggestion(&mut self) -> Result<Suggestion> {
        self.view.suggestion_form.validate()?;

        match self
            .api
            .create_suggestion(&self.view.suggestion_form.draft)
            .await
        {
            Ok(suggestion) => {
                info!("Suggestion '{}' submitted", suggestion.name);
                self.view.suggestion_form.reset();
                self.view.suggestion_form.close();
                Ok(suggestion)
            }
            Err(e) => {
                error!("Error submitting suggestion: {}", e);
                Err(e)
            }
        }
    }

    /// Approval materializes a gear server-side, so both lists are re-fetched.
    pub async fn approve_suggestion(
        &mut self,
        session: Option<&Session>,
        suggestion_id: &str,
    ) -> Result<()> {
        let session = authorize(session, Action::ModerateSuggestion)?;
        if let Err(e) = self
            .api
            .approve_suggestion(&session.token, suggestion_id)
            .await
        {
            error!("Error approving suggestion {}: {}", suggestion_id, e);
            return Err(e);
        }

        info!("Suggestion {} approved", suggestion_id);
        let _ = self.refresh_suggestions(Some(session)).await;
        let _ = self.refresh_gears().await;
        Ok(())
    }

    pub async fn reject_suggestion(
        &mut self,
        session: Option<&Session>,
        suggestion_id: &str,
    ) -> Result<()> {
        let session = authorize(session, Action::ModerateSuggestion)?;
        if let Err(e) = self
            .api
            .reject_suggestion(&session.token, suggestion_id)
            .await
        {
            error!("Error rejecting suggestion {}: {}", suggestion_id, e);
            return Err(e);
        }

        info!("Suggestion {} rejected", suggestion_id);
        let _ = self.refresh_suggestions(Some(session)).await;
        Ok(())
    }

    /// Post the user form, then reload the user list.
    pub async fn create_user(&mut self, session: Option<&Session>) -> Result<()> {
        let session = authorize(session, Action::CreateUser)?;
        let request = self.view.user_form.to_request()?;

        if let Err(e) = self.api.create_user(&session.token, &request).await {
            error!("Error creating user '{}': {}", request.username, e);
            return Err(e);
        }

        info!("User '{}' created with role {}", request.username, request.role);
        self.view.user_form.reset();
        let _ = self.refresh_users(Some(session)).await;
        Ok(())
    }

    pub async fn create_gear(&mut self, session: Option<&Session>, draft: &GearDraft) -> Result<Gear> {
        let session = authorize(session, Action::EditGear)?;
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(CatalogError::InvalidInput {
                message: missing.join(", "),
            });
        }

        match self.api.create_gear(&session.token, draft).await {
            Ok(gear) => {
                info!("Gear '{}' created", gear.name);
                let _ = self.refresh_gears().await;
                Ok(gear)
            }
            Err(e) => {
                error!("Error creating gear: {}", e);
                Err(e)
            }
        }
    }

    /// Open the edit slot with a copy of the cached gear
    pub fn begin_edit(&mut self, gear_id: &str) -> Option<&mut Gear> {
        let gear = self.gears.iter().find(|g| g.id == gear_id)?.clone();
        self.view.editing = Some(gear);
        self.view.editing.as_mut()
    }

    pub fn cancel_edit(&mut self) {
        self.view.editing = None;
    }

    /// Send the full edited record. The edit slot closes only on success.
    pub async fn update_gear(&mut self, session: Option<&Session>) -> Result<()> {
        let session = authorize(session, Action::EditGear)?;
        let gear = self
            .view
            .editing
            .as_ref()
            .ok_or_else(|| CatalogError::InvalidInput {
                message: "no gear is being edited".to_string(),
            })?;

        if let Err(e) = self.api.update_gear(&session.token, gear).await {
            error!("Error updating gear {}: {}", gear.id, e);
            return Err(e);
        }

        info!("Gear {} updated", gear.id);
        self.view.editing = None;
        let _ = self.refresh_gears().await;
        Ok(())
    }

    /// Delete after `confirm` agrees. Returns `Ok(false)` when declined,
    /// in which case nothing is sent.
    pub async fn delete_gear<F>(
        &mut self,
        session: Option<&Session>,
        gear_id: &str,
        confirm: F,
    ) -> Result<bool>
    where
        F: FnOnce(&str) -> bool,
    {
        let session = authorize(session, Action::EditGear)?;
        if !confirm(gear_id) {
            debug!("Deletion of gear {} not confirmed", gear_id);
            return Ok(false);
        }

        if let Err(e) = self.api.delete_gear(&session.token, gear_id).await {
            error!("Error deleting gear {}: {}", gear_id, e);
            return Err(e);
        }

        info!("Gear {} deleted", gear_id);
        let _ = self.refresh_gears().await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{gear_json, suggestion_json, RecordingTransport};
    use crate::api::Method;
    use crate::models::{Category, Role, SuggestionStatus};
    use std::sync::Arc;

    fn catalog() -> (Arc<RecordingTransport>, Catalog) {
        let transport = Arc::new(RecordingTransport::new());
        (transport.clone(), Catalog::new(ApiClient::new(transport)))
    }

    fn creator() -> Session {
        Session::new("tok-c", Role::Createur)
    }

    fn serve_gears(transport: &RecordingTransport, ids: &[&str]) {
        let gears: Vec<_> = ids
            .iter()
            .map(|id| gear_json(id, &format!("Gear {}", id), "joueurs", "2024-01-01T00:00:00"))
            .collect();
        transport.respond(Method::Get, "/api/gears", 200, serde_json::Value::Array(gears));
    }

    fn fill_suggestion(form: &mut SuggestionForm) {
        form.open();
        form.draft = GearDraft {
            name: "Viseur".into(),
            nickname: "Sniper".into(),
            gear_id: "1234".into(),
            image_url: "https://img.example/v.png".into(),
            description: "arme".into(),
            category: Category::Events,
        };
    }

    #[tokio::test]
    async fn test_refresh_gears_replaces_cache() {
        let (transport, mut catalog) = catalog();
        serve_gears(&transport, &["a", "b"]);
        assert_eq!(catalog.refresh_gears().await.unwrap(), 2);

        serve_gears(&transport, &["c"]);
        catalog.refresh_gears().await.unwrap();
        assert_eq!(catalog.gears().len(), 1);
        assert_eq!(catalog.gears()[0].id, "c");
    }

    #[tokio::test]
    async fn test_failed_gear_refresh_keeps_stale_cache() {
        let (transport, mut catalog) = catalog();
        serve_gears(&transport, &["a", "b"]);
        catalog.refresh_gears().await.unwrap();

        transport.fail(Method::Get, "/api/gears", "connection refused");
        assert!(catalog.refresh_gears().await.is_err());
        assert_eq!(catalog.gears().len(), 2);

        transport.respond_raw(Method::Get, "/api/gears", 200, "not json");
        assert!(matches!(
            catalog.refresh_gears().await,
            Err(CatalogError::Decode { .. })
        ));
        assert_eq!(catalog.gears().len(), 2);
    }

    #[tokio::test]
    async fn test_gated_reads_make_no_calls() {
        let (transport, mut catalog) = catalog();

        assert!(matches!(
            catalog.refresh_suggestions(None).await,
            Err(CatalogError::NotAuthenticated)
        ));
        let responsable = Session::new("tok-r", Role::Responsable);
        assert!(matches!(
            catalog.refresh_users(Some(&responsable)).await,
            Err(CatalogError::Forbidden { .. })
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_suggestion_resets_and_closes_form() {
        let (transport, mut catalog) = catalog();
        transport.respond(
            Method::Post,
            "/api/suggestions",
            200,
            suggestion_json("s-1", "Viseur", "pending"),
        );
        fill_suggestion(&mut catalog.view.suggestion_form);

        let suggestion = catalog.submit_suggestion().await.unwrap();
        assert_eq!(suggestion.status, SuggestionStatus::Pending);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].path, "/api/suggestions");
        assert_eq!(calls[0].bearer, None);
        assert_eq!(calls[0].body.as_ref().unwrap()["category"], "événements");

        let form = &catalog.view.suggestion_form;
        assert!(!form.open);
        assert_eq!(form.draft.name, "");
        assert_eq!(form.draft.nickname, "");
        assert_eq!(form.draft.gear_id, "");
        assert_eq!(form.draft.image_url, "");
        assert_eq!(form.draft.description, "");
    }

    #[tokio::test]
    async fn test_failed_suggestion_keeps_form_open() {
        let (transport, mut catalog) = catalog();
        transport.respond(
            Method::Post,
            "/api/suggestions",
            500,
            serde_json::json!({"detail": "db down"}),
        );
        fill_suggestion(&mut catalog.view.suggestion_form);

        let err = catalog.submit_suggestion().await.unwrap_err();
        assert_eq!(err.user_message(), "Erreur du serveur : db down");
        assert!(catalog.view.suggestion_form.open);
        assert_eq!(catalog.view.suggestion_form.draft.name, "Viseur");
    }

    #[tokio::test]
    async fn test_incomplete_suggestion_is_not_sent() {
        let (transport, mut catalog) = catalog();
        catalog.view.suggestion_form.open();
        catalog.view.suggestion_form.draft.name = "Viseur".into();

        assert!(matches!(
            catalog.submit_suggestion().await,
            Err(CatalogError::InvalidInput { .. })
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_approve_refetches_suggestions_then_gears() {
        let (transport, mut catalog) = catalog();
        transport.respond(
            Method::Get,
            "/api/suggestions",
            200,
            serde_json::json!([suggestion_json("s-1", "Viseur", "pending")]),
        );
        serve_gears(&transport, &[]);
        let session = creator();
        catalog.refresh_suggestions(Some(&session)).await.unwrap();
        transport.clear_calls();

        // Server flips the status; the local copy must only change via re-fetch
        transport.respond(
            Method::Put,
            "/api/suggestions/s-1/approve",
            200,
            serde_json::json!({"message": "Suggestion approved and gear created"}),
        );
        transport.respond(
            Method::Get,
            "/api/suggestions",
            200,
            serde_json::json!([suggestion_json("s-1", "Viseur", "approved")]),
        );
        serve_gears(&transport, &["new"]);

        catalog
            .approve_suggestion(Some(&session), "s-1")
            .await
            .unwrap();

        let calls = transport.calls();
        let paths: Vec<(Method, &str)> = calls.iter().map(|c| (c.method, c.path.as_str())).collect();
        assert_eq!(
            paths,
            vec![
                (Method::Put, "/api/suggestions/s-1/approve"),
                (Method::Get, "/api/suggestions"),
                (Method::Get, "/api/gears"),
            ]
        );
        assert!(calls.iter().all(|c| c.bearer.as_deref() == Some("tok-c") || c.path == "/api/gears"));
        assert_eq!(catalog.suggestions()[0].status, SuggestionStatus::Approved);
        assert_eq!(catalog.gears()[0].id, "new");
        assert_eq!(catalog.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_forget_session_keeps_only_public_data() {
        let (transport, mut catalog) = catalog();
        serve_gears(&transport, &["g-1"]);
        transport.respond(
            Method::Get,
            "/api/suggestions",
            200,
            serde_json::json!([suggestion_json("s-1", "Viseur", "pending")]),
        );
        transport.respond(
            Method::Get,
            "/api/users",
            200,
            serde_json::json!([{"id": "u-1", "username": "root", "role": "créateur", "created_at": "2024-01-01T00:00:00"}]),
        );
        let session = creator();
        catalog.refresh_all(Some(&session)).await.unwrap();
        catalog.begin_edit("g-1");
        catalog.view.user_form.username = "bob".into();
        catalog.view.active_tab = view::Tab::Users;

        catalog.forget_session();

        assert_eq!(catalog.gears().len(), 1);
        assert!(catalog.suggestions().is_empty());
        assert!(catalog.users().is_empty());
        assert!(catalog.view.editing.is_none());
        assert!(catalog.view.user_form.username.is_empty());
        assert_eq!(catalog.view.active_tab, view::Tab::Gears);
        assert_eq!(catalog.status_counts(), view::StatusCounts::default());
    }

    #[tokio::test]
    async fn test_failed_approve_leaves_local_record() {
        let (transport, mut catalog) = catalog();
        transport.respond(
            Method::Get,
            "/api/suggestions",
            200,
            serde_json::json!([suggestion_json("s-1", "Viseur", "pending")]),
        );
        let session = creator();
        catalog.refresh_suggestions(Some(&session)).await.unwrap();
        transport.clear_calls();

        transport.respond(
            Method::Put,
            "/api/suggestions/s-1/approve",
            403,
            serde_json::json!({"detail": "Insufficient permissions"}),
        );
        assert!(matches!(
            catalog.approve_suggestion(Some(&session), "s-1").await,
            Err(CatalogError::Forbidden { .. })
        ));
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(catalog.suggestions()[0].status, SuggestionStatus::Pending);
        assert_eq!(catalog.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_moderator_may_attempt_reject() {
        let (transport, mut catalog) = catalog();
        transport.respond(Method::Put, "/api/suggestions/s-2/reject", 200, serde_json::json!({}));
        transport.respond(Method::Get, "/api/suggestions", 200, serde_json::json!([]));
        let moderator = Session::new("tok-m", Role::Moderateur);

        catalog
            .reject_suggestion(Some(&moderator), "s-2")
            .await
            .unwrap();
        assert_eq!(transport.calls_to(Method::Put, "/api/suggestions/s-2/reject"), 1);
        assert_eq!(transport.calls_to(Method::Get, "/api/suggestions"), 1);
        assert_eq!(transport.calls_to(Method::Get, "/api/gears"), 0);
    }

    #[tokio::test]
    async fn test_create_user_resets_form_and_reloads() {
        let (transport, mut catalog) = catalog();
        transport.respond(
            Method::Post,
            "/api/auth/create-user",
            200,
            serde_json::json!({"message": "User created successfully"}),
        );
        transport.respond(
            Method::Get,
            "/api/users",
            200,
            serde_json::json!([{
                "_id": "x", "id": "u-1", "username": "alice",
                "role": "responsable", "created_at": "2024-02-02T02:02:02"
            }]),
        );
        catalog.view.user_form = UserForm {
            username: "alice".into(),
            password: "pw".into(),
            role: Role::Responsable,
        };

        catalog.create_user(Some(&creator())).await.unwrap();
        assert_eq!(catalog.view.user_form, UserForm::default());
        assert_eq!(catalog.users()[0].username, "alice");
        assert_eq!(
            transport.calls()[0].body,
            Some(serde_json::json!({"username": "alice", "password": "pw", "role": "responsable"}))
        );
    }

    #[tokio::test]
    async fn test_create_user_failure_keeps_form() {
        let (transport, mut catalog) = catalog();
        transport.respond(
            Method::Post,
            "/api/auth/create-user",
            400,
            serde_json::json!({"detail": "Username already exists"}),
        );
        catalog.view.user_form.username = "root".into();
        catalog.view.user_form.password = "pw".into();

        assert!(catalog.create_user(Some(&creator())).await.is_err());
        assert_eq!(catalog.view.user_form.username, "root");
        assert_eq!(transport.calls_to(Method::Get, "/api/users"), 0);
    }

    #[tokio::test]
    async fn test_update_gear_sends_edited_record() {
        let (transport, mut catalog) = catalog();
        serve_gears(&transport, &["g-1"]);
        catalog.refresh_gears().await.unwrap();
        transport.respond(Method::Put, "/api/gears/g-1", 200, serde_json::json!({}));

        let editing = catalog.begin_edit("g-1").unwrap();
        editing.nickname = "Renamed".into();
        let session = Session::new("tok-r", Role::Responsable);
        catalog.update_gear(Some(&session)).await.unwrap();

        let put = transport
            .calls()
            .into_iter()
            .find(|c| c.method == Method::Put)
            .unwrap();
        assert_eq!(put.body.unwrap()["nickname"], "Renamed");
        assert!(catalog.view.editing.is_none());
        assert_eq!(transport.calls_to(Method::Get, "/api/gears"), 2);
    }

    #[tokio::test]
    async fn test_update_gear_forbidden_for_moderator() {
        let (transport, mut catalog) = catalog();
        serve_gears(&transport, &["g-1"]);
        catalog.refresh_gears().await.unwrap();
        catalog.begin_edit("g-1");
        transport.clear_calls();

        let moderator = Session::new("tok-m", Role::Moderateur);
        assert!(matches!(
            catalog.update_gear(Some(&moderator)).await,
            Err(CatalogError::Forbidden { .. })
        ));
        assert!(transport.calls().is_empty());
        assert!(catalog.view.editing.is_some());
    }

    #[tokio::test]
    async fn test_unconfirmed_delete_sends_nothing() {
        let (transport, mut catalog) = catalog();
        let deleted = catalog
            .delete_gear(Some(&creator()), "g-1", |_| false)
            .await
            .unwrap();

        assert!(!deleted);
        assert_eq!(transport.calls_to(Method::Delete, "/api/gears/g-1"), 0);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_confirmed_delete_refetches() {
        let (transport, mut catalog) = catalog();
        transport.respond(Method::Delete, "/api/gears/g-1", 200, serde_json::json!({}));
        serve_gears(&transport, &[]);

        let mut asked = None;
        let deleted = catalog
            .delete_gear(Some(&creator()), "g-1", |id| {
                asked = Some(id.to_string());
                true
            })
            .await
            .unwrap();

        assert!(deleted);
        assert_eq!(asked.as_deref(), Some("g-1"));
        assert_eq!(transport.calls_to(Method::Delete, "/api/gears/g-1"), 1);
        assert_eq!(transport.calls_to(Method::Get, "/api/gears"), 1);
    }

    #[tokio::test]
    async fn test_refresh_all_respects_role() {
        let (transport, mut catalog) = catalog();
        serve_gears(&transport, &["a"]);
        transport.respond(Method::Get, "/api/suggestions", 200, serde_json::json!([]));
        transport.respond(Method::Get, "/api/users", 200, serde_json::json!([]));

        catalog.refresh_all(None).await.unwrap();
        assert_eq!(transport.calls().len(), 1);

        transport.clear_calls();
        let moderator = Session::new("tok-m", Role::Moderateur);
        catalog.refresh_all(Some(&moderator)).await.unwrap();
        assert_eq!(transport.calls_to(Method::Get, "/api/users"), 0);
        assert_eq!(transport.calls_to(Method::Get, "/api/suggestions"), 1);

        transport.clear_calls();
        catalog.refresh_all(Some(&creator())).await.unwrap();
        assert_eq!(transport.calls_to(Method::Get, "/api/users"), 1);
    }

    #[tokio::test]
    async fn test_visible_gears_uses_view_state() {
        let (transport, mut catalog) = catalog();
        transport.respond(
            Method::Get,
            "/api/gears",
            200,
            serde_json::json!([
                gear_json("1", "Viseur", "joueurs", "2024-01-01T00:00:00"),
                gear_json("2", "Marteau", "modérateur", "2024-01-02T00:00:00"),
            ]),
        );
        catalog.refresh_gears().await.unwrap();

        assert_eq!(catalog.visible_gears().len(), 1);
        catalog.view.selected_category = Category::Moderator;
        catalog.view.search = "MART".into();
        assert_eq!(catalog.visible_gears()[0].id, "2");
    }
}
