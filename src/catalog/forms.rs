use crate::error::{CatalogError, Result};
use crate::models::{Category, CreateUserRequest, Gear, GearDraft, Role};
use crate::view::{SortBy, Tab};

/// Suggestion submission form. Open/closed mirrors the modal in a UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionForm {
    pub draft: GearDraft,
    pub open: bool,
}

impl SuggestionForm {
    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Empty every field and put the category back to players
    pub fn reset(&mut self) {
        self.draft = GearDraft::default();
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.draft.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::InvalidInput {
                message: missing.join(", "),
            })
        }
    }
}

/// New account form (créateur only)
#[derive(Debug, Clone, PartialEq)]
pub struct UserForm {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl Default for UserForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            role: Role::Moderateur,
        }
    }
}

impl UserForm {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn to_request(&self) -> Result<CreateUserRequest> {
        let mut missing = Vec::new();
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(CatalogError::InvalidInput {
                message: missing.join(", "),
            });
        }

        Ok(CreateUserRequest {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            role: self.role.clone(),
        })
    }
}

/// Everything a UI would keep between renders. Nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub active_tab: Tab,
    pub selected_category: Category,
    pub search: String,
    pub sort: SortBy,
    pub suggestion_form: SuggestionForm,
    pub user_form: UserForm,
    /// Copy of the gear currently open in the edit modal
    pub editing: Option<Gear>,
}
