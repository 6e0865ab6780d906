// src/permissions.rs
use crate::error::{CatalogError, Result};
use crate::models::Role;
use crate::session::Session;

/// Operations gated on the client before any request is made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListSuggestions,
    ModerateSuggestion,
    ListUsers,
    CreateUser,
    EditGear,
    CurrentUser,
}

impl Action {
    fn allows(&self, role: &Role) -> bool {
        match self {
            // Any logged-in role may read suggestions and try to moderate;
            // the server has the final word on moderation.
            Action::ListSuggestions | Action::ModerateSuggestion | Action::CurrentUser => true,
            Action::ListUsers | Action::CreateUser => role.can_manage_users(),
            Action::EditGear => role.can_edit_gears(),
        }
    }
}

/// Check the session against `action`, returning it for the bearer token
pub fn authorize(session: Option<&Session>, action: Action) -> Result<&Session> {
    let session = session.ok_or(CatalogError::NotAuthenticated)?;
    if action.allows(&session.role) {
        Ok(session)
    } else {
        Err(CatalogError::forbidden(format!(
            "role '{}' may not perform {:?}",
            session.role, action
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_session_is_not_authenticated() {
        assert!(matches!(
            authorize(None, Action::ListSuggestions),
            Err(CatalogError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_moderation_is_not_blocked_locally() {
        let moderator = Session::new("t", Role::Moderateur);
        assert!(authorize(Some(&moderator), Action::ModerateSuggestion).is_ok());
        assert!(matches!(
            authorize(Some(&moderator), Action::EditGear),
            Err(CatalogError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_user_management_is_creator_only() {
        let responsable = Session::new("t", Role::Responsable);
        let creator = Session::new("t", Role::Createur);
        assert!(authorize(Some(&responsable), Action::ListUsers).is_err());
        assert!(authorize(Some(&responsable), Action::EditGear).is_ok());
        assert_eq!(
            authorize(Some(&creator), Action::CreateUser).unwrap().token,
            "t"
        );
    }
}
