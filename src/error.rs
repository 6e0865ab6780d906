use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    // Authorization errors
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // Remote API errors
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("API returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Malformed response for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse state file '{path}': {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    // Configuration errors
    #[error("Invalid config: {message}")]
    Config { message: String },
}

impl CatalogError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        CatalogError::Forbidden {
            message: message.into(),
        }
    }

    /// Map a non-OK HTTP status to the matching variant.
    pub fn from_status(status: u16, resource: &str, detail: String) -> Self {
        match status {
            401 => CatalogError::NotAuthenticated,
            403 => CatalogError::Forbidden { message: detail },
            404 => CatalogError::NotFound {
                resource: resource.to_string(),
            },
            _ => CatalogError::Status { status, detail },
        }
    }

    /// French text shown to the person using the client.
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::NotAuthenticated => "Vous devez être connecté".to_string(),
            CatalogError::InvalidCredentials => {
                "Nom d'utilisateur ou mot de passe incorrect".to_string()
            }
            CatalogError::Forbidden { .. } => "Permissions insuffisantes".to_string(),
            CatalogError::NotFound { resource } => format!("Introuvable : {}", resource),
            CatalogError::Status { detail, .. } if !detail.is_empty() => {
                format!("Erreur du serveur : {}", detail)
            }
            CatalogError::Status { status, .. } => format!("Erreur du serveur ({})", status),
            CatalogError::Transport { .. } => "Impossible de joindre le serveur".to_string(),
            CatalogError::Decode { .. } => "Réponse du serveur invalide".to_string(),
            CatalogError::StateSave { .. }
            | CatalogError::StateLoad { .. }
            | CatalogError::StateParse { .. } => "Erreur de stockage local".to_string(),
            CatalogError::InvalidInput { message } => {
                format!("Formulaire incomplet : {}", message)
            }
            CatalogError::Config { message } => format!("Configuration invalide : {}", message),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Transport {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
