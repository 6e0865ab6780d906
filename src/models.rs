// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization level attached to an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Createur,
    Responsable,
    Moderateur,
    /// Any label the server sends that the client does not know about
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Createur => "créateur",
            Role::Responsable => "responsable",
            Role::Moderateur => "modérateur",
            Role::Other(label) => label,
        }
    }

    /// May approve/reject suggestions
    pub fn can_moderate(&self) -> bool {
        matches!(self, Role::Createur | Role::Responsable)
    }

    /// May create, edit and delete gears directly
    pub fn can_edit_gears(&self) -> bool {
        matches!(self, Role::Createur | Role::Responsable)
    }

    /// May list and create user accounts
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Createur)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "créateur" => Role::Createur,
            "responsable" => Role::Responsable,
            "modérateur" => Role::Moderateur,
            _ => Role::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog section a gear belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[default]
    #[serde(rename = "joueurs")]
    Players,
    #[serde(rename = "modérateur")]
    Moderator,
    #[serde(rename = "événements")]
    Events,
    #[serde(rename = "interdits")]
    Forbidden,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Players,
        Category::Moderator,
        Category::Events,
        Category::Forbidden,
    ];

    /// Identifier used on the wire
    pub fn id(&self) -> &'static str {
        match self {
            Category::Players => "joueurs",
            Category::Moderator => "modérateur",
            Category::Events => "événements",
            Category::Forbidden => "interdits",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Players => "Joueurs",
            Category::Moderator => "Modérateur",
            Category::Events => "Événements",
            Category::Forbidden => "Interdits",
        }
    }

    /// Parse either the wire id or the English name
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Category::ALL.into_iter().find(|c| {
            c.id() == value
                || match c {
                    Category::Players => value == "players",
                    Category::Moderator => value == "moderator",
                    Category::Events => value == "events",
                    Category::Forbidden => value == "forbidden",
                }
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Gear payload without the fields the server assigns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GearDraft {
    pub name: String,
    pub nickname: String,
    pub gear_id: String,
    pub image_url: String,
    pub description: String,
    pub category: Category,
}

impl GearDraft {
    /// Names of required fields that are still empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.nickname.trim().is_empty() {
            missing.push("nickname");
        }
        if self.gear_id.trim().is_empty() {
            missing.push("gear_id");
        }
        if self.image_url.trim().is_empty() {
            missing.push("image_url");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gear {
    pub id: String,
    pub name: String,
    pub nickname: String,
    pub gear_id: String,
    pub image_url: String,
    pub description: String,
    pub category: Category,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Moderation state of a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SuggestionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SuggestionStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
    pub nickname: String,
    pub gear_id: String,
    pub image_url: String,
    pub description: String,
    pub category: Category,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub status: SuggestionStatus,
}

/// Account as listed by the server (never carries the password hash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub username: String,
    pub role: Role,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Timestamps arrive without an offset (UTC implied); RFC 3339 is accepted too.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
