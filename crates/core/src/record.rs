use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned when the input leaves it blank
pub const DEFAULT_ROLE: &str = "USER";

/// Nickname assigned when the input leaves it blank
pub const DEFAULT_NICKNAME: &str = "guest";

/// Account status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
    /// Every record starts here unless told otherwise
    #[default]
    Pending,
}

impl Status {
    pub const VALUES: &[Status] = &[Status::Active, Status::Inactive, Status::Pending];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Pending => "pending",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "inactive" => Ok(Status::Inactive),
            "pending" => Ok(Status::Pending),
            _ => Err(crate::ValidationError::new(
                "status",
                format!("`{}` is not a valid status (expected active, inactive or pending)", s),
            )),
        }
    }
}

/// A record as supplied by a caller, before the store assigns an id
///
/// Optional fields fall back to the same defaults the store would apply, so
/// seed fixtures and CLI input can omit them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(default)]
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub bio: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl NewRecord {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self { username: username.into(), email: email.into(), ..Default::default() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    /// Apply the storage transforms: trimmed username, trimmed lowercase
    /// email, uppercase role, and defaults for an absent role or nickname.
    ///
    /// A supplied value is never replaced by a default, so an empty nickname
    /// is left for validation to reject.
    pub fn normalize(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_lowercase();

        self.role = Some(match self.role.as_deref() {
            Some(role) => role.trim().to_uppercase(),
            None => DEFAULT_ROLE.to_string(),
        });

        if self.nickname.is_none() {
            self.nickname = Some(DEFAULT_NICKNAME.to_string());
        }

        self
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Insertion sequence number, strictly increasing
    pub id: i64,
    pub name: String,
    pub username: String,
    pub bio: String,
    pub email: String,
    pub role: String,
    pub status: Status,
    /// Set once at insertion; never rewritten
    pub created_by: Option<String>,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Build a stored record from a normalized input
    pub fn from_new(id: i64, new: NewRecord, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            username: new.username,
            bio: new.bio,
            email: new.email,
            role: new.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            status: new.status,
            created_by: new.created_by,
            nickname: new.nickname.unwrap_or_else(|| DEFAULT_NICKNAME.to_string()),
            created_at,
        }
    }
}

/// A record paired with its relevance score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub record: Record,
    pub score: u32,
}
