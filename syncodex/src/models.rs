//! Document shapes persisted by the services, plus schema decoding at the
//! store boundary.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned, de::Error as _};
use serde_json::Value;

use crate::{
    errors::{GraphError, ValidationError, ValidationIssue, ValidationResult},
    id::UserId,
    identity::Identity,
    validators::{is_valid_url, is_valid_username},
};

pub const USERS: &str = "users";
pub const FOLLOWS: &str = "follows";
pub const PROJECTS: &str = "projects";

pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// A user's profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default, deserialize_with = "id_set")]
    pub following: BTreeSet<UserId>,
    #[serde(default, deserialize_with = "id_set")]
    pub followers: BTreeSet<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}

impl UserProfile {
    pub fn new(id: UserId, defaults: ProfileDefaults, now: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name: defaults.display_name,
            username: defaults.username,
            photo_url: defaults.photo_url,
            bio: defaults.bio,
            following: BTreeSet::new(),
            followers: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Public handle, falling back to the id when no username was chosen.
    pub fn handle(&self) -> &str {
        if self.username.is_empty() {
            self.id.as_str()
        } else {
            &self.username
        }
    }

    pub fn counts(&self) -> RelationCounts {
        RelationCounts {
            followers: self.followers.len(),
            following: self.following.len(),
        }
    }
}

/// Initial attributes for a profile created on first sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDefaults {
    pub display_name: String,
    pub username: String,
    pub photo_url: Option<String>,
    pub bio: String,
}

impl ProfileDefaults {
    pub fn from_identity(identity: &Identity) -> Self {
        let display_name = identity
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(default_display_name);
        Self {
            username: derive_username(&display_name, &identity.id),
            display_name,
            photo_url: identity.photo_url.clone(),
            bio: String::new(),
        }
    }
}

/// Lowercased, underscore-joined handle from a display name; falls back to
/// an id-based handle when too little of the name survives.
pub fn derive_username(display_name: &str, id: &UserId) -> String {
    let mut handle: String = display_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    handle.truncate(32);
    let handle = handle.trim_matches('_').to_string();
    if is_valid_username(&handle) && handle != DEFAULT_DISPLAY_NAME.to_ascii_lowercase() {
        return handle;
    }
    fallback_username(id)
}

/// Id-based handle used when a name yields nothing usable or is taken.
pub fn fallback_username(id: &UserId) -> String {
    let suffix: String = id
        .as_str()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(12)
        .collect();
    format!("user_{suffix}")
}

/// Profile edit request. Only provided fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.username.is_none() && self.photo_url.is_none() && self.bio.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let mut issues = Vec::new();
        if let Some(name) = &self.display_name
            && (name.trim().is_empty() || name.chars().count() > 64)
        {
            issues.push(ValidationIssue::new(
                "display_name",
                "length",
                "Display name must be between 1 and 64 characters.",
            ));
        }
        if let Some(username) = &self.username
            && !is_valid_username(username)
        {
            issues.push(ValidationIssue::new(
                "username",
                "invalid_username",
                "Username must be 3-32 lowercase letters, digits or underscores.",
            ));
        }
        if let Some(url) = &self.photo_url
            && !is_valid_url(url)
        {
            issues.push(ValidationIssue::new("photo_url", "invalid_url", "Photo URL is not valid."));
        }
        if let Some(bio) = &self.bio
            && bio.chars().count() > 500
        {
            issues.push(ValidationIssue::new("bio", "length", "Bio must be at most 500 characters."));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

/// Persisted per-edge relation record: `follower` follows `followed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub followed_id: UserId,
    pub follower_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl FollowEdge {
    pub fn document_id(&self) -> String {
        edge_document_id(&self.followed_id, &self.follower_id)
    }
}

/// Composite document id for the `(followed, follower)` edge.
///
/// `.` never appears in a valid [`UserId`], so the encoding is unambiguous.
pub fn edge_document_id(followed: &UserId, follower: &UserId) -> String {
    format!("{followed}.{follower}")
}

/// Result of a relation status lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RelationStatus {
    pub is_following: bool,
}

/// Denormalized relation set sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RelationCounts {
    pub followers: usize,
    pub following: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// A project uploaded by a user and optionally shown on their channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: Option<String>,
    pub visibility: Visibility,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Project upload request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub language: Option<String>,
    pub visibility: Visibility,
    pub tags: Vec<String>,
}

impl NewProject {
    pub fn public(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            language: None,
            visibility: Visibility::Public,
            tags: Vec::new(),
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > 120 {
            return Err(ValidationError::single(
                "title",
                "length",
                "Project title must be between 1 and 120 characters.",
            ));
        }
        Ok(())
    }
}

/// Decodes a raw store document, failing fast on schema mismatch.
pub fn decode_document<T>(collection: &str, id: &str, value: Value) -> Result<T, GraphError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value).map_err(|err| GraphError::malformed(collection, id, err))
}

/// Decodes a profile and checks the embedded id matches its document id.
pub fn decode_profile(id: &UserId, value: Value) -> Result<UserProfile, GraphError> {
    let profile: UserProfile = decode_document(USERS, id.as_str(), value)?;
    if &profile.id != id {
        return Err(GraphError::malformed(
            USERS,
            id.as_str(),
            format!("embedded id '{}' does not match", profile.id),
        ));
    }
    Ok(profile)
}

pub fn encode_document<T: Serialize>(collection: &str, id: &str, value: &T) -> Result<Value, GraphError> {
    serde_json::to_value(value).map_err(|err| GraphError::malformed(collection, id, err))
}

/// Scripted stores encode an emptied array as `{}`; accept that, `null`,
/// or a real array.
fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) if map.is_empty() => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(D::Error::custom(format!("expected an array, found {other}"))),
    }
}

fn id_set<'de, D>(deserializer: D) -> Result<BTreeSet<UserId>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_items(deserializer)?
        .into_iter()
        .map(|item| serde_json::from_value::<UserId>(item).map_err(D::Error::custom))
        .collect()
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_items(deserializer)?
        .into_iter()
        .map(|item| serde_json::from_value::<String>(item).map_err(D::Error::custom))
        .collect()
}
