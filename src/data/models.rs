//! Data models
//!
//! Domain types mirrored from the platform's documents, plus the input
//! types accepted by the gateway. Document ids are ULIDs generated on
//! the client; timestamps are chrono UTC datetimes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything addressable by a document id
///
/// Infinite lists derive their next cursor from the last item's id.
pub trait HasId {
    fn id(&self) -> &str;
}

// =============================================================================
// User
// =============================================================================

/// Mirrored user document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Document id
    pub id: String,
    /// Platform account id
    pub account_id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    /// Avatar URL (initials avatar until the user uploads one)
    pub image_url: String,
    pub bio: Option<String>,
    /// Bookmarks owned by this user
    pub saves: Vec<SavedPostRecord>,
    /// Ids of posts this user liked
    pub liked: Vec<String>,
}

impl User {
    /// Save record for `post_id`, if this user bookmarked it
    pub fn saved_record_for(&self, post_id: &str) -> Option<&SavedPostRecord> {
        self.saves.iter().find(|record| record.post_id == post_id)
    }
}

impl HasId for User {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Creator information embedded in a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub image_url: Option<String>,
}

// =============================================================================
// Post
// =============================================================================

/// A post with its media reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub creator: Option<UserSummary>,
    pub caption: String,
    pub location: String,
    pub tags: Vec<String>,
    /// Preview URL derived from the uploaded file
    pub image_url: String,
    /// Uploaded file id
    pub image_id: String,
    /// Ids of users who liked this post
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HasId for Post {
    fn id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Saves
// =============================================================================

/// Join record linking a user to a bookmarked post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPostRecord {
    /// Record id, used to target deletion
    pub id: String,
    pub user_id: Option<String>,
    pub post_id: String,
}

/// A save record with its post expanded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPost {
    pub record_id: String,
    pub post: Post,
}

impl HasId for SavedPost {
    fn id(&self) -> &str {
        &self.record_id
    }
}

// =============================================================================
// Account / Session
// =============================================================================

/// Platform account (credentials side of a user)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Platform session
///
/// Held in memory only; the platform owns the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub expire: Option<DateTime<Utc>>,
}

/// Uploaded file metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
}

/// One page of a list operation
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentList<T> {
    pub total: u64,
    pub documents: Vec<T>,
}

// =============================================================================
// Inputs
// =============================================================================

/// File picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Sign-up form values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        min_chars("name", &self.name, 2)?;
        min_chars("username", &self.username, 2)?;
        email("email", &self.email)?;
        min_chars("password", &self.password, 8)
    }
}

/// Sign-in form values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInCredentials {
    pub email: String,
    pub password: String,
}

impl SignInCredentials {
    pub fn validate(&self) -> Result<(), AppError> {
        email("email", &self.email)?;
        min_chars("password", &self.password, 8)
    }
}

/// New post form values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Creator's user document id
    pub user_id: String,
    pub caption: String,
    pub location: String,
    /// Free-text, comma separated
    pub tags: String,
    pub file: MediaFile,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), AppError> {
        char_range("caption", &self.caption, 5, 2200)?;
        char_range("location", &self.location, 2, 100)
    }
}

/// Edit post form values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePost {
    pub post_id: String,
    pub caption: String,
    pub location: String,
    pub tags: String,
    /// Current file id
    pub image_id: String,
    /// Current preview URL
    pub image_url: String,
    /// Replacement file, if the user picked one
    pub file: Option<MediaFile>,
}

impl UpdatePost {
    pub fn validate(&self) -> Result<(), AppError> {
        char_range("caption", &self.caption, 5, 2200)?;
        char_range("location", &self.location, 2, 100)
    }
}

fn min_chars(field: &str, value: &str, min: usize) -> Result<(), AppError> {
    if value.chars().count() < min {
        return Err(AppError::Validation(format!(
            "{} must be at least {} characters long",
            field, min
        )));
    }
    Ok(())
}

fn char_range(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {} characters long",
            field, min, max
        )));
    }
    Ok(())
}

fn email(field: &str, value: &str) -> Result<(), AppError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AppError::Validation(format!(
            "{} must be a valid email address",
            field
        )));
    }
    Ok(())
}
