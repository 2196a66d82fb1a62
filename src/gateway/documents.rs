//! Platform document schemas
//!
//! Raw records as the platform returns them. Relationship attributes come
//! back either as a bare id or as the expanded related document, depending
//! on query depth; [`Relation`] accepts both. Conversion into domain types
//! fails with [`AppError::Schema`] when a required piece is missing.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::data::{Post, SavedPost, SavedPostRecord, User, UserSummary};
use crate::error::AppError;

/// Relationship attribute: bare id or expanded document
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Relation<T> {
    Id(String),
    Expanded(Box<T>),
}

impl<T: DocumentId> Relation<T> {
    pub(crate) fn id(&self) -> &str {
        match self {
            Relation::Id(id) => id,
            Relation::Expanded(document) => document.document_id(),
        }
    }
}

pub(crate) trait DocumentId {
    fn document_id(&self) -> &str;
}

/// Any document, reduced to its id
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DocRef {
    #[serde(rename = "$id")]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatorDocument {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostDocument {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub creator: Option<Relation<CreatorDocument>>,
    pub caption: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image_url: String,
    pub image_id: String,
    #[serde(default)]
    pub likes: Vec<Relation<DocRef>>,
}

/// Save record as embedded in a user document
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SaveRefDocument {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<Relation<DocRef>>,
    #[serde(default)]
    pub post: Option<Relation<DocRef>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SaveDocument {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<Relation<DocRef>>,
    #[serde(default)]
    pub post: Option<Relation<PostDocument>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserDocument {
    #[serde(rename = "$id")]
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub save: Vec<Relation<SaveRefDocument>>,
    #[serde(default)]
    pub liked: Vec<Relation<DocRef>>,
}

impl DocumentId for DocRef {
    fn document_id(&self) -> &str {
        &self.id
    }
}

impl DocumentId for CreatorDocument {
    fn document_id(&self) -> &str {
        &self.id
    }
}

impl DocumentId for PostDocument {
    fn document_id(&self) -> &str {
        &self.id
    }
}

impl DocumentId for SaveRefDocument {
    fn document_id(&self) -> &str {
        &self.id
    }
}

/// Decode a raw record and convert it into a domain type
pub(crate) fn decode<D, T>(kind: &str, value: Value) -> Result<T, AppError>
where
    D: DeserializeOwned,
    T: TryFrom<D, Error = AppError>,
{
    let document: D = serde_json::from_value(value)
        .map_err(|e| AppError::Schema(format!("{} record: {}", kind, e)))?;
    T::try_from(document)
}

impl From<Relation<CreatorDocument>> for UserSummary {
    fn from(relation: Relation<CreatorDocument>) -> Self {
        match relation {
            Relation::Id(id) => UserSummary {
                id,
                name: None,
                username: None,
                image_url: None,
            },
            Relation::Expanded(creator) => UserSummary {
                id: creator.id,
                name: creator.name,
                username: creator.username,
                image_url: creator.image_url,
            },
        }
    }
}

impl TryFrom<PostDocument> for Post {
    type Error = AppError;

    fn try_from(document: PostDocument) -> Result<Self, Self::Error> {
        if document.image_id.is_empty() {
            return Err(AppError::Schema(format!(
                "post {} has no image id",
                document.id
            )));
        }

        Ok(Post {
            likes: document
                .likes
                .iter()
                .map(|like| like.id().to_string())
                .collect(),
            creator: document.creator.map(UserSummary::from),
            id: document.id,
            caption: document.caption,
            location: document.location.unwrap_or_default(),
            tags: document.tags,
            image_url: document.image_url,
            image_id: document.image_id,
            created_at: document.created_at,
            updated_at: document.updated_at,
        })
    }
}

impl TryFrom<SaveRefDocument> for SavedPostRecord {
    type Error = AppError;

    fn try_from(document: SaveRefDocument) -> Result<Self, Self::Error> {
        let post = document
            .post
            .ok_or_else(|| AppError::Schema(format!("save {} has no post", document.id)))?;

        Ok(SavedPostRecord {
            post_id: post.id().to_string(),
            user_id: document.user.map(|user| user.id().to_string()),
            id: document.id,
        })
    }
}

impl TryFrom<SaveDocument> for SavedPostRecord {
    type Error = AppError;

    fn try_from(document: SaveDocument) -> Result<Self, Self::Error> {
        let post = document
            .post
            .ok_or_else(|| AppError::Schema(format!("save {} has no post", document.id)))?;

        Ok(SavedPostRecord {
            post_id: post.id().to_string(),
            user_id: document.user.map(|user| user.id().to_string()),
            id: document.id,
        })
    }
}

impl TryFrom<SaveDocument> for SavedPost {
    type Error = AppError;

    fn try_from(document: SaveDocument) -> Result<Self, Self::Error> {
        match document.post {
            Some(Relation::Expanded(post)) => Ok(SavedPost {
                record_id: document.id,
                post: Post::try_from(*post)?,
            }),
            Some(Relation::Id(post_id)) => Err(AppError::Schema(format!(
                "save {} references post {} without expanding it",
                document.id, post_id
            ))),
            None => Err(AppError::Schema(format!("save {} has no post", document.id))),
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = AppError;

    fn try_from(document: UserDocument) -> Result<Self, Self::Error> {
        let saves = document
            .save
            .into_iter()
            .map(|relation| match relation {
                Relation::Expanded(record) => SavedPostRecord::try_from(*record),
                Relation::Id(id) => Err(AppError::Schema(format!(
                    "user {} references save {} without expanding it",
                    document.id, id
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(User {
            liked: document
                .liked
                .iter()
                .map(|post| post.id().to_string())
                .collect(),
            saves,
            id: document.id,
            account_id: document.account_id,
            name: document.name,
            username: document.username,
            email: document.email,
            image_url: document.image_url.unwrap_or_default(),
            bio: document.bio,
        })
    }
}
