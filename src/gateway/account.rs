//! Account and user operations

use serde_json::json;

use super::documents::{UserDocument, decode};
use super::{Gateway, optional, require};
use crate::backend::{CURRENT_SESSION, Query};
use crate::data::{EntityId, NewUser, Session, SignInCredentials, User};
use crate::error::AppError;

/// Values of a freshly mirrored user document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    pub account_id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub image_url: String,
}

impl Gateway {
    /// Create the platform account and its mirrored user document
    ///
    /// The avatar starts as the initials avatar of the account name.
    pub async fn create_user_account(&self, user: &NewUser) -> Result<User, AppError> {
        user.validate()?;

        let account = self
            .backend
            .create_account(&EntityId::new().0, &user.email, &user.password, &user.name)
            .await?;
        tracing::info!(account_id = %account.id, "Account created");

        let avatar = self.backend.initials_avatar_url(&account.name)?;

        self.save_user_to_db(NewUserRecord {
            account_id: account.id,
            name: account.name,
            username: user.username.clone(),
            email: account.email,
            image_url: avatar.to_string(),
        })
        .await
    }

    /// Create the user document mirroring an account
    pub async fn save_user_to_db(&self, record: NewUserRecord) -> Result<User, AppError> {
        require("account id", &record.account_id)?;

        let value = self
            .backend
            .create_document(
                &self.collections.users,
                &EntityId::new().0,
                json!({
                    "accountId": record.account_id,
                    "name": record.name,
                    "username": record.username,
                    "email": record.email,
                    "imageUrl": record.image_url,
                }),
            )
            .await?;

        decode::<UserDocument, _>("user", value)
    }

    pub async fn sign_in_account(
        &self,
        credentials: &SignInCredentials,
    ) -> Result<Session, AppError> {
        credentials.validate()?;

        let session = self
            .backend
            .create_email_password_session(&credentials.email, &credentials.password)
            .await?;
        tracing::info!(session_id = %session.id, "Signed in");
        Ok(session)
    }

    pub async fn sign_out_account(&self) -> Result<(), AppError> {
        self.backend.delete_session(CURRENT_SESSION).await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// User document of the signed-in account, `None` without a session
    pub async fn get_current_user(&self) -> Result<Option<User>, AppError> {
        let Some(account) = optional(self.backend.get_account().await)? else {
            return Ok(None);
        };

        let users = self
            .backend
            .list_documents(
                &self.collections.users,
                &[Query::equal("accountId", account.id.as_str()), Query::limit(1)],
            )
            .await?;

        users
            .documents
            .into_iter()
            .next()
            .map(|value| decode::<UserDocument, _>("user", value))
            .transpose()
    }

    /// Most recently created users
    pub async fn get_users(&self, limit: Option<usize>) -> Result<Vec<User>, AppError> {
        let limit = limit.unwrap_or(self.limits.users_limit);
        let users = self
            .backend
            .list_documents(
                &self.collections.users,
                &[Query::order_desc("$createdAt"), Query::limit(limit)],
            )
            .await?;

        users
            .documents
            .into_iter()
            .map(|value| decode::<UserDocument, _>("user", value))
            .collect()
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        require("user id", user_id)?;

        optional(
            self.backend
                .get_document(&self.collections.users, user_id)
                .await,
        )?
        .map(|value| decode::<UserDocument, _>("user", value))
        .transpose()
    }
}
