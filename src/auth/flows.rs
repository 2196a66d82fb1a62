//! Sign-up, sign-in, sign-out and startup flows
//!
//! Each flow runs its steps in order and stops at the first failure.
//! Navigation is expressed as the [`Destination`] the caller should show.

use super::fallback::SessionFallback;
use super::session::SessionStore;
use crate::data::{NewUser, SignInCredentials};
use crate::error::AppError;
use crate::queries::Queries;

/// Where the caller should navigate after a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Feed,
    SignIn,
}

/// Create the account, sign in and load the user
///
/// Fails with [`AppError::Unauthorized`] if the new session cannot be
/// confirmed.
pub async fn sign_up(
    queries: &Queries,
    session: &SessionStore,
    user: NewUser,
) -> Result<Destination, AppError> {
    let credentials = SignInCredentials {
        email: user.email.clone(),
        password: user.password.clone(),
    };

    queries.create_user_account(user).await?;
    queries.sign_in_account(credentials).await?;
    confirm(session).await
}

pub async fn sign_in(
    queries: &Queries,
    session: &SessionStore,
    credentials: SignInCredentials,
) -> Result<Destination, AppError> {
    queries.sign_in_account(credentials).await?;
    confirm(session).await
}

pub async fn sign_out(queries: &Queries, session: &SessionStore) -> Result<Destination, AppError> {
    queries.sign_out_account().await?;
    session.mark_signed_out();
    Ok(Destination::SignIn)
}

/// Decide the first screen
///
/// A persisted signed-out flag goes straight to sign-in without a round
/// trip; the session check still runs in the background. Otherwise the
/// check is awaited.
pub async fn bootstrap(
    session: &SessionStore,
    fallback: &SessionFallback,
) -> Result<Destination, AppError> {
    if fallback.is_signed_out().await? {
        tracing::debug!("Persisted session flag says signed out");
        let session = session.clone();
        tokio::spawn(async move {
            session.check_auth_user().await;
        });
        return Ok(Destination::SignIn);
    }

    if session.check_auth_user().await {
        Ok(Destination::Feed)
    } else {
        Ok(Destination::SignIn)
    }
}

async fn confirm(session: &SessionStore) -> Result<Destination, AppError> {
    if session.check_auth_user().await {
        Ok(Destination::Feed)
    } else {
        Err(AppError::Unauthorized)
    }
}
