//! Session/identity store
//!
//! Holds the authenticated user for the whole process. The store is the
//! single writer; views hold `watch` receivers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::data::{QueryKey, User};
use crate::queries::Queries;

/// Authentication state of the process
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    /// A session check is in flight
    Checking,
    Authenticated(Arc<User>),
}

impl SessionState {
    pub fn user(&self) -> Option<&Arc<User>> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Current-user store
///
/// Cheap to clone; clones share the state.
#[derive(Clone)]
pub struct SessionStore {
    queries: Queries,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new(queries: Queries) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            queries,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<Arc<User>> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Ask the platform who is signed in
    ///
    /// Moves to `Authenticated` when a mirrored user exists, otherwise to
    /// `Anonymous`. A failed check counts as signed out. The fetched user
    /// is also written to the current-user cache entry.
    pub async fn check_auth_user(&self) -> bool {
        self.state.send_replace(SessionState::Checking);

        match self.queries.gateway().get_current_user().await {
            Ok(Some(user)) => {
                tracing::info!(user_id = %user.id, username = %user.username, "Session active");
                self.queries
                    .client()
                    .set_query_data(QueryKey::current_user(), Some(user.clone()));
                self.state
                    .send_replace(SessionState::Authenticated(Arc::new(user)));
                true
            }
            Ok(None) => {
                tracing::debug!("No active session");
                self.state.send_replace(SessionState::Anonymous);
                false
            }
            Err(e) => {
                e.record();
                tracing::warn!(error = %e, "Session check failed");
                self.state.send_replace(SessionState::Anonymous);
                false
            }
        }
    }

    /// Forget the user after a successful sign-out
    pub fn mark_signed_out(&self) {
        self.state.send_replace(SessionState::Anonymous);
    }
}
