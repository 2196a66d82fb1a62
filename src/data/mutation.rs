//! Mutation kinds, their invalidation sets and status tracking.

use std::collections::HashMap;
use std::sync::Mutex;

use super::keys::{QueryKey, QueryTag};

/// Every write the client can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CreateUserAccount,
    SignInAccount,
    SignOutAccount,
    CreatePost,
    UpdatePost,
    DeletePost,
    LikePost,
    SavePost,
    DeleteSavedPost,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateUserAccount => "create_user_account",
            Self::SignInAccount => "sign_in_account",
            Self::SignOutAccount => "sign_out_account",
            Self::CreatePost => "create_post",
            Self::UpdatePost => "update_post",
            Self::DeletePost => "delete_post",
            Self::LikePost => "like_post",
            Self::SavePost => "save_post",
            Self::DeleteSavedPost => "delete_saved_post",
        }
    }

    /// Keys marked stale after this mutation succeeds
    ///
    /// Static and deliberately broad; `post_id` narrows only the
    /// post-detail entry.
    pub fn dependent_keys(&self, post_id: Option<&str>) -> Vec<QueryKey> {
        let post_detail = || post_id.map(QueryKey::post_by_id);
        match self {
            Self::CreateUserAccount | Self::SignInAccount | Self::SignOutAccount => Vec::new(),
            Self::CreatePost | Self::DeletePost => vec![QueryKey::recent_posts()],
            Self::UpdatePost => post_detail().into_iter().collect(),
            Self::LikePost => post_detail()
                .into_iter()
                .chain([
                    QueryKey::recent_posts(),
                    QueryKey::tag(QueryTag::GetPosts),
                    QueryKey::infinite_posts(),
                    QueryKey::current_user(),
                ])
                .collect(),
            Self::SavePost | Self::DeleteSavedPost => vec![
                QueryKey::recent_posts(),
                QueryKey::tag(QueryTag::GetPosts),
                QueryKey::infinite_posts(),
                QueryKey::current_user(),
                QueryKey::tag(QueryTag::GetSavedPosts),
            ],
        }
    }
}

/// Status of the most recent mutation of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        *self == Self::Pending
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Success
    }

    pub fn is_error(&self) -> bool {
        *self == Self::Error
    }
}

#[derive(Debug, Default)]
struct Slot {
    pending: usize,
    last: MutationStatus,
}

/// Per-kind mutation status
///
/// A kind stays `Pending` while any mutation of that kind is in flight.
#[derive(Debug, Default)]
pub struct MutationTracker {
    slots: Mutex<HashMap<MutationKind, Slot>>,
}

impl MutationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, kind: MutationKind) {
        let mut slots = self.lock();
        slots.entry(kind).or_default().pending += 1;
    }

    pub fn finish(&self, kind: MutationKind, succeeded: bool) {
        let mut slots = self.lock();
        let slot = slots.entry(kind).or_default();
        slot.pending = slot.pending.saturating_sub(1);
        slot.last = if succeeded {
            MutationStatus::Success
        } else {
            MutationStatus::Error
        };
    }

    pub fn status(&self, kind: MutationKind) -> MutationStatus {
        let slots = self.lock();
        match slots.get(&kind) {
            Some(slot) if slot.pending > 0 => MutationStatus::Pending,
            Some(slot) => slot.last,
            None => MutationStatus::Idle,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MutationKind, Slot>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_invalidates_post_feeds_and_current_user() {
        let keys = MutationKind::LikePost.dependent_keys(Some("p1"));
        assert_eq!(
            keys,
            vec![
                QueryKey::post_by_id("p1"),
                QueryKey::recent_posts(),
                QueryKey::tag(QueryTag::GetPosts),
                QueryKey::infinite_posts(),
                QueryKey::current_user(),
            ]
        );
    }

    #[test]
    fn create_post_invalidates_recent_posts_only() {
        assert_eq!(
            MutationKind::CreatePost.dependent_keys(None),
            vec![QueryKey::recent_posts()]
        );
    }

    #[test]
    fn auth_mutations_invalidate_nothing() {
        assert!(MutationKind::SignInAccount.dependent_keys(None).is_empty());
        assert!(MutationKind::SignOutAccount.dependent_keys(None).is_empty());
    }

    #[test]
    fn tracker_stays_pending_while_any_in_flight() {
        let tracker = MutationTracker::new();
        assert_eq!(tracker.status(MutationKind::SavePost), MutationStatus::Idle);

        tracker.begin(MutationKind::SavePost);
        tracker.begin(MutationKind::SavePost);
        tracker.finish(MutationKind::SavePost, true);
        assert!(tracker.status(MutationKind::SavePost).is_pending());

        tracker.finish(MutationKind::SavePost, false);
        assert!(tracker.status(MutationKind::SavePost).is_error());
    }
}
