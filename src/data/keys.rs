//! Query key definitions.
//!
//! Every cached read is addressed by an operation tag plus ordered
//! parameter values. Invalidation matches keys by prefix.

use std::fmt;

/// Operation tag of a cached read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryTag {
    GetCurrentUser,
    GetRecentPosts,
    GetPosts,
    GetInfinitePosts,
    GetPostById,
    SearchPosts,
    GetSavedPosts,
    GetUsers,
    GetUserById,
}

impl QueryTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetCurrentUser => "getCurrentUser",
            Self::GetRecentPosts => "getRecentPosts",
            Self::GetPosts => "getPosts",
            Self::GetInfinitePosts => "getInfinitePosts",
            Self::GetPostById => "getPostById",
            Self::SearchPosts => "searchPosts",
            Self::GetSavedPosts => "getSavedPosts",
            Self::GetUsers => "getUsers",
            Self::GetUserById => "getUserById",
        }
    }
}

/// Structured cache key: `[tag, params...]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub tag: QueryTag,
    pub params: Vec<String>,
}

impl QueryKey {
    /// Key with no parameters; as an invalidation target it matches every
    /// key carrying `tag`.
    pub fn tag(tag: QueryTag) -> Self {
        Self {
            tag,
            params: Vec::new(),
        }
    }

    pub fn with_param(tag: QueryTag, param: impl Into<String>) -> Self {
        Self {
            tag,
            params: vec![param.into()],
        }
    }

    pub fn current_user() -> Self {
        Self::tag(QueryTag::GetCurrentUser)
    }

    pub fn recent_posts() -> Self {
        Self::tag(QueryTag::GetRecentPosts)
    }

    pub fn infinite_posts() -> Self {
        Self::tag(QueryTag::GetInfinitePosts)
    }

    pub fn post_by_id(post_id: &str) -> Self {
        Self::with_param(QueryTag::GetPostById, post_id)
    }

    pub fn search_posts(term: &str) -> Self {
        Self::with_param(QueryTag::SearchPosts, term)
    }

    pub fn saved_posts(user_id: &str) -> Self {
        Self::with_param(QueryTag::GetSavedPosts, user_id)
    }

    pub fn users() -> Self {
        Self::tag(QueryTag::GetUsers)
    }

    pub fn user_by_id(user_id: &str) -> Self {
        Self::with_param(QueryTag::GetUserById, user_id)
    }

    /// Whether `self` is matched by the invalidation target `prefix`
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.tag == prefix.tag
            && prefix.params.len() <= self.params.len()
            && self.params.iter().zip(&prefix.params).all(|(a, b)| a == b)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.tag.as_str())?;
        for param in &self.params {
            write!(f, ", {}", param)?;
        }
        write!(f, "]")
    }
}
