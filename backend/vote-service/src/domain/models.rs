use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum post length, counted in Unicode code points
pub const MAX_CONTENT_CHARS: usize = 280;

/// Maximum display name length, counted in Unicode code points
pub const MAX_USERNAME_CHARS: usize = 32;

/// Display name for authors without a profile
pub const ANONYMOUS_AUTHOR: &str = "ANON";

/// Post entity - a short take that voters can upvote
///
/// `vote_count` is a derived projection of the `votes` ledger and is only
/// ever written by a `LedgerStore` add/remove path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub vote_count: i64,
}

/// Vote entity - one row per (post, voter) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub post_id: Uuid,
    pub voter_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: Uuid,
    pub content: String,
}

impl NewPost {
    /// Trim and validate post content.
    ///
    /// Returns a human readable reason on rejection.
    pub fn parse(author_id: Uuid, content: &str) -> Result<Self, String> {
        let content = content.trim();
        if content.is_empty() {
            return Err("content must not be empty".to_string());
        }

        let chars = content.chars().count();
        if chars > MAX_CONTENT_CHARS {
            return Err(format!(
                "content is {} characters, limit is {}",
                chars, MAX_CONTENT_CHARS
            ));
        }

        Ok(Self {
            author_id,
            content: content.to_string(),
        })
    }
}

/// Author display profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub username: String,
}

impl Profile {
    /// Trim and validate a display name
    pub fn parse(user_id: Uuid, username: &str) -> Result<Self, String> {
        let username = username.trim();
        if username.is_empty() {
            return Err("username must not be empty".to_string());
        }

        let chars = username.chars().count();
        if chars > MAX_USERNAME_CHARS {
            return Err(format!(
                "username is {} characters, limit is {}",
                chars, MAX_USERNAME_CHARS
            ));
        }

        Ok(Self {
            user_id,
            username: username.to_string(),
        })
    }
}

/// Per (post, voter) vote state. There is no downvote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteState {
    NotVoted,
    Voted,
}

impl VoteState {
    pub fn from_upvoted(upvoted: bool) -> Self {
        if upvoted {
            VoteState::Voted
        } else {
            VoteState::NotVoted
        }
    }

    pub fn is_voted(self) -> bool {
        matches!(self, VoteState::Voted)
    }
}

/// Confirmed server-side result of a toggle
///
/// Clients that flipped their local state optimistically reconcile against
/// this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub post_id: Uuid,
    pub vote_count: i64,
    pub state: VoteState,
}

/// One entry of the ranked feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    /// 1-based position in the ranked feed
    pub rank: usize,
    pub post: Post,
    /// Author's username, or `ANONYMOUS_AUTHOR` when they have no profile
    pub author_name: String,
    pub has_voted: bool,
}
