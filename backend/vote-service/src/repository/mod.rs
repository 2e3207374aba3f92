pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::domain::{NewPost, Post, Profile};
use crate::error::LedgerResult;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Source of post records and author profiles.
///
/// Post creation lives outside the voting core; the ledger only needs to
/// resolve posts and the feed needs to list them with author names.
#[async_trait::async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a validated post with a zero vote count
    async fn create_post(&self, new_post: NewPost) -> LedgerResult<Post>;

    /// Fetch a single post
    async fn get_post(&self, post_id: Uuid) -> LedgerResult<Post>;

    /// All posts, in no particular order
    async fn list_posts(&self) -> LedgerResult<Vec<Post>>;

    /// All posts, possibly pre-sorted by the backing index.
    /// Callers still apply `rank_posts` to the result.
    async fn list_ranked(&self) -> LedgerResult<Vec<Post>> {
        self.list_posts().await
    }

    /// Create or replace the author's display profile
    async fn upsert_profile(&self, profile: Profile) -> LedgerResult<Profile>;

    /// Usernames for the given authors. Authors without a profile are
    /// absent from the map.
    async fn usernames(&self, user_ids: &[Uuid]) -> LedgerResult<HashMap<Uuid, String>>;
}

/// Durable record of (post, voter) pairs and the derived vote counts.
///
/// `add_vote` and `remove_vote` must be atomic per (post, voter) pair: the
/// presence check, the row mutation and the count update happen as one
/// step or not at all.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Record a vote. Returns the new vote count.
    ///
    /// Fails with `AlreadyVoted` if the pair exists, `NotFound` if the
    /// post does not.
    async fn add_vote(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<i64>;

    /// Remove a vote. Returns the new vote count, floored at zero.
    ///
    /// Fails with `NotVoted` if the pair does not exist.
    async fn remove_vote(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<i64>;

    async fn has_voted(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<bool>;

    /// Every post the voter currently has a vote on
    async fn votes_by_voter(&self, voter_id: Uuid) -> LedgerResult<HashSet<Uuid>>;

    /// Current derived count for a post
    async fn vote_count(&self, post_id: Uuid) -> LedgerResult<i64>;

    /// Recompute every derived count from the ledger rows.
    /// Returns how many posts had drifted.
    async fn reconcile_vote_counts(&self) -> LedgerResult<usize>;
}
