use super::{LedgerStore, PostStore};
use crate::domain::{NewPost, Post, Profile, Vote};
use crate::error::{LedgerError, LedgerResult};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// A post together with its slice of the vote ledger
#[derive(Debug)]
struct PostRecord {
    post: Post,
    voters: HashMap<Uuid, Vote>,
}

/// In-process post store and vote ledger
///
/// Each post's shard write guard is the single writer for every
/// (post, voter) pair on that post. Lock order is always `posts` then
/// `voter_index`; nothing takes them the other way round. No guard is held
/// across an `.await`, so a dropped future can never observe a half-applied
/// vote.
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: DashMap<Uuid, PostRecord>,
    voter_index: DashMap<Uuid, HashSet<Uuid>>,
    profiles: DashMap<Uuid, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed post, e.g. when seeding from a fixture.
    /// Any existing votes on a post with the same id are discarded, along
    /// with their voter index entries.
    pub fn insert_post(&self, mut post: Post) {
        post.vote_count = 0;
        let post_id = post.id;
        let record = PostRecord {
            post,
            voters: HashMap::new(),
        };

        match self.posts.entry(post_id) {
            Entry::Occupied(mut occupied) => {
                let replaced = occupied.insert(record);
                for voter_id in replaced.voters.keys() {
                    if let Some(mut voted) = self.voter_index.get_mut(voter_id) {
                        voted.remove(&post_id);
                    }
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(record);
            }
        }
    }

    /// Number of ledger rows for a post
    pub fn vote_rows(&self, post_id: Uuid) -> usize {
        self.posts
            .get(&post_id)
            .map(|record| record.voters.len())
            .unwrap_or(0)
    }

    fn apply_add(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<i64> {
        let mut record = self.posts.get_mut(&post_id).ok_or(LedgerError::NotFound)?;

        if record.voters.contains_key(&voter_id) {
            return Err(LedgerError::AlreadyVoted);
        }

        record.voters.insert(
            voter_id,
            Vote {
                post_id,
                voter_id,
                created_at: Utc::now(),
            },
        );
        record.post.vote_count += 1;
        let count = record.post.vote_count;

        self.voter_index.entry(voter_id).or_default().insert(post_id);

        Ok(count)
    }

    fn apply_remove(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<i64> {
        let mut record = self.posts.get_mut(&post_id).ok_or(LedgerError::NotVoted)?;

        if record.voters.remove(&voter_id).is_none() {
            return Err(LedgerError::NotVoted);
        }

        record.post.vote_count = (record.post.vote_count - 1).max(0);
        let count = record.post.vote_count;

        if let Some(mut voted) = self.voter_index.get_mut(&voter_id) {
            voted.remove(&post_id);
        }

        Ok(count)
    }
}

#[async_trait::async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, new_post: NewPost) -> LedgerResult<Post> {
        let post = Post {
            id: Uuid::new_v4(),
            author_id: new_post.author_id,
            content: new_post.content,
            created_at: Utc::now(),
            vote_count: 0,
        };
        self.insert_post(post.clone());
        Ok(post)
    }

    async fn get_post(&self, post_id: Uuid) -> LedgerResult<Post> {
        self.posts
            .get(&post_id)
            .map(|record| record.post.clone())
            .ok_or(LedgerError::NotFound)
    }

    async fn list_posts(&self) -> LedgerResult<Vec<Post>> {
        Ok(self
            .posts
            .iter()
            .map(|record| record.post.clone())
            .collect())
    }

    async fn upsert_profile(&self, profile: Profile) -> LedgerResult<Profile> {
        self.profiles.insert(profile.user_id, profile.username.clone());
        Ok(profile)
    }

    async fn usernames(&self, user_ids: &[Uuid]) -> LedgerResult<HashMap<Uuid, String>> {
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                self.profiles
                    .get(id)
                    .map(|username| (*id, username.value().clone()))
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryStore {
    async fn add_vote(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<i64> {
        let count = self.apply_add(post_id, voter_id)?;
        debug!(%post_id, %voter_id, vote_count = count, "vote added");
        Ok(count)
    }

    async fn remove_vote(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<i64> {
        let count = self.apply_remove(post_id, voter_id)?;
        debug!(%post_id, %voter_id, vote_count = count, "vote removed");
        Ok(count)
    }

    async fn has_voted(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<bool> {
        Ok(self
            .posts
            .get(&post_id)
            .map(|record| record.voters.contains_key(&voter_id))
            .unwrap_or(false))
    }

    async fn votes_by_voter(&self, voter_id: Uuid) -> LedgerResult<HashSet<Uuid>> {
        Ok(self
            .voter_index
            .get(&voter_id)
            .map(|voted| voted.value().clone())
            .unwrap_or_default())
    }

    async fn vote_count(&self, post_id: Uuid) -> LedgerResult<i64> {
        self.posts
            .get(&post_id)
            .map(|record| record.post.vote_count)
            .ok_or(LedgerError::NotFound)
    }

    async fn reconcile_vote_counts(&self) -> LedgerResult<usize> {
        let mut repaired = 0;
        for mut record in self.posts.iter_mut() {
            let actual = record.voters.len() as i64;
            if record.post.vote_count != actual {
                record.post.vote_count = actual;
                repaired += 1;
            }
        }
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn store_with_post() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let post = store
            .create_post(NewPost::parse(Uuid::new_v4(), "first take").unwrap())
            .await
            .unwrap();
        (store, post.id)
    }

    #[tokio::test]
    async fn test_add_then_remove_vote() {
        let (store, post_id) = store_with_post().await;
        let voter = Uuid::new_v4();

        assert_eq!(store.add_vote(post_id, voter).await, Ok(1));
        assert_eq!(store.remove_vote(post_id, voter).await, Ok(0));
        assert_eq!(
            store.remove_vote(post_id, voter).await,
            Err(LedgerError::NotVoted)
        );
    }

    #[tokio::test]
    async fn test_add_vote_twice_is_already_voted() {
        let (store, post_id) = store_with_post().await;
        let voter = Uuid::new_v4();

        store.add_vote(post_id, voter).await.unwrap();
        assert_eq!(
            store.add_vote(post_id, voter).await,
            Err(LedgerError::AlreadyVoted)
        );
        assert_eq!(store.vote_count(post_id).await, Ok(1));
        assert_eq!(store.vote_rows(post_id), 1);
    }

    #[tokio::test]
    async fn test_add_vote_unknown_post() {
        let store = MemoryStore::new();
        assert_eq!(
            store.add_vote(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(LedgerError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_votes_by_voter_tracks_membership() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let a = store
            .create_post(NewPost::parse(author, "a").unwrap())
            .await
            .unwrap();
        let b = store
            .create_post(NewPost::parse(author, "b").unwrap())
            .await
            .unwrap();
        let voter = Uuid::new_v4();

        store.add_vote(a.id, voter).await.unwrap();
        store.add_vote(b.id, voter).await.unwrap();
        store.remove_vote(a.id, voter).await.unwrap();

        let voted = store.votes_by_voter(voter).await.unwrap();
        assert_eq!(voted, HashSet::from([b.id]));
        assert!(store.has_voted(b.id, voter).await.unwrap());
        assert!(!store.has_voted(a.id, voter).await.unwrap());
        assert!(store.votes_by_voter(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_usernames_skips_authors_without_profile() {
        let store = MemoryStore::new();
        let named = Uuid::new_v4();
        let unnamed = Uuid::new_v4();

        store
            .upsert_profile(Profile::parse(named, "first").unwrap())
            .await
            .unwrap();
        store
            .upsert_profile(Profile::parse(named, "renamed").unwrap())
            .await
            .unwrap();

        let names = store.usernames(&[named, unnamed]).await.unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[&named], "renamed");
    }

    #[tokio::test]
    async fn test_insert_post_resets_derived_count() {
        let store = MemoryStore::new();
        let post = Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content: "seeded".to_string(),
            created_at: Utc::now(),
            vote_count: 42,
        };
        store.insert_post(post.clone());
        assert_eq!(store.vote_count(post.id).await, Ok(0));
        assert_eq!(store.reconcile_vote_counts().await, Ok(0));
    }

    #[tokio::test]
    async fn test_reinsert_post_clears_voter_index() {
        let (store, post_id) = store_with_post().await;
        let voter = Uuid::new_v4();
        store.add_vote(post_id, voter).await.unwrap();

        let post = store.get_post(post_id).await.unwrap();
        store.insert_post(post);

        assert!(!store.has_voted(post_id, voter).await.unwrap());
        assert!(store.votes_by_voter(voter).await.unwrap().is_empty());
        assert_eq!(store.vote_count(post_id).await, Ok(0));
        assert_eq!(store.vote_rows(post_id), 0);

        // The pair can be voted again from a clean slate
        assert_eq!(store.add_vote(post_id, voter).await, Ok(1));
        assert_eq!(store.votes_by_voter(voter).await.unwrap(), HashSet::from([post_id]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_same_pair_apply_once() {
        let (store, post_id) = store_with_post().await;
        let store = Arc::new(store);
        let voter = Uuid::new_v4();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.add_vote(post_id, voter).await })
            })
            .collect();

        let mut applied = 0;
        let mut already = 0;
        for result in futures::future::join_all(handles).await {
            match result.unwrap() {
                Ok(_) => applied += 1,
                Err(LedgerError::AlreadyVoted) => already += 1,
                Err(other) => panic!("unexpected ledger error: {other}"),
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(already, 15);
        assert_eq!(store.vote_count(post_id).await, Ok(1));
        assert_eq!(store.vote_rows(post_id), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_voters_all_counted() {
        let (store, post_id) = store_with_post().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.add_vote(post_id, Uuid::new_v4()).await })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.vote_count(post_id).await, Ok(50));
        assert_eq!(store.vote_rows(post_id), 50);
    }
}
