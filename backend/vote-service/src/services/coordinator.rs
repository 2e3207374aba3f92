use crate::domain::{FeedEntry, VoteOutcome, VoteState, ANONYMOUS_AUTHOR};
use crate::error::{LedgerError, ServiceError, ServiceResult};
use crate::metrics::{self, VoteOutcomeLabel};
use crate::repository::{LedgerStore, PostStore};
use crate::services::ranking::rank_posts;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Public vote surface
///
/// Reconciles a client's optimistic vote state with the ledger. Toggling is
/// idempotent in the intended end state: `AlreadyVoted` and `NotVoted` from
/// the ledger mean the state the caller asked for already holds, so they
/// are answered with the current count instead of an error. Every other
/// failure is surfaced and the client reverts to its last confirmed state.
///
/// Holds no locks and never retries.
#[derive(Clone)]
pub struct VoteCoordinator {
    posts: Arc<dyn PostStore>,
    ledger: Arc<dyn LedgerStore>,
}

impl VoteCoordinator {
    pub fn new(posts: Arc<dyn PostStore>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { posts, ledger }
    }

    /// Build a coordinator over a store that is both post store and ledger
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PostStore + LedgerStore + 'static,
    {
        Self {
            posts: store.clone(),
            ledger: store,
        }
    }

    /// Drive the (post, voter) pair to `intended` and report the confirmed
    /// count and state.
    pub async fn toggle(
        &self,
        post_id: Uuid,
        voter_id: Option<Uuid>,
        intended: VoteState,
    ) -> ServiceResult<VoteOutcome> {
        let operation = match intended {
            VoteState::Voted => "upvote",
            VoteState::NotVoted => "unvote",
        };

        let voter_id = match resolve_voter(voter_id) {
            Some(id) => id,
            None => {
                metrics::record_vote(operation, VoteOutcomeLabel::Rejected);
                return Err(ServiceError::Unauthenticated);
            }
        };

        let result = match intended {
            VoteState::Voted => self.ledger.add_vote(post_id, voter_id).await,
            VoteState::NotVoted => self.ledger.remove_vote(post_id, voter_id).await,
        };

        let vote_count = match result {
            Ok(count) => {
                metrics::record_vote(operation, VoteOutcomeLabel::Applied);
                count
            }
            Err(LedgerError::AlreadyVoted) | Err(LedgerError::NotVoted) => {
                warn!(
                    %post_id,
                    %voter_id,
                    operation,
                    "Vote already in requested state, answering with current count"
                );
                let count = self
                    .ledger
                    .vote_count(post_id)
                    .await
                    .map_err(|err| surface(operation, post_id, err))?;
                metrics::record_vote(operation, VoteOutcomeLabel::Absorbed);
                count
            }
            Err(err) => return Err(surface(operation, post_id, err)),
        };

        Ok(VoteOutcome {
            post_id,
            vote_count,
            state: intended,
        })
    }

    /// Upvote; no-op if already voted
    pub async fn upvote(&self, post_id: Uuid, voter_id: Option<Uuid>) -> ServiceResult<VoteOutcome> {
        self.toggle(post_id, voter_id, VoteState::Voted).await
    }

    /// Remove an upvote; no-op if not voted
    pub async fn unvote(&self, post_id: Uuid, voter_id: Option<Uuid>) -> ServiceResult<VoteOutcome> {
        self.toggle(post_id, voter_id, VoteState::NotVoted).await
    }

    /// Ranked feed, annotated with the voter's own votes and author names.
    ///
    /// The voter's votes and the author names are each loaded in one batch
    /// and joined in memory.
    pub async fn get_ranked(&self, voter_id: Option<Uuid>) -> ServiceResult<Vec<FeedEntry>> {
        let voter_id = resolve_voter(voter_id);
        metrics::record_feed_request(voter_id.is_some());

        let posts = self.posts.list_ranked().await.map_err(|err| {
            error!(error = %err, "Failed to load posts for feed");
            ServiceError::from(err)
        })?;
        let ranked = rank_posts(posts);

        let voted: HashSet<Uuid> = match voter_id {
            Some(voter_id) => self.ledger.votes_by_voter(voter_id).await.map_err(|err| {
                error!(error = %err, %voter_id, "Failed to load voter's votes for feed");
                ServiceError::from(err)
            })?,
            None => HashSet::new(),
        };

        let mut authors: Vec<Uuid> = ranked.iter().map(|post| post.author_id).collect();
        authors.sort_unstable();
        authors.dedup();
        let names = self.posts.usernames(&authors).await.map_err(|err| {
            error!(error = %err, "Failed to load author names for feed");
            ServiceError::from(err)
        })?;

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(index, post)| FeedEntry {
                rank: index + 1,
                author_name: names
                    .get(&post.author_id)
                    .cloned()
                    .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
                has_voted: voted.contains(&post.id),
                post,
            })
            .collect())
    }
}

/// An absent or nil user id is an unresolved identity
fn resolve_voter(voter_id: Option<Uuid>) -> Option<Uuid> {
    voter_id.filter(|id| !id.is_nil())
}

fn surface(operation: &str, post_id: Uuid, err: LedgerError) -> ServiceError {
    match &err {
        LedgerError::StorageUnavailable(reason) => {
            error!(%post_id, operation, reason = %reason, "Vote storage unavailable");
            metrics::record_vote(operation, VoteOutcomeLabel::Failed);
        }
        _ => {
            warn!(%post_id, operation, error = %err, "Vote rejected");
            metrics::record_vote(operation, VoteOutcomeLabel::Rejected);
        }
    }
    ServiceError::from(err)
}
