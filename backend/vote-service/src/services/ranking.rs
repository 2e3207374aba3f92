//! Feed ranking by vote count
//!
//! Order:
//! - `vote_count` descending
//! - `created_at` descending (newer first) among equal counts
//! - `id` ascending as the final tie-break
//!
//! The result is a total order, so equal states always render identically
//! and the top-3 badges never swap between requests.
//!
//! This is a pure function of its input. At larger scale the same order is
//! served by the `(vote_count DESC, created_at DESC)` index and this sort
//! becomes a near no-op over pre-sorted rows.

use crate::domain::Post;
use std::cmp::Ordering;
use tracing::debug;

/// Comparator defining feed order
pub fn ranking_order(a: &Post, b: &Post) -> Ordering {
    b.vote_count
        .cmp(&a.vote_count)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort posts into feed order
pub fn rank_posts(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(ranking_order);

    debug!("Ranked {} posts", posts.len());

    posts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    fn create_test_post(vote_count: i64, created_at: DateTime<Utc>) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content: "Test content".to_string(),
            created_at,
            vote_count,
        }
    }

    #[test]
    fn test_rank_posts_count_then_recency() {
        let t1 = Utc::now() - Duration::hours(2);
        let t2 = t1 + Duration::minutes(30);

        let a = create_test_post(5, t1);
        let b = create_test_post(5, t2);
        let c = create_test_post(7, t1 - Duration::days(1));

        let ranked = rank_posts(vec![a.clone(), b.clone(), c.clone()]);

        assert_eq!(ranked, vec![c, b, a]);
    }

    #[test]
    fn test_rank_posts_is_independent_of_input_order() {
        let now = Utc::now();
        let posts: Vec<Post> = (0..12)
            .map(|i| create_test_post(i % 3, now - Duration::minutes(i % 4)))
            .collect();

        let forward = rank_posts(posts.clone());
        let mut reversed_input = posts;
        reversed_input.reverse();
        let backward = rank_posts(reversed_input);

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_rank_posts_same_instant_falls_back_to_id() {
        let now = Utc::now();
        let mut a = create_test_post(3, now);
        let mut b = create_test_post(3, now);
        a.id = Uuid::from_u128(1);
        b.id = Uuid::from_u128(2);

        let ranked = rank_posts(vec![b.clone(), a.clone()]);

        assert_eq!(ranked[0].id, a.id);
        assert_eq!(ranked[1].id, b.id);
    }

    #[test]
    fn test_rank_posts_empty_list() {
        assert!(rank_posts(Vec::new()).is_empty());
    }

    #[test]
    fn test_ranking_order_votes_dominate_age() {
        let now = Utc::now();
        let old_popular = create_test_post(10, now - Duration::days(30));
        let fresh = create_test_post(9, now);

        assert_eq!(ranking_order(&old_popular, &fresh), Ordering::Less);
    }
}
