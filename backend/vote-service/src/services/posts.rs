use crate::domain::{NewPost, Post, Profile};
use crate::error::{ServiceError, ServiceResult};
use crate::repository::PostStore;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Posting flow: validates and stores new posts and author profiles
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    pub async fn create_post(&self, author_id: Option<Uuid>, content: &str) -> ServiceResult<Post> {
        let author_id = author_id
            .filter(|id| !id.is_nil())
            .ok_or(ServiceError::Unauthenticated)?;

        let new_post = NewPost::parse(author_id, content).map_err(ServiceError::InvalidInput)?;

        let post = self.store.create_post(new_post).await.map_err(|err| {
            error!(error = %err, %author_id, "Failed to create post");
            ServiceError::from(err)
        })?;

        info!(post_id = %post.id, %author_id, "Post created");
        Ok(post)
    }

    pub async fn get_post(&self, post_id: Uuid) -> ServiceResult<Post> {
        self.store.get_post(post_id).await.map_err(ServiceError::from)
    }

    /// Set the caller's display name shown on their feed entries
    pub async fn set_username(&self, user_id: Option<Uuid>, username: &str) -> ServiceResult<Profile> {
        let user_id = user_id
            .filter(|id| !id.is_nil())
            .ok_or(ServiceError::Unauthenticated)?;

        let profile = Profile::parse(user_id, username).map_err(ServiceError::InvalidInput)?;

        let profile = self.store.upsert_profile(profile).await.map_err(|err| {
            error!(error = %err, %user_id, "Failed to update profile");
            ServiceError::from(err)
        })?;

        info!(%user_id, username = %profile.username, "Profile updated");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;

    #[tokio::test]
    async fn test_create_post_requires_author() {
        let service = PostService::new(Arc::new(MemoryStore::new()));
        assert_eq!(
            service.create_post(None, "take").await,
            Err(ServiceError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_create_post_validates_content() {
        let service = PostService::new(Arc::new(MemoryStore::new()));
        let result = service.create_post(Some(Uuid::new_v4()), "   ").await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_post_starts_at_zero_votes() {
        let service = PostService::new(Arc::new(MemoryStore::new()));
        let author = Uuid::new_v4();

        let post = service.create_post(Some(author), "  AI will write the tests  ").await.unwrap();

        assert_eq!(post.author_id, author);
        assert_eq!(post.content, "AI will write the tests");
        assert_eq!(post.vote_count, 0);
        assert_eq!(service.get_post(post.id).await, Ok(post));
    }

    #[tokio::test]
    async fn test_set_username() {
        let service = PostService::new(Arc::new(MemoryStore::new()));
        let user = Uuid::new_v4();

        assert_eq!(
            service.set_username(None, "name").await,
            Err(ServiceError::Unauthenticated)
        );
        assert!(matches!(
            service.set_username(Some(user), "  ").await,
            Err(ServiceError::InvalidInput(_))
        ));

        let profile = service.set_username(Some(user), " hottakes ").await.unwrap();
        assert_eq!(profile, Profile { user_id: user, username: "hottakes".into() });
    }
}
