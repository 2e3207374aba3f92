pub mod feed;
pub mod posts;
pub mod profile;
pub mod votes;

use crate::repository::{LedgerStore, PostStore};
use crate::services::{PostService, VoteCoordinator};
use actix_web::web;
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: VoteCoordinator,
    pub posts: PostService,
}

impl AppState {
    /// State over a store that backs both posts and the vote ledger
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PostStore + LedgerStore + 'static,
    {
        Self {
            posts: PostService::new(store.clone()),
            coordinator: VoteCoordinator::from_store(store),
        }
    }
}

/// Mount the `/api/v1` routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/feed", web::get().to(feed::get_feed))
            .route("/profile", web::put().to(profile::set_username))
            .service(web::resource("/posts").route(web::post().to(posts::create_post)))
            .service(web::resource("/posts/{post_id}").route(web::get().to(posts::get_post)))
            .service(
                web::resource("/posts/{post_id}/vote")
                    .route(web::post().to(votes::upvote))
                    .route(web::delete().to(votes::unvote))
                    .route(web::put().to(votes::set_vote)),
            ),
    );
}
