use actix_web::{web, HttpResponse};
use serde::Serialize;

use super::AppState;
use crate::domain::FeedEntry;
use crate::error::ServiceResult;
use crate::middleware::UserId;

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub posts: Vec<FeedEntry>,
}

/// GET /api/v1/feed
///
/// Anonymous callers get the same order with every `has_voted` false.
pub async fn get_feed(
    state: web::Data<AppState>,
    user: Option<UserId>,
) -> ServiceResult<HttpResponse> {
    let posts = state.coordinator.get_ranked(user.map(|u| u.0)).await?;
    Ok(HttpResponse::Ok().json(FeedResponse { posts }))
}
