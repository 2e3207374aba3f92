use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::error::ServiceResult;
use crate::middleware::UserId;

#[derive(Debug, Deserialize)]
pub struct CreatePostBody {
    pub content: String,
}

/// POST /api/v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    user: Option<UserId>,
    body: web::Json<CreatePostBody>,
) -> ServiceResult<HttpResponse> {
    let post = state
        .posts
        .create_post(user.map(|u| u.0), &body.content)
        .await?;
    Ok(HttpResponse::Created().json(post))
}

/// GET /api/v1/posts/{post_id}
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let post = state.posts.get_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}
