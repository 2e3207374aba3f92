use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::AppState;
use crate::error::ServiceResult;
use crate::middleware::UserId;

#[derive(Debug, Deserialize)]
pub struct SetUsernameBody {
    pub username: String,
}

/// PUT /api/v1/profile
pub async fn set_username(
    state: web::Data<AppState>,
    user: Option<UserId>,
    body: web::Json<SetUsernameBody>,
) -> ServiceResult<HttpResponse> {
    let profile = state
        .posts
        .set_username(user.map(|u| u.0), &body.username)
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}
