use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::domain::{VoteOutcome, VoteState};
use crate::error::ServiceResult;
use crate::middleware::UserId;

/// Confirmed vote state returned to the post-card control
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteResponse {
    pub post_id: Uuid,
    pub vote_count: i64,
    pub upvoted: bool,
}

impl From<VoteOutcome> for VoteResponse {
    fn from(outcome: VoteOutcome) -> Self {
        Self {
            post_id: outcome.post_id,
            vote_count: outcome.vote_count,
            upvoted: outcome.state.is_voted(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetVoteBody {
    pub upvoted: bool,
}

async fn toggle(
    state: &AppState,
    post_id: Uuid,
    user: Option<UserId>,
    intended: VoteState,
) -> ServiceResult<HttpResponse> {
    let outcome = state
        .coordinator
        .toggle(post_id, user.map(|u| u.0), intended)
        .await?;
    Ok(HttpResponse::Ok().json(VoteResponse::from(outcome)))
}

/// POST /api/v1/posts/{post_id}/vote
pub async fn upvote(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: Option<UserId>,
) -> ServiceResult<HttpResponse> {
    toggle(&state, path.into_inner(), user, VoteState::Voted).await
}

/// DELETE /api/v1/posts/{post_id}/vote
pub async fn unvote(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: Option<UserId>,
) -> ServiceResult<HttpResponse> {
    toggle(&state, path.into_inner(), user, VoteState::NotVoted).await
}

/// PUT /api/v1/posts/{post_id}/vote with `{"upvoted": bool}`
///
/// Carries the client's post-flip state; safe to resend after a timeout.
pub async fn set_vote(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: Option<UserId>,
    body: web::Json<SetVoteBody>,
) -> ServiceResult<HttpResponse> {
    let intended = VoteState::from_upvoted(body.upvoted);
    toggle(&state, path.into_inner(), user, intended).await
}
