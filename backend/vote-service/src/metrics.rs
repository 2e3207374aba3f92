//! Prometheus metrics for vote-service

use actix_web::HttpResponse;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static::lazy_static! {
    /// Vote toggles by operation (upvote/unvote) and outcome
    static ref VOTE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vote_operations_total",
        "Vote toggle operations by outcome",
        &["operation", "outcome"]
    ).expect("Prometheus metrics registration should succeed at startup");

    /// Ranked feed reads
    static ref FEED_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_requests_total",
        "Ranked feed requests",
        &["authenticated"]
    ).expect("Prometheus metrics registration should succeed at startup");
}

/// How a toggle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcomeLabel {
    /// Ledger mutated
    Applied,
    /// Desired state already held
    Absorbed,
    /// Refused (unauthenticated, unknown post)
    Rejected,
    /// Storage failure
    Failed,
}

impl VoteOutcomeLabel {
    fn as_str(self) -> &'static str {
        match self {
            VoteOutcomeLabel::Applied => "applied",
            VoteOutcomeLabel::Absorbed => "absorbed",
            VoteOutcomeLabel::Rejected => "rejected",
            VoteOutcomeLabel::Failed => "failed",
        }
    }
}

pub fn record_vote(operation: &str, outcome: VoteOutcomeLabel) {
    VOTE_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome.as_str()])
        .inc();
}

pub fn record_feed_request(authenticated: bool) {
    FEED_REQUESTS_TOTAL
        .with_label_values(&[if authenticated { "true" } else { "false" }])
        .inc();
}

/// Prometheus text exposition endpoint
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
