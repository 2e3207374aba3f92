pub mod coordinator;
pub mod posts;
pub mod ranking;

pub use coordinator::VoteCoordinator;
pub use posts::PostService;
pub use ranking::{rank_posts, ranking_order};
