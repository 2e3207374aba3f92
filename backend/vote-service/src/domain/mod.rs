pub mod models;

pub use models::{
    FeedEntry, NewPost, Post, Profile, Vote, VoteOutcome, VoteState, ANONYMOUS_AUTHOR,
    MAX_CONTENT_CHARS, MAX_USERNAME_CHARS,
};
