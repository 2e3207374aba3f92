pub mod identity;

pub use identity::{sign_token, Claims, IdentityMiddleware, UserId};
