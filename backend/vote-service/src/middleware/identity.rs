use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use uuid::Uuid;

use crate::error::ServiceError;

/// User ID resolved by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

/// JWT claims issued by the identity provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Resolves a bearer JWT into a `UserId` request extension.
///
/// Never rejects a request: a missing, malformed or expired token leaves the
/// request anonymous. Whether anonymous callers may proceed is decided by
/// the operation (the feed allows it, voting does not).
#[derive(Clone)]
pub struct IdentityMiddleware {
    decoding_key: DecodingKey,
}

impl IdentityMiddleware {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = IdentityMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            decoding_key: self.decoding_key.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    decoding_key: DecodingKey,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        if let Some(token) = bearer {
            match resolve_user(token, &self.decoding_key) {
                Ok(user_id) => {
                    req.extensions_mut().insert(UserId(user_id));
                }
                Err(reason) => {
                    tracing::warn!(path = %req.path(), "Ignoring bearer token: {}", reason);
                }
            }
        }

        Box::pin(async move { service.call(req).await })
    }
}

/// Validate the token and parse its subject
fn resolve_user(token: &str, key: &DecodingKey) -> Result<Uuid, String> {
    let token_data = decode::<Claims>(token, key, &Validation::new(Algorithm::HS256))
        .map_err(|e| format!("invalid token: {}", e))?;

    Uuid::parse_str(&token_data.claims.sub).map_err(|e| format!("malformed user_id: {}", e))
}

/// Sign an HS256 token for `user_id`. Used by local tooling and tests;
/// production tokens come from the identity provider.
pub fn sign_token(secret: &str, user_id: Uuid, ttl_seconds: i64) -> Result<String, String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now as usize,
        exp: (now + ttl_seconds).max(0) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

/// FromRequest implementation for UserId
///
/// Use `Option<UserId>` in handlers to accept anonymous callers.
impl actix_web::FromRequest for UserId {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<UserId>() {
            Some(user_id) => ready(Ok(*user_id)),
            None => ready(Err(ServiceError::Unauthenticated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_resolve_user_round_trip() {
        let user_id = Uuid::new_v4();
        let token = sign_token(SECRET, user_id, 3600).unwrap();
        let key = DecodingKey::from_secret(SECRET.as_bytes());

        assert_eq!(resolve_user(&token, &key), Ok(user_id));
    }

    #[test]
    fn test_resolve_user_rejects_wrong_secret() {
        let token = sign_token(SECRET, Uuid::new_v4(), 3600).unwrap();
        let key = DecodingKey::from_secret(b"another-secret");

        assert!(resolve_user(&token, &key).is_err());
    }

    #[test]
    fn test_resolve_user_rejects_expired_token() {
        // Past the default 60s leeway
        let token = sign_token(SECRET, Uuid::new_v4(), -3600).unwrap();
        let key = DecodingKey::from_secret(SECRET.as_bytes());

        assert!(resolve_user(&token, &key).is_err());
    }
}
