//! Bearer-token authentication
//!
//! Credential issuance lives outside this service; requests arrive with
//! an opaque API token and the extractor resolves it to a verified user
//! or rejects with 401. Tokens are stored as SHA-256 digests.

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use sha2::{Digest, Sha256};

use crate::db::{User, UserRepository};
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller, resolved from the Authorization header
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let user = UserRepository::new(state.db())
            .find_by_token_hash(&hash_token(token))
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

        Ok(CurrentUser(user))
    }
}

/// SHA-256 digest of an API token, hex-encoded
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let digest = hash_token("secret-token");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token("secret-token"));
        assert_ne!(digest, hash_token("other-token"));
    }
}
