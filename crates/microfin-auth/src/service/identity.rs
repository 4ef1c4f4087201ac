//! Identity resolution
//!
//! Turns a bearer token into a `Subject`. The token only proves who the caller
//! is; account status and role are re-read from the store on every request.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use microfin_persistence::{AccountStatus, PersistenceService};

use crate::error::AuthError;
use crate::model::{Subject, TOKEN_PREFIX};
use crate::service::primary_role::PrimaryRoleResolver;

/// Claims the identity layer needs from a verified token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(alias = "userId")]
    pub sub: String,
    pub exp: i64,
}

/// Opaque token verification collaborator
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError>;
}

/// HS256 JWT verifier
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn from_base64_secret(secret: &str, leeway_seconds: u64) -> anyhow::Result<Self> {
        let decoding_key = DecodingKey::from_base64_secret(secret)?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_seconds;

        Ok(Self {
            decoding_key,
            validation,
        })
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Unauthenticated("Token expired".to_string()),
                _ => AuthError::Unauthenticated("Invalid token".to_string()),
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(AuthError::Unauthenticated(
                "Invalid token: missing user ID".to_string(),
            ));
        }

        Ok(claims)
    }
}

/// Extract the token from an `Authorization` header value.
///
/// Returns `None` for a missing header, another scheme, or an empty token.
pub fn extract_bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix(TOKEN_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub struct IdentityResolver {
    verifier: Arc<dyn TokenVerifier>,
    persistence: Arc<dyn PersistenceService>,
    primary_role: Arc<PrimaryRoleResolver>,
}

impl IdentityResolver {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        persistence: Arc<dyn PersistenceService>,
        primary_role: Arc<PrimaryRoleResolver>,
    ) -> Self {
        Self {
            verifier,
            persistence,
            primary_role,
        }
    }

    /// Resolve a subject from a token; an absent token is `Unauthenticated`.
    ///
    /// Denials are `AuthError`s inside the returned `anyhow::Error`; anything
    /// else is a store failure.
    pub async fn resolve(&self, token: Option<&str>) -> anyhow::Result<Subject> {
        let token = token.ok_or_else(|| AuthError::Unauthenticated("No token provided".to_string()))?;
        let claims = self.verifier.verify(token)?;

        self.load_subject(&claims.sub).await
    }

    /// Like `resolve`, but any failure means "no subject"
    pub async fn resolve_optional(&self, token: Option<&str>) -> Option<Subject> {
        token?;

        match self.resolve(token).await {
            Ok(subject) => Some(subject),
            Err(e) => {
                debug!("optional authentication ignored: {}", e);
                None
            }
        }
    }

    /// Build a subject from a fresh account lookup
    pub async fn load_subject(&self, user_id: &str) -> anyhow::Result<Subject> {
        let account = self
            .persistence
            .account_find_by_id(user_id)
            .await?
            .filter(|account| !account.deleted)
            .ok_or(AuthError::AccountInvalid)?;

        let status = account
            .status
            .parse::<AccountStatus>()
            .map_err(|_| AuthError::AccountInvalid)?;
        if status != AccountStatus::Active {
            return Err(AuthError::AccountInactive(status).into());
        }

        let role = account
            .role
            .filter(|role| !role.name.is_empty())
            .ok_or(AuthError::RoleMissing)?;

        let is_primary_role = self.primary_role.is_primary(&role.id).await?;

        Ok(Subject {
            id: account.id,
            role_id: role.id,
            role_name: role.name,
            status,
            is_primary_role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer_token(Some("Bearer ")), None);
        assert_eq!(extract_bearer_token(Some("Basic dXNlcg==")), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[test]
    fn test_claims_accept_user_id_alias() {
        let claims: TokenClaims =
            serde_json::from_str(r#"{"userId":"u-1","exp":4102444800}"#).unwrap();
        assert_eq!(claims.sub, "u-1");
    }
}
