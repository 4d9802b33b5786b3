//! Identity collaborator.
//!
//! User accounts and session tokens are managed elsewhere. The server only
//! needs two things from that system: the bearer token presented with a
//! request ([`bearer_token`]) and the identity it stands for
//! ([`IdentityProvider::identify`]). [`StaticTokens`] covers deployments
//! that hand out a fixed set of API tokens.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
}

/// Why a request could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
}

/// Resolves bearer tokens to identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identify(&self, bearer_token: &str) -> Result<Identity, AuthError>;
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Accepts a fixed set of tokens, each mapped to a subject.
#[derive(Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, Identity>,
}

impl StaticTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        self.tokens.insert(
            token.into(),
            Identity {
                subject: subject.into(),
            },
        );
        self
    }

    /// Parse a comma-separated token list. Each token becomes its own
    /// subject (`token-1`, `token-2`, …).
    pub fn from_list(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .enumerate()
            .fold(Self::new(), |acc, (i, token)| {
                acc.with_token(token, format!("token-{}", i + 1))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Raw token values, for scrubbing outbound messages.
    pub fn secrets(&self) -> Vec<String> {
        self.tokens.keys().cloned().collect()
    }
}

impl fmt::Debug for StaticTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokens")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokens {
    async fn identify(&self, bearer_token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(bearer_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer   xyz ")), Some("xyz"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwdw==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn static_tokens_identify_known_tokens_only() {
        let tokens = StaticTokens::from_list(" alpha, ,beta ");
        assert_eq!(tokens.secrets().len(), 2);
        assert_eq!(
            tokens.identify("beta").await.unwrap(),
            Identity {
                subject: "token-2".into()
            }
        );
        assert_eq!(
            tokens.identify("gamma").await.unwrap_err(),
            AuthError::InvalidToken
        );
    }
}
