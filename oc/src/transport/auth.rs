//! Bearer credential to owner mapping
//!
//! Issuing credentials happens elsewhere; this only resolves them.

use std::collections::HashMap;

use tracing::debug;

/// Resolve a bearer credential to an owner id
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, bearer: &str) -> Option<String>;
}

/// Static token table
///
/// With no tokens configured it runs in open mode: any non-empty bearer
/// value is accepted and used as the owner id.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl TokenAuthenticator {
    /// Create from a token → owner table
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// Accept any bearer value as its own owner id
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, bearer: &str) -> Option<String> {
        let bearer = bearer.trim();
        if bearer.is_empty() {
            return None;
        }
        if self.is_open() {
            return Some(bearer.to_string());
        }
        let owner = self.tokens.get(bearer).cloned();
        if owner.is_none() {
            debug!("TokenAuthenticator::authenticate: unknown token");
        }
        owner
    }
}

/// Extract the credential from an `Authorization: Bearer <token>` value
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_mode_uses_bearer_as_owner() {
        let auth = TokenAuthenticator::open();
        assert_eq!(auth.authenticate("u1"), Some("u1".to_string()));
        assert_eq!(auth.authenticate("  "), None);
    }

    #[test]
    fn test_token_table() {
        let auth = TokenAuthenticator::new(HashMap::from([("secret".to_string(), "alice".to_string())]));
        assert_eq!(auth.authenticate("secret"), Some("alice".to_string()));
        assert_eq!(auth.authenticate("alice"), None);
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("bearer  abc "), Some("abc"));
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("abc"), None);
    }
}
