//! Bearer-token authentication.
//!
//! Requests carry `Authorization: Bearer <token>`. The server keeps a set of
//! accepted tokens; anything else is rejected with 401.

use crate::error::{ServerError, ServerResult};
use std::collections::HashSet;

/// Validates `Authorization` header values.
#[derive(Debug, Clone, Default)]
pub struct BearerAuth {
    tokens: HashSet<String>,
}

impl BearerAuth {
    /// Creates a validator accepting `tokens`.
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Accepts an additional token.
    pub fn allow(&mut self, token: impl Into<String>) {
        self.tokens.insert(token.into());
    }

    /// Checks an `Authorization` header value.
    pub fn validate(&self, header: Option<&str>) -> ServerResult<()> {
        let header = header.ok_or_else(|| ServerError::Unauthorized("missing token".into()))?;
        let (scheme, token) = header
            .trim()
            .split_once(' ')
            .ok_or_else(|| ServerError::Unauthorized("malformed authorization header".into()))?;

        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(ServerError::Unauthorized("unsupported scheme".into()));
        }
        if self.tokens.contains(token.trim()) {
            Ok(())
        } else {
            Err(ServerError::Unauthorized("API token is invalid".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_token() {
        let auth = BearerAuth::new(["secret_abc"]);
        assert!(auth.validate(Some("Bearer secret_abc")).is_ok());
        assert!(auth.validate(Some("bearer secret_abc")).is_ok());
    }

    #[test]
    fn rejects_unknown_or_missing() {
        let auth = BearerAuth::new(["secret_abc"]);
        assert!(auth.validate(None).is_err());
        assert!(auth.validate(Some("Bearer secret_other")).is_err());
        assert!(auth.validate(Some("Basic secret_abc")).is_err());
        assert!(auth.validate(Some("secret_abc")).is_err());
    }

    #[test]
    fn allow_adds_token() {
        let mut auth = BearerAuth::default();
        assert!(auth.validate(Some("Bearer t")).is_err());
        auth.allow("t");
        assert!(auth.validate(Some("Bearer t")).is_ok());
    }

    #[test]
    fn rejections_are_401() {
        let err = BearerAuth::default().validate(None).unwrap_err();
        assert_eq!(err.status(), 401);
    }
}
