//! Principal resolution for incoming connections.
//!
//! Tokens are hashed once at construction; lookups compare SHA-256
//! digests in constant time so neither token length nor prefix
//! matches leak through timing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use adj_domain::config::AuthConfig;
use adj_domain::error::{Error, Result};

pub struct IdentityResolver {
    /// `(principal id, sha256 of token)`.
    principals: Vec<(String, Vec<u8>)>,
    dev_mode: bool,
}

impl IdentityResolver {
    /// Build from the `[auth]` config section plus the token env var.
    ///
    /// With no principals and no env token the resolver runs in dev
    /// mode: every connection resolves to the `anonymous` principal.
    pub fn from_config(auth: &AuthConfig) -> Self {
        let mut principals: Vec<(String, Vec<u8>)> = auth
            .principals
            .iter()
            .filter(|p| !p.token.is_empty())
            .map(|p| (p.id.clone(), Sha256::digest(p.token.as_bytes()).to_vec()))
            .collect();

        if let Ok(token) = std::env::var(&auth.token_env) {
            if !token.is_empty() {
                principals.push((
                    "owner".to_owned(),
                    Sha256::digest(token.as_bytes()).to_vec(),
                ));
                tracing::info!(source = %auth.token_env, "owner token auth enabled");
            }
        }

        let dev_mode = principals.is_empty();
        if dev_mode {
            tracing::warn!(
                "auth DISABLED — no principals configured and {} unset; \
                 connections resolve to \"anonymous\"",
                auth.token_env
            );
        }

        Self {
            principals,
            dev_mode,
        }
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Resolve a presented token to a principal.
    ///
    /// Fails with [`Error::Unauthorized`] before any session is
    /// created; the connection must be rejected without entering the
    /// dispatch loop.
    pub fn resolve(&self, token: Option<&str>) -> Result<String> {
        if self.dev_mode {
            return Ok("anonymous".to_owned());
        }

        let provided = token.ok_or_else(|| Error::Unauthorized("missing token".into()))?;
        let digest = Sha256::digest(provided.as_bytes());

        for (id, expected) in &self.principals {
            if bool::from(expected.as_slice().ct_eq(digest.as_slice())) {
                return Ok(id.clone());
            }
        }
        Err(Error::Unauthorized("invalid token".into()))
    }
}

#[cfg(test)]
mod tests {
    use adj_domain::config::Principal;

    use super::*;

    fn auth(principals: Vec<Principal>) -> AuthConfig {
        AuthConfig {
            principals,
            // Point at a var that is never set so tests don't depend
            // on the environment.
            token_env: "ADJUTANT_TEST_TOKEN_UNSET".into(),
        }
    }

    #[test]
    fn resolves_configured_principal() {
        let resolver = IdentityResolver::from_config(&auth(vec![
            Principal {
                id: "alice".into(),
                token: "alpha-token-0123456789".into(),
            },
            Principal {
                id: "bob".into(),
                token: "bravo-token-0123456789".into(),
            },
        ]));

        assert!(!resolver.is_dev_mode());
        assert_eq!(
            resolver.resolve(Some("bravo-token-0123456789")).unwrap(),
            "bob"
        );
    }

    #[test]
    fn rejects_wrong_or_missing_token() {
        let resolver = IdentityResolver::from_config(&auth(vec![Principal {
            id: "alice".into(),
            token: "alpha-token-0123456789".into(),
        }]));

        assert!(matches!(
            resolver.resolve(Some("nope")),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            resolver.resolve(None),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn dev_mode_resolves_anonymous() {
        let resolver = IdentityResolver::from_config(&auth(vec![]));
        assert!(resolver.is_dev_mode());
        assert_eq!(resolver.resolve(None).unwrap(), "anonymous");
        assert_eq!(resolver.resolve(Some("anything")).unwrap(), "anonymous");
    }

    #[test]
    fn empty_configured_token_is_ignored() {
        let resolver = IdentityResolver::from_config(&auth(vec![Principal {
            id: "alice".into(),
            token: String::new(),
        }]));
        assert!(resolver.is_dev_mode());
    }
}
