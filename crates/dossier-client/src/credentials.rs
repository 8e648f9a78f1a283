//! Where the bearer token comes from.
//!
//! Token issuance is someone else's job; the client only asks "is there one
//! right now?" before each call. A flush without a token is skipped.

use parking_lot::RwLock;

use crate::constants::ENV_TOKEN;

pub trait CredentialSource: Send + Sync {
    /// Current bearer token, if any.
    fn token(&self) -> Option<String>;
}

/// A replaceable token held in memory.
#[derive(Debug, Default)]
pub struct TokenCell {
    token: RwLock<Option<String>>,
}

impl TokenCell {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    /// Seed from `DOSSIER_TOKEN`.
    pub fn from_env() -> Self {
        Self::new(std::env::var(ENV_TOKEN).ok())
    }

    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        *self.token.write() = (!token.trim().is_empty()).then_some(token);
    }

    pub fn clear(&self) {
        *self.token.write() = None;
    }
}

impl CredentialSource for TokenCell {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}
