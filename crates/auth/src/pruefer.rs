//! Token-Pruefung beim Verbindungsaufbau
//!
//! Der WebSocket-Endpunkt kennt nur den `TokenPruefer`. Die mitgelieferte
//! Implementierung ist der In-Memory `SessionStore`; andere Verfahren
//! (signierte Tokens, externe Dienste) implementieren denselben Trait.

use async_trait::async_trait;
use plauder_core::UserId;

use crate::error::{AuthError, AuthResult};
use crate::session::SessionStore;

/// Ordnet einem Zugangs-Token den Benutzer zu
#[async_trait]
pub trait TokenPruefer: Send + Sync {
    async fn pruefen(&self, token: &str) -> AuthResult<UserId>;
}

#[async_trait]
impl TokenPruefer for SessionStore {
    async fn pruefen(&self, token: &str) -> AuthResult<UserId> {
        let token = token_bereinigen(token).ok_or(AuthError::TokenFehlt)?;
        Ok(self.validieren(token).await?.user_id)
    }
}

/// Entfernt ein optionales `Bearer `-Praefix und Leerraum
pub fn token_bereinigen(roh: &str) -> Option<&str> {
    let roh = roh.trim();
    let token = roh
        .strip_prefix("Bearer ")
        .or_else(|| roh.strip_prefix("bearer "))
        .unwrap_or(roh)
        .trim();
    (!token.is_empty()).then_some(token)
}
