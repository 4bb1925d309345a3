//! Session-Token-Verwaltung fuer Plauder
//!
//! Implementiert kurzlebige Zugangs-Tokens fuer eingeloggte Benutzer.
//! Tokens werden im Speicher gehalten (in-memory HashMap mit TTL).
//! Ein Hintergrund-Task bereinigt abgelaufene Tokens automatisch.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use plauder_core::UserId;
use rand::RngCore;
use tokio::{sync::RwLock, task::JoinHandle};

use crate::error::{AuthError, AuthResult};

/// Standard-Token-Lebensdauer: 24 Stunden
const SESSION_TTL_SEKUNDEN: i64 = 24 * 60 * 60;

/// Ein ausgegebenes Zugangs-Token
#[derive(Debug, Clone)]
pub struct Session {
    /// Der Token-String (URL-sicheres Base64)
    pub token: String,
    /// Benutzer dem dieses Token gehoert
    pub user_id: UserId,
    pub erstellt_am: DateTime<Utc>,
    pub laeuft_ab_am: DateTime<Utc>,
}

impl Session {
    /// Gibt `true` zurueck wenn das Token noch gueltig ist
    pub fn ist_gueltig(&self) -> bool {
        Utc::now() < self.laeuft_ab_am
    }
}

/// In-Memory Token-Store mit TTL-Unterstuetzung
#[derive(Debug)]
pub struct SessionStore {
    /// token -> Session
    sessions: RwLock<HashMap<String, Session>>,
    ttl: chrono::Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::seconds(SESSION_TTL_SEKUNDEN),
        }
    }
}

impl SessionStore {
    /// Erstellt einen neuen leeren Store mit Standard-TTL
    pub fn neu() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Erstellt einen neuen leeren Store mit eigener TTL
    pub fn mit_ttl(ttl: Duration) -> Arc<Self> {
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(SESSION_TTL_SEKUNDEN));
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        })
    }

    /// Startet den periodischen Cleanup-Task
    pub fn cleanup_starten(self: &Arc<Self>, intervall: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(intervall).await;
                let entfernt = store.cleanup_abgelaufene().await;
                if entfernt > 0 {
                    tracing::debug!(anzahl = entfernt, "Abgelaufene Tokens bereinigt");
                }
            }
        })
    }

    /// Erstellt ein neues Token fuer den angegebenen Benutzer
    pub async fn erstellen(&self, user_id: UserId) -> AuthResult<Session> {
        let token = token_generieren();
        let jetzt = Utc::now();
        let session = Session {
            token: token.clone(),
            user_id,
            erstellt_am: jetzt,
            laeuft_ab_am: jetzt + self.ttl,
        };

        self.sessions.write().await.insert(token, session.clone());
        tracing::debug!(user_id = %user_id, "Neues Token erstellt");
        Ok(session)
    }

    /// Validiert ein Token und gibt die Session zurueck
    ///
    /// Gibt `AuthError::SessionUngueltig` zurueck wenn das Token nicht gefunden wurde.
    /// Gibt `AuthError::SessionAbgelaufen` zurueck wenn das Token abgelaufen ist.
    pub async fn validieren(&self, token: &str) -> AuthResult<Session> {
        let sessions = self.sessions.read().await;
        match sessions.get(token) {
            None => Err(AuthError::SessionUngueltig),
            Some(session) if !session.ist_gueltig() => Err(AuthError::SessionAbgelaufen),
            Some(session) => Ok(session.clone()),
        }
    }

    /// Invalidiert (loescht) ein Token
    pub async fn invalidieren(&self, token: &str) {
        self.sessions.write().await.remove(token);
        tracing::debug!("Token invalidiert");
    }

    /// Invalidiert alle Tokens eines Benutzers
    pub async fn alle_invalidieren(&self, user_id: UserId) -> usize {
        let mut sessions = self.sessions.write().await;
        let vorher = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        let entfernt = vorher - sessions.len();
        if entfernt > 0 {
            tracing::debug!(user_id = %user_id, anzahl = entfernt, "Alle Tokens des Benutzers invalidiert");
        }
        entfernt
    }

    /// Bereinigt abgelaufene Tokens und gibt die Anzahl der entfernten zurueck
    pub async fn cleanup_abgelaufene(&self) -> usize {
        let jetzt = Utc::now();
        let mut sessions = self.sessions.write().await;
        let vorher = sessions.len();
        sessions.retain(|_, s| s.laeuft_ab_am > jetzt);
        vorher - sessions.len()
    }

    /// Gibt die Anzahl der nicht abgelaufenen Tokens zurueck
    pub async fn anzahl_aktive(&self) -> usize {
        let jetzt = Utc::now();
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| s.laeuft_ab_am > jetzt).count()
    }
}

/// Generiert ein kryptografisch sicheres Token (URL-sicheres Base64)
fn token_generieren() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}
