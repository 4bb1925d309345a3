//! Verwaltungs-Schreibpfad fuer SQLite
//!
//! Benutzer, Kontakte, Gruppen und Nachrichtenzustand werden von der
//! umgebenden Anwendung gepflegt. Der Echtzeit-Kern liest nur. Diese
//! Methoden sind der Schreibpfad dafuer (Verwaltung, Seeding, Tests).

use chrono::Utc;
use plauder_core::{Freigabe, GroupId, MessageId, UserId};

use crate::error::DbError;
use crate::models::{BenutzerRecord, NeuerBenutzer, NeuesMitglied};
use crate::repository::DbResult;
use crate::sqlite::pool::{zeit_formatieren, zeit_parsen, SqliteDb};

impl SqliteDb {
    /// Legt einen neuen Benutzer an (Status `offline`)
    pub async fn benutzer_anlegen(&self, daten: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord> {
        let jetzt_str = zeit_formatieren(Utc::now());

        let id = sqlx::query(
            "INSERT INTO users (username, full_name, avatar, status, created_at)
             VALUES (?, ?, ?, 'offline', ?)",
        )
        .bind(daten.username)
        .bind(daten.full_name)
        .bind(daten.avatar)
        .bind(&jetzt_str)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE") || msg.contains("unique") {
                DbError::Eindeutigkeit(format!("Benutzername '{}' bereits vergeben", daten.username))
            } else {
                DbError::Sqlx(e)
            }
        })?
        .last_insert_rowid();

        Ok(BenutzerRecord {
            id: UserId(id),
            username: daten.username.to_string(),
            full_name: daten.full_name.map(Into::into),
            avatar: daten.avatar.map(Into::into),
            status: plauder_core::BenutzerStatus::Offline,
            created_at: zeit_parsen(jetzt_str)?,
        })
    }

    /// Setzt die gerichtete Beziehung `user -> friend` (legt sie bei Bedarf an)
    pub async fn beziehung_setzen(
        &self,
        user: UserId,
        friend: UserId,
        freigabe: Freigabe,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO user_relations (user_id, friend_id, approval_status, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id, friend_id) DO UPDATE SET approval_status = excluded.approval_status",
        )
        .bind(user.inner())
        .bind(friend.inner())
        .bind(freigabe.als_str())
        .bind(zeit_formatieren(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Bestaetigte Kontaktbeziehung in beide Richtungen
    pub async fn befreunden(&self, a: UserId, b: UserId) -> DbResult<()> {
        self.beziehung_setzen(a, b, Freigabe::Approved).await?;
        self.beziehung_setzen(b, a, Freigabe::Approved).await
    }

    /// `von` blockiert `ziel` (auf der Zeile `von -> ziel`)
    pub async fn blockieren(&self, von: UserId, ziel: UserId) -> DbResult<()> {
        self.zeile_markieren(
            "UPDATE user_relations SET is_blocked = 1, blocked_by_user_id = ?
             WHERE user_id = ? AND friend_id = ?",
            von,
            ziel,
        )
        .await
    }

    /// `von` loescht `ziel` weich (auf der Zeile `von -> ziel`)
    pub async fn kontakt_loeschen(&self, von: UserId, ziel: UserId) -> DbResult<()> {
        self.zeile_markieren(
            "UPDATE user_relations SET is_deleted = 1, deleted_by_user_id = ?
             WHERE user_id = ? AND friend_id = ?",
            von,
            ziel,
        )
        .await
    }

    async fn zeile_markieren(&self, sql: &str, von: UserId, ziel: UserId) -> DbResult<()> {
        let affected = sqlx::query(sql)
            .bind(von.inner())
            .bind(von.inner())
            .bind(ziel.inner())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Beziehung {von} -> {ziel}")));
        }
        Ok(())
    }

    /// Legt eine Gruppe an, der Besitzer wird Mitglied mit Rolle `owner`
    pub async fn gruppe_anlegen(&self, name: &str, besitzer: UserId) -> DbResult<GroupId> {
        let jetzt_str = zeit_formatieren(Utc::now());
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO groups (name, owner_id, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(besitzer.inner())
            .bind(&jetzt_str)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query(
            "INSERT INTO group_members (group_id, user_id, role, joined_at)
             VALUES (?, ?, 'owner', ?)",
        )
        .bind(id)
        .bind(besitzer.inner())
        .bind(&jetzt_str)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(GroupId(id))
    }

    pub async fn mitglied_hinzufuegen(&self, daten: NeuesMitglied<'_>) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO group_members (group_id, user_id, role, nickname, joined_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(daten.group_id.inner())
        .bind(daten.user_id.inner())
        .bind(daten.role.als_str())
        .bind(daten.nickname)
        .bind(zeit_formatieren(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn stumm_schalten(&self, gruppe: GroupId, user: UserId, stumm: bool) -> DbResult<()> {
        let affected =
            sqlx::query("UPDATE group_members SET is_muted = ? WHERE group_id = ? AND user_id = ?")
                .bind(stumm)
                .bind(gruppe.inner())
                .bind(user.inner())
                .execute(&self.pool)
                .await?
                .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Mitglied {user} in {gruppe}")));
        }
        Ok(())
    }

    pub async fn gruppe_aufloesen(&self, gruppe: GroupId) -> DbResult<()> {
        sqlx::query("UPDATE groups SET disbanded_at = ? WHERE id = ? AND disbanded_at IS NULL")
            .bind(zeit_formatieren(Utc::now()))
            .bind(gruppe.inner())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Ruft eine private Nachricht zurueck (Status `recalled`)
    pub async fn nachricht_zurueckrufen(&self, id: MessageId) -> DbResult<()> {
        sqlx::query("UPDATE messages SET status = 'recalled' WHERE id = ?")
            .bind(id.inner())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Loescht eine Nachricht nur fuer `user`
    pub async fn nachricht_fuer_benutzer_loeschen(
        &self,
        id: MessageId,
        user: UserId,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE messages SET deleted_by_users = json_insert(deleted_by_users, '$[#]', ?)
             WHERE id = ?
               AND NOT EXISTS (
                   SELECT 1 FROM json_each(messages.deleted_by_users) WHERE json_each.value = ?
               )",
        )
        .bind(user.inner())
        .bind(id.inner())
        .bind(user.inner())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
