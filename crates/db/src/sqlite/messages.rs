//! SQLite-Implementierung des NachrichtenRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plauder_core::{MessageId, NachrichtenTyp, UserId};

use crate::error::DbError;
use crate::models::{NachrichtRecord, NeueNachricht};
use crate::repository::{BenutzerRepository, DbResult, NachrichtenRepository};
use crate::sqlite::pool::{id_liste_parsen, zeit_formatieren, zeit_parsen, SqliteDb};

const SPALTEN: &str = "id, sender_id, receiver_id, sender_name, receiver_name,
    sender_avatar, receiver_avatar, content, message_type, file_name,
    quoted_message_id, quoted_message_content, call_type, voice_duration,
    status, is_read, read_at, deleted_by_users, created_at";

#[async_trait]
impl NachrichtenRepository for SqliteDb {
    async fn erstellen(&self, daten: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        let sender = self
            .profil(daten.sender_id)
            .await?
            .ok_or_else(|| DbError::nicht_gefunden(format!("Absender {}", daten.sender_id)))?;
        let empfaenger = self
            .profil(daten.receiver_id)
            .await?
            .ok_or_else(|| DbError::nicht_gefunden(format!("Empfaenger {}", daten.receiver_id)))?;

        let jetzt_str = zeit_formatieren(Utc::now());

        let id = sqlx::query(
            "INSERT INTO messages
             (sender_id, receiver_id, sender_name, receiver_name, sender_avatar, receiver_avatar,
              content, message_type, file_name, quoted_message_id, quoted_message_content,
              call_type, voice_duration, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(daten.sender_id.inner())
        .bind(daten.receiver_id.inner())
        .bind(sender.anzeigename())
        .bind(empfaenger.anzeigename())
        .bind(&sender.avatar)
        .bind(&empfaenger.avatar)
        .bind(daten.content)
        .bind(daten.message_type.als_str())
        .bind(daten.file_name)
        .bind(daten.quoted_message_id.map(|m| m.inner()))
        .bind(daten.quoted_message_content)
        .bind(daten.call_type)
        .bind(daten.voice_duration)
        .bind(&jetzt_str)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(NachrichtRecord {
            id: MessageId(id),
            sender_id: daten.sender_id,
            receiver_id: daten.receiver_id,
            sender_name: sender.anzeigename().to_string(),
            receiver_name: empfaenger.anzeigename().to_string(),
            sender_avatar: sender.avatar,
            receiver_avatar: empfaenger.avatar,
            content: daten.content.to_string(),
            message_type: daten.message_type,
            file_name: daten.file_name.map(Into::into),
            quoted_message_id: daten.quoted_message_id,
            quoted_message_content: daten.quoted_message_content.map(Into::into),
            call_type: daten.call_type.map(Into::into),
            voice_duration: daten.voice_duration,
            status: plauder_core::NachrichtenStatus::Normal,
            is_read: false,
            read_at: None,
            deleted_by_users: Vec::new(),
            created_at: zeit_parsen(jetzt_str)?,
        })
    }

    async fn finde_aktuelles_duplikat(
        &self,
        a: UserId,
        b: UserId,
        typ: NachrichtenTyp,
        inhalt: &str,
        seit: DateTime<Utc>,
    ) -> DbResult<Option<MessageId>> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM messages
             WHERE ((sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?))
               AND message_type = ?
               AND content = ?
               AND created_at >= ?
             ORDER BY created_at ASC, id ASC
             LIMIT 1",
        )
        .bind(a.inner())
        .bind(b.inner())
        .bind(b.inner())
        .bind(a.inner())
        .bind(typ.als_str())
        .bind(inhalt)
        .bind(zeit_formatieren(seit))
        .fetch_optional(&self.pool)
        .await?;

        Ok(id.map(MessageId))
    }

    async fn als_gelesen_markieren(
        &self,
        id: MessageId,
        leser: UserId,
    ) -> DbResult<Option<NachrichtRecord>> {
        let affected = sqlx::query(
            "UPDATE messages SET is_read = 1, read_at = ?
             WHERE id = ? AND receiver_id = ? AND is_read = 0",
        )
        .bind(zeit_formatieren(Utc::now()))
        .bind(id.inner())
        .bind(leser.inner())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Ok(None);
        }
        self.nachricht_laden(id).await
    }

    async fn alle_von_sender_gelesen(&self, leser: UserId, sender: UserId) -> DbResult<u64> {
        let affected = sqlx::query(
            "UPDATE messages SET is_read = 1, read_at = ?
             WHERE receiver_id = ? AND sender_id = ? AND is_read = 0",
        )
        .bind(zeit_formatieren(Utc::now()))
        .bind(leser.inner())
        .bind(sender.inner())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }

    async fn ausstehende_ungelesene(&self, empfaenger: UserId) -> DbResult<Vec<NachrichtRecord>> {
        let sql = format!(
            "SELECT {SPALTEN} FROM messages
             WHERE receiver_id = ?
               AND is_read = 0
               AND status != 'recalled'
               AND NOT EXISTS (
                   SELECT 1 FROM json_each(messages.deleted_by_users) WHERE json_each.value = ?
               )
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(empfaenger.inner())
            .bind(empfaenger.inner())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_nachricht).collect()
    }

    async fn nachricht_laden(&self, id: MessageId) -> DbResult<Option<NachrichtRecord>> {
        let sql = format!("SELECT {SPALTEN} FROM messages WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.inner())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_nachricht(&r)).transpose()
    }
}

pub(crate) fn row_to_nachricht(row: &sqlx::sqlite::SqliteRow) -> DbResult<NachrichtRecord> {
    use sqlx::Row as _;

    let typ_str: String = row.try_get("message_type")?;
    let status_str: String = row.try_get("status")?;
    let read_at: Option<String> = row.try_get("read_at")?;
    let geloescht: String = row.try_get("deleted_by_users")?;

    Ok(NachrichtRecord {
        id: MessageId(row.try_get("id")?),
        sender_id: UserId(row.try_get("sender_id")?),
        receiver_id: UserId(row.try_get("receiver_id")?),
        sender_name: row.try_get("sender_name")?,
        receiver_name: row.try_get("receiver_name")?,
        sender_avatar: row.try_get("sender_avatar")?,
        receiver_avatar: row.try_get("receiver_avatar")?,
        content: row.try_get("content")?,
        message_type: typ_str.parse()?,
        file_name: row.try_get("file_name")?,
        quoted_message_id: row
            .try_get::<Option<i64>, _>("quoted_message_id")?
            .map(MessageId),
        quoted_message_content: row.try_get("quoted_message_content")?,
        call_type: row.try_get("call_type")?,
        voice_duration: row.try_get("voice_duration")?,
        status: status_str.parse()?,
        is_read: row.try_get("is_read")?,
        read_at: read_at.map(zeit_parsen).transpose()?,
        deleted_by_users: id_liste_parsen(&geloescht)?,
        created_at: zeit_parsen(row.try_get("created_at")?)?,
    })
}
