//! SQLite-Implementierung des GruppenRepository

use async_trait::async_trait;
use chrono::Utc;
use plauder_core::{GroupId, GruppenRolle, MessageId, UserId};

use crate::error::DbError;
use crate::models::{GruppenNachrichtRecord, MitgliedsAnzeige, NeueGruppenNachricht};
use crate::repository::{DbResult, GruppenRepository};
use crate::sqlite::pool::{id_liste_parsen, zeit_formatieren, zeit_parsen, SqliteDb};

const SPALTEN: &str = "id, group_id, sender_id, sender_name, sender_nickname, sender_full_name,
    sender_avatar, content, message_type, file_name, quoted_message_id,
    quoted_message_content, mentioned_user_ids, mentions, voice_duration, status, created_at";

#[async_trait]
impl GruppenRepository for SqliteDb {
    async fn ist_aufgeloest(&self, gruppe: GroupId) -> DbResult<bool> {
        let aufgeloest: Option<bool> = sqlx::query_scalar(
            "SELECT disbanded_at IS NOT NULL FROM groups WHERE id = ?",
        )
        .bind(gruppe.inner())
        .fetch_optional(&self.pool)
        .await?;

        Ok(aufgeloest.unwrap_or(false))
    }

    async fn mitglieds_rolle(
        &self,
        gruppe: GroupId,
        user: UserId,
    ) -> DbResult<Option<GruppenRolle>> {
        let rolle: Option<String> =
            sqlx::query_scalar("SELECT role FROM group_members WHERE group_id = ? AND user_id = ?")
                .bind(gruppe.inner())
                .bind(user.inner())
                .fetch_optional(&self.pool)
                .await?;

        Ok(rolle.map(|r| r.parse::<GruppenRolle>()).transpose()?)
    }

    async fn ist_stumm(&self, gruppe: GroupId, user: UserId) -> DbResult<bool> {
        let stumm: Option<bool> = sqlx::query_scalar(
            "SELECT is_muted FROM group_members WHERE group_id = ? AND user_id = ?",
        )
        .bind(gruppe.inner())
        .bind(user.inner())
        .fetch_optional(&self.pool)
        .await?;

        Ok(stumm.unwrap_or(false))
    }

    async fn mitglied_anzeige(
        &self,
        gruppe: GroupId,
        user: UserId,
    ) -> DbResult<Option<MitgliedsAnzeige>> {
        use sqlx::Row as _;

        let row = sqlx::query(
            "SELECT m.nickname, u.full_name, u.username, u.avatar
             FROM group_members m JOIN users u ON u.id = m.user_id
             WHERE m.group_id = ? AND m.user_id = ?",
        )
        .bind(gruppe.inner())
        .bind(user.inner())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok::<_, DbError>(MitgliedsAnzeige {
                nickname: r.try_get("nickname")?,
                full_name: r.try_get("full_name")?,
                username: r.try_get("username")?,
                avatar: r.try_get("avatar")?,
            })
        })
        .transpose()
    }

    async fn mitglieder_ids(&self, gruppe: GroupId) -> DbResult<Vec<UserId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM group_members WHERE group_id = ? ORDER BY joined_at, user_id",
        )
        .bind(gruppe.inner())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(UserId).collect())
    }

    async fn gruppen_nachricht_erstellen(
        &self,
        daten: NeueGruppenNachricht<'_>,
    ) -> DbResult<GruppenNachrichtRecord> {
        let jetzt_str = zeit_formatieren(Utc::now());
        let erwaehnt = serde_json::to_string(daten.mentioned_user_ids)?;

        let id = sqlx::query(
            "INSERT INTO group_messages
             (group_id, sender_id, sender_name, sender_nickname, sender_full_name, sender_avatar,
              content, message_type, file_name, quoted_message_id, quoted_message_content,
              mentioned_user_ids, mentions, voice_duration, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(daten.group_id.inner())
        .bind(daten.sender_id.inner())
        .bind(daten.sender_name)
        .bind(daten.sender_nickname)
        .bind(daten.sender_full_name)
        .bind(daten.sender_avatar)
        .bind(daten.content)
        .bind(daten.message_type.als_str())
        .bind(daten.file_name)
        .bind(daten.quoted_message_id.map(|m| m.inner()))
        .bind(daten.quoted_message_content)
        .bind(&erwaehnt)
        .bind(daten.mentions)
        .bind(daten.voice_duration)
        .bind(&jetzt_str)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(GruppenNachrichtRecord {
            id: MessageId(id),
            group_id: daten.group_id,
            sender_id: daten.sender_id,
            sender_name: daten.sender_name.to_string(),
            sender_nickname: daten.sender_nickname.map(Into::into),
            sender_full_name: daten.sender_full_name.map(Into::into),
            sender_avatar: daten.sender_avatar.map(Into::into),
            content: daten.content.to_string(),
            message_type: daten.message_type,
            file_name: daten.file_name.map(Into::into),
            quoted_message_id: daten.quoted_message_id,
            quoted_message_content: daten.quoted_message_content.map(Into::into),
            mentioned_user_ids: daten.mentioned_user_ids.to_vec(),
            mentions: daten.mentions.map(Into::into),
            voice_duration: daten.voice_duration,
            status: plauder_core::NachrichtenStatus::Normal,
            created_at: zeit_parsen(jetzt_str)?,
        })
    }

    async fn gruppen_nachricht_gelesen(
        &self,
        id: MessageId,
        leser: UserId,
    ) -> DbResult<Option<GruppenNachrichtRecord>> {
        // Nur Mitglieder, nicht der Absender selbst
        let affected = sqlx::query(
            "INSERT OR IGNORE INTO group_message_reads (group_message_id, user_id, read_at)
             SELECT gm.id, ?, ?
             FROM group_messages gm
             JOIN group_members m ON m.group_id = gm.group_id AND m.user_id = ?
             WHERE gm.id = ? AND gm.sender_id != ?",
        )
        .bind(leser.inner())
        .bind(zeit_formatieren(Utc::now()))
        .bind(leser.inner())
        .bind(id.inner())
        .bind(leser.inner())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Ok(None);
        }

        let sql = format!("SELECT {SPALTEN} FROM group_messages WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.inner())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_gruppen_nachricht(&r)).transpose()
    }
}

impl SqliteDb {
    /// Anzahl der Leser einer Gruppennachricht
    pub async fn gruppen_leser_anzahl(&self, id: MessageId) -> DbResult<i64> {
        let anzahl: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM group_message_reads WHERE group_message_id = ?",
        )
        .bind(id.inner())
        .fetch_one(&self.pool)
        .await?;
        Ok(anzahl)
    }
}

fn row_to_gruppen_nachricht(row: &sqlx::sqlite::SqliteRow) -> DbResult<GruppenNachrichtRecord> {
    use sqlx::Row as _;

    let typ_str: String = row.try_get("message_type")?;
    let status_str: String = row.try_get("status")?;
    let erwaehnt: String = row.try_get("mentioned_user_ids")?;

    Ok(GruppenNachrichtRecord {
        id: MessageId(row.try_get("id")?),
        group_id: GroupId(row.try_get("group_id")?),
        sender_id: UserId(row.try_get("sender_id")?),
        sender_name: row.try_get("sender_name")?,
        sender_nickname: row.try_get("sender_nickname")?,
        sender_full_name: row.try_get("sender_full_name")?,
        sender_avatar: row.try_get("sender_avatar")?,
        content: row.try_get("content")?,
        message_type: typ_str.parse()?,
        file_name: row.try_get("file_name")?,
        quoted_message_id: row
            .try_get::<Option<i64>, _>("quoted_message_id")?
            .map(MessageId),
        quoted_message_content: row.try_get("quoted_message_content")?,
        mentioned_user_ids: id_liste_parsen(&erwaehnt)?,
        mentions: row.try_get("mentions")?,
        voice_duration: row.try_get("voice_duration")?,
        status: status_str.parse()?,
        created_at: zeit_parsen(row.try_get("created_at")?)?,
    })
}
