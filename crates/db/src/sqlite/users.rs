//! SQLite-Implementierung des BenutzerRepository

use async_trait::async_trait;
use plauder_core::{BenutzerStatus, UserId};

use crate::error::DbError;
use crate::models::BenutzerRecord;
use crate::repository::{BenutzerRepository, DbResult};
use crate::sqlite::pool::{zeit_parsen, SqliteDb};

#[async_trait]
impl BenutzerRepository for SqliteDb {
    async fn profil(&self, id: UserId) -> DbResult<Option<BenutzerRecord>> {
        let row = sqlx::query(
            "SELECT id, username, full_name, avatar, status, created_at FROM users WHERE id = ?",
        )
        .bind(id.inner())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }

    async fn status_setzen(&self, id: UserId, status: BenutzerStatus) -> DbResult<()> {
        let affected = sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(status.als_str())
            .bind(id.inner())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Benutzer {id}")));
        }
        Ok(())
    }
}

pub(crate) fn row_to_benutzer(row: &sqlx::sqlite::SqliteRow) -> DbResult<BenutzerRecord> {
    use sqlx::Row as _;

    let status_str: String = row.try_get("status")?;

    Ok(BenutzerRecord {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        full_name: row.try_get("full_name")?,
        avatar: row.try_get("avatar")?,
        status: status_str.parse()?,
        created_at: zeit_parsen(row.try_get("created_at")?)?,
    })
}
