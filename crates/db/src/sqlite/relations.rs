//! SQLite-Implementierung des BeziehungsRepository

use async_trait::async_trait;
use plauder_core::UserId;

use crate::models::BeziehungRecord;
use crate::repository::{BeziehungsRepository, DbResult};
use crate::sqlite::pool::SqliteDb;

#[async_trait]
impl BeziehungsRepository for SqliteDb {
    async fn beziehungen_zwischen(&self, a: UserId, b: UserId) -> DbResult<Vec<BeziehungRecord>> {
        let rows = sqlx::query(
            "SELECT user_id, friend_id, approval_status, is_blocked, blocked_by_user_id,
                    is_deleted, deleted_by_user_id
             FROM user_relations
             WHERE (user_id = ? AND friend_id = ?) OR (user_id = ? AND friend_id = ?)",
        )
        .bind(a.inner())
        .bind(b.inner())
        .bind(b.inner())
        .bind(a.inner())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_beziehung).collect()
    }

    async fn kontakt_ids(&self, user: UserId) -> DbResult<Vec<UserId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT friend_id FROM user_relations
             WHERE user_id = ? AND approval_status = 'approved' AND is_deleted = 0
             ORDER BY friend_id",
        )
        .bind(user.inner())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(UserId).collect())
    }
}

fn row_to_beziehung(row: &sqlx::sqlite::SqliteRow) -> DbResult<BeziehungRecord> {
    use sqlx::Row as _;

    let freigabe: String = row.try_get("approval_status")?;

    Ok(BeziehungRecord {
        user_id: UserId(row.try_get("user_id")?),
        friend_id: UserId(row.try_get("friend_id")?),
        approval_status: freigabe.parse()?,
        is_blocked: row.try_get("is_blocked")?,
        blocked_by_user_id: row
            .try_get::<Option<i64>, _>("blocked_by_user_id")?
            .map(UserId),
        is_deleted: row.try_get("is_deleted")?,
        deleted_by_user_id: row
            .try_get::<Option<i64>, _>("deleted_by_user_id")?
            .map(UserId),
    })
}
