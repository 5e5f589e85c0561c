use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{User, UserChanges, UserSummary};
use crate::query::Listable;

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            User::COLUMNS
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            User::COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Inserts a user; a taken email surfaces as a unique violation.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        avatar: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, avatar)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            User::COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(avatar)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: UserChanges,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                bio = COALESCE($4, bio),
                avatar = COALESCE($5, avatar),
                password_hash = COALESCE($6, password_hash)
            WHERE id = $1
            RETURNING {}
            "#,
            User::COLUMNS
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.bio)
        .bind(changes.avatar)
        .bind(changes.password_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Swaps the password hash only while it still equals `current_hash`.
    /// `None` when the user is gone or the hash has already changed.
    pub async fn replace_password(
        db: &PgPool,
        id: Uuid,
        current_hash: &str,
        new_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET password_hash = $3
            WHERE id = $1 AND password_hash = $2
            RETURNING {}
            "#,
            User::COLUMNS
        ))
        .bind(id)
        .bind(current_hash)
        .bind(new_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Removes the user from every attendee list, then deletes them.
    /// Their own events go with them through the foreign key.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let mut tx = db.begin().await?;
        sqlx::query(
            "UPDATE events SET attendees = array_remove(attendees, $1) WHERE $1 = ANY(attendees)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }
}

impl UserSummary {
    /// Summaries for `ids` in one query; missing ids are simply absent.
    pub async fn by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<UserSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserSummary>(
            "SELECT id, name, avatar FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
