use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Event, EventChanges, NewEvent};
use crate::query::Listable;

impl Event {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            Event::COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(event)
    }

    pub async fn create(db: &PgPool, new: NewEvent) -> anyhow::Result<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (title, description, location, event_date, image, category, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            Event::COLUMNS
        ))
        .bind(new.title)
        .bind(new.description)
        .bind(new.location)
        .bind(new.event_date)
        .bind(new.image)
        .bind(new.category)
        .bind(new.creator_id)
        .fetch_one(db)
        .await?;
        Ok(event)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: EventChanges,
    ) -> anyhow::Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                event_date = COALESCE($5, event_date),
                image = COALESCE($6, image),
                category = COALESCE($7, category)
            WHERE id = $1
            RETURNING {}
            "#,
            Event::COLUMNS
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.location)
        .bind(changes.event_date)
        .bind(changes.image)
        .bind(changes.category)
        .fetch_optional(db)
        .await?;
        Ok(event)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Appends `user_id` unless already present or the user no longer exists.
    /// `None` when nothing changed.
    pub async fn add_attendee(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events SET attendees = array_append(attendees, $2)
            WHERE id = $1
              AND NOT ($2 = ANY(attendees))
              AND EXISTS (SELECT 1 FROM users WHERE users.id = $2)
            RETURNING {}
            "#,
            Event::COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(event)
    }

    /// Removes `user_id` if present. `None` when nothing changed.
    pub async fn remove_attendee(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events SET attendees = array_remove(attendees, $2)
            WHERE id = $1 AND $2 = ANY(attendees)
            RETURNING {}
            "#,
            Event::COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(event)
    }
}
