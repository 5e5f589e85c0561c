//! Sample data for local development.

use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::{auth::password::hash_password, events::repo_types::EventCategory};

pub const SAMPLE_PASSWORD: &str = "password123";

struct SampleUser {
    name: &'static str,
    email: &'static str,
    bio: &'static str,
}

const USERS: [SampleUser; 3] = [
    SampleUser {
        name: "Admin Usuario",
        email: "admin@ejemplo.com",
        bio: "Administrador de la plataforma de eventos",
    },
    SampleUser {
        name: "Juan Pérez",
        email: "juan@ejemplo.com",
        bio: "Organizador de eventos musicales",
    },
    SampleUser {
        name: "María García",
        email: "maria@ejemplo.com",
        bio: "Amante de los eventos deportivos",
    },
];

struct SampleEvent {
    title: &'static str,
    description: &'static str,
    location: &'static str,
    days_ahead: i64,
    category: EventCategory,
    /// Indexes into `USERS`.
    creator: usize,
    attendees: &'static [usize],
}

const EVENTS: [SampleEvent; 5] = [
    SampleEvent {
        title: "Concierto de Rock",
        description: "Un increíble concierto con las mejores bandas de rock de la ciudad.",
        location: "Estadio Municipal",
        days_ahead: 7,
        category: EventCategory::Music,
        creator: 0,
        attendees: &[1, 2],
    },
    SampleEvent {
        title: "Torneo de Fútbol",
        description: "Participa en el torneo de fútbol más grande de la temporada.",
        location: "Complejo Deportivo Norte",
        days_ahead: 14,
        category: EventCategory::Sports,
        creator: 1,
        attendees: &[0],
    },
    SampleEvent {
        title: "Exposición de Arte Moderno",
        description: "Descubre las obras de los artistas contemporáneos más destacados.",
        location: "Galería Central",
        days_ahead: 3,
        category: EventCategory::Art,
        creator: 2,
        attendees: &[0, 1],
    },
    SampleEvent {
        title: "Conferencia de Tecnología",
        description: "Aprende sobre las últimas tendencias en tecnología y desarrollo.",
        location: "Centro de Convenciones",
        days_ahead: 10,
        category: EventCategory::Technology,
        creator: 0,
        attendees: &[2],
    },
    SampleEvent {
        title: "Festival Gastronómico",
        description: "Degusta los mejores platos de la cocina internacional.",
        location: "Plaza Mayor",
        days_ahead: 5,
        category: EventCategory::Gastronomy,
        creator: 1,
        attendees: &[0, 2],
    },
];

/// Replaces all users and events with the sample set.
pub async fn import(db: &PgPool, avatar_url: &str, image_url: &str) -> anyhow::Result<()> {
    let hash = hash_password(SAMPLE_PASSWORD)?;
    let mut tx = db.begin().await?;
    wipe(&mut tx).await?;

    let mut user_ids = Vec::with_capacity(USERS.len());
    for user in &USERS {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO users (name, email, password_hash, avatar, bio)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(&hash)
        .bind(avatar_url)
        .bind(user.bio)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("insert user {}", user.email))?;
        user_ids.push(id);
    }

    let now = OffsetDateTime::now_utc();
    for event in &EVENTS {
        let attendees: Vec<Uuid> = event.attendees.iter().map(|&i| user_ids[i]).collect();
        sqlx::query(
            r#"
            INSERT INTO events
                (title, description, location, event_date, image, category, creator_id, attendees)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.title)
        .bind(event.description)
        .bind(event.location)
        .bind(now + Duration::days(event.days_ahead))
        .bind(image_url)
        .bind(event.category)
        .bind(user_ids[event.creator])
        .bind(attendees)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert event {}", event.title))?;
    }

    tx.commit().await?;
    info!(users = USERS.len(), events = EVENTS.len(), "sample data imported");
    Ok(())
}

/// Deletes every user and event.
pub async fn destroy(db: &PgPool) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;
    wipe(&mut tx).await?;
    tx.commit().await?;
    info!("sample data deleted");
    Ok(())
}

async fn wipe(tx: &mut Transaction<'_, Postgres>) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM events")
        .execute(&mut **tx)
        .await
        .context("delete events")?;
    sqlx::query("DELETE FROM users")
        .execute(&mut **tx)
        .await
        .context("delete users")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_references_point_at_sample_users() {
        for event in &EVENTS {
            assert!(event.creator < USERS.len(), "{}", event.title);
            assert!(event.attendees.iter().all(|&i| i < USERS.len()));
            assert!(!event.attendees.contains(&event.creator), "{}", event.title);
        }
    }

    #[test]
    fn sample_users_have_unique_valid_emails() {
        let mut emails: Vec<&str> = USERS.iter().map(|u| u.email).collect();
        assert!(emails.iter().all(|e| crate::validation::is_valid_email(e)));
        emails.sort_unstable();
        emails.dedup();
        assert_eq!(emails.len(), USERS.len());
    }
}
