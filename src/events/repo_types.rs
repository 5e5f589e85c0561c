use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::query::{FieldKind, FieldSpec, Listable};

/// Postgres enum `event_category`; labels are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_category")]
pub enum EventCategory {
    #[sqlx(rename = "Música")]
    #[serde(rename = "Música")]
    Music,
    #[sqlx(rename = "Deportes")]
    #[serde(rename = "Deportes")]
    Sports,
    #[sqlx(rename = "Arte")]
    #[serde(rename = "Arte")]
    Art,
    #[sqlx(rename = "Tecnología")]
    #[serde(rename = "Tecnología")]
    Technology,
    #[sqlx(rename = "Gastronomía")]
    #[serde(rename = "Gastronomía")]
    Gastronomy,
    #[sqlx(rename = "Educación")]
    #[serde(rename = "Educación")]
    Education,
    #[sqlx(rename = "Otro")]
    #[serde(rename = "Otro")]
    Other,
}

impl EventCategory {
    pub const LABELS: &'static [&'static str] = &[
        "Música",
        "Deportes",
        "Arte",
        "Tecnología",
        "Gastronomía",
        "Educación",
        "Otro",
    ];

    const ALL: [EventCategory; 7] = [
        EventCategory::Music,
        EventCategory::Sports,
        EventCategory::Art,
        EventCategory::Technology,
        EventCategory::Gastronomy,
        EventCategory::Education,
        EventCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        Self::LABELS[self as usize]
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|c| c.label() == raw)
    }
}

/// Event record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: OffsetDateTime,
    pub image: String,
    pub category: EventCategory,
    pub creator_id: Uuid,
    pub attendees: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

impl Listable for Event {
    const TABLE: &'static str = "events";
    const COLUMNS: &'static str = "id, title, description, location, event_date, image, \
                                   category, creator_id, attendees, created_at";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("_id", "id", FieldKind::Uuid),
        FieldSpec::new("title", "title", FieldKind::Text),
        FieldSpec::new("description", "description", FieldKind::Text),
        FieldSpec::new("location", "location", FieldKind::Text),
        FieldSpec::new("date", "event_date", FieldKind::Timestamp),
        FieldSpec::new("image", "image", FieldKind::Text).unsortable(),
        FieldSpec::new(
            "category",
            "category",
            FieldKind::Enum {
                type_name: "event_category",
                variants: EventCategory::LABELS,
            },
        ),
        FieldSpec::new("creator", "creator_id", FieldKind::Uuid),
        FieldSpec::new("attendees", "attendees", FieldKind::UuidList).unsortable(),
        FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
        FieldSpec::new("search", "", FieldKind::Search(&["title", "description"])).filter_only(),
    ];
}

#[derive(Debug)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: OffsetDateTime,
    pub image: String,
    pub category: EventCategory,
    pub creator_id: Uuid,
}

/// Columns to overwrite; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<OffsetDateTime>,
    pub image: Option<String>,
    pub category: Option<EventCategory>,
}
