use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{EventCategory, EventChanges, NewEvent};
use crate::{
    error::{AppResult, FieldErrors},
    query::parse_timestamp,
    users::repo_types::UserSummary,
    validation::{is_valid_image_url, max_chars, required_text},
};

pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 1000;
pub const LOCATION_MAX: usize = 200;

/// A user reference that could not be resolved stays a bare id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UserRef {
    User(UserSummary),
    Id(Uuid),
}

/// Event as returned by the API, with `creator` and `attendees` populated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub image: String,
    pub category: EventCategory,
    pub creator: UserRef,
    pub attendees: Vec<UserSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Body of `POST /events`. Every field is optional here so that missing ones
/// are reported together as validation errors.
#[derive(Debug, Default, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
}

impl CreateEventRequest {
    pub fn into_new_event(self, creator_id: Uuid, default_image: &str) -> AppResult<NewEvent> {
        let mut errors = FieldErrors::new();
        let title = required_text(
            &mut errors,
            "title",
            "Title",
            self.title.as_deref().unwrap_or_default(),
            TITLE_MAX,
        );
        let description = required_text(
            &mut errors,
            "description",
            "Description",
            self.description.as_deref().unwrap_or_default(),
            DESCRIPTION_MAX,
        );
        let location = required_text(
            &mut errors,
            "location",
            "Location",
            self.location.as_deref().unwrap_or_default(),
            LOCATION_MAX,
        );
        let event_date = match self.date.as_deref() {
            Some(raw) => checked_date(&mut errors, raw),
            None => {
                errors.add("date", "Date is required");
                None
            }
        };
        let category = match self.category.as_deref() {
            Some(raw) => checked_category(&mut errors, raw),
            None => {
                errors.add("category", "Category is required");
                None
            }
        };
        let image = match self.image {
            Some(image) if !image.trim().is_empty() => checked_image(&mut errors, image),
            _ => default_image.to_string(),
        };
        errors.into_result()?;

        match (event_date, category) {
            (Some(event_date), Some(category)) => Ok(NewEvent {
                title,
                description,
                location,
                event_date,
                image,
                category,
                creator_id,
            }),
            _ => Err(anyhow::anyhow!("validated event without date or category").into()),
        }
    }
}

/// Body of `PUT /events/:id`. `creator` and `attendees` are not writable
/// and are dropped if sent.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
}

impl UpdateEventRequest {
    pub fn into_changes(self) -> AppResult<EventChanges> {
        let mut errors = FieldErrors::new();
        let changes = EventChanges {
            title: self
                .title
                .map(|t| required_text(&mut errors, "title", "Title", &t, TITLE_MAX)),
            description: self.description.map(|d| {
                required_text(&mut errors, "description", "Description", &d, DESCRIPTION_MAX)
            }),
            location: self
                .location
                .map(|l| required_text(&mut errors, "location", "Location", &l, LOCATION_MAX)),
            event_date: self
                .date
                .and_then(|raw| checked_date(&mut errors, &raw)),
            image: self.image.map(|i| checked_image(&mut errors, i)),
            category: self
                .category
                .and_then(|raw| checked_category(&mut errors, &raw)),
        };
        errors.into_result()?;
        Ok(changes)
    }
}

fn checked_date(errors: &mut FieldErrors, raw: &str) -> Option<OffsetDateTime> {
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        errors.add("date", "Date must be RFC 3339 or YYYY-MM-DD");
    }
    parsed
}

fn checked_category(errors: &mut FieldErrors, raw: &str) -> Option<EventCategory> {
    let parsed = EventCategory::parse(raw);
    if parsed.is_none() {
        errors.add(
            "category",
            format!("Category must be one of: {}", EventCategory::LABELS.join(", ")),
        );
    }
    parsed
}

fn checked_image(errors: &mut FieldErrors, image: String) -> String {
    let image = image.trim().to_string();
    max_chars(errors, "image", "Image", &image, 2048);
    if !is_valid_image_url(&image) {
        errors.add("image", "Image must be a valid URL");
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    fn create(body: serde_json::Value) -> AppResult<NewEvent> {
        let req: CreateEventRequest = serde_json::from_value(body).unwrap();
        req.into_new_event(Uuid::nil(), "/static/default-event.jpg")
    }

    #[test]
    fn create_fills_default_image_and_trims() {
        let event = create(json!({
            "title": "  Jazz night ",
            "description": "Live quartet",
            "location": "Madrid",
            "date": "2025-06-01",
            "category": "Música"
        }))
        .unwrap();
        assert_eq!(event.title, "Jazz night");
        assert_eq!(event.image, "/static/default-event.jpg");
        assert_eq!(event.category, EventCategory::Music);
        assert_eq!(event.event_date.date().to_string(), "2025-06-01");
    }

    #[test]
    fn create_reports_every_missing_field() {
        match create(json!({})) {
            Err(AppError::Validation(fields)) => {
                for field in ["title", "description", "location", "date", "category"] {
                    assert!(fields.get(field).is_some(), "{field} not reported");
                }
                assert!(fields.get("image").is_none());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_unknown_category_and_long_title() {
        let err = create(json!({
            "title": "x".repeat(TITLE_MAX + 1),
            "description": "d",
            "location": "l",
            "date": "tomorrow",
            "category": "Cine"
        }))
        .unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.get("title").unwrap().contains("100"));
        assert!(fields.get("category").unwrap().contains("Tecnología"));
        assert!(fields.get("date").is_some());
    }

    #[test]
    fn update_drops_creator_and_attendees() {
        let req: UpdateEventRequest = serde_json::from_value(json!({
            "location": "Sevilla",
            "creator": Uuid::new_v4(),
            "attendees": [Uuid::new_v4()]
        }))
        .unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.location.as_deref(), Some("Sevilla"));
        assert!(changes.title.is_none() && changes.category.is_none());
    }

    #[test]
    fn unresolved_creator_serializes_as_bare_id() {
        let id = Uuid::new_v4();
        assert_eq!(serde_json::to_value(UserRef::Id(id)).unwrap(), json!(id.to_string()));
        let summary = UserSummary {
            id,
            name: "Ana".into(),
            avatar: "/a.png".into(),
        };
        assert_eq!(
            serde_json::to_value(UserRef::User(summary)).unwrap(),
            json!({"_id": id.to_string(), "name": "Ana", "avatar": "/a.png"})
        );
    }
}
