use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::query::{FieldKind, FieldSpec, Listable};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub avatar: String,
    pub bio: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Listable for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, name, email, password_hash, avatar, bio, created_at";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("_id", "id", FieldKind::Uuid),
        FieldSpec::new("name", "name", FieldKind::Text),
        FieldSpec::new("email", "email", FieldKind::LowercaseText),
        FieldSpec::new("avatar", "avatar", FieldKind::Text).unsortable(),
        FieldSpec::new("bio", "bio", FieldKind::Text),
        FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
    ];
}

/// `{_id, name, avatar}` used wherever another record references a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
}

/// Columns to overwrite; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub password_hash: Option<String>,
}
