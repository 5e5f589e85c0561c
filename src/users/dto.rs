use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{User, UserChanges};
use crate::{
    error::{AppResult, FieldErrors},
    validation::{is_valid_image_url, max_chars, required_text},
};

pub const NAME_MAX: usize = 50;
pub const BIO_MAX: usize = 500;

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            avatar: u.avatar,
            bio: u.bio,
            created_at: u.created_at,
        }
    }
}

/// Body of `PUT /users/:id`. Email and password are changed through the auth
/// profile route, so they are not read here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl UpdateUserRequest {
    pub fn into_changes(self) -> AppResult<UserChanges> {
        let mut errors = FieldErrors::new();
        let changes = UserChanges {
            name: self
                .name
                .map(|n| required_text(&mut errors, "name", "Name", &n, NAME_MAX)),
            bio: self.bio.map(|b| checked_bio(&mut errors, b)),
            avatar: self.avatar.map(|a| checked_avatar(&mut errors, a)),
            ..UserChanges::default()
        };
        errors.into_result()?;
        Ok(changes)
    }
}

pub fn checked_bio(errors: &mut FieldErrors, bio: String) -> String {
    let bio = bio.trim().to_string();
    max_chars(errors, "bio", "Bio", &bio, BIO_MAX);
    bio
}

pub fn checked_avatar(errors: &mut FieldErrors, avatar: String) -> String {
    let avatar = avatar.trim().to_string();
    if !is_valid_image_url(&avatar) {
        errors.add("avatar", "Avatar must be a valid URL");
    }
    avatar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn public_user_hides_password_and_uses_underscore_id() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            avatar: "/static/default-avatar.png".into(),
            bio: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(PublicUser::from(user.clone())).unwrap();
        assert_eq!(json["_id"], user.id.to_string());
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("bio").is_none());
    }

    #[test]
    fn update_ignores_email_and_password() {
        let req: UpdateUserRequest = serde_json::from_str(
            r#"{"name":" Ana María ","email":"x@y.z","password":"hunter22"}"#,
        )
        .unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.name.as_deref(), Some("Ana María"));
        assert!(changes.email.is_none());
        assert!(changes.password_hash.is_none());
    }

    #[test]
    fn update_rejects_blank_name_and_long_bio() {
        let req = UpdateUserRequest {
            name: Some("  ".into()),
            bio: Some("x".repeat(BIO_MAX + 1)),
            avatar: Some("not a url".into()),
        };
        match req.into_changes() {
            Err(AppError::Validation(fields)) => {
                assert!(fields.get("name").is_some());
                assert!(fields.get("bio").is_some());
                assert!(fields.get("avatar").is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
