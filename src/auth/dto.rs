use serde::{Deserialize, Serialize};

use crate::{
    auth::password::MIN_PASSWORD_LEN,
    error::{AppError, AppResult, FieldErrors},
    users::{
        dto::{checked_avatar, checked_bio, PublicUser, NAME_MAX},
        repo_types::UserChanges,
    },
    validation::{is_valid_email, required_text},
};

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated registration fields.
#[derive(Debug)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> AppResult<NewAccount> {
        let mut errors = FieldErrors::new();
        let name = required_text(
            &mut errors,
            "name",
            "Name",
            self.name.as_deref().unwrap_or_default(),
            NAME_MAX,
        );
        let email = checked_email(&mut errors, self.email.as_deref().unwrap_or_default());
        let password = self.password.unwrap_or_default();
        checked_password(&mut errors, "password", &password);
        errors.into_result()?;
        Ok(NewAccount {
            name,
            email,
            password,
        })
    }
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Normalized email and password; both must be present.
    pub fn credentials(self) -> AppResult<(String, String)> {
        let email = self.email.map(|e| normalize_email(&e)).unwrap_or_default();
        let password = self.password.unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::BadRequest(
                "Please provide an email and password".into(),
            ));
        }
        Ok((email, password))
    }
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: String,
}

/// Body of `PUT /auth/profile`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Profile changes plus the password swap, if one was asked for.
#[derive(Debug)]
pub struct ProfileUpdate {
    pub changes: UserChanges,
    /// `(current, new)` plain-text passwords.
    pub password: Option<(String, String)>,
}

impl ProfileRequest {
    pub fn validate(self) -> AppResult<ProfileUpdate> {
        let mut errors = FieldErrors::new();
        let changes = UserChanges {
            name: self
                .name
                .map(|n| required_text(&mut errors, "name", "Name", &n, NAME_MAX)),
            email: self.email.map(|e| checked_email(&mut errors, &e)),
            bio: self.bio.map(|b| checked_bio(&mut errors, b)),
            avatar: self.avatar.map(|a| checked_avatar(&mut errors, a)),
            password_hash: None,
        };
        let password = match (self.current_password, self.new_password) {
            (_, None) => None,
            (current, Some(new)) => {
                let current = current.unwrap_or_default();
                if current.is_empty() {
                    errors.add("currentPassword", "Current password is required");
                }
                checked_password(&mut errors, "newPassword", &new);
                Some((current, new))
            }
        };
        errors.into_result()?;
        Ok(ProfileUpdate { changes, password })
    }
}

/// Request body for `POST /auth/forgot-password`.
#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

/// Request body for `POST /auth/reset-password`.
#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

impl ResetPasswordRequest {
    pub fn validate(self) -> AppResult<(String, String)> {
        let mut errors = FieldErrors::new();
        let token = self.token.unwrap_or_default();
        if token.trim().is_empty() {
            errors.add("token", "Reset token is required");
        }
        let password = self.password.unwrap_or_default();
        checked_password(&mut errors, "password", &password);
        errors.into_result()?;
        Ok((token.trim().to_string(), password))
    }
}

/// Payload returned after register, login, refresh or password reset.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Reply to a forgot-password request. The token is only echoed in development.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn checked_email(errors: &mut FieldErrors, raw: &str) -> String {
    let email = normalize_email(raw);
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(&email) {
        errors.add("email", "Please provide a valid email");
    }
    email
}

fn checked_password(errors: &mut FieldErrors, field: &'static str, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            field,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
}
