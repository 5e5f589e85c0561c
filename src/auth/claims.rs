use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of JWT: access, refresh or password reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
    #[serde(alias = "Reset")]
    Reset,
}

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // user ID
    pub iat: usize,      // issued at (unix timestamp)
    pub exp: usize,      // expires at (unix timestamp)
    pub iss: String,     // issuer
    pub aud: String,     // audience
    pub kind: TokenKind, // token type
    /// Reset tokens only: salt of the password hash they were issued against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp: Option<String>,
}
