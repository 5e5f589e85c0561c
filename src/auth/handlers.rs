use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            normalize_email, AuthResponse, ForgotPasswordRequest, ForgotPasswordResponse,
            LoginRequest, ProfileRequest, RefreshRequest, RegisterRequest, ResetPasswordRequest,
        },
        extractors::{AuthUser, CurrentUser},
        jwt::JwtKeys,
        password::{fingerprint, hash_password, verify_password},
    },
    error::{AppError, AppResult, FieldErrors},
    response::{ok, ApiJson, ApiResponse, Empty},
    state::AppState,
    users::{dto::PublicUser, repo_types::User},
};

const EMAIL_TAKEN: &str = "Email already registered";
const BAD_RESET_TOKEN: &str = "Invalid or expired reset token";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/logout", get(logout).post(logout))
        .route("/auth/profile", put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let account = payload.validate().inspect_err(|_| warn!("invalid registration"))?;

    // the unique index still catches concurrent registrations
    if User::find_by_email(&state.db, &account.email).await?.is_some() {
        warn!(email = %account.email, "email already registered");
        return Err(AppError::Conflict(EMAIL_TAKEN.into()));
    }

    let hash = hash_password(&account.password)?;
    let user = User::create(
        &state.db,
        &account.name,
        &account.email,
        &hash,
        &state.config.default_avatar_url,
    )
    .await
    .map_err(|e| AppError::conflict_or_internal(e, EMAIL_TAKEN))?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, ok(token_pair(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let (email, password) = payload.credentials()?;

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(%email, "login unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(ok(token_pair(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| {
            warn!(error = %e, "refresh rejected");
            AppError::Unauthorized("Invalid or expired refresh token".into())
        })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(ok(token_pair(&state, user)?))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<PublicUser>> {
    ok(PublicUser::from(user))
}

/// Tokens are stateless; the client drops them.
#[instrument(skip_all)]
pub async fn logout(AuthUser(user_id): AuthUser) -> Json<ApiResponse<Empty>> {
    info!(%user_id, "user logged out");
    ok(Empty {})
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ProfileRequest>,
) -> AppResult<Json<ApiResponse<PublicUser>>> {
    let user_id = user.id;
    let update = payload.validate()?;
    let mut changes = update.changes;

    if let Some((current, new)) = update.password {
        if !verify_password(&current, &user.password_hash)? {
            warn!(%user_id, "profile update with wrong current password");
            let mut errors = FieldErrors::new();
            errors.add("currentPassword", "Current password is incorrect");
            return Err(AppError::Validation(errors));
        }
        changes.password_hash = Some(hash_password(&new)?);
    }

    let user = User::update(&state.db, user_id, changes)
        .await
        .map_err(|e| AppError::conflict_or_internal(e, EMAIL_TAKEN))?
        .ok_or_else(gone)?;
    info!(%user_id, "profile updated");
    Ok(ok(PublicUser::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<ForgotPasswordResponse>>> {
    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    if email.is_empty() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Email is required");
        return Err(AppError::Validation(errors));
    }

    let mut response = ForgotPasswordResponse {
        message: "If that email is registered, a reset token has been issued".into(),
        reset_token: None,
    };

    match User::find_by_email(&state.db, &email).await? {
        Some(user) => {
            let token = JwtKeys::from_ref(&state)
                .sign_reset(user.id, fingerprint(&user.password_hash)?)?;
            info!(user_id = %user.id, "password reset token issued");
            if state.config.env.is_development() {
                response.reset_token = Some(token);
            }
        }
        None => warn!(%email, "password reset for unknown email"),
    }
    Ok(ok(response))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let (token, password) = payload.validate()?;

    let claims = JwtKeys::from_ref(&state).verify_reset(&token).map_err(|e| {
        warn!(error = %e, "reset token rejected");
        AppError::BadRequest(BAD_RESET_TOKEN.into())
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::BadRequest(BAD_RESET_TOKEN.into()))?;

    // a changed password means this token was already used or superseded
    if claims.fp.as_deref() != Some(fingerprint(&user.password_hash)?.as_str()) {
        warn!(user_id = %user.id, "stale reset token");
        return Err(AppError::BadRequest(BAD_RESET_TOKEN.into()));
    }

    // only one concurrent reset still matches the old hash
    let new_hash = hash_password(&password)?;
    let user = User::replace_password(&state.db, user.id, &user.password_hash, &new_hash)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "reset token raced another reset");
            AppError::BadRequest(BAD_RESET_TOKEN.into())
        })?;
    info!(user_id = %user.id, "password reset");
    Ok(ok(token_pair(&state, user)?))
}

fn token_pair(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    Ok(AuthResponse {
        token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user: PublicUser::from(user),
    })
}

fn gone() -> AppError {
    AppError::Unauthorized("User no longer exists".into())
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app(state: AppState) -> Router {
        Router::new()
            .merge(auth_routes())
            .merge(me_routes())
            .with_state(state)
    }

    async fn send(state: AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app(state).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_with_invalid_email_is_rejected() {
        let req = post_json(
            "/auth/register",
            serde_json::json!({"name": "Juan", "email": "nope", "password": "password123"}),
        );
        let (status, body) = send(AppState::fake(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["email"], "Please provide a valid email");
    }

    #[tokio::test]
    async fn register_with_short_password_is_rejected() {
        let req = post_json(
            "/auth/register",
            serde_json::json!({"name": "Juan", "email": "juan@example.com", "password": "123"}),
        );
        let (status, body) = send(AppState::fake(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["password"].is_string());
    }

    #[tokio::test]
    async fn login_without_password_is_bad_request() {
        let req = post_json("/auth/login", serde_json::json!({"email": "juan@example.com"}));
        let (status, body) = send(AppState::fake(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please provide an email and password");
    }

    #[tokio::test]
    async fn refresh_rejects_an_access_token() {
        let state = AppState::fake();
        let access = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let req = post_json("/auth/refresh", serde_json::json!({"refreshToken": access}));
        let (status, _) = send(state, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn reset_rejects_a_refresh_token() {
        let state = AppState::fake();
        let refresh = JwtKeys::from_ref(&state).sign_refresh(Uuid::new_v4()).unwrap();
        let req = post_json(
            "/auth/reset-password",
            serde_json::json!({"token": refresh, "password": "new-secret"}),
        );
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], BAD_RESET_TOKEN);
    }

    #[tokio::test]
    async fn forgot_password_needs_an_email() {
        let req = post_json("/auth/forgot-password", serde_json::json!({"email": "  "}));
        let (status, body) = send(AppState::fake(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["email"], "Email is required");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        for (method, uri) in [
            ("GET", "/auth/me"),
            ("GET", "/auth/logout"),
            ("POST", "/auth/logout"),
            ("PUT", "/auth/profile"),
        ] {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap();
            let (status, _) = send(AppState::fake(), req).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn logout_is_stateless() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let req = Request::post("/auth/logout")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"success": true, "data": {}}));
    }

    async fn register_user(state: &AppState, email: &str) -> (String, Uuid) {
        let req = post_json(
            "/auth/register",
            serde_json::json!({"name": "Ana", "email": email, "password": "password123"}),
        );
        let (status, body) = send(state.clone(), req).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let token = body["data"]["token"].as_str().unwrap().to_string();
        let id = body["data"]["user"]["_id"].as_str().unwrap().parse().unwrap();
        (token, id)
    }

    fn put_profile(token: &str, body: &str) -> Request<Body> {
        Request::put("/auth/profile")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn register_then_login_with_mixed_case_email(db: sqlx::PgPool) {
        let state = AppState::with_db(db);
        let (_, id) = register_user(&state, "ana@example.com").await;
        let req = post_json(
            "/auth/login",
            serde_json::json!({"email": " ANA@Example.com", "password": "password123"}),
        );
        let (status, body) = send(state.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["_id"], id.to_string());
        assert!(body["data"]["refreshToken"].is_string());

        let req = post_json(
            "/auth/login",
            serde_json::json!({"email": "ana@example.com", "password": "wrong-one"}),
        );
        assert_eq!(send(state, req).await.0, StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn register_taken_email_conflicts(db: sqlx::PgPool) {
        let state = AppState::with_db(db);
        register_user(&state, "ana@example.com").await;
        let req = post_json(
            "/auth/register",
            serde_json::json!({"name": "Otra", "email": "ANA@example.com", "password": "password123"}),
        );
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], EMAIL_TAKEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reset_token_works_once(db: sqlx::PgPool) {
        let state = AppState::with_db(db);
        register_user(&state, "ana@example.com").await;

        let req = post_json(
            "/auth/forgot-password",
            serde_json::json!({"email": "ana@example.com"}),
        );
        let (status, body) = send(state.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        let reset = body["data"]["resetToken"].as_str().unwrap().to_string();

        let reset_req = |password: &str| {
            post_json(
                "/auth/reset-password",
                serde_json::json!({"token": reset, "password": password}),
            )
        };
        let (status, body) = send(state.clone(), reset_req("new-secret")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["token"].is_string());

        let (status, body) = send(state.clone(), reset_req("third-secret")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], BAD_RESET_TOKEN);

        let req = post_json(
            "/auth/login",
            serde_json::json!({"email": "ana@example.com", "password": "new-secret"}),
        );
        assert_eq!(send(state, req).await.0, StatusCode::OK);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn forgot_password_for_unknown_email_looks_the_same(db: sqlx::PgPool) {
        let state = AppState::with_db(db);
        let req = post_json(
            "/auth/forgot-password",
            serde_json::json!({"email": "nobody@example.com"}),
        );
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["message"].is_string());
        assert!(body["data"].get("resetToken").is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn profile_is_validated(db: sqlx::PgPool) {
        let state = AppState::with_db(db);
        let (token, _) = register_user(&state, "ana@example.com").await;
        let req = put_profile(&token, r#"{"email":"broken","newPassword":"abc"}"#);
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["email"].is_string());
        assert!(body["errors"]["newPassword"].is_string());
        assert!(body["errors"]["currentPassword"].is_string());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn profile_password_change_checks_current(db: sqlx::PgPool) {
        let state = AppState::with_db(db);
        let (token, _) = register_user(&state, "ana@example.com").await;

        let req = put_profile(
            &token,
            r#"{"currentPassword":"not-it","newPassword":"brand-new"}"#,
        );
        let (status, body) = send(state.clone(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["currentPassword"], "Current password is incorrect");

        let req = put_profile(
            &token,
            r#"{"bio":"Hola","currentPassword":"password123","newPassword":"brand-new"}"#,
        );
        let (status, body) = send(state.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["bio"], "Hola");

        let req = post_json(
            "/auth/login",
            serde_json::json!({"email": "ana@example.com", "password": "brand-new"}),
        );
        assert_eq!(send(state, req).await.0, StatusCode::OK);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleted_account_token_is_rejected(db: sqlx::PgPool) {
        let state = AppState::with_db(db);
        let (token, id) = register_user(&state, "ana@example.com").await;
        User::delete(&state.db, id).await.unwrap();

        let req = put_profile(&token, r#"{"name":"Ghost"}"#);
        let (status, body) = send(state.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "User no longer exists");

        let req = Request::get("/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(state, req).await.0, StatusCode::UNAUTHORIZED);
    }
}
