use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{PublicUser, UpdateUserRequest},
    repo_types::User,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    events::{repo_types::Event, services::populate},
    query::{fetch_page, FilterValue, ListParams, Paginated},
    response::{ok, ApiJson, ApiResponse, Empty},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/events", get(list_user_events))
}

#[instrument(skip(state, params))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    params: ListParams,
) -> AppResult<Json<Paginated<Value>>> {
    let q = params.parse::<User>()?;
    let (users, total) = fetch_page::<User>(&state.db, &q).await?;
    let users: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();
    Ok(Json(Paginated::<Value>::build(&q, users, total)?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PublicUser>>> {
    let user = find_user(&state, id).await?;
    Ok(ok(PublicUser::from(user)))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<PublicUser>>> {
    ensure_self(caller, id, "update")?;
    let changes = body.into_changes()?;
    let user = User::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| not_found(id))?;
    info!(user_id = %id, "user updated");
    Ok(ok(PublicUser::from(user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    ensure_self(caller, id, "delete")?;
    if !User::delete(&state.db, id).await? {
        return Err(not_found(id));
    }
    info!(user_id = %id, "user deleted");
    Ok(ok(Empty {}))
}

/// Events created by the user, through the same list query as `/events`.
#[instrument(skip(state, params))]
pub async fn list_user_events(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
    params: ListParams,
) -> AppResult<Json<Paginated<Value>>> {
    let mut q = params.parse::<Event>()?;
    find_user(&state, id).await?;
    q.require::<Event>("creator", FilterValue::Uuid(id))?;
    let (events, total) = fetch_page::<Event>(&state.db, &q).await?;
    let views = populate(&state.db, events).await?;
    Ok(Json(Paginated::<Value>::build(&q, views, total)?))
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<User> {
    User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User not found with id {id}"))
}

fn ensure_self(caller: Uuid, id: Uuid, action: &str) -> AppResult<()> {
    if caller != id {
        warn!(%caller, user_id = %id, "caller tried to {action} another user");
        return Err(AppError::Forbidden(format!(
            "Not authorized to {action} this user"
        )));
    }
    Ok(())
}
