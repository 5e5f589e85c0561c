use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateEventRequest, EventView, UpdateEventRequest},
    repo_types::Event,
    services::{attendees_of, populate, populate_one},
};
use crate::{
    auth::extractors::{AuthUser, CurrentUser},
    error::{AppError, AppResult},
    query::{fetch_page, ListParams, Paginated},
    response::{ok, ApiJson, ApiResponse, Empty},
    state::AppState,
    users::repo_types::UserSummary,
};

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/:id/attend", post(attend_event).put(attend_event))
        .route("/events/:id/cancel", post(cancel_attendance).put(cancel_attendance))
        .route("/events/:id/unattend", post(cancel_attendance).put(cancel_attendance))
        .route("/events/:id/attendees", get(list_attendees))
}

#[instrument(skip(state, params))]
pub async fn list_events(
    State(state): State<AppState>,
    params: ListParams,
) -> AppResult<Json<Paginated<Value>>> {
    let q = params.parse::<Event>()?;
    let (events, total) = fetch_page::<Event>(&state.db, &q).await?;
    let views = populate(&state.db, events).await?;
    Ok(Json(Paginated::<Value>::build(&q, views, total)?))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EventView>>> {
    let event = find_event(&state, id).await?;
    Ok(ok(populate_one(&state.db, event).await?))
}

#[instrument(skip(state, body))]
pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<EventView>>)> {
    let user_id = user.id;
    let new = body
        .into_new_event(user_id, &state.config.default_event_image_url)
        .inspect_err(|_| warn!(%user_id, "invalid event payload"))?;
    let event = Event::create(&state.db, new).await?;
    info!(event_id = %event.id, %user_id, "event created");
    Ok((StatusCode::CREATED, ok(populate_one(&state.db, event).await?)))
}

#[instrument(skip(state, body))]
pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateEventRequest>,
) -> AppResult<Json<ApiResponse<EventView>>> {
    let event = find_event(&state, id).await?;
    ensure_creator(&event, user_id, "update")?;
    let changes = body.into_changes()?;
    let event = Event::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(ok(populate_one(&state.db, event).await?))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    let event = find_event(&state, id).await?;
    ensure_creator(&event, user_id, "delete")?;
    if !Event::delete(&state.db, id).await? {
        return Err(not_found(id));
    }
    info!(event_id = %id, %user_id, "event deleted");
    Ok(ok(Empty {}))
}

#[instrument(skip(state))]
pub async fn attend_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EventView>>> {
    let user_id = user.id;
    find_event(&state, id).await?;
    let event = Event::add_attendee(&state.db, id, user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("You are already attending this event".into()))?;
    info!(event_id = %id, %user_id, "attendance added");
    Ok(ok(populate_one(&state.db, event).await?))
}

#[instrument(skip(state))]
pub async fn cancel_attendance(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EventView>>> {
    find_event(&state, id).await?;
    let event = Event::remove_attendee(&state.db, id, user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("You are not attending this event".into()))?;
    info!(event_id = %id, %user_id, "attendance cancelled");
    Ok(ok(populate_one(&state.db, event).await?))
}

#[instrument(skip(state))]
pub async fn list_attendees(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<UserSummary>>>> {
    let event = find_event(&state, id).await?;
    Ok(ok(attendees_of(&state.db, &event).await?))
}

async fn find_event(state: &AppState, id: Uuid) -> AppResult<Event> {
    Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Event not found with id {id}"))
}

fn ensure_creator(event: &Event, user_id: Uuid, action: &str) -> AppResult<()> {
    if event.creator_id != user_id {
        warn!(event_id = %event.id, %user_id, "caller is not the event creator");
        return Err(AppError::Forbidden(format!(
            "Not authorized to {action} this event"
        )));
    }
    Ok(())
}
