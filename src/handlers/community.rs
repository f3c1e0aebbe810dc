//! Events, announcements and messages.

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use validator::Validate;

use crate::actions::community;
use crate::database::DatabaseManager;
use crate::filter::{ListQuery, Predicate};
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::*;
use crate::models::{Announcement, Event, Message, Role};
use crate::scope;

use super::{find_scoped, list_scoped, ListPayload};

const EVENT_SORT: &[&str] = &["title", "start_time"];
const ANNOUNCEMENT_SORT: &[&str] = &["title", "date"];
const MESSAGE_SORT: &[&str] = &["sent_at", "subject"];

/// GET /api/events
pub async fn list_events(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Event>> {
    let mut filters = vec![];
    if let Some(class_id) = query.class_id {
        filters.push(Predicate::eq("class_id", class_id));
    }

    let payload = list_scoped(
        "events",
        scope::events(viewer.role, viewer.id),
        filters,
        &["title", "description"],
        EVENT_SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/events/:id
pub async fn get_event(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Event> {
    let event = find_scoped::<Event>("events", scope::events(viewer.role, viewer.id), id).await?;
    Ok(ApiResponse::success(event))
}

/// POST /api/events
pub async fn create_event(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<Event> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let event = community::create_event(&pool, req).await?;
    Ok(ApiResponse::created(event))
}

/// PUT /api/events/:id
pub async fn update_event(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<Event> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let event = community::update_event(&pool, id, req).await?;
    Ok(ApiResponse::success(event))
}

/// DELETE /api/events/:id
pub async fn delete_event(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    community::delete_event(&pool, id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}

/// GET /api/announcements
pub async fn list_announcements(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Announcement>> {
    let mut filters = vec![];
    if let Some(class_id) = query.class_id {
        filters.push(Predicate::eq("class_id", class_id));
    }

    let payload = list_scoped(
        "announcements",
        scope::announcements(viewer.role, viewer.id),
        filters,
        &["title", "description"],
        ANNOUNCEMENT_SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/announcements/:id
pub async fn get_announcement(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Announcement> {
    let announcement = find_scoped::<Announcement>(
        "announcements",
        scope::announcements(viewer.role, viewer.id),
        id,
    )
    .await?;
    Ok(ApiResponse::success(announcement))
}

/// POST /api/announcements
pub async fn create_announcement(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateAnnouncementRequest>,
) -> ApiResult<Announcement> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let announcement = community::create_announcement(&pool, req).await?;
    Ok(ApiResponse::created(announcement))
}

/// PUT /api/announcements/:id
pub async fn update_announcement(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateAnnouncementRequest>,
) -> ApiResult<Announcement> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let announcement = community::update_announcement(&pool, id, req).await?;
    Ok(ApiResponse::success(announcement))
}

/// DELETE /api/announcements/:id
pub async fn delete_announcement(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    community::delete_announcement(&pool, id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}

/// GET /api/messages
pub async fn list_messages(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Message>> {
    let payload = list_scoped(
        "messages",
        scope::messages(viewer.role, viewer.id),
        vec![],
        &["subject", "body"],
        MESSAGE_SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/messages/:id
pub async fn get_message(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Message> {
    let message =
        find_scoped::<Message>("messages", scope::messages(viewer.role, viewer.id), id).await?;
    Ok(ApiResponse::success(message))
}

/// POST /api/messages
///
/// Any authenticated user can send; the sender is taken from the session,
/// never from the payload.
pub async fn create_message(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateMessageRequest>,
) -> ApiResult<Message> {
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let message = community::create_message(&pool, viewer.id, req).await?;
    Ok(ApiResponse::created(message))
}

/// POST /api/messages/:id/read
pub async fn mark_message_read(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    let pool = DatabaseManager::pool().await?;
    community::mark_message_read(&pool, id, viewer.id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "read": id })))
}

/// DELETE /api/messages/:id
pub async fn delete_message(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    let restrict_sender = match viewer.role {
        Role::Admin => None,
        _ => Some(viewer.id),
    };
    let pool = DatabaseManager::pool().await?;
    community::delete_message(&pool, id, restrict_sender).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
