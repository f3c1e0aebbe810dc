use axum::extract::{Path, Query};
use axum::{Extension, Json};
use validator::Validate;

use crate::actions::lessons;
use crate::database::DatabaseManager;
use crate::filter::{ListQuery, Predicate};
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::{CreateLessonRequest, UpdateLessonRequest};
use crate::models::Lesson;
use crate::scope;

use super::{find_scoped, list_scoped, ListPayload};

const SORT: &[&str] = &["name", "day", "start_time"];
const SEARCH: &[&str] = &["name"];

/// GET /api/lessons
pub async fn list(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Lesson>> {
    let mut filters = vec![];
    if let Some(class_id) = query.class_id {
        filters.push(Predicate::eq("class_id", class_id));
    }
    if let Some(subject_id) = query.subject_id {
        filters.push(Predicate::eq("subject_id", subject_id));
    }
    if let Some(teacher_id) = query.teacher_id {
        filters.push(Predicate::eq("teacher_id", teacher_id));
    }
    if let Some(day) = &query.day {
        filters.push(Predicate::eq_text("day", day.to_lowercase()));
    }

    let payload = list_scoped(
        "lessons",
        scope::lessons(viewer.role, viewer.id),
        filters,
        SEARCH,
        SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/lessons/:id
pub async fn get(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Lesson> {
    let lesson =
        find_scoped::<Lesson>("lessons", scope::lessons(viewer.role, viewer.id), id).await?;
    Ok(ApiResponse::success(lesson))
}

/// POST /api/lessons
pub async fn create(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateLessonRequest>,
) -> ApiResult<Lesson> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let lesson = lessons::create_lesson(&pool, req).await?;
    Ok(ApiResponse::created(lesson))
}

/// PUT /api/lessons/:id
pub async fn update(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateLessonRequest>,
) -> ApiResult<Lesson> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let lesson = lessons::update_lesson(&pool, id, req).await?;
    Ok(ApiResponse::success(lesson))
}

/// DELETE /api/lessons/:id
pub async fn delete(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    lessons::delete_lesson(&pool, id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
