//! Exams and assignments. Reads are role-scoped; writes are open to staff,
//! with teachers confined to lessons they teach.

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use validator::Validate;

use crate::actions::lessons as actions;
use crate::database::DatabaseManager;
use crate::filter::{ListQuery, Predicate};
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::*;
use crate::models::{Assignment, Exam};
use crate::scope;

use super::{find_scoped, list_scoped, teacher_restriction, ListPayload};

const EXAM_SORT: &[&str] = &["title", "start_time"];
const ASSIGNMENT_SORT: &[&str] = &["title", "due_date"];

/// GET /api/exams
pub async fn list_exams(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Exam>> {
    let mut filters = vec![];
    if let Some(lesson_id) = query.lesson_id {
        filters.push(Predicate::eq("lesson_id", lesson_id));
    }

    let payload = list_scoped(
        "exams",
        scope::exams(viewer.role, viewer.id),
        filters,
        &["title"],
        EXAM_SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/exams/:id
pub async fn get_exam(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Exam> {
    let exam = find_scoped::<Exam>("exams", scope::exams(viewer.role, viewer.id), id).await?;
    Ok(ApiResponse::success(exam))
}

/// POST /api/exams
pub async fn create_exam(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateExamRequest>,
) -> ApiResult<Exam> {
    viewer.require_staff()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let exam = actions::create_exam(&pool, req, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::created(exam))
}

/// PUT /api/exams/:id
pub async fn update_exam(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateExamRequest>,
) -> ApiResult<Exam> {
    viewer.require_staff()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let exam = actions::update_exam(&pool, id, req, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::success(exam))
}

/// DELETE /api/exams/:id
pub async fn delete_exam(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_staff()?;
    let pool = DatabaseManager::pool().await?;
    actions::delete_exam(&pool, id, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}

/// GET /api/assignments
pub async fn list_assignments(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Assignment>> {
    let mut filters = vec![];
    if let Some(lesson_id) = query.lesson_id {
        filters.push(Predicate::eq("lesson_id", lesson_id));
    }

    let payload = list_scoped(
        "assignments",
        scope::assignments(viewer.role, viewer.id),
        filters,
        &["title"],
        ASSIGNMENT_SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/assignments/:id
pub async fn get_assignment(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Assignment> {
    let assignment = find_scoped::<Assignment>(
        "assignments",
        scope::assignments(viewer.role, viewer.id),
        id,
    )
    .await?;
    Ok(ApiResponse::success(assignment))
}

/// POST /api/assignments
pub async fn create_assignment(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateAssignmentRequest>,
) -> ApiResult<Assignment> {
    viewer.require_staff()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let assignment = actions::create_assignment(&pool, req, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::created(assignment))
}

/// PUT /api/assignments/:id
pub async fn update_assignment(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateAssignmentRequest>,
) -> ApiResult<Assignment> {
    viewer.require_staff()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let assignment =
        actions::update_assignment(&pool, id, req, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::success(assignment))
}

/// DELETE /api/assignments/:id
pub async fn delete_assignment(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_staff()?;
    let pool = DatabaseManager::pool().await?;
    actions::delete_assignment(&pool, id, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
