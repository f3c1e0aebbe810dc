//! Results and attendance records.

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use validator::Validate;

use crate::actions::records;
use crate::database::DatabaseManager;
use crate::filter::{ListQuery, Predicate};
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::*;
use crate::models::{AssessmentResult, Attendance};
use crate::scope;

use super::{find_scoped, list_scoped, teacher_restriction, ListPayload};

const RESULT_SORT: &[&str] = &["score"];
const ATTENDANCE_SORT: &[&str] = &["date"];

/// GET /api/results
pub async fn list_results(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<AssessmentResult>> {
    let mut filters = vec![];
    if let Some(student_id) = query.student_id {
        filters.push(Predicate::eq("student_id", student_id));
    }

    let payload = list_scoped(
        "results",
        scope::results(viewer.role, viewer.id),
        filters,
        &[],
        RESULT_SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/results/:id
pub async fn get_result(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<AssessmentResult> {
    let result =
        find_scoped::<AssessmentResult>("results", scope::results(viewer.role, viewer.id), id)
            .await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/results
pub async fn create_result(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateResultRequest>,
) -> ApiResult<AssessmentResult> {
    viewer.require_staff()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let result = records::create_result(&pool, req, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::created(result))
}

/// PUT /api/results/:id
pub async fn update_result(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateResultRequest>,
) -> ApiResult<AssessmentResult> {
    viewer.require_staff()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let result = records::update_result(&pool, id, req, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::success(result))
}

/// DELETE /api/results/:id
pub async fn delete_result(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_staff()?;
    let pool = DatabaseManager::pool().await?;
    records::delete_result(&pool, id, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}

/// GET /api/attendances
pub async fn list_attendances(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Attendance>> {
    let mut filters = vec![];
    if let Some(student_id) = query.student_id {
        filters.push(Predicate::eq("student_id", student_id));
    }
    if let Some(lesson_id) = query.lesson_id {
        filters.push(Predicate::eq("lesson_id", lesson_id));
    }

    let payload = list_scoped(
        "attendances",
        scope::attendances(viewer.role, viewer.id),
        filters,
        &[],
        ATTENDANCE_SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/attendances/:id
pub async fn get_attendance(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Attendance> {
    let attendance =
        find_scoped::<Attendance>("attendances", scope::attendances(viewer.role, viewer.id), id)
            .await?;
    Ok(ApiResponse::success(attendance))
}

/// POST /api/attendances
pub async fn create_attendance(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateAttendanceRequest>,
) -> ApiResult<Attendance> {
    viewer.require_staff()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let attendance = records::create_attendance(&pool, req, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::created(attendance))
}

/// PUT /api/attendances/:id
pub async fn update_attendance(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateAttendanceRequest>,
) -> ApiResult<Attendance> {
    viewer.require_staff()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let attendance =
        records::update_attendance(&pool, id, req, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::success(attendance))
}

/// DELETE /api/attendances/:id
pub async fn delete_attendance(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_staff()?;
    let pool = DatabaseManager::pool().await?;
    records::delete_attendance(&pool, id, teacher_restriction(&viewer)).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
