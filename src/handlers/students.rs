use axum::extract::{Path, Query};
use axum::{Extension, Json};
use uuid::Uuid;
use validator::Validate;

use crate::actions::people;
use crate::database::DatabaseManager;
use crate::filter::{ListQuery, Predicate};
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::{CreateStudentRequest, UpdateStudentRequest};
use crate::models::Student;
use crate::scope;

use super::{find_scoped, list_scoped, ListPayload};

const SORT: &[&str] = &["name", "surname", "username", "birthday", "created_at"];
const SEARCH: &[&str] = &["name", "surname", "username"];

/// GET /api/students
pub async fn list(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Student>> {
    let mut filters = vec![];
    if let Some(class_id) = query.class_id {
        filters.push(Predicate::eq("class_id", class_id));
    }
    if let Some(grade_id) = query.grade_id {
        filters.push(Predicate::eq("grade_id", grade_id));
    }
    if let Some(sex) = &query.sex {
        filters.push(Predicate::eq_text("sex", sex.to_lowercase()));
    }
    if let Some(blood_type) = &query.blood_type {
        filters.push(Predicate::eq("blood_type", blood_type.as_str()));
    }

    let payload = list_scoped(
        "student_directory",
        scope::students(viewer.role, viewer.id),
        filters,
        SEARCH,
        SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/students/:id
pub async fn get(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
) -> ApiResult<Student> {
    let student = find_scoped::<Student>(
        "student_directory",
        scope::students(viewer.role, viewer.id),
        id,
    )
    .await?;
    Ok(ApiResponse::success(student))
}

/// POST /api/students
pub async fn create(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateStudentRequest>,
) -> ApiResult<Student> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let student = people::create_student(&pool, req).await?;
    Ok(ApiResponse::created(student))
}

/// PUT /api/students/:id
pub async fn update(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStudentRequest>,
) -> ApiResult<Student> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let student = people::update_student(&pool, id, req).await?;
    Ok(ApiResponse::success(student))
}

/// DELETE /api/students/:id
pub async fn delete(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    people::delete_student(&pool, id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
