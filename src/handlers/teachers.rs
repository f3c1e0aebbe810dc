use axum::extract::{Path, Query};
use axum::{Extension, Json};
use uuid::Uuid;
use validator::Validate;

use crate::actions::people;
use crate::database::DatabaseManager;
use crate::filter::{ListQuery, Param, Predicate};
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::{CreateTeacherRequest, UpdateTeacherRequest};
use crate::models::Teacher;
use crate::scope;

use super::{find_scoped, list_scoped, ListPayload};

const SORT: &[&str] = &["name", "surname", "username", "created_at"];
const SEARCH: &[&str] = &["name", "surname", "username"];

/// GET /api/teachers
pub async fn list(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Teacher>> {
    let mut filters = vec![];
    if let Some(subject_id) = query.subject_id {
        filters.push(Predicate::exists(
            "SELECT 1 FROM subject_teachers st \
             WHERE st.teacher_id = teacher_directory.id AND st.subject_id = ?",
            vec![Param::from(subject_id)],
        ));
    }
    if let Some(class_id) = query.class_id {
        filters.push(Predicate::exists(
            "SELECT 1 FROM lessons l \
             WHERE l.teacher_id = teacher_directory.id AND l.class_id = ?",
            vec![Param::from(class_id)],
        ));
    }

    let payload = list_scoped(
        "teacher_directory",
        scope::teachers(viewer.role, viewer.id),
        filters,
        SEARCH,
        SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/teachers/:id
pub async fn get(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
) -> ApiResult<Teacher> {
    let teacher = find_scoped::<Teacher>(
        "teacher_directory",
        scope::teachers(viewer.role, viewer.id),
        id,
    )
    .await?;
    Ok(ApiResponse::success(teacher))
}

/// POST /api/teachers
pub async fn create(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateTeacherRequest>,
) -> ApiResult<Teacher> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let teacher = people::create_teacher(&pool, req).await?;
    Ok(ApiResponse::created(teacher))
}

/// PUT /api/teachers/:id
pub async fn update(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTeacherRequest>,
) -> ApiResult<Teacher> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let teacher = people::update_teacher(&pool, id, req).await?;
    Ok(ApiResponse::success(teacher))
}

/// DELETE /api/teachers/:id
pub async fn delete(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    people::delete_teacher(&pool, id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
