//! Grades, classes and subjects. Catalog data is visible to every
//! authenticated role; mutations are admin-only.

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use validator::Validate;

use crate::actions::catalog;
use crate::database::DatabaseManager;
use crate::filter::{ListQuery, Param, Predicate};
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::*;
use crate::models::{Class, Grade, Subject};

use super::{find_scoped, list_scoped, ListPayload};

const GRADE_SORT: &[&str] = &["level"];
const CLASS_SORT: &[&str] = &["name", "capacity", "grade_id"];
const SUBJECT_SORT: &[&str] = &["name"];

/// GET /api/grades
pub async fn list_grades(
    Extension(_viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Grade>> {
    let payload = list_scoped("grades", Predicate::All, vec![], &[], GRADE_SORT, &query).await?;
    Ok(ApiResponse::success(payload))
}

/// POST /api/grades
pub async fn create_grade(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateGradeRequest>,
) -> ApiResult<Grade> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let grade = catalog::create_grade(&pool, req).await?;
    Ok(ApiResponse::created(grade))
}

/// DELETE /api/grades/:id
pub async fn delete_grade(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    catalog::delete_grade(&pool, id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}

/// GET /api/classes
pub async fn list_classes(
    Extension(_viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Class>> {
    let mut filters = vec![];
    if let Some(grade_id) = query.grade_id {
        filters.push(Predicate::eq("grade_id", grade_id));
    }
    if let Some(supervisor_id) = query.teacher_id {
        filters.push(Predicate::eq("supervisor_id", supervisor_id));
    }
    if let Some(raw) = &query.capacity_range {
        let (lo, hi) = ListQuery::range(raw)?;
        filters.push(Predicate::between("capacity", lo, hi));
    }

    let payload = list_scoped(
        "classes",
        Predicate::All,
        filters,
        &["name"],
        CLASS_SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/classes/:id
pub async fn get_class(
    Extension(_viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Class> {
    let class = find_scoped::<Class>("classes", Predicate::All, id).await?;
    Ok(ApiResponse::success(class))
}

/// POST /api/classes
pub async fn create_class(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateClassRequest>,
) -> ApiResult<Class> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let class = catalog::create_class(&pool, req).await?;
    Ok(ApiResponse::created(class))
}

/// PUT /api/classes/:id
pub async fn update_class(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateClassRequest>,
) -> ApiResult<Class> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let class = catalog::update_class(&pool, id, req).await?;
    Ok(ApiResponse::success(class))
}

/// DELETE /api/classes/:id
pub async fn delete_class(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    catalog::delete_class(&pool, id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}

/// GET /api/subjects
pub async fn list_subjects(
    Extension(_viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Subject>> {
    let mut filters = vec![];
    if let Some(teacher_id) = query.teacher_id {
        filters.push(Predicate::exists(
            "SELECT 1 FROM subject_teachers st \
             WHERE st.subject_id = subjects.id AND st.teacher_id = ?",
            vec![Param::Uuid(teacher_id)],
        ));
    }

    let payload = list_scoped(
        "subjects",
        Predicate::All,
        filters,
        &["name"],
        SUBJECT_SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/subjects/:id
pub async fn get_subject(
    Extension(_viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Subject> {
    let subject = find_scoped::<Subject>("subjects", Predicate::All, id).await?;
    Ok(ApiResponse::success(subject))
}

/// POST /api/subjects
pub async fn create_subject(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateSubjectRequest>,
) -> ApiResult<Subject> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let subject = catalog::create_subject(&pool, req).await?;
    Ok(ApiResponse::created(subject))
}

/// PUT /api/subjects/:id
pub async fn update_subject(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateSubjectRequest>,
) -> ApiResult<Subject> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let subject = catalog::update_subject(&pool, id, req).await?;
    Ok(ApiResponse::success(subject))
}

/// DELETE /api/subjects/:id
pub async fn delete_subject(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    catalog::delete_subject(&pool, id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
