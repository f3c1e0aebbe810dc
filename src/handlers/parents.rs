use axum::extract::{Path, Query};
use axum::{Extension, Json};
use uuid::Uuid;
use validator::Validate;

use crate::actions::people;
use crate::database::DatabaseManager;
use crate::filter::ListQuery;
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::{CreateParentRequest, UpdateParentRequest};
use crate::models::Parent;
use crate::scope;

use super::{find_scoped, list_scoped, ListPayload};

const SORT: &[&str] = &["name", "surname", "username", "created_at"];
const SEARCH: &[&str] = &["name", "surname", "username"];

/// GET /api/parents
pub async fn list(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Parent>> {
    let payload = list_scoped(
        "parent_directory",
        scope::parents(viewer.role, viewer.id),
        vec![],
        SEARCH,
        SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/parents/:id
pub async fn get(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
) -> ApiResult<Parent> {
    let parent = find_scoped::<Parent>(
        "parent_directory",
        scope::parents(viewer.role, viewer.id),
        id,
    )
    .await?;
    Ok(ApiResponse::success(parent))
}

/// POST /api/parents
pub async fn create(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateParentRequest>,
) -> ApiResult<Parent> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let parent = people::create_parent(&pool, req).await?;
    Ok(ApiResponse::created(parent))
}

/// PUT /api/parents/:id
pub async fn update(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateParentRequest>,
) -> ApiResult<Parent> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let parent = people::update_parent(&pool, id, req).await?;
    Ok(ApiResponse::success(parent))
}

/// DELETE /api/parents/:id
///
/// Removes the parent and their children's entire record subtree.
pub async fn delete(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    people::delete_parent(&pool, id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
