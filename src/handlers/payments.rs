//! Payment listing, creation and the public gateway callback.

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use validator::Validate;

use crate::actions::payments;
use crate::config;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::filter::{ListQuery, Predicate};
use crate::gateway::{self, CallbackPayload};
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::CreatePaymentRequest;
use crate::models::Payment;
use crate::scope;

use super::{find_scoped, list_scoped, ListPayload};

const SORT: &[&str] = &["due_date", "amount", "created_at"];

/// GET /api/payments
pub async fn list(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListPayload<Payment>> {
    let mut filters = vec![];
    if let Some(student_id) = query.student_id {
        filters.push(Predicate::eq("student_id", student_id));
    }
    if let Some(status) = &query.status {
        filters.push(Predicate::eq_text("status", status.to_uppercase()));
    }
    if let Some(payment_type) = &query.payment_type {
        filters.push(Predicate::eq("payment_type", payment_type.as_str()));
    }

    let payload = list_scoped(
        "payments",
        scope::payments(viewer.role, viewer.id),
        filters,
        &[],
        SORT,
        &query,
    )
    .await?;
    Ok(ApiResponse::success(payload))
}

/// GET /api/payments/:id
pub async fn get(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Payment> {
    let payment =
        find_scoped::<Payment>("payments", scope::payments(viewer.role, viewer.id), id).await?;
    Ok(ApiResponse::success(payment))
}

/// POST /api/payments
pub async fn create(
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreatePaymentRequest>,
) -> ApiResult<Payment> {
    viewer.require_admin()?;
    req.validate()?;
    let pool = DatabaseManager::pool().await?;
    let payment = payments::create_payment(&pool, req).await?;
    Ok(ApiResponse::created(payment))
}

/// POST /api/payments/:id/cancel
pub async fn cancel(
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i32>,
) -> ApiResult<Payment> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    let payment = payments::cancel_payment(&pool, id).await?;
    Ok(ApiResponse::success(payment))
}

/// POST /api/payments/sweep-overdue
pub async fn sweep_overdue(Extension(viewer): Extension<Viewer>) -> ApiResult<serde_json::Value> {
    viewer.require_admin()?;
    let pool = DatabaseManager::pool().await?;
    let moved = payments::sweep_overdue(&pool).await?;
    Ok(ApiResponse::success(serde_json::json!({ "moved": moved })))
}

/// POST /payments/callback
///
/// Public endpoint for the gateway. Authentication is the HMAC signature
/// over the order and payment ids; an invalid signature is a 400 before
/// any database work happens, leaving the payment untouched.
pub async fn gateway_callback(Json(payload): Json<CallbackPayload>) -> ApiResult<Payment> {
    payload.validate()?;

    let secret = &config::config().security.payment_webhook_secret;
    if secret.is_empty() {
        tracing::error!("payment webhook secret not configured");
        return Err(ApiError::service_unavailable("Payment callbacks unavailable"));
    }
    if !gateway::verify_signature(&payload, secret) {
        tracing::warn!(order_id = %payload.order_id, "rejected callback with bad signature");
        return Err(ApiError::bad_request("Invalid callback signature"));
    }

    let pool = DatabaseManager::pool().await?;
    let payment =
        payments::confirm_payment(&pool, &payload.order_id, &payload.payment_id).await?;
    tracing::info!(order_id = %payload.order_id, payment = payment.id, "payment confirmed");
    Ok(ApiResponse::success(payment))
}
