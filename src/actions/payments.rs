//! Payment lifecycle.
//!
//! State machine: PENDING -> PAID (gateway confirmation), PENDING ->
//! OVERDUE (due-date sweep), OVERDUE -> PAID (late confirmation), and
//! PENDING/OVERDUE -> CANCELLED. PAID and CANCELLED are terminal.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::requests::CreatePaymentRequest;
use crate::models::Payment;

use super::{ActionError, ActionResult};

pub async fn create_payment(pool: &PgPool, req: CreatePaymentRequest) -> ActionResult<Payment> {
    let mut tx = pool.begin().await?;

    let student: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM students WHERE id = $1")
        .bind(req.student_id)
        .fetch_optional(&mut *tx)
        .await?;
    if student.is_none() {
        return Err(ActionError::NotFound(format!(
            "student {} not found",
            req.student_id
        )));
    }

    let order_id = req
        .gateway_order_id
        .clone()
        .unwrap_or_else(|| format!("ord_{}", Uuid::new_v4().simple()));

    let taken: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM payments WHERE gateway_order_id = $1")
            .bind(&order_id)
            .fetch_optional(&mut *tx)
            .await?;
    if taken.is_some() {
        return Err(ActionError::Precondition(format!(
            "order id '{}' is already in use",
            order_id
        )));
    }

    let payment: Payment = sqlx::query_as(
        "INSERT INTO payments (student_id, amount, payment_type, method, status, due_date, gateway_order_id) \
         VALUES ($1, $2, $3, $4, 'PENDING', $5, $6) RETURNING *",
    )
    .bind(req.student_id)
    .bind(req.amount)
    .bind(&req.payment_type)
    .bind(&req.method)
    .bind(req.due_date)
    .bind(&order_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(payment)
}

/// Apply a verified gateway confirmation. The state guard lives in the
/// UPDATE itself, so two callbacks racing on the same order leave exactly
/// one transition; the loser falls through to the diagnosis query below.
pub async fn confirm_payment(
    pool: &PgPool,
    order_id: &str,
    gateway_payment_id: &str,
) -> ActionResult<Payment> {
    let updated: Option<Payment> = sqlx::query_as(
        "UPDATE payments SET status = 'PAID', paid_at = $2, gateway_payment_id = $3 \
         WHERE gateway_order_id = $1 AND status IN ('PENDING', 'OVERDUE') \
         RETURNING *",
    )
    .bind(order_id)
    .bind(Utc::now())
    .bind(gateway_payment_id)
    .fetch_optional(pool)
    .await?;

    if let Some(payment) = updated {
        return Ok(payment);
    }

    let existing: Option<Payment> =
        sqlx::query_as("SELECT * FROM payments WHERE gateway_order_id = $1")
            .bind(order_id)
            .fetch_optional(pool)
            .await?;
    match existing {
        Some(payment) => Err(ActionError::Precondition(format!(
            "payment for order '{}' is {} and cannot be confirmed",
            order_id,
            payment.status.as_str()
        ))),
        None => Err(ActionError::NotFound(format!(
            "no payment for order '{}'",
            order_id
        ))),
    }
}

pub async fn cancel_payment(pool: &PgPool, id: i32) -> ActionResult<Payment> {
    let updated: Option<Payment> = sqlx::query_as(
        "UPDATE payments SET status = 'CANCELLED' \
         WHERE id = $1 AND status IN ('PENDING', 'OVERDUE') RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    if let Some(payment) = updated {
        return Ok(payment);
    }

    let existing: Option<Payment> = sqlx::query_as("SELECT * FROM payments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match existing {
        Some(payment) => Err(ActionError::Precondition(format!(
            "payment {} is {} and cannot be cancelled",
            id,
            payment.status.as_str()
        ))),
        None => Err(ActionError::NotFound(format!("payment {} not found", id))),
    }
}

/// Flip every pending payment whose due date has passed. Returns how many
/// rows moved to OVERDUE.
pub async fn sweep_overdue(pool: &PgPool) -> ActionResult<u64> {
    let moved = sqlx::query(
        "UPDATE payments SET status = 'OVERDUE' \
         WHERE status = 'PENDING' AND due_date < $1",
    )
    .bind(Utc::now().date_naive())
    .execute(pool)
    .await?
    .rows_affected();
    if moved > 0 {
        tracing::info!(count = moved, "payments moved to overdue");
    }
    Ok(moved)
}
