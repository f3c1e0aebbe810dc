//! Scoring and attendance mutations.
//!
//! A result points at exactly one assessment. The exclusivity rule is
//! enforced here before the insert ever runs, and again by the schema's
//! CHECK constraint.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::requests::*;
use crate::models::{AssessmentResult, Attendance};

use super::lessons::ensure_lesson_owned;
use super::{ActionError, ActionResult};

pub async fn create_result(
    pool: &PgPool,
    req: CreateResultRequest,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<AssessmentResult> {
    let mut tx = pool.begin().await?;

    let lesson_id = match (req.exam_id, req.assignment_id) {
        (Some(exam_id), None) => {
            let row: Option<(i32,)> = sqlx::query_as("SELECT lesson_id FROM exams WHERE id = $1")
                .bind(exam_id)
                .fetch_optional(&mut *tx)
                .await?;
            row.ok_or_else(|| ActionError::NotFound(format!("exam {} not found", exam_id)))?
                .0
        }
        (None, Some(assignment_id)) => {
            let row: Option<(i32,)> =
                sqlx::query_as("SELECT lesson_id FROM assignments WHERE id = $1")
                    .bind(assignment_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            row.ok_or_else(|| {
                ActionError::NotFound(format!("assignment {} not found", assignment_id))
            })?
            .0
        }
        _ => {
            return Err(ActionError::Validation(
                "a result must reference exactly one of exam_id or assignment_id".to_string(),
            ));
        }
    };

    ensure_lesson_owned(&mut tx, lesson_id, restrict_teacher).await?;
    ensure_student_exists(&mut tx, req.student_id).await?;

    let result: AssessmentResult = sqlx::query_as(
        "INSERT INTO results (score, student_id, exam_id, assignment_id) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(req.score)
    .bind(req.student_id)
    .bind(req.exam_id)
    .bind(req.assignment_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(result)
}

/// Only the score moves; re-pointing a result at another assessment is a
/// delete-and-recreate.
pub async fn update_result(
    pool: &PgPool,
    id: i32,
    req: UpdateResultRequest,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<AssessmentResult> {
    let mut tx = pool.begin().await?;

    let current = fetch_result(&mut tx, id).await?;
    ensure_result_owned(&mut tx, &current, restrict_teacher).await?;

    let result: AssessmentResult = sqlx::query_as(
        "UPDATE results SET score = COALESCE($2, score) WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.score)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(result)
}

pub async fn delete_result(
    pool: &PgPool,
    id: i32,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<()> {
    let mut tx = pool.begin().await?;

    let current = fetch_result(&mut tx, id).await?;
    ensure_result_owned(&mut tx, &current, restrict_teacher).await?;

    sqlx::query("DELETE FROM results WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn create_attendance(
    pool: &PgPool,
    req: CreateAttendanceRequest,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<Attendance> {
    let mut tx = pool.begin().await?;

    ensure_lesson_owned(&mut tx, req.lesson_id, restrict_teacher).await?;
    ensure_student_exists(&mut tx, req.student_id).await?;

    // One record per (student, lesson, date); a second take overwrites.
    let attendance: Attendance = sqlx::query_as(
        "INSERT INTO attendances (date, present, student_id, lesson_id) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (student_id, lesson_id, date) \
         DO UPDATE SET present = EXCLUDED.present \
         RETURNING *",
    )
    .bind(req.date)
    .bind(req.present)
    .bind(req.student_id)
    .bind(req.lesson_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(attendance)
}

pub async fn update_attendance(
    pool: &PgPool,
    id: i32,
    req: UpdateAttendanceRequest,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<Attendance> {
    let mut tx = pool.begin().await?;

    let current: Option<Attendance> = sqlx::query_as("SELECT * FROM attendances WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let current =
        current.ok_or_else(|| ActionError::NotFound(format!("attendance {} not found", id)))?;
    ensure_lesson_owned(&mut tx, current.lesson_id, restrict_teacher).await?;

    let attendance: Attendance = sqlx::query_as(
        "UPDATE attendances SET date = COALESCE($2, date), present = COALESCE($3, present) \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.date)
    .bind(req.present)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(attendance)
}

pub async fn delete_attendance(
    pool: &PgPool,
    id: i32,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<()> {
    let mut tx = pool.begin().await?;

    let current: Option<Attendance> = sqlx::query_as("SELECT * FROM attendances WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let current =
        current.ok_or_else(|| ActionError::NotFound(format!("attendance {} not found", id)))?;
    ensure_lesson_owned(&mut tx, current.lesson_id, restrict_teacher).await?;

    sqlx::query("DELETE FROM attendances WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

async fn fetch_result(
    tx: &mut Transaction<'_, Postgres>,
    id: i32,
) -> ActionResult<AssessmentResult> {
    let row: Option<AssessmentResult> = sqlx::query_as("SELECT * FROM results WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    row.ok_or_else(|| ActionError::NotFound(format!("result {} not found", id)))
}

async fn ensure_result_owned(
    tx: &mut Transaction<'_, Postgres>,
    result: &AssessmentResult,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<()> {
    let lesson_id: Option<(i32,)> = match (result.exam_id, result.assignment_id) {
        (Some(exam_id), _) => sqlx::query_as("SELECT lesson_id FROM exams WHERE id = $1")
            .bind(exam_id)
            .fetch_optional(&mut **tx)
            .await?,
        (_, Some(assignment_id)) => {
            sqlx::query_as("SELECT lesson_id FROM assignments WHERE id = $1")
                .bind(assignment_id)
                .fetch_optional(&mut **tx)
                .await?
        }
        _ => None,
    };
    match lesson_id {
        Some((lesson_id,)) => ensure_lesson_owned(tx, lesson_id, restrict_teacher).await,
        None => Err(ActionError::Internal(format!(
            "result {} references a missing assessment",
            result.id
        ))),
    }
}

async fn ensure_student_exists(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> ActionResult<()> {
    let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    if found.is_none() {
        return Err(ActionError::NotFound(format!("student {} not found", id)));
    }
    Ok(())
}
