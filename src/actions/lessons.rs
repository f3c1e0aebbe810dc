//! Schedule mutations: lessons, exams and assignments.
//!
//! Exams and assignments can be managed by teachers, but only against
//! lessons they teach. Callers pass `restrict_teacher` when the actor is a
//! teacher; admins pass `None` and skip the ownership check.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::filter::Param;
use crate::models::requests::*;
use crate::models::{Assignment, Exam, Lesson};

use super::cascade::{self, ASSIGNMENT_PLAN, EXAM_PLAN, LESSON_PLAN};
use super::{ActionError, ActionResult};

pub async fn create_lesson(pool: &PgPool, req: CreateLessonRequest) -> ActionResult<Lesson> {
    if req.start_time >= req.end_time {
        return Err(ActionError::Validation(
            "lesson must start before it ends".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    ensure_lesson_refs(&mut tx, req.subject_id, req.class_id, req.teacher_id).await?;

    let lesson: Lesson = sqlx::query_as(
        "INSERT INTO lessons (name, day, start_time, end_time, subject_id, class_id, teacher_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(&req.name)
    .bind(req.day)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(req.subject_id)
    .bind(req.class_id)
    .bind(req.teacher_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(lesson)
}

pub async fn update_lesson(
    pool: &PgPool,
    id: i32,
    req: UpdateLessonRequest,
) -> ActionResult<Lesson> {
    let mut tx = pool.begin().await?;

    let current: Option<Lesson> = sqlx::query_as("SELECT * FROM lessons WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let current = current.ok_or_else(|| ActionError::NotFound(format!("lesson {} not found", id)))?;

    let start = req.start_time.unwrap_or(current.start_time);
    let end = req.end_time.unwrap_or(current.end_time);
    if start >= end {
        return Err(ActionError::Validation(
            "lesson must start before it ends".to_string(),
        ));
    }

    ensure_lesson_refs(
        &mut tx,
        req.subject_id.unwrap_or(current.subject_id),
        req.class_id.unwrap_or(current.class_id),
        req.teacher_id.unwrap_or(current.teacher_id),
    )
    .await?;

    let lesson: Lesson = sqlx::query_as(
        "UPDATE lessons SET \
         name = COALESCE($2, name), day = COALESCE($3, day), \
         start_time = COALESCE($4, start_time), end_time = COALESCE($5, end_time), \
         subject_id = COALESCE($6, subject_id), class_id = COALESCE($7, class_id), \
         teacher_id = COALESCE($8, teacher_id) \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(req.day)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(req.subject_id)
    .bind(req.class_id)
    .bind(req.teacher_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(lesson)
}

pub async fn delete_lesson(pool: &PgPool, id: i32) -> ActionResult<()> {
    let mut tx = pool.begin().await?;
    let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM lessons WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("lesson {} not found", id)));
    }
    cascade::run_plan(&mut tx, &LESSON_PLAN, &Param::from(id)).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn create_exam(
    pool: &PgPool,
    req: CreateExamRequest,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<Exam> {
    if req.start_time >= req.end_time {
        return Err(ActionError::Validation(
            "exam must start before it ends".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    ensure_lesson_owned(&mut tx, req.lesson_id, restrict_teacher).await?;

    let exam: Exam = sqlx::query_as(
        "INSERT INTO exams (title, start_time, end_time, lesson_id) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&req.title)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(req.lesson_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(exam)
}

pub async fn update_exam(
    pool: &PgPool,
    id: i32,
    req: UpdateExamRequest,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<Exam> {
    let mut tx = pool.begin().await?;

    let current: Option<Exam> = sqlx::query_as("SELECT * FROM exams WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let current = current.ok_or_else(|| ActionError::NotFound(format!("exam {} not found", id)))?;

    ensure_lesson_owned(&mut tx, current.lesson_id, restrict_teacher).await?;
    if let Some(lesson_id) = req.lesson_id {
        ensure_lesson_owned(&mut tx, lesson_id, restrict_teacher).await?;
    }

    let start = req.start_time.unwrap_or(current.start_time);
    let end = req.end_time.unwrap_or(current.end_time);
    if start >= end {
        return Err(ActionError::Validation(
            "exam must start before it ends".to_string(),
        ));
    }

    let exam: Exam = sqlx::query_as(
        "UPDATE exams SET \
         title = COALESCE($2, title), start_time = COALESCE($3, start_time), \
         end_time = COALESCE($4, end_time), lesson_id = COALESCE($5, lesson_id) \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.title)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(req.lesson_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(exam)
}

pub async fn delete_exam(
    pool: &PgPool,
    id: i32,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<()> {
    let mut tx = pool.begin().await?;

    let current: Option<Exam> = sqlx::query_as("SELECT * FROM exams WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let current = current.ok_or_else(|| ActionError::NotFound(format!("exam {} not found", id)))?;
    ensure_lesson_owned(&mut tx, current.lesson_id, restrict_teacher).await?;

    cascade::run_plan(&mut tx, &EXAM_PLAN, &Param::from(id)).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn create_assignment(
    pool: &PgPool,
    req: CreateAssignmentRequest,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<Assignment> {
    if req.start_date > req.due_date {
        return Err(ActionError::Validation(
            "assignment cannot be due before it starts".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    ensure_lesson_owned(&mut tx, req.lesson_id, restrict_teacher).await?;

    let assignment: Assignment = sqlx::query_as(
        "INSERT INTO assignments (title, start_date, due_date, lesson_id) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&req.title)
    .bind(req.start_date)
    .bind(req.due_date)
    .bind(req.lesson_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(assignment)
}

pub async fn update_assignment(
    pool: &PgPool,
    id: i32,
    req: UpdateAssignmentRequest,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<Assignment> {
    let mut tx = pool.begin().await?;

    let current: Option<Assignment> = sqlx::query_as("SELECT * FROM assignments WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let current =
        current.ok_or_else(|| ActionError::NotFound(format!("assignment {} not found", id)))?;

    ensure_lesson_owned(&mut tx, current.lesson_id, restrict_teacher).await?;
    if let Some(lesson_id) = req.lesson_id {
        ensure_lesson_owned(&mut tx, lesson_id, restrict_teacher).await?;
    }

    let start = req.start_date.unwrap_or(current.start_date);
    let due = req.due_date.unwrap_or(current.due_date);
    if start > due {
        return Err(ActionError::Validation(
            "assignment cannot be due before it starts".to_string(),
        ));
    }

    let assignment: Assignment = sqlx::query_as(
        "UPDATE assignments SET \
         title = COALESCE($2, title), start_date = COALESCE($3, start_date), \
         due_date = COALESCE($4, due_date), lesson_id = COALESCE($5, lesson_id) \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.title)
    .bind(req.start_date)
    .bind(req.due_date)
    .bind(req.lesson_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(assignment)
}

pub async fn delete_assignment(
    pool: &PgPool,
    id: i32,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<()> {
    let mut tx = pool.begin().await?;

    let current: Option<Assignment> = sqlx::query_as("SELECT * FROM assignments WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let current =
        current.ok_or_else(|| ActionError::NotFound(format!("assignment {} not found", id)))?;
    ensure_lesson_owned(&mut tx, current.lesson_id, restrict_teacher).await?;

    cascade::run_plan(&mut tx, &ASSIGNMENT_PLAN, &Param::from(id)).await?;
    tx.commit().await?;
    Ok(())
}

/// Lesson must exist, and when the actor is a teacher, be taught by them.
pub(crate) async fn ensure_lesson_owned(
    tx: &mut Transaction<'_, Postgres>,
    lesson_id: i32,
    restrict_teacher: Option<Uuid>,
) -> ActionResult<()> {
    let lesson: Option<(Uuid,)> = sqlx::query_as("SELECT teacher_id FROM lessons WHERE id = $1")
        .bind(lesson_id)
        .fetch_optional(&mut **tx)
        .await?;
    let (teacher_id,) =
        lesson.ok_or_else(|| ActionError::NotFound(format!("lesson {} not found", lesson_id)))?;
    if let Some(actor) = restrict_teacher {
        if teacher_id != actor {
            return Err(ActionError::Forbidden(
                "lesson is taught by another teacher".to_string(),
            ));
        }
    }
    Ok(())
}

async fn ensure_lesson_refs(
    tx: &mut Transaction<'_, Postgres>,
    subject_id: i32,
    class_id: i32,
    teacher_id: Uuid,
) -> ActionResult<()> {
    let subject: Option<(i32,)> = sqlx::query_as("SELECT id FROM subjects WHERE id = $1")
        .bind(subject_id)
        .fetch_optional(&mut **tx)
        .await?;
    if subject.is_none() {
        return Err(ActionError::NotFound(format!(
            "subject {} not found",
            subject_id
        )));
    }

    let class: Option<(i32,)> = sqlx::query_as("SELECT id FROM classes WHERE id = $1")
        .bind(class_id)
        .fetch_optional(&mut **tx)
        .await?;
    if class.is_none() {
        return Err(ActionError::NotFound(format!(
            "class {} not found",
            class_id
        )));
    }

    let teacher: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teachers WHERE id = $1")
        .bind(teacher_id)
        .fetch_optional(&mut **tx)
        .await?;
    if teacher.is_none() {
        return Err(ActionError::NotFound(format!(
            "teacher {} not found",
            teacher_id
        )));
    }
    Ok(())
}
