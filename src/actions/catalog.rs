//! Catalog mutations: grades, classes and subjects.

use sqlx::PgPool;
use uuid::Uuid;

use crate::filter::Param;
use crate::models::requests::*;
use crate::models::{Class, Grade, Subject};

use super::cascade::{self, CLASS_PLAN, SUBJECT_PLAN};
use super::{ActionError, ActionResult};

pub async fn create_grade(pool: &PgPool, req: CreateGradeRequest) -> ActionResult<Grade> {
    let mut tx = pool.begin().await?;

    let taken: Option<(i32,)> = sqlx::query_as("SELECT id FROM grades WHERE level = $1")
        .bind(req.level)
        .fetch_optional(&mut *tx)
        .await?;
    if taken.is_some() {
        return Err(ActionError::Precondition(format!(
            "grade level {} already exists",
            req.level
        )));
    }

    let grade: Grade = sqlx::query_as("INSERT INTO grades (level) VALUES ($1) RETURNING *")
        .bind(req.level)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(grade)
}

/// Grades are never cascaded; a grade still referenced by classes or
/// students refuses to go.
pub async fn delete_grade(pool: &PgPool, id: i32) -> ActionResult<()> {
    let mut tx = pool.begin().await?;

    let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM grades WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("grade {} not found", id)));
    }

    let (in_use,): (i64,) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM classes WHERE grade_id = $1) \
         + (SELECT COUNT(*) FROM students WHERE grade_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if in_use > 0 {
        return Err(ActionError::Precondition(format!(
            "grade {} is still referenced by classes or students",
            id
        )));
    }

    sqlx::query("DELETE FROM grades WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn create_class(pool: &PgPool, req: CreateClassRequest) -> ActionResult<Class> {
    let mut tx = pool.begin().await?;

    let grade: Option<(i32,)> = sqlx::query_as("SELECT id FROM grades WHERE id = $1")
        .bind(req.grade_id)
        .fetch_optional(&mut *tx)
        .await?;
    if grade.is_none() {
        return Err(ActionError::NotFound(format!(
            "grade {} not found",
            req.grade_id
        )));
    }

    if let Some(supervisor_id) = req.supervisor_id {
        ensure_teacher_exists(&mut tx, supervisor_id).await?;
    }

    let class: Class = sqlx::query_as(
        "INSERT INTO classes (name, capacity, grade_id, supervisor_id) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&req.name)
    .bind(req.capacity)
    .bind(req.grade_id)
    .bind(req.supervisor_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(class)
}

pub async fn update_class(pool: &PgPool, id: i32, req: UpdateClassRequest) -> ActionResult<Class> {
    let mut tx = pool.begin().await?;

    let current: Option<(Option<Uuid>,)> =
        sqlx::query_as("SELECT supervisor_id FROM classes WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let (current_supervisor,) =
        current.ok_or_else(|| ActionError::NotFound(format!("class {} not found", id)))?;

    // Capacity can't be shrunk below the current enrollment.
    if let Some(capacity) = req.capacity {
        let (enrolled,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM students WHERE class_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if (capacity as i64) < enrolled {
            return Err(ActionError::Precondition(format!(
                "class {} already has {} students enrolled",
                id, enrolled
            )));
        }
    }

    // Some(None) clears the supervisor; the class stays unsupervised until
    // a teacher is assigned again.
    let supervisor_id = match req.supervisor_id {
        Some(new) => {
            if let Some(teacher_id) = new {
                ensure_teacher_exists(&mut tx, teacher_id).await?;
            }
            new
        }
        None => current_supervisor,
    };

    let class: Class = sqlx::query_as(
        "UPDATE classes SET \
         name = COALESCE($2, name), capacity = COALESCE($3, capacity), \
         grade_id = COALESCE($4, grade_id), supervisor_id = $5 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(req.capacity)
    .bind(req.grade_id)
    .bind(supervisor_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(class)
}

/// Classes with enrolled students refuse to go; everything else hanging
/// off the class is removed by the cascade plan.
pub async fn delete_class(pool: &PgPool, id: i32) -> ActionResult<()> {
    let mut tx = pool.begin().await?;

    let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM classes WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("class {} not found", id)));
    }

    let (enrolled,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students WHERE class_id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if enrolled > 0 {
        return Err(ActionError::Precondition(format!(
            "class {} still has {} enrolled students",
            id, enrolled
        )));
    }

    cascade::run_plan(&mut tx, &CLASS_PLAN, &Param::from(id)).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn create_subject(pool: &PgPool, req: CreateSubjectRequest) -> ActionResult<Subject> {
    let mut tx = pool.begin().await?;

    let subject: Subject = sqlx::query_as("INSERT INTO subjects (name) VALUES ($1) RETURNING *")
        .bind(&req.name)
        .fetch_one(&mut *tx)
        .await?;

    for teacher_id in &req.teacher_ids {
        ensure_teacher_exists(&mut tx, *teacher_id).await?;
        sqlx::query(
            "INSERT INTO subject_teachers (subject_id, teacher_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(subject.id)
        .bind(teacher_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(subject)
}

pub async fn update_subject(
    pool: &PgPool,
    id: i32,
    req: UpdateSubjectRequest,
) -> ActionResult<Subject> {
    let mut tx = pool.begin().await?;

    let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM subjects WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("subject {} not found", id)));
    }

    let subject: Subject = sqlx::query_as(
        "UPDATE subjects SET name = COALESCE($2, name) WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(teacher_ids) = &req.teacher_ids {
        sqlx::query("DELETE FROM subject_teachers WHERE subject_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for teacher_id in teacher_ids {
            ensure_teacher_exists(&mut tx, *teacher_id).await?;
            sqlx::query(
                "INSERT INTO subject_teachers (subject_id, teacher_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(subject)
}

pub async fn delete_subject(pool: &PgPool, id: i32) -> ActionResult<()> {
    let mut tx = pool.begin().await?;
    let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM subjects WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("subject {} not found", id)));
    }
    cascade::run_plan(&mut tx, &SUBJECT_PLAN, &Param::from(id)).await?;
    tx.commit().await?;
    Ok(())
}

async fn ensure_teacher_exists(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> ActionResult<()> {
    let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teachers WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    if found.is_none() {
        return Err(ActionError::NotFound(format!("teacher {} not found", id)));
    }
    Ok(())
}
