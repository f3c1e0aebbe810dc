//! Identity-entity mutations. Students, teachers and parents share the
//! `users` supertype table, so every create is two inserts in one
//! transaction: the identity row and the role extension row. A failure in
//! either leaves no orphaned half.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth;
use crate::filter::Param;
use crate::models::requests::*;
use crate::models::{Parent, Role, Student, Teacher};

use super::cascade::{self, PARENT_PLAN, STUDENT_PLAN, TEACHER_PLAN};
use super::{ensure_username_free, ActionError, ActionResult};

pub async fn create_student(pool: &PgPool, req: CreateStudentRequest) -> ActionResult<Student> {
    let mut tx = pool.begin().await?;

    ensure_username_free(&mut tx, &req.username).await?;
    ensure_class_has_room(&mut tx, req.class_id, None).await?;

    let parent_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM parents WHERE id = $1")
        .bind(req.parent_id)
        .fetch_optional(&mut *tx)
        .await?;
    if parent_exists.is_none() {
        return Err(ActionError::NotFound(format!(
            "parent {} not found",
            req.parent_id
        )));
    }

    let id = Uuid::new_v4();
    let password_hash = auth::hash_password(&req.password)?;

    sqlx::query(
        "INSERT INTO users (id, username, password_hash, role, name, surname, email, phone, address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(&req.username)
    .bind(&password_hash)
    .bind(Role::Student)
    .bind(&req.name)
    .bind(&req.surname)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO students (id, blood_type, sex, birthday, grade_id, class_id, parent_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(&req.blood_type)
    .bind(req.sex)
    .bind(req.birthday)
    .bind(req.grade_id)
    .bind(req.class_id)
    .bind(req.parent_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    fetch_student(pool, id).await
}

pub async fn update_student(
    pool: &PgPool,
    id: Uuid,
    req: UpdateStudentRequest,
) -> ActionResult<Student> {
    let mut tx = pool.begin().await?;

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("student {} not found", id)));
    }

    // Moving between classes re-checks the target's capacity.
    if let Some(class_id) = req.class_id {
        ensure_class_has_room(&mut tx, class_id, Some(id)).await?;
    }

    sqlx::query(
        "UPDATE users SET \
         name = COALESCE($2, name), surname = COALESCE($3, surname), \
         email = COALESCE($4, email), phone = COALESCE($5, phone), \
         address = COALESCE($6, address) WHERE id = $1",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.surname)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .execute(&mut *tx)
    .await?;

    if let Some(hash) = rehash_if_present(req.password.as_deref())? {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        "UPDATE students SET \
         blood_type = COALESCE($2, blood_type), sex = COALESCE($3, sex), \
         birthday = COALESCE($4, birthday), grade_id = COALESCE($5, grade_id), \
         class_id = COALESCE($6, class_id), parent_id = COALESCE($7, parent_id) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&req.blood_type)
    .bind(req.sex)
    .bind(req.birthday)
    .bind(req.grade_id)
    .bind(req.class_id)
    .bind(req.parent_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    fetch_student(pool, id).await
}

pub async fn delete_student(pool: &PgPool, id: Uuid) -> ActionResult<()> {
    let mut tx = pool.begin().await?;
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("student {} not found", id)));
    }
    cascade::run_plan(&mut tx, &STUDENT_PLAN, &Param::Uuid(id)).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn create_teacher(pool: &PgPool, req: CreateTeacherRequest) -> ActionResult<Teacher> {
    let mut tx = pool.begin().await?;

    ensure_username_free(&mut tx, &req.username).await?;

    let id = Uuid::new_v4();
    let password_hash = auth::hash_password(&req.password)?;

    sqlx::query(
        "INSERT INTO users (id, username, password_hash, role, name, surname, email, phone, address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(&req.username)
    .bind(&password_hash)
    .bind(Role::Teacher)
    .bind(&req.name)
    .bind(&req.surname)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO teachers (id, blood_type, sex, birthday) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(&req.blood_type)
        .bind(req.sex)
        .bind(req.birthday)
        .execute(&mut *tx)
        .await?;

    for subject_id in &req.subject_ids {
        sqlx::query(
            "INSERT INTO subject_teachers (subject_id, teacher_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(subject_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    fetch_teacher(pool, id).await
}

pub async fn update_teacher(
    pool: &PgPool,
    id: Uuid,
    req: UpdateTeacherRequest,
) -> ActionResult<Teacher> {
    let mut tx = pool.begin().await?;

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teachers WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("teacher {} not found", id)));
    }

    sqlx::query(
        "UPDATE users SET \
         name = COALESCE($2, name), surname = COALESCE($3, surname), \
         email = COALESCE($4, email), phone = COALESCE($5, phone), \
         address = COALESCE($6, address) WHERE id = $1",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.surname)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .execute(&mut *tx)
    .await?;

    if let Some(hash) = rehash_if_present(req.password.as_deref())? {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        "UPDATE teachers SET \
         blood_type = COALESCE($2, blood_type), sex = COALESCE($3, sex), \
         birthday = COALESCE($4, birthday) WHERE id = $1",
    )
    .bind(id)
    .bind(&req.blood_type)
    .bind(req.sex)
    .bind(req.birthday)
    .execute(&mut *tx)
    .await?;

    // Replace the subject set when one is supplied.
    if let Some(subject_ids) = &req.subject_ids {
        sqlx::query("DELETE FROM subject_teachers WHERE teacher_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for subject_id in subject_ids {
            sqlx::query(
                "INSERT INTO subject_teachers (subject_id, teacher_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(subject_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    fetch_teacher(pool, id).await
}

pub async fn delete_teacher(pool: &PgPool, id: Uuid) -> ActionResult<()> {
    let mut tx = pool.begin().await?;
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teachers WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("teacher {} not found", id)));
    }
    cascade::run_plan(&mut tx, &TEACHER_PLAN, &Param::Uuid(id)).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn create_parent(pool: &PgPool, req: CreateParentRequest) -> ActionResult<Parent> {
    let mut tx = pool.begin().await?;

    ensure_username_free(&mut tx, &req.username).await?;

    let id = Uuid::new_v4();
    let password_hash = auth::hash_password(&req.password)?;

    sqlx::query(
        "INSERT INTO users (id, username, password_hash, role, name, surname, email, phone, address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(&req.username)
    .bind(&password_hash)
    .bind(Role::Parent)
    .bind(&req.name)
    .bind(&req.surname)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO parents (id) VALUES ($1)")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    fetch_parent(pool, id).await
}

pub async fn update_parent(
    pool: &PgPool,
    id: Uuid,
    req: UpdateParentRequest,
) -> ActionResult<Parent> {
    let mut tx = pool.begin().await?;

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM parents WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("parent {} not found", id)));
    }

    sqlx::query(
        "UPDATE users SET \
         name = COALESCE($2, name), surname = COALESCE($3, surname), \
         email = COALESCE($4, email), phone = COALESCE($5, phone), \
         address = COALESCE($6, address) WHERE id = $1",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.surname)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .execute(&mut *tx)
    .await?;

    if let Some(hash) = rehash_if_present(req.password.as_deref())? {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    fetch_parent(pool, id).await
}

pub async fn delete_parent(pool: &PgPool, id: Uuid) -> ActionResult<()> {
    let mut tx = pool.begin().await?;
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM parents WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ActionError::NotFound(format!("parent {} not found", id)));
    }
    cascade::run_plan(&mut tx, &PARENT_PLAN, &Param::Uuid(id)).await?;
    tx.commit().await?;
    Ok(())
}

/// The `SELECT` that backs the capacity precondition. `FOR UPDATE` locks
/// the class row, so concurrent enrollments into the same class serialize
/// here and the count below always includes whoever committed first.
pub(crate) const LOCK_CLASS_SQL: &str =
    "SELECT capacity FROM classes WHERE id = $1 FOR UPDATE";

async fn ensure_class_has_room(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    class_id: i32,
    moving_student: Option<Uuid>,
) -> ActionResult<()> {
    let capacity: Option<(i32,)> = sqlx::query_as(LOCK_CLASS_SQL)
        .bind(class_id)
        .fetch_optional(&mut **tx)
        .await?;
    let (capacity,) =
        capacity.ok_or_else(|| ActionError::NotFound(format!("class {} not found", class_id)))?;

    // A student moving within the same class does not count against it.
    let (enrolled,): (i64,) = match moving_student {
        Some(student_id) => {
            sqlx::query_as("SELECT COUNT(*) FROM students WHERE class_id = $1 AND id <> $2")
                .bind(class_id)
                .bind(student_id)
                .fetch_one(&mut **tx)
                .await?
        }
        None => sqlx::query_as("SELECT COUNT(*) FROM students WHERE class_id = $1")
            .bind(class_id)
            .fetch_one(&mut **tx)
            .await?,
    };

    if enrolled >= capacity as i64 {
        return Err(ActionError::Precondition(format!(
            "class {} is at capacity ({})",
            class_id, capacity
        )));
    }
    Ok(())
}

/// Passwords are only re-hashed when a non-empty value was supplied.
fn rehash_if_present(password: Option<&str>) -> ActionResult<Option<String>> {
    match password {
        Some(p) if !p.trim().is_empty() => Ok(Some(auth::hash_password(p)?)),
        _ => Ok(None),
    }
}

async fn fetch_student(pool: &PgPool, id: Uuid) -> ActionResult<Student> {
    sqlx::query_as("SELECT * FROM student_directory WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ActionError::NotFound(format!("student {} not found", id)))
}

async fn fetch_teacher(pool: &PgPool, id: Uuid) -> ActionResult<Teacher> {
    sqlx::query_as("SELECT * FROM teacher_directory WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ActionError::NotFound(format!("teacher {} not found", id)))
}

async fn fetch_parent(pool: &PgPool, id: Uuid) -> ActionResult<Parent> {
    sqlx::query_as("SELECT * FROM parent_directory WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ActionError::NotFound(format!("parent {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_check_locks_the_class_row() {
        // Without the row lock, two concurrent creates can both count
        // `capacity - 1` students and both enroll.
        assert!(LOCK_CLASS_SQL.ends_with("FOR UPDATE"));
    }

    #[test]
    fn empty_password_is_not_rehashed() {
        assert!(rehash_if_present(None).unwrap().is_none());
        assert!(rehash_if_present(Some("")).unwrap().is_none());
        assert!(rehash_if_present(Some("   ")).unwrap().is_none());
    }

    #[test]
    fn supplied_password_is_rehashed() {
        let hash = rehash_if_present(Some("new-password-123"))
            .unwrap()
            .expect("hash");
        assert!(crate::auth::verify_password("new-password-123", &hash).unwrap());
    }
}
