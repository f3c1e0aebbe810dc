//! Mutation payloads. Field-level validation runs before any action touches
//! the database; updates are partial (absent field = leave unchanged, and a
//! password is only re-hashed when a non-empty value is supplied).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use super::{Day, Sex};

/// Distinguishes an absent field (leave unchanged) from an explicit `null`
/// (clear the value). A plain `Option<Option<T>>` derive folds both into
/// `None`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub surname: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(min = 1))]
    pub blood_type: String,
    pub sex: Sex,
    pub birthday: NaiveDate,
    pub grade_id: i32,
    pub class_id: i32,
    pub parent_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    /// Empty string is treated the same as absent: the hash is kept.
    pub password: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub sex: Option<Sex>,
    pub birthday: Option<NaiveDate>,
    pub grade_id: Option<i32>,
    pub class_id: Option<i32>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeacherRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub surname: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(min = 1))]
    pub blood_type: String,
    pub sex: Sex,
    pub birthday: NaiveDate,
    /// Subjects taught; rows go to the subject_teachers join table.
    #[serde(default)]
    pub subject_ids: Vec<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeacherRequest {
    pub password: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub sex: Option<Sex>,
    pub birthday: Option<NaiveDate>,
    pub subject_ids: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateParentRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub surname: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateParentRequest {
    pub password: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGradeRequest {
    #[validate(range(min = 1, max = 12))]
    pub level: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 1))]
    pub capacity: i32,
    pub grade_id: i32,
    pub supervisor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClassRequest {
    pub name: Option<String>,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    pub grade_id: Option<i32>,
    /// `null` clears the supervisor and leaves the class unsupervised.
    #[serde(default, deserialize_with = "double_option")]
    pub supervisor_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub teacher_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubjectRequest {
    pub name: Option<String>,
    pub teacher_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLessonRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: i32,
    pub class_id: i32,
    pub teacher_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLessonRequest {
    pub name: Option<String>,
    pub day: Option<Day>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub subject_id: Option<i32>,
    pub class_id: Option<i32>,
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1))]
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub lesson_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub lesson_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssignmentRequest {
    #[validate(length(min = 1))]
    pub title: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub lesson_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub lesson_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateResultRequest {
    #[validate(range(min = 0, max = 100))]
    pub score: i32,
    pub student_id: Uuid,
    pub exam_id: Option<i32>,
    pub assignment_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateResultRequest {
    #[validate(range(min = 0, max = 100))]
    pub score: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAttendanceRequest {
    pub date: NaiveDate,
    pub present: bool,
    pub student_id: Uuid,
    pub lesson_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAttendanceRequest {
    pub date: Option<NaiveDate>,
    pub present: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1))]
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub class_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// `null` clears the class and makes the event school-wide.
    #[serde(default, deserialize_with = "double_option")]
    pub class_id: Option<Option<i32>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnnouncementRequest {
    #[validate(length(min = 1))]
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub class_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    /// `null` clears the class and makes the announcement school-wide.
    #[serde(default, deserialize_with = "double_option")]
    pub class_id: Option<Option<i32>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMessageRequest {
    #[validate(length(min = 1))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub body: String,
    #[validate(length(min = 1, message = "at least one recipient is required"))]
    pub recipient_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub student_id: Uuid,
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    #[validate(length(min = 1))]
    pub payment_type: String,
    pub method: Option<String>,
    pub due_date: NaiveDate,
    pub gateway_order_id: Option<String>,
}

fn validate_amount(amount: &Decimal) -> Result<(), validator::ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(validator::ValidationError::new("amount_not_positive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_supervisor_leaves_it_unchanged() {
        let req: UpdateClassRequest = serde_json::from_value(serde_json::json!({
            "name": "5B"
        }))
        .unwrap();
        assert_eq!(req.supervisor_id, None);
    }

    #[test]
    fn null_supervisor_clears_the_assignment() {
        let req: UpdateClassRequest = serde_json::from_value(serde_json::json!({
            "supervisor_id": null
        }))
        .unwrap();
        assert_eq!(req.supervisor_id, Some(None));
    }

    #[test]
    fn supplied_supervisor_comes_through() {
        let teacher = Uuid::new_v4();
        let req: UpdateClassRequest = serde_json::from_value(serde_json::json!({
            "supervisor_id": teacher
        }))
        .unwrap();
        assert_eq!(req.supervisor_id, Some(Some(teacher)));
    }

    #[test]
    fn null_event_class_means_school_wide() {
        let absent: UpdateEventRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(absent.class_id, None);

        let cleared: UpdateEventRequest =
            serde_json::from_value(serde_json::json!({ "class_id": null })).unwrap();
        assert_eq!(cleared.class_id, Some(None));

        let pinned: UpdateEventRequest =
            serde_json::from_value(serde_json::json!({ "class_id": 3 })).unwrap();
        assert_eq!(pinned.class_id, Some(Some(3)));
    }
}
