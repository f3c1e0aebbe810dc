//! Events, announcements and messaging.
//!
//! Event and announcement updates can clear `class_id` (double-Option in
//! the payload), so they re-read the current row and write concrete values
//! instead of COALESCE-ing.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::requests::*;
use crate::models::{Announcement, Event, Message};

use super::{ActionError, ActionResult};

pub async fn create_event(pool: &PgPool, req: CreateEventRequest) -> ActionResult<Event> {
    if req.start_time >= req.end_time {
        return Err(ActionError::Validation(
            "event must start before it ends".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    if let Some(class_id) = req.class_id {
        ensure_class_exists(&mut tx, class_id).await?;
    }

    let event: Event = sqlx::query_as(
        "INSERT INTO events (title, description, start_time, end_time, class_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(req.class_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(event)
}

pub async fn update_event(pool: &PgPool, id: i32, req: UpdateEventRequest) -> ActionResult<Event> {
    let mut tx = pool.begin().await?;

    let current: Option<Event> = sqlx::query_as("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let current = current.ok_or_else(|| ActionError::NotFound(format!("event {} not found", id)))?;

    let start = req.start_time.unwrap_or(current.start_time);
    let end = req.end_time.unwrap_or(current.end_time);
    if start >= end {
        return Err(ActionError::Validation(
            "event must start before it ends".to_string(),
        ));
    }

    // Some(None) clears the class and makes the event school-wide.
    let class_id = match req.class_id {
        Some(new) => new,
        None => current.class_id,
    };
    if let Some(class_id) = class_id {
        ensure_class_exists(&mut tx, class_id).await?;
    }

    let event: Event = sqlx::query_as(
        "UPDATE events SET title = $2, description = $3, start_time = $4, end_time = $5, \
         class_id = $6 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.title.unwrap_or(current.title))
    .bind(req.description.unwrap_or(current.description))
    .bind(start)
    .bind(end)
    .bind(class_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(event)
}

pub async fn delete_event(pool: &PgPool, id: i32) -> ActionResult<()> {
    let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(ActionError::NotFound(format!("event {} not found", id)));
    }
    Ok(())
}

pub async fn create_announcement(
    pool: &PgPool,
    req: CreateAnnouncementRequest,
) -> ActionResult<Announcement> {
    let mut tx = pool.begin().await?;
    if let Some(class_id) = req.class_id {
        ensure_class_exists(&mut tx, class_id).await?;
    }

    let announcement: Announcement = sqlx::query_as(
        "INSERT INTO announcements (title, description, date, class_id) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.date)
    .bind(req.class_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(announcement)
}

pub async fn update_announcement(
    pool: &PgPool,
    id: i32,
    req: UpdateAnnouncementRequest,
) -> ActionResult<Announcement> {
    let mut tx = pool.begin().await?;

    let current: Option<Announcement> =
        sqlx::query_as("SELECT * FROM announcements WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let current =
        current.ok_or_else(|| ActionError::NotFound(format!("announcement {} not found", id)))?;

    let class_id = match req.class_id {
        Some(new) => new,
        None => current.class_id,
    };
    if let Some(class_id) = class_id {
        ensure_class_exists(&mut tx, class_id).await?;
    }

    let announcement: Announcement = sqlx::query_as(
        "UPDATE announcements SET title = $2, description = $3, date = $4, class_id = $5 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.title.unwrap_or(current.title))
    .bind(req.description.unwrap_or(current.description))
    .bind(req.date.unwrap_or(current.date))
    .bind(class_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(announcement)
}

pub async fn delete_announcement(pool: &PgPool, id: i32) -> ActionResult<()> {
    let deleted = sqlx::query("DELETE FROM announcements WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(ActionError::NotFound(format!(
            "announcement {} not found",
            id
        )));
    }
    Ok(())
}

/// The message row and all recipient links are written in one transaction;
/// a bad recipient id rolls the whole send back.
pub async fn create_message(
    pool: &PgPool,
    sender_id: Uuid,
    req: CreateMessageRequest,
) -> ActionResult<Message> {
    let mut tx = pool.begin().await?;

    let message: Message = sqlx::query_as(
        "INSERT INTO messages (sender_id, subject, body) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(sender_id)
    .bind(&req.subject)
    .bind(&req.body)
    .fetch_one(&mut *tx)
    .await?;

    for recipient_id in &req.recipient_ids {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(recipient_id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Err(ActionError::NotFound(format!(
                "recipient {} not found",
                recipient_id
            )));
        }
        sqlx::query(
            "INSERT INTO message_recipients (message_id, recipient_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(message.id)
        .bind(recipient_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(message)
}

/// Marking an already-read message again is a no-op, not an error.
pub async fn mark_message_read(
    pool: &PgPool,
    message_id: i32,
    recipient_id: Uuid,
) -> ActionResult<()> {
    let link: Option<(Option<chrono::DateTime<Utc>>,)> = sqlx::query_as(
        "SELECT read_at FROM message_recipients WHERE message_id = $1 AND recipient_id = $2",
    )
    .bind(message_id)
    .bind(recipient_id)
    .fetch_optional(pool)
    .await?;
    if link.is_none() {
        return Err(ActionError::NotFound(format!(
            "message {} not found",
            message_id
        )));
    }

    sqlx::query(
        "UPDATE message_recipients SET read_at = now() \
         WHERE message_id = $1 AND recipient_id = $2 AND read_at IS NULL",
    )
    .bind(message_id)
    .bind(recipient_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Senders can retract their own messages; admins can delete any.
pub async fn delete_message(
    pool: &PgPool,
    id: i32,
    restrict_sender: Option<Uuid>,
) -> ActionResult<()> {
    let mut tx = pool.begin().await?;

    let current: Option<(Uuid,)> = sqlx::query_as("SELECT sender_id FROM messages WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let (sender_id,) =
        current.ok_or_else(|| ActionError::NotFound(format!("message {} not found", id)))?;
    if let Some(actor) = restrict_sender {
        if sender_id != actor {
            return Err(ActionError::Forbidden(
                "only the sender can delete a message".to_string(),
            ));
        }
    }

    sqlx::query("DELETE FROM message_recipients WHERE message_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

async fn ensure_class_exists(tx: &mut Transaction<'_, Postgres>, id: i32) -> ActionResult<()> {
    let found: Option<(i32,)> = sqlx::query_as("SELECT id FROM classes WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    if found.is_none() {
        return Err(ActionError::NotFound(format!("class {} not found", id)));
    }
    Ok(())
}
