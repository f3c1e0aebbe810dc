use axum::{Extension, Json};
use serde::Serialize;
use validator::Validate;

use crate::auth::{generate_jwt, Claims};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::models::requests::LoginRequest;
use crate::models::User;

#[derive(Debug, Serialize)]
pub struct LoginPayload {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: uuid::Uuid,
    pub username: String,
    pub role: crate::models::Role,
    pub name: String,
    pub surname: String,
}

/// POST /auth/login
///
/// A bad username and a bad password produce the same 401 so the endpoint
/// does not leak which usernames exist.
pub async fn login(Json(req): Json<LoginRequest>) -> ApiResult<LoginPayload> {
    req.validate()?;

    let pool = DatabaseManager::pool().await?;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("login lookup failed: {}", e);
            ApiError::internal_server_error("An error occurred while processing your request")
        })?;

    let user = match user {
        Some(user) if crate::auth::verify_password(&req.password, &user.password_hash)? => user,
        _ => return Err(ApiError::unauthorized("Invalid username or password")),
    };

    let claims = Claims::new(
        user.id,
        user.username.clone(),
        user.role,
        user.name.clone(),
        user.surname.clone(),
    );
    let token = generate_jwt(&claims)?;

    tracing::info!(username = %user.username, role = ?user.role, "login");
    Ok(ApiResponse::success(LoginPayload {
        token,
        user: SessionUser {
            id: user.id,
            username: user.username,
            role: user.role,
            name: user.name,
            surname: user.surname,
        },
    }))
}

/// GET /api/auth/whoami
pub async fn whoami(Extension(viewer): Extension<Viewer>) -> ApiResult<SessionUser> {
    Ok(ApiResponse::success(SessionUser {
        id: viewer.id,
        username: viewer.username,
        role: viewer.role,
        name: viewer.name,
        surname: viewer.surname,
    }))
}
