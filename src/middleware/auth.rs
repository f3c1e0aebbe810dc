use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use uuid::Uuid;

use crate::auth::{decode_jwt, Claims};
use crate::error::ApiError;
use crate::models::Role;

/// Authenticated caller extracted from the session token.
///
/// This is the single role-resolution point for the whole API: a request
/// without a decodable token and role is rejected here with 401. There is
/// deliberately no default role.
#[derive(Clone, Debug)]
pub struct Viewer {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub name: String,
    pub surname: String,
}

impl Viewer {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin role required"))
        }
    }

    pub fn require_staff(&self) -> Result<(), ApiError> {
        match self.role {
            Role::Admin | Role::Teacher => Ok(()),
            _ => Err(ApiError::forbidden("Admin or teacher role required")),
        }
    }
}

impl From<Claims> for Viewer {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
            name: claims.name,
            surname: claims.surname,
        }
    }
}

/// Session middleware guarding `/api/*`: validates the bearer token and
/// injects the [`Viewer`] into request extensions.
pub async fn session_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    let token = extract_token_from_headers(&headers).map_err(reject)?;
    let claims = decode_jwt(&token)
        .map_err(|e| reject(e.to_string()))?;

    let viewer = Viewer::from(claims);
    request.extensions_mut().insert(viewer);

    Ok(next.run(request).await)
}

fn reject(msg: String) -> (StatusCode, Json<serde_json::Value>) {
    let api_error = ApiError::unauthorized(msg);
    (
        StatusCode::from_u16(api_error.status_code()).unwrap_or(StatusCode::UNAUTHORIZED),
        Json(api_error.to_json()),
    )
}

fn extract_token_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty session token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
