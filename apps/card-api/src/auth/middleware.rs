//! Bearer-token extraction for REST handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::auth::roles::{self, STAFF};
use crate::auth::tokens::Claims;
use crate::AppState;

/// Authenticated caller extracted from the `Authorization: Bearer <token>`
/// header. Missing or unverifiable tokens are rejected here — unlike the
/// chat handshake, REST never degrades to Guest.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

/// Rejection returned when the bearer token is missing or invalid.
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let code = match self.status {
            StatusCode::FORBIDDEN => "FORBIDDEN",
            _ => "UNAUTHORIZED",
        };
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": self.message
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthRejection {
                status: StatusCode::UNAUTHORIZED,
                message: "Missing Authorization header",
            })?;

        let token = header.strip_prefix("Bearer ").ok_or(AuthRejection {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid Authorization header format",
        })?;

        let claims = state.codec.verify(token).map_err(|_| AuthRejection {
            status: StatusCode::FORBIDDEN,
            message: "Invalid or expired token",
        })?;

        Ok(AuthUser(claims))
    }
}

/// Authenticated caller holding a staff role (admin or moderator).
/// Mutation-guarded routes take this instead of `AuthUser`.
#[derive(Debug, Clone)]
pub struct Staff(pub Claims);

impl FromRequestParts<AppState> for Staff {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        if !roles::authorize(Some(&claims), STAFF) {
            return Err(AuthRejection {
                status: StatusCode::FORBIDDEN,
                message: "This action requires a staff role",
            });
        }

        Ok(Staff(claims))
    }
}
