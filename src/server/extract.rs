//! Acting user resolution
//!
//! Authentication happens upstream; requests arrive with the authenticated
//! user id in the `x-user-id` header.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::app::AppState;
use super::error::ApiError;
use crate::services::{AccessService, Actor};

pub const USER_HEADER: &str = "x-user-id";

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(*actor);
        }

        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.trim().parse::<i32>().ok())
            .ok_or_else(|| ApiError::unauthorized(format!("Missing or invalid {} header", USER_HEADER)))?;

        let actor = AccessService::new(state.db.clone())
            .resolve_actor(user_id)
            .await?
            .ok_or_else(|| {
                warn!("Rejected request from unknown or inactive user {}", user_id);
                ApiError::unauthorized("Unknown or inactive user")
            })?;

        parts.extensions.insert(actor);
        Ok(actor)
    }
}

/// Staff gate for administrative handlers
pub fn require_staff(actor: &Actor) -> Result<(), ApiError> {
    if actor.is_staff() {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}
