//! Actor extraction
//!
//! Identity is verified upstream by the identity provider, which forwards
//! the authenticated actor in `x-actor-id` and a coarse role in
//! `x-actor-role`. This module only trusts and checks those headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::AppError;
use super::state::AppState;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Authenticated caller of an engine endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: String,
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("missing actor identity".into()))?;
        let role = header_value(parts, ACTOR_ROLE_HEADER).unwrap_or_default();

        if !state.role_allowed(&role) {
            tracing::warn!(actor_id = %id, role = %role, "actor role not permitted");
            return Err(AppError::Forbidden(format!("role '{}' may not resolve transactions", role)));
        }

        Ok(Actor { id, role })
    }
}
