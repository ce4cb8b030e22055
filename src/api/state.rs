use std::sync::Arc;

use crate::core::LoyaltyEngine;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; the engine holds its store behind an `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    pub engine: LoyaltyEngine,
    /// Roles (lowercase) permitted to call the engine endpoints.
    pub allowed_roles: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(engine: LoyaltyEngine, allowed_roles: Vec<String>) -> Self {
        let allowed_roles = allowed_roles
            .into_iter()
            .map(|role| role.trim().to_lowercase())
            .filter(|role| !role.is_empty())
            .collect();
        Self {
            engine,
            allowed_roles: Arc::new(allowed_roles),
        }
    }

    pub fn role_allowed(&self, role: &str) -> bool {
        let role = role.trim().to_lowercase();
        self.allowed_roles.iter().any(|allowed| *allowed == role)
    }
}
