//! HTTP surface
//!
//! | Method & Path                  | Handler                          |
//! |--------------------------------|----------------------------------|
//! | GET `/health`                  | liveness                         |
//! | GET `/transactions`            | newest-first listing             |
//! | PATCH `/transactions`          | resolve one transaction          |
//! | POST `/transactions`           | resolve many transactions        |
//! | POST `/transactions/reconcile` | match a CSV export (`?apply=`)   |
//! | POST `/transactions/repair`    | re-run missing disbursements     |

pub mod actor;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

pub use actor::{Actor, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use error::{AppError, AppResult};
pub use state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the application router with tracing middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/transactions",
            get(handlers::list_transactions)
                .patch(handlers::resolve_transaction)
                .post(handlers::resolve_many),
        )
        .route("/transactions/reconcile", post(handlers::reconcile))
        .route("/transactions/repair", post(handlers::repair))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
