//! HTTP API Layer
//!
//! REST API for the distributor ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one per ledger operation, scoped to a distributor
//! - **Middleware**: bearer authentication, tracing, audit logging
//! - **DTOs**: validated request bodies and response envelopes
//! - **Error Handling**: `LedgerError` mapped onto consistent JSON errors
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(service, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_ledger::LedgerService;

use crate::config::ApiConfig;
use crate::handlers::{health, ledger};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: LedgerService,
    pub config: ApiConfig,
}

/// Creates the main API router
pub fn create_router(service: LedgerService, config: ApiConfig) -> Router {
    let state = AppState { service, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let ledger_routes = Router::new()
        .route("/", get(ledger::list_entries))
        .route("/stream", get(ledger::stream_entries))
        .route("/summary", get(ledger::summary))
        .route("/debits", post(ledger::register_debit))
        .route("/debits/:entry_id/pay", post(ledger::pay_debit))
        .route("/payments", post(ledger::register_payment))
        .route("/reverts/check", post(ledger::check_revert))
        .route("/reverts", post(ledger::revert));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/distributors/:distributor_id/ledger", ledger_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
