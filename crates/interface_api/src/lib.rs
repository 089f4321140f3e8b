//! HTTP API Layer
//!
//! REST surface for the timesheet ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per resource, each a thin call into [`LedgerService`]
//! - **Middleware**: bearer authentication producing a `Session`, request logging
//! - **DTOs**: validated request bodies and query parameters
//! - **Error Handling**: ledger errors mapped to status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(service, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use domain_ledger::LedgerService;

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, request_log_middleware};
use crate::handlers::{audit, clients, employees, health, rates, reports, timesheets, users};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(service: LedgerService, config: ApiConfig) -> Self {
        Self {
            service: Arc::new(service),
            config,
        }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let timesheet_routes = Router::new()
        .route("/", get(timesheets::list_timesheets).post(timesheets::create_timesheet))
        .route("/valuate", post(rates::valuate_entry))
        .route("/balance", get(timesheets::balance))
        .route("/import", post(timesheets::import_timesheets))
        .route("/import/csv", post(timesheets::import_timesheets_csv))
        .route("/:id", put(timesheets::update_timesheet).delete(timesheets::delete_timesheet));

    let employee_routes = Router::new()
        .route("/", get(employees::list_employees).post(employees::create_employee))
        .route(
            "/:id",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        )
        .route("/:id/rate", get(rates::resolve_rate))
        .route("/:id/rate-history", get(employees::rate_history));

    let client_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route("/import", post(clients::import_clients))
        .route(
            "/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/:id/timesheets", get(timesheets::client_timesheets));

    let report_routes = Router::new()
        .route("/clients", get(reports::all_client_reports))
        .route("/clients/:id", get(reports::client_report))
        .route("/employees", get(reports::all_employee_reports))
        .route("/employees/:id", get(reports::employee_report));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/:username", put(users::update_user).delete(users::delete_user));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/timesheets", timesheet_routes)
        .nest("/employees", employee_routes)
        .nest("/clients", client_routes)
        .nest("/reports", report_routes)
        .nest("/users", user_routes)
        .route("/audit-log", get(audit::audit_log))
        .layer(axum_middleware::from_fn(request_log_middleware))
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
