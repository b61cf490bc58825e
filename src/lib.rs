//! Checkout API: an inventory-backed payment lifecycle service.
//!
//! Products carry a stock counter; payments reserve one unit at creation
//! (idempotently, keyed by a client-chosen idempotency key), walk a fixed
//! status state machine, and release their unit back when cancelled. All
//! stock and status mutations run inside coordinated database transactions
//! so concurrent checkouts never oversell.

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod migrator;
pub mod openapi;
pub mod request_id;
pub mod services;

use crate::config::AppConfig;
use crate::db::Db;
use crate::events::EventSender;
use crate::handlers::AppServices;
use crate::request_id::current_request_id;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Shared application state threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Db, config: Arc<AppConfig>, event_sender: Arc<EventSender>) -> Self {
        let services = AppServices::new(db.clone(), event_sender.clone());
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

/// Standard success envelope for every JSON endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
    /// Echo of the request's `x-request-id`, when one was in scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: ResponseMeta {
                timestamp: Utc::now(),
                request_id: current_request_id().map(|id| id.0),
            },
        }
    }
}

/// Paged collection wrapper used by list endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Versioned API router; mounted under `/api/v1` alongside the root-level
/// health routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", handlers::products::product_routes())
        .nest("/payments", handlers::payments::payment_routes())
}
