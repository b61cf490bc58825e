#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use checkout_api::config::AppConfig;
use checkout_api::db::{establish_connection_with_config, run_migrations, Db, DbConfig};
use checkout_api::events::{process_events, EventSender};
use checkout_api::handlers::AppServices;
use checkout_api::{api_v1_routes, health, request_id, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// An in-process application instance backed by a throwaway SQLite database.
///
/// Each instance gets its own database file, so tests never share state. The
/// pool is capped at a single connection, which makes SQLite's whole-database
/// write lock behave like the row locks the service takes on Postgres.
pub struct TestApp {
    pub db: Db,
    pub services: AppServices,
    pub router: Router,
    db_path: std::path::PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_path = std::env::temp_dir().join(format!("checkout-api-test-{}.db", Uuid::new_v4()));
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let db_config = DbConfig {
            url: database_url,
            max_connections: 1,
            min_connections: 1,
            ..DbConfig::default()
        };

        let pool = establish_connection_with_config(&db_config)
            .await
            .expect("failed to open test database");
        run_migrations(&pool).await.expect("migrations failed");

        let db = Db::new(Arc::new(pool));

        let (tx, rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(tx));
        tokio::spawn(process_events(rx));

        // The router reads the pool from AppState; the config URL is unused.
        let config = Arc::new(AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        ));

        let state = AppState::new(db.clone(), config, event_sender);

        let router = Router::new()
            .merge(health::health_routes())
            .nest("/api/v1", api_v1_routes())
            .layer(axum::middleware::from_fn(
                request_id::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            db,
            services: state.services,
            router,
            db_path,
        }
    }

    /// Send a JSON request through the router and return (status, parsed body).
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                builder
                    .body(Body::from(json.to_string()))
                    .expect("failed to build request")
            }
            None => builder.body(Body::empty()).expect("failed to build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body was not JSON")
        };

        (status, json)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}
