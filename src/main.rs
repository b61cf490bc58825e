use anyhow::Context;
use axum::http::HeaderValue;
use axum::Router;
use checkout_api::config::{init_tracing, load_config, AppConfig};
use checkout_api::db::{establish_connection_from_app_config, run_migrations, Db};
use checkout_api::events::{process_events, EventSender};
use checkout_api::{api_v1_routes, health, openapi, request_id, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(load_config().context("failed to load configuration")?);
    init_tracing(config.log_level(), config.log_json);

    info!(
        environment = %config.environment,
        "starting checkout-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pool = establish_connection_from_app_config(&config)
        .await
        .context("failed to connect to the database")?;

    if config.auto_migrate {
        info!("running pending migrations");
        run_migrations(&pool).await.context("migrations failed")?;
    }

    let db = Db::new(Arc::new(pool));

    let (tx, rx) = mpsc::channel(config.event_channel_capacity);
    let event_sender = Arc::new(EventSender::new(tx));
    tokio::spawn(process_events(rx));

    let state = AppState::new(db, config.clone(), event_sender);

    let app = Router::new()
        .merge(health::health_routes())
        .merge(openapi::swagger_ui())
        .nest("/api/v1", api_v1_routes())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors(&config))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

fn build_cors(config: &AppConfig) -> CorsLayer {
    if config.should_allow_permissive_cors() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        warn!("no valid CORS origins configured; cross-origin requests will be rejected");
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to install ctrl-c handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => warn!("failed to install SIGTERM handler: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
