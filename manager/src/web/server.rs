// File: manager/src/web/server.rs
use crate::config::Config;
use crate::scheduler::MaintenanceScheduler;
use crate::web::{handlers, AppState};
use anyhow::Result;
use axum::{
    routing::{get, patch},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn start_web_server<F>(
    config: Arc<Config>,
    scheduler: Arc<MaintenanceScheduler>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(config.clone(), scheduler);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // === MAINTENANCE WINDOW ROUTES ===
        .route(
            "/api/maintenance/v1",
            get(handlers::list_windows).post(handlers::create_window),
        )
        .route(
            "/api/maintenance/v1/{mw_id}",
            get(handlers::get_window)
                .patch(handlers::update_window)
                .delete(handlers::remove_window),
        )
        .route(
            "/api/maintenance/v1/{mw_id}/end",
            patch(handlers::end_window),
        )
        .route(
            "/api/maintenance/v1/{mw_id}/extend",
            patch(handlers::extend_window),
        )
        // === DEVICE STATUS ROUTES ===
        .route(
            "/api/maintenance/v1/status",
            get(handlers::get_maintenance_counts),
        )
        .route(
            "/api/maintenance/v1/status/{kind}/{device_id}",
            get(handlers::get_device_status),
        )
        // Add middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
