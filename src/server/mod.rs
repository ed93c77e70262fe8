//! HTTP surface of the race service.

mod error;
mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::orchestration::RaceService;
use crate::{rlog, Result};

pub use error::{ApiError, ApiResult};
pub use handlers::{
    ConfigResponse, StartBody, StartResponse, SubmitBody, SubmitResponse,
};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: RaceService,
}

impl AppState {
    pub fn new(service: RaceService) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/config", get(handlers::get_config))
        .route("/api/race/start", post(handlers::start_race))
        .route("/api/race/status", get(handlers::race_status))
        .route("/api/race/submit", post(handlers::submit_answer))
        .route("/api/race/reset", post(handlers::reset_race))
        .route("/health", get(handlers::health_check))
        .with_state(state)
}

/// Serve on `host:port` until Ctrl+C or SIGTERM. Any active race is reset
/// on the way out so its agent processes stop.
pub async fn serve(host: &str, port: u16, service: RaceService) -> Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    rlog!("Listening on http://{}", addr);
    println!("aoc-race listening on http://{addr}");

    let app = router(AppState::new(service.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.reset_race();
    rlog!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => rlog!("Received Ctrl+C"),
        _ = terminate => rlog!("Received SIGTERM"),
    }
}
