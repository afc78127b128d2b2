use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use controller::MapConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    map_config: Arc<MapConfig>,
}

#[derive(Debug, Clone, PartialEq)]
struct ServerConfig {
    root: PathBuf,
    data_dir: PathBuf,
    addr: SocketAddr,
}

impl ServerConfig {
    fn from_lookup<F>(get: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = PathBuf::from(
            get("AUDIOMNIA_ROOT").unwrap_or_else(|| "crates/apps/web/assets".to_string()),
        );
        let data_dir = get("AUDIOMNIA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join("data"));
        let addr = get("AUDIOMNIA_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let addr = addr
            .parse()
            .map_err(|e| format!("invalid AUDIOMNIA_ADDR {addr:?}: {e}"))?;
        Ok(Self {
            root,
            data_dir,
            addr,
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = real_main().await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<(), String> {
    let lookup = |key: &str| env::var(key).ok();
    let config = ServerConfig::from_lookup(lookup)?;
    let map_config = MapConfig::default()
        .with_env_overrides(lookup)
        .map_err(|e| e.to_string())?;

    if tokio::fs::metadata(config.data_dir.join("macaulaylibrary.geojson.gz"))
        .await
        .is_err()
    {
        warn!("no dataset found under {}", config.data_dir.display());
    }

    let state = AppState {
        map_config: Arc::new(map_config),
    };
    let app = app(&config, state);

    info!(
        root = %config.root.display(),
        "audiomnia server listening on http://{}",
        config.addr
    );
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| format!("bind {}: {e}", config.addr))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("server error: {e}"))
}

fn app(config: &ServerConfig, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/config.json", get(get_config))
        .nest_service("/data", ServeDir::new(&config.data_dir))
        .fallback_service(ServeDir::new(&config.root))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn get_config(State(state): State<AppState>) -> Response {
    Json(state.map_config.as_ref().clone()).into_response()
}
