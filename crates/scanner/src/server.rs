use std::{net::SocketAddr, sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use interface::CoinSymbolMap;

use crate::scheduler::ScanStats;

/// keep-alive 요청 주기
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(600);

/// 헬스체크 서버 상태. 스캐너와는 카운터와 코인 맵만 공유한다
#[derive(Clone)]
pub struct AppState {
    pub coins: Arc<ArcSwap<CoinSymbolMap>>,
    pub stats: Arc<ScanStats>,
}

impl AppState {
    pub fn new(coins: Arc<ArcSwap<CoinSymbolMap>>, stats: Arc<ScanStats>) -> Self {
        Self { coins, stats }
    }
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "message": "spread scanner is running",
    }))
}

async fn ping_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "pong" }))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = &state.stats;
    Json(serde_json::json!({
        "status": "ok",
        "sweeps": stats.sweeps(),
        "spreads": stats.spreads(),
        "alerts": stats.alerts(),
        "last_sweep_at": stats.last_sweep_at(),
        "coins": state.coins.load().len(),
    }))
}

async fn coins_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let coins = CoinSymbolMap::clone(&state.coins.load());
    Json(coins)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .route("/coins", get(coins_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 취소되면 진행 중인 요청을 마치고 종료
pub async fn serve(state: Arc<AppState>, port: u16, cancel: CancellationToken) -> eyre::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

/// 주기적으로 url에 GET 요청을 보내 호스팅 환경에서 프로세스가 잠들지 않게 한다
pub async fn run_keepalive(url: String, interval: Duration, cancel: CancellationToken) {
    let http = reqwest::Client::new();
    info!("keep-alive 시작: {} ({}초 간격)", url, interval.as_secs());

    loop {
        tokio::select! {
            _ = sleep(interval) => {}
            _ = cancel.cancelled() => break,
        }

        match http
            .get(&url)
            .timeout(exchanges::DEFAULT_TIMEOUT)
            .send()
            .await
            .and_then(|res| res.error_for_status())
        {
            Ok(res) => info!("keep-alive ping 성공: {}", res.status()),
            Err(e) => warn!("keep-alive ping 실패: {}", e),
        }
    }
}
