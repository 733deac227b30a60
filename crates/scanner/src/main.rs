use std::sync::Arc;

use color_eyre::eyre;
use structopt::StructOpt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use scanner::logger::init_tracing;
use scanner::server::{self, AppState, KEEPALIVE_INTERVAL};
use scanner::{
    AlertSink, HistoryStore, JsonlHistory, Notifier, Opt, Scanner, Settings, TelegramNotifier,
    TransferChecker,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // init error reporting
    color_eyre::install()?;

    // .env는 있으면 읽고 없으면 무시
    dotenv::dotenv().ok();

    let settings = Settings::from_opt(Opt::from_args())?;

    // init logging
    let _guards = init_tracing(settings.log_dir.as_deref())?;

    info!("스캐너 시작 중...");
    info!(
        "거래소: {:?}, 알림 구간: {}% ~ {}%",
        settings.exchanges, settings.band.low, settings.band.high
    );

    let history: Arc<dyn HistoryStore> = Arc::new(JsonlHistory::open(&settings.history_path).await?);

    let notifier: Option<Arc<dyn Notifier>> = match &settings.telegram_token {
        Some(token) => {
            if settings.recipients.is_empty() {
                warn!("텔레그램 토큰은 있지만 수신자가 없음");
            }
            Some(Arc::new(TelegramNotifier::new(
                token.clone(),
                settings.scanner.timeout,
            )) as Arc<dyn Notifier>)
        }
        None => {
            info!("텔레그램 토큰 없음: 알림은 로그로만 출력");
            None
        }
    };

    let (spot_exchanges, status_exchanges) = settings.build_exchanges();
    let transfer = TransferChecker::new(status_exchanges, settings.scanner.timeout);
    let sink = AlertSink::new(notifier, settings.recipients.clone(), history, settings.band)
        .with_timeout(settings.scanner.timeout);
    let scanner = Scanner::new(spot_exchanges, transfer, sink, settings.scanner);

    let cancel = CancellationToken::new();

    // Ctrl-C -> 종료 요청
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("종료 신호 수신"),
                Err(e) => warn!("failed to listen for ctrl-c: {}", e),
            }
            cancel.cancel();
        });
    }

    // start HTTP server
    let state = Arc::new(AppState::new(scanner.coins(), scanner.stats()));
    let server_handle = {
        let cancel = cancel.clone();
        let port = settings.port;
        tokio::spawn(async move {
            if let Err(e) = server::serve(state, port, cancel).await {
                warn!("health server stopped: {}", e);
            }
        })
    };

    if let Some(url) = settings.keepalive_url.clone() {
        tokio::spawn(server::run_keepalive(url, KEEPALIVE_INTERVAL, cancel.clone()));
    }

    let result = scanner.run(cancel.clone()).await;
    cancel.cancel();
    server_handle.await.ok();

    if let Err(e) = result {
        error!("스캐너 종료: {}", e);
        return Err(e.into());
    }

    info!("스캐너 정상 종료");
    Ok(())
}
