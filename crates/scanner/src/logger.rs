use std::{fs::OpenOptions, path::Path};

use chrono::Local;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_PREFIX: &str = "scanner";

/// Tracing guards를 보관하는 구조체
/// 이 구조체가 drop되기 전까지 로깅이 계속 작동합니다
pub struct TracingGuards {
    _file: Option<WorkerGuard>,
    _stdout: WorkerGuard,
}

/// Tracing 초기화
/// stdout 로깅은 항상, log_dir가 있으면 날짜별 파일 로깅도 설정합니다
pub fn init_tracing(log_dir: Option<&Path>) -> eyre::Result<TracingGuards> {
    // 1) 파일 appender (선택)
    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = daily_file_appender(dir, LOG_PREFIX)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("info"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // 2) stdout도 non-blocking
    let (stdout_writer, stdout_guard) = non_blocking(std::io::stdout());

    // 3) EnvFilter: RUST_LOG가 없으면 info
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // 4) 레이어 조립
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(stdout_writer).with_ansi(true))
        .try_init()?;

    Ok(TracingGuards {
        _file: file_guard,
        _stdout: stdout_guard,
    })
}

/// 날짜별 로그 파일 생성
/// `<dir>/scanner.2025-11-29.log` 형식
fn daily_file_appender(dir: &Path, prefix: &str) -> eyre::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;

    let date = Local::now().format("%Y-%m-%d");
    let path = dir.join(format!("{prefix}.{date}.log"));

    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    Ok(non_blocking(file))
}
