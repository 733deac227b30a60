use std::path::PathBuf;
use std::{sync::Arc, time::Duration};

use structopt::StructOpt;
use thiserror::Error;
use tracing::info;

use exchanges::{AssetStatusExchange, BybitClient, GateClient, MexcClient, OkxClient, SpotExchange};
use interface::ExchangeId;

use crate::alert::AlertBand;
use crate::scheduler::ScannerOptions;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("interval must be greater than zero")]
    ZeroInterval,
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid alert band: low={low}, high={high}")]
    InvalidBand { low: f64, high: f64 },
    #[error("at least two distinct exchanges are required, got {0}")]
    NotEnoughExchanges(usize),
    #[error("MEXC API key and secret must be set together")]
    IncompleteMexcCredentials,
}

/// CLI 인자 (환경변수로도 지정 가능)
#[derive(StructOpt)]
#[structopt(name = "scanner", about = "거래소 간 현물 스프레드 스캐너")]
pub struct Opt {
    /// 감시할 거래소 (쉼표 구분)
    #[structopt(
        long,
        env = "SCANNER_EXCHANGES",
        default_value = "mexc,gate,bybit,okx",
        use_delimiter = true
    )]
    pub exchanges: Vec<ExchangeId>,

    /// 스윕 사이 대기 시간(초)
    #[structopt(long, env = "SCANNER_INTERVAL_SECS", default_value = "10")]
    pub interval_secs: u64,

    /// 거래소 요청 타임아웃(초)
    #[structopt(long, env = "SCANNER_TIMEOUT_SECS", default_value = "10")]
    pub timeout_secs: u64,

    /// 알림 하한(%)
    #[structopt(long, env = "SCANNER_THRESHOLD_LOW", default_value = "3.0")]
    pub threshold_low: f64,

    /// 알림 상한(%)
    #[structopt(long, env = "SCANNER_THRESHOLD_HIGH", default_value = "20.0")]
    pub threshold_high: f64,

    /// N번 스윕마다 심볼 재정합 (0이면 안 함)
    #[structopt(long, env = "SCANNER_REFRESH_SWEEPS", default_value = "0")]
    pub refresh_sweeps: u64,

    #[structopt(
        long,
        env = "SCANNER_HISTORY_PATH",
        default_value = "price_history.jsonl",
        parse(from_os_str)
    )]
    pub history_path: PathBuf,

    /// 헬스체크 서버 포트
    #[structopt(long, env = "SCANNER_PORT", default_value = "8000")]
    pub port: u16,

    /// 로그 파일 디렉터리 (없으면 stdout만)
    #[structopt(long, env = "SCANNER_LOG_DIR", parse(from_os_str))]
    pub log_dir: Option<PathBuf>,

    /// 10분마다 GET 요청을 보낼 주소
    #[structopt(long, env = "SCANNER_KEEPALIVE_URL")]
    pub keepalive_url: Option<String>,

    #[structopt(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// 알림 받을 chat id (쉼표 구분)
    #[structopt(long, env = "TELEGRAM_CHAT_IDS", use_delimiter = true)]
    pub recipients: Vec<String>,

    #[structopt(long, env = "MEXC_API_KEY", hide_env_values = true)]
    pub mexc_api_key: Option<String>,

    #[structopt(long, env = "MEXC_API_SECRET", hide_env_values = true)]
    pub mexc_api_secret: Option<String>,
}

/// 검증이 끝난 실행 설정. 시작 후에는 바뀌지 않는다
#[derive(Clone)]
pub struct Settings {
    pub exchanges: Vec<ExchangeId>,
    pub scanner: ScannerOptions,
    pub band: AlertBand,
    pub history_path: PathBuf,
    pub port: u16,
    pub log_dir: Option<PathBuf>,
    pub keepalive_url: Option<String>,
    pub telegram_token: Option<String>,
    pub recipients: Vec<String>,
    mexc_credentials: Option<(String, String)>,
}

impl Settings {
    pub fn from_opt(opt: Opt) -> Result<Self, ConfigError> {
        if opt.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if opt.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let (low, high) = (opt.threshold_low, opt.threshold_high);
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low > high {
            return Err(ConfigError::InvalidBand { low, high });
        }

        let mut exchanges = Vec::with_capacity(opt.exchanges.len());
        for id in opt.exchanges {
            if !exchanges.contains(&id) {
                exchanges.push(id);
            }
        }
        if exchanges.len() < 2 {
            return Err(ConfigError::NotEnoughExchanges(exchanges.len()));
        }

        let mexc_credentials = match (non_empty(opt.mexc_api_key), non_empty(opt.mexc_api_secret)) {
            (Some(key), Some(secret)) => Some((key, secret)),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteMexcCredentials),
        };

        Ok(Self {
            exchanges,
            scanner: ScannerOptions {
                interval: Duration::from_secs(opt.interval_secs),
                timeout: Duration::from_secs(opt.timeout_secs),
                refresh_sweeps: opt.refresh_sweeps,
            },
            band: AlertBand { low, high },
            history_path: opt.history_path,
            port: opt.port,
            log_dir: opt.log_dir,
            keepalive_url: non_empty(opt.keepalive_url),
            telegram_token: non_empty(opt.telegram_token),
            recipients: opt
                .recipients
                .into_iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            mexc_credentials,
        })
    }

    /// 시세 조회용 거래소와 입출금 상태 조회용 거래소 목록
    ///
    /// Gate는 공개 API라 항상 상태 조회 대상이다. MEXC는 API 키가 있을 때만 포함한다.
    pub fn build_exchanges(
        &self,
    ) -> (Vec<Arc<dyn SpotExchange>>, Vec<Arc<dyn AssetStatusExchange>>) {
        let mut spot: Vec<Arc<dyn SpotExchange>> = Vec::new();
        let mut status: Vec<Arc<dyn AssetStatusExchange>> = Vec::new();

        for id in &self.exchanges {
            match id {
                ExchangeId::Mexc => {
                    let client = match &self.mexc_credentials {
                        Some((key, secret)) => MexcClient::with_keys(key, secret),
                        None => MexcClient::new(),
                    };
                    if client.has_credentials() {
                        status.push(Arc::new(client.clone()));
                    } else {
                        info!("MEXC API 키 없음: MEXC 입출금 상태 확인 생략");
                    }
                    spot.push(Arc::new(client));
                }
                ExchangeId::Gate => {
                    let client = GateClient::new();
                    status.push(Arc::new(client.clone()));
                    spot.push(Arc::new(client));
                }
                ExchangeId::Bybit => spot.push(Arc::new(BybitClient::new())),
                ExchangeId::Okx => spot.push(Arc::new(OkxClient::new())),
            }
        }

        (spot, status)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
