//! 거래소 간 현물 가격 차이(스프레드) 감시 엔진
//!
//! 흐름: 심볼 정합(reconcile) -> 주기마다 코인별 가격 수집/스프레드 계산(detector)
//! -> 입출금 상태 확인(transfer) -> 알림 및 히스토리 기록(alert)

pub mod alert;
pub mod config;
pub mod detector;
pub mod history;
pub mod logger;
pub mod notify;
pub mod reconcile;
pub mod scheduler;
pub mod server;
pub mod transfer;

pub use alert::{AlertBand, AlertSink, SinkOutcome};
pub use config::{ConfigError, Opt, Settings};
pub use detector::{compute_spread, SpreadDetector};
pub use history::{HistoryError, HistoryStore, JsonlHistory, MemoryHistory};
pub use notify::{broadcast, Notifier, NotifyError, TelegramNotifier};
pub use reconcile::reconcile;
pub use scheduler::{CoinOutcome, ScanError, ScanStats, Scanner, ScannerOptions, SweepSummary};
pub use transfer::TransferChecker;

#[cfg(test)]
pub(crate) mod testing;
