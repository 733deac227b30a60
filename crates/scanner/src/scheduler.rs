use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use exchanges::SpotExchange;
use interface::{CoinSymbolMap, ExchangeId};

use crate::alert::{AlertSink, SinkOutcome};
use crate::detector::SpreadDetector;
use crate::reconcile::reconcile;
use crate::transfer::TransferChecker;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("no coins are listed on two or more exchanges")]
    NoCoins,
    #[error("panic while processing {scope}: {message}")]
    Panicked { scope: String, message: String },
}

/// 라이브니스 엔드포인트에서 읽는 카운터
#[derive(Debug, Default)]
pub struct ScanStats {
    sweeps: AtomicU64,
    spreads: AtomicU64,
    alerts: AtomicU64,
    last_sweep_ms: AtomicI64,
}

impl ScanStats {
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub fn spreads(&self) -> u64 {
        self.spreads.load(Ordering::Relaxed)
    }

    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }

    pub fn last_sweep_at(&self) -> Option<DateTime<Utc>> {
        match self.last_sweep_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    fn record_sweep(&self, summary: &SweepSummary) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.spreads
            .fetch_add(summary.detected as u64, Ordering::Relaxed);
        self.alerts.fetch_add(summary.alerts as u64, Ordering::Relaxed);
        self.last_sweep_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

/// 코인 하나 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinOutcome {
    /// 가격 2개 미만
    Skipped,
    Detected(SinkOutcome),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub coins: usize,
    pub skipped: usize,
    pub detected: usize,
    pub recorded: usize,
    pub alerts: usize,
    pub failures: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ScannerOptions {
    /// 한 바퀴 끝난 뒤 대기 시간
    pub interval: Duration,
    /// 거래소 요청 타임아웃
    pub timeout: Duration,
    /// N바퀴마다 심볼 재정합 (0이면 시작 시 한 번만)
    pub refresh_sweeps: u64,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: exchanges::DEFAULT_TIMEOUT,
            refresh_sweeps: 0,
        }
    }
}

/// 폴링 루프
///
/// INIT: 심볼 정합. 코인이 없으면 종료
/// POLLING: 코인마다 감지 -> (알림 구간이면) 입출금 확인 -> 기록/알림, 바퀴마다 interval 대기
pub struct Scanner {
    exchanges: Vec<Arc<dyn SpotExchange>>,
    detector: SpreadDetector,
    transfer: TransferChecker,
    sink: AlertSink,
    coins: Arc<ArcSwap<CoinSymbolMap>>,
    stats: Arc<ScanStats>,
    options: ScannerOptions,
}

impl Scanner {
    pub fn new(
        exchanges: Vec<Arc<dyn SpotExchange>>,
        transfer: TransferChecker,
        sink: AlertSink,
        options: ScannerOptions,
    ) -> Self {
        Self {
            detector: SpreadDetector::new(&exchanges, options.timeout),
            exchanges,
            transfer,
            sink,
            coins: Arc::new(ArcSwap::from_pointee(CoinSymbolMap::default())),
            stats: Arc::new(ScanStats::default()),
            options,
        }
    }

    /// 현재 코인 맵 (읽기 전용 공유)
    pub fn coins(&self) -> Arc<ArcSwap<CoinSymbolMap>> {
        self.coins.clone()
    }

    pub fn stats(&self) -> Arc<ScanStats> {
        self.stats.clone()
    }

    /// 최초 심볼 정합. 코인이 하나도 없으면 치명적 오류
    pub async fn init(&self) -> Result<usize, ScanError> {
        let map = reconcile(&self.exchanges, self.options.timeout).await;
        if map.is_empty() {
            return Err(ScanError::NoCoins);
        }
        let count = map.len();
        self.coins.store(Arc::new(map));
        Ok(count)
    }

    /// 심볼 재정합. 결과가 비어 있으면 기존 맵을 유지한다
    pub async fn refresh(&self) -> usize {
        let map = reconcile(&self.exchanges, self.options.timeout).await;
        if map.is_empty() {
            warn!("심볼 재정합 결과가 비어 있어 기존 코인 목록 유지");
            return self.coins.load().len();
        }
        let count = map.len();
        self.coins.store(Arc::new(map));
        count
    }

    /// 코인 하나 처리
    /// 입출금 확인은 스프레드 계산 이후에만 돌며 계산된 가격/차이는 바꾸지 않는다
    pub async fn process_coin(
        &self,
        coin: &str,
        symbols: &BTreeMap<ExchangeId, String>,
    ) -> CoinOutcome {
        let Some(mut result) = self.detector.detect(coin, symbols).await else {
            return CoinOutcome::Skipped;
        };

        if self.sink.band().contains(result.percent_diff) {
            result.restricted_exchanges = self
                .transfer
                .restricted(coin, symbols.keys().copied())
                .await;
        }

        CoinOutcome::Detected(self.sink.handle(&result).await)
    }

    /// 모든 코인 한 바퀴
    /// 코인 하나에서 패닉이 나도 나머지 코인은 계속 처리한다
    pub async fn sweep(&self, cancel: &CancellationToken) -> SweepSummary {
        // 바퀴 도중 맵이 교체되어도 이번 바퀴는 시작 시점 스냅샷을 쓴다
        let coins = self.coins.load_full();
        let mut summary = SweepSummary {
            coins: coins.len(),
            ..Default::default()
        };

        for (coin, symbols) in coins.iter() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            match AssertUnwindSafe(self.process_coin(coin, symbols))
                .catch_unwind()
                .await
            {
                Ok(CoinOutcome::Skipped) => summary.skipped += 1,
                Ok(CoinOutcome::Detected(outcome)) => {
                    summary.detected += 1;
                    if outcome.recorded {
                        summary.recorded += 1;
                    }
                    if outcome.delivered > 0 {
                        summary.alerts += 1;
                    }
                }
                Err(panic) => {
                    summary.failures += 1;
                    let err = ScanError::Panicked {
                        scope: coin.to_string(),
                        message: panic_message(panic.as_ref()),
                    };
                    error!("{}", err);
                }
            }
        }

        summary
    }

    /// 무한 루프. 시작 시 코인이 없을 때만 오류로 끝난다
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ScanError> {
        let count = self.init().await?;
        info!(
            "메인 루프 시작: 코인 {}개, 거래소 {}개, {}초 간격",
            count,
            self.exchanges.len(),
            self.options.interval.as_secs()
        );

        let mut sweep_no: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                break;
            }

            if self.options.refresh_sweeps > 0
                && sweep_no > 0
                && sweep_no % self.options.refresh_sweeps == 0
            {
                let count = self.refresh().await;
                info!("심볼 재정합 완료: 코인 {}개", count);
            }

            let started = Instant::now();
            match AssertUnwindSafe(self.sweep(&cancel)).catch_unwind().await {
                Ok(summary) => {
                    self.stats.record_sweep(&summary);
                    info!(
                        "스윕 #{} 완료 ({:.1}s): 코인 {}개, 감지 {}개, 스킵 {}개, 알림 {}개, 실패 {}개",
                        sweep_no,
                        started.elapsed().as_secs_f64(),
                        summary.coins,
                        summary.detected,
                        summary.skipped,
                        summary.alerts,
                        summary.failures
                    );
                }
                Err(panic) => {
                    let err = ScanError::Panicked {
                        scope: format!("sweep #{}", sweep_no),
                        message: panic_message(panic.as_ref()),
                    };
                    error!("{}", err);
                }
            }
            sweep_no += 1;

            tokio::select! {
                _ = sleep(self.options.interval) => {}
                _ = cancel.cancelled() => {
                    debug!("대기 중 종료 요청 수신");
                    break;
                }
            }
        }

        info!("메인 루프 종료 (스윕 {}회)", sweep_no);
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
