use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use interface::{HistoryRecord, SpreadResult, QUOTE_ASSET};

use crate::history::HistoryStore;
use crate::notify::{broadcast, Notifier};

/// 알림을 보낼 스프레드 구간 (퍼센트, 양 끝 포함)
///
/// 상한은 데이터 오류나 상장폐지 직전 코인처럼 비정상적으로 큰 차이를 거르기 위한 값이다.
/// 구간 밖의 결과도 히스토리에는 기록된다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertBand {
    pub low: f64,
    pub high: f64,
}

impl Default for AlertBand {
    fn default() -> Self {
        Self {
            low: 3.0,
            high: 20.0,
        }
    }
}

impl AlertBand {
    pub fn contains(&self, percent_diff: f64) -> bool {
        self.low <= percent_diff && percent_diff <= self.high
    }
}

/// AlertSink 처리 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkOutcome {
    /// 히스토리 기록 성공 여부
    pub recorded: bool,
    /// 알림 구간에 들어왔는지
    pub actionable: bool,
    /// 전송에 성공한 수신자 수
    pub delivered: usize,
}

/// 알림 전송 + 히스토리 기록
pub struct AlertSink {
    notifier: Option<Arc<dyn Notifier>>,
    recipients: Vec<String>,
    history: Arc<dyn HistoryStore>,
    band: AlertBand,
    /// 수신자별 전송 제한 시간
    timeout: Duration,
}

impl AlertSink {
    pub fn new(
        notifier: Option<Arc<dyn Notifier>>,
        recipients: Vec<String>,
        history: Arc<dyn HistoryStore>,
        band: AlertBand,
    ) -> Self {
        Self {
            notifier,
            recipients,
            history,
            band,
            timeout: exchanges::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn band(&self) -> AlertBand {
        self.band
    }

    /// 히스토리 기록은 항상, 알림은 구간 안일 때만
    /// 두 작업은 독립적이라 한쪽 실패가 다른 쪽을 막지 않는다
    pub async fn handle(&self, result: &SpreadResult) -> SinkOutcome {
        let report = format_report(result);
        log_snapshot(result);
        info!("\n{}", report);

        let actionable = self.band.contains(result.percent_diff);

        let record = async {
            match self
                .history
                .append(&result.coin, HistoryRecord::from(result))
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    warn!("history write failed for {}: {}", result.coin, e);
                    false
                }
            }
        };

        let alert = async {
            if !actionable {
                return 0;
            }
            match &self.notifier {
                Some(notifier) => {
                    broadcast(notifier.as_ref(), &self.recipients, &report, self.timeout).await
                }
                None => {
                    debug!("{}: 알림 채널 미설정, 로그로만 출력", result.coin);
                    0
                }
            }
        };

        let (recorded, delivered) = tokio::join!(record, alert);

        SinkOutcome {
            recorded,
            actionable,
            delivered,
        }
    }
}

/// 사람이 읽는 리포트
pub fn format_report(result: &SpreadResult) -> String {
    let mut lines = Vec::with_capacity(result.snapshot.len() + 3);

    lines.push(format!(
        "[{}] {}/{}",
        result.timestamp.format("%H:%M:%S"),
        result.coin,
        QUOTE_ASSET
    ));

    for (exchange, price) in result.snapshot.iter() {
        lines.push(format!("- {}: ${}", exchange.label(), group_thousands(price, 6)));
    }

    lines.push(format!(
        "🔹 Arbitrage: buy on {}, sell on {} (+{:.2}% / +${:.4})",
        result.buy_exchange, result.sell_exchange, result.percent_diff, result.abs_diff
    ));

    if !result.restricted_exchanges.is_empty() {
        let restricted: Vec<&str> = result
            .restricted_exchanges
            .iter()
            .map(|id| id.as_str())
            .collect();
        lines.push(format!("⚠️ Transfer restricted: {}", restricted.join(", ")));
    }

    lines.join("\n")
}

/// 최저가 대비 거래소별 가격 차이 (콘솔용)
fn log_snapshot(result: &SpreadResult) {
    for (exchange, price) in result.snapshot.iter() {
        let pct = (price - result.buy_price) / result.buy_price * 100.0;
        let tag = if exchange == result.buy_exchange {
            " [buy]"
        } else if exchange == result.sell_exchange {
            " [sell]"
        } else {
            ""
        };
        debug!(
            "{}/{} - {}: ${:.6} ({:+.2}%){}",
            result.coin,
            QUOTE_ASSET,
            exchange.label(),
            price,
            pct,
            tag
        );
    }
}

/// 1234567.5 -> "1,234,567.500000"
fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    if value.is_sign_negative() && value != 0.0 {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::compute_spread;
    use crate::history::{HistoryError, MemoryHistory};
    use crate::testing::{MockNotifier, StalledNotifier};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use interface::{ExchangeId, PriceSnapshot};

    fn spread(prices: &[(ExchangeId, f64)]) -> SpreadResult {
        let snapshot: PriceSnapshot = prices.iter().copied().collect();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 56).unwrap();
        compute_spread("ABC", snapshot, ts).unwrap()
    }

    fn sink(notifier: Arc<MockNotifier>, history: Arc<dyn HistoryStore>) -> AlertSink {
        AlertSink::new(
            Some(notifier as Arc<dyn Notifier>),
            vec!["100".to_string(), "200".to_string()],
            history,
            AlertBand::default(),
        )
    }

    struct BrokenHistory;

    #[async_trait]
    impl HistoryStore for BrokenHistory {
        async fn append(&self, _coin: &str, _record: HistoryRecord) -> Result<(), HistoryError> {
            Err(HistoryError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }

        async fn records(&self, _coin: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
            Ok(Vec::new())
        }

        async fn count(&self, _coin: &str) -> usize {
            0
        }
    }

    #[test]
    fn test_alert_band_bounds_inclusive() {
        let band = AlertBand::default();
        assert!(band.contains(3.0));
        assert!(band.contains(20.0));
        assert!(band.contains(3.5));
        assert!(!band.contains(2.999));
        assert!(!band.contains(20.001));
    }

    #[tokio::test]
    async fn test_in_band_spread_alerts_and_records() {
        let notifier = Arc::new(MockNotifier::default());
        let history = Arc::new(MemoryHistory::new());
        let sink = sink(notifier.clone(), history.clone());

        let outcome = sink
            .handle(&spread(&[(ExchangeId::Gate, 100.0), (ExchangeId::Okx, 103.5)]))
            .await;

        assert_eq!(
            outcome,
            SinkOutcome {
                recorded: true,
                actionable: true,
                delivered: 2
            }
        );
        assert_eq!(history.count("ABC").await, 1);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_below_band_records_without_alert() {
        let notifier = Arc::new(MockNotifier::default());
        let history = Arc::new(MemoryHistory::new());
        let sink = sink(notifier.clone(), history.clone());

        let outcome = sink
            .handle(&spread(&[(ExchangeId::Gate, 100.0), (ExchangeId::Okx, 101.0)]))
            .await;

        assert!(outcome.recorded);
        assert!(!outcome.actionable);
        assert!(notifier.sent().is_empty());
        assert_eq!(history.count("ABC").await, 1);
    }

    #[tokio::test]
    async fn test_above_band_records_without_alert() {
        let notifier = Arc::new(MockNotifier::default());
        let history = Arc::new(MemoryHistory::new());
        let sink = sink(notifier.clone(), history.clone());

        let outcome = sink
            .handle(&spread(&[(ExchangeId::Gate, 100.0), (ExchangeId::Okx, 130.0)]))
            .await;

        assert!(outcome.recorded);
        assert!(!outcome.actionable);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_block_history() {
        let notifier = Arc::new(MockNotifier::failing_for(&["100", "200"]));
        let history = Arc::new(MemoryHistory::new());
        let sink = sink(notifier, history.clone());

        let outcome = sink
            .handle(&spread(&[(ExchangeId::Gate, 100.0), (ExchangeId::Okx, 105.0)]))
            .await;

        assert!(outcome.recorded);
        assert_eq!(outcome.delivered, 0);
        assert_eq!(history.count("ABC").await, 1);
    }

    #[tokio::test]
    async fn test_history_failure_does_not_block_alert() {
        let notifier = Arc::new(MockNotifier::default());
        let sink = sink(notifier.clone(), Arc::new(BrokenHistory));

        let outcome = sink
            .handle(&spread(&[(ExchangeId::Gate, 100.0), (ExchangeId::Okx, 105.0)]))
            .await;

        assert!(!outcome.recorded);
        assert_eq!(outcome.delivered, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_notifier_does_not_block_sink() {
        let history = Arc::new(MemoryHistory::new());
        let sink = AlertSink::new(
            Some(Arc::new(StalledNotifier::stalling_for(&["100"])) as Arc<dyn Notifier>),
            vec!["100".to_string()],
            history.clone(),
            AlertBand::default(),
        )
        .with_timeout(Duration::from_secs(5));

        let outcome = tokio::time::timeout(
            Duration::from_secs(3600),
            sink.handle(&spread(&[(ExchangeId::Gate, 100.0), (ExchangeId::Okx, 105.0)])),
        )
        .await
        .expect("sink must return once the delivery deadline passes");

        assert!(outcome.recorded);
        assert!(outcome.actionable);
        assert_eq!(outcome.delivered, 0);
        assert_eq!(history.count("ABC").await, 1);
    }

    #[test]
    fn test_format_report() {
        let mut result = spread(&[
            (ExchangeId::Gate, 50.0),
            (ExchangeId::Bybit, 51.0),
            (ExchangeId::Okx, 49.5),
        ]);
        result.restricted_exchanges.insert(ExchangeId::Gate);

        let report = format_report(&result);
        let expected = "[12:34:56] ABC/USDT\n\
                        - Gate: $50.000000\n\
                        - Bybit: $51.000000\n\
                        - Okx: $49.500000\n\
                        🔹 Arbitrage: buy on okx, sell on bybit (+3.03% / +$1.5000)\n\
                        ⚠️ Transfer restricted: gate";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(1234567.5, 6), "1,234,567.500000");
        assert_eq!(group_thousands(999.0, 2), "999.00");
        assert_eq!(group_thousands(1000.0, 0), "1,000");
        assert_eq!(group_thousands(0.000123, 6), "0.000123");
    }
}
