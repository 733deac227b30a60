use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExchangeId, PriceSnapshot};

/// 한 코인의 거래소 간 가격 차이
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadResult {
    pub coin: String,
    pub timestamp: DateTime<Utc>,
    pub snapshot: PriceSnapshot,
    /// 최저가 거래소
    pub buy_exchange: ExchangeId,
    /// 최고가 거래소
    pub sell_exchange: ExchangeId,
    pub buy_price: f64,
    pub sell_price: f64,
    /// (max - min) / min * 100
    pub percent_diff: f64,
    pub abs_diff: f64,
    /// 입출금이 막혔거나 확인에 실패한 거래소
    #[serde(default)]
    pub restricted_exchanges: BTreeSet<ExchangeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageLeg {
    pub buy: ExchangeId,
    pub sell: ExchangeId,
    pub percent_diff: f64,
    pub abs_diff: f64,
}

/// 히스토리 로그에 코인별로 쌓이는 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub time: DateTime<Utc>,
    pub prices: PriceSnapshot,
    pub arbitrage: ArbitrageLeg,
    #[serde(default)]
    pub restricted: BTreeSet<ExchangeId>,
}

impl From<&SpreadResult> for HistoryRecord {
    fn from(result: &SpreadResult) -> Self {
        Self {
            time: result.timestamp,
            prices: result.snapshot.clone(),
            arbitrage: ArbitrageLeg {
                buy: result.buy_exchange,
                sell: result.sell_exchange,
                percent_diff: result.percent_diff,
                abs_diff: result.abs_diff,
            },
            restricted: result.restricted_exchanges.clone(),
        }
    }
}
