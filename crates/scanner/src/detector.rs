use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::debug;

use exchanges::{fetch_last_price, SpotExchange};
use interface::{ExchangeId, PriceSnapshot, SpreadResult};

/// 코인 하나에 대해 거래소별 가격을 모아 스프레드를 계산
pub struct SpreadDetector {
    exchanges: HashMap<ExchangeId, Arc<dyn SpotExchange>>,
    timeout: Duration,
}

impl SpreadDetector {
    pub fn new(exchanges: &[Arc<dyn SpotExchange>], timeout: Duration) -> Self {
        Self {
            exchanges: exchanges.iter().map(|ex| (ex.id(), ex.clone())).collect(),
            timeout,
        }
    }

    /// 코인 맵에 있는 거래소마다 가격을 동시에 조회
    /// 거래소별 타임아웃은 독립적이며 실패한 거래소는 스냅샷에서 빠진다
    pub async fn collect(
        &self,
        coin: &str,
        symbols: &BTreeMap<ExchangeId, String>,
    ) -> PriceSnapshot {
        let requests = symbols.iter().filter_map(|(id, symbol)| {
            let exchange = self.exchanges.get(id)?;
            Some(fetch_last_price(exchange.as_ref(), coin, symbol, self.timeout))
        });

        join_all(requests).await.into_iter().flatten().collect()
    }

    /// 가격 수집 후 스프레드 계산. 가격이 2개 미만이면 None (정상적인 스킵)
    pub async fn detect(
        &self,
        coin: &str,
        symbols: &BTreeMap<ExchangeId, String>,
    ) -> Option<SpreadResult> {
        let snapshot = self.collect(coin, symbols).await;
        let result = compute_spread(coin, snapshot, Utc::now());
        if result.is_none() {
            debug!("{}: 가격 2개 미만, 이번 주기 건너뜀", coin);
        }
        result
    }
}

/// 스냅샷의 최저가/최고가 거래소와 차이를 계산
///
/// 스냅샷은 ExchangeId 순서로 순회한다. 동일 가격이면 매수는 처음 나온 최저가,
/// 매도는 마지막에 나온 최고가 거래소가 된다. 따라서 가격이 2개 이상이면
/// 매수/매도 거래소는 항상 다르다.
pub fn compute_spread(
    coin: &str,
    snapshot: PriceSnapshot,
    timestamp: DateTime<Utc>,
) -> Option<SpreadResult> {
    if snapshot.len() < 2 {
        return None;
    }

    let mut iter = snapshot.iter();
    let (first_exchange, first_price) = iter.next()?;
    let (mut buy_exchange, mut buy_price) = (first_exchange, first_price);
    let (mut sell_exchange, mut sell_price) = (first_exchange, first_price);

    for (exchange, price) in iter {
        if price < buy_price {
            buy_exchange = exchange;
            buy_price = price;
        }
        if price >= sell_price {
            sell_exchange = exchange;
            sell_price = price;
        }
    }

    let abs_diff = sell_price - buy_price;
    let percent_diff = abs_diff / buy_price * 100.0;

    Some(SpreadResult {
        coin: coin.to_string(),
        timestamp,
        snapshot,
        buy_exchange,
        sell_exchange,
        buy_price,
        sell_price,
        percent_diff,
        abs_diff,
        restricted_exchanges: BTreeSet::new(),
    })
}
