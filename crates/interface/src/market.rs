use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ExchangeId;

/// 코인 티커 -> (거래소 -> 거래소 고유 심볼)
///
/// 두 개 이상의 거래소에 상장된 코인만 담는다. 생성 이후에는 변경되지 않으며,
/// 갱신이 필요하면 새로 만들어 통째로 교체한다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CoinSymbolMap {
    coins: BTreeMap<String, BTreeMap<ExchangeId, String>>,
}

impl CoinSymbolMap {
    /// 거래소별 상장 목록을 코인 기준으로 병합
    /// 거래소 하나에만 있는 코인은 버린다
    pub fn from_listings<I>(listings: I) -> Self
    where
        I: IntoIterator<Item = (ExchangeId, HashMap<String, String>)>,
    {
        let mut merged: BTreeMap<String, BTreeMap<ExchangeId, String>> = BTreeMap::new();

        for (exchange, symbols) in listings {
            for (coin, native) in symbols {
                let coin = coin.trim().to_uppercase();
                if coin.is_empty() || native.is_empty() {
                    continue;
                }
                merged.entry(coin).or_default().insert(exchange, native);
            }
        }

        merged.retain(|_, by_exchange| by_exchange.len() >= 2);

        Self { coins: merged }
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn contains(&self, coin: &str) -> bool {
        self.coins.contains_key(coin)
    }

    pub fn symbols(&self, coin: &str) -> Option<&BTreeMap<ExchangeId, String>> {
        self.coins.get(coin)
    }

    pub fn coins(&self) -> impl Iterator<Item = &str> {
        self.coins.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<ExchangeId, String>)> {
        self.coins.iter().map(|(coin, symbols)| (coin.as_str(), symbols))
    }
}

/// 한 거래소에서 받은 단일 가격
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub exchange: ExchangeId,
    pub coin: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// 한 시점에 한 코인에 대해 성공적으로 받은 가격들
/// 실패한 거래소는 0이나 null이 아니라 아예 빠진다
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSnapshot(BTreeMap<ExchangeId, f64>);

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 유한한 양수만 받는다. 그 외 값은 무시하고 false 반환
    pub fn insert(&mut self, exchange: ExchangeId, price: f64) -> bool {
        if !price.is_finite() || price <= 0.0 {
            return false;
        }
        self.0.insert(exchange, price);
        true
    }

    pub fn get(&self, exchange: ExchangeId) -> Option<f64> {
        self.0.get(&exchange).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// ExchangeId 선언 순서로 순회
    pub fn iter(&self) -> impl Iterator<Item = (ExchangeId, f64)> + '_ {
        self.0.iter().map(|(exchange, price)| (*exchange, *price))
    }
}

impl FromIterator<PriceQuote> for PriceSnapshot {
    fn from_iter<T: IntoIterator<Item = PriceQuote>>(iter: T) -> Self {
        let mut snapshot = PriceSnapshot::new();
        for quote in iter {
            snapshot.insert(quote.exchange, quote.price);
        }
        snapshot
    }
}

impl FromIterator<(ExchangeId, f64)> for PriceSnapshot {
    fn from_iter<T: IntoIterator<Item = (ExchangeId, f64)>>(iter: T) -> Self {
        let mut snapshot = PriceSnapshot::new();
        for (exchange, price) in iter {
            snapshot.insert(exchange, price);
        }
        snapshot
    }
}

/// 한 거래소에서 코인의 입출금 가능 여부
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatus {
    pub deposit_enabled: bool,
    pub withdraw_enabled: bool,
}

impl TransferStatus {
    pub fn is_restricted(&self) -> bool {
        !(self.deposit_enabled && self.withdraw_enabled)
    }
}
