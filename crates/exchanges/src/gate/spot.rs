use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::{GateClient, BASE_URL};
use crate::{get_text, validate_price, ExchangeError, SpotExchange};
use interface::{ExchangeId, QUOTE_ASSET};

#[derive(Debug, Deserialize)]
struct GateCurrencyPair {
    id: String,
    #[serde(default)]
    base: String,
    #[serde(default)]
    quote: String,
    #[serde(default)]
    trade_status: String,
}

#[derive(Debug, Deserialize)]
struct GateSpotTicker {
    #[allow(dead_code)]
    currency_pair: String,
    #[serde(default)]
    last: String,
}

fn parse_currency_pairs(body: &str) -> Result<HashMap<String, String>, ExchangeError> {
    let pairs: Vec<GateCurrencyPair> =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;

    let mut out = HashMap::new();
    for pair in pairs {
        if pair.quote != QUOTE_ASSET {
            continue; // USDT 페어만
        }
        // untradable, sellable, buyable 등은 시세가 멈춰있을 수 있음
        if !pair.trade_status.is_empty() && pair.trade_status != "tradable" {
            continue;
        }
        // base가 비어있는 경우 "BTC_USDT"에서 추출
        let coin = if pair.base.is_empty() {
            match pair.id.split('_').next() {
                Some(coin) => coin.to_string(),
                None => continue,
            }
        } else {
            pair.base
        };
        out.insert(coin.to_uppercase(), pair.id);
    }

    Ok(out)
}

fn parse_tickers(body: &str) -> Result<Option<f64>, ExchangeError> {
    let tickers: Vec<GateSpotTicker> =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;

    Ok(tickers
        .first()
        .and_then(|ticker| validate_price(&ticker.last)))
}

#[async_trait]
impl SpotExchange for GateClient {
    fn id(&self) -> ExchangeId {
        ExchangeId::Gate
    }

    async fn usdt_symbols(&self) -> Result<HashMap<String, String>, ExchangeError> {
        let url = format!("{BASE_URL}/api/v4/spot/currency_pairs");
        let body = get_text(self.http.get(&url)).await?;
        parse_currency_pairs(&body)
    }

    async fn last_price(&self, symbol: &str) -> Result<Option<f64>, ExchangeError> {
        // Gate 심볼은 "BTC_USDT" 형식
        let url = format!("{BASE_URL}/api/v4/spot/tickers");
        let body = get_text(self.http.get(&url).query(&[("currency_pair", symbol)])).await?;
        parse_tickers(&body)
    }
}
