use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::{MexcClient, BASE_URL};
use crate::{get_text, validate_price, ExchangeError, SpotExchange};
use interface::{ExchangeId, QUOTE_ASSET};

#[derive(Debug, Deserialize)]
struct MexcExchangeInfo {
    #[serde(default)]
    symbols: Vec<MexcSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MexcSymbol {
    symbol: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    base_asset: String,
    #[serde(default)]
    quote_asset: String,
    #[serde(default)]
    is_spot_trading_allowed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct MexcTickerPrice {
    #[allow(dead_code)]
    symbol: String,
    #[serde(default)]
    price: String,
}

fn parse_exchange_info(body: &str) -> Result<HashMap<String, String>, ExchangeError> {
    let info: MexcExchangeInfo =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;

    let mut out = HashMap::new();
    for symbol in info.symbols {
        if symbol.quote_asset != QUOTE_ASSET || symbol.base_asset.is_empty() {
            continue; // USDT 페어만
        }
        if symbol.is_spot_trading_allowed == Some(false) {
            continue;
        }
        // "1" = online, 구버전 응답은 "ENABLED"
        if !matches!(symbol.status.as_str(), "" | "1" | "ENABLED") {
            continue;
        }
        out.insert(symbol.base_asset.to_uppercase(), symbol.symbol);
    }

    Ok(out)
}

fn parse_ticker_price(body: &str) -> Result<Option<f64>, ExchangeError> {
    let ticker: MexcTickerPrice =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;
    Ok(validate_price(&ticker.price))
}

#[async_trait]
impl SpotExchange for MexcClient {
    fn id(&self) -> ExchangeId {
        ExchangeId::Mexc
    }

    async fn usdt_symbols(&self) -> Result<HashMap<String, String>, ExchangeError> {
        let url = format!("{BASE_URL}/api/v3/exchangeInfo");
        let body = get_text(self.http.get(&url)).await?;
        parse_exchange_info(&body)
    }

    async fn last_price(&self, symbol: &str) -> Result<Option<f64>, ExchangeError> {
        let url = format!("{BASE_URL}/api/v3/ticker/price");
        let body = get_text(self.http.get(&url).query(&[("symbol", symbol)])).await?;
        parse_ticker_price(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mexc_client_id() {
        let client = MexcClient::new();
        assert_eq!(client.id(), ExchangeId::Mexc);
    }

    #[test]
    fn test_parse_exchange_info() {
        let body = r#"{"timezone":"CST","symbols":[
            {"symbol":"BTCUSDT","status":"1","baseAsset":"BTC","quoteAsset":"USDT","isSpotTradingAllowed":true},
            {"symbol":"ETHBTC","status":"1","baseAsset":"ETH","quoteAsset":"BTC"},
            {"symbol":"HALTUSDT","status":"2","baseAsset":"HALT","quoteAsset":"USDT"},
            {"symbol":"NOSPOTUSDT","status":"1","baseAsset":"NOSPOT","quoteAsset":"USDT","isSpotTradingAllowed":false},
            {"symbol":"OLDUSDT","status":"ENABLED","baseAsset":"OLD","quoteAsset":"USDT"}
        ]}"#;
        let symbols = parse_exchange_info(body).unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols["BTC"], "BTCUSDT");
        assert_eq!(symbols["OLD"], "OLDUSDT");
    }

    #[test]
    fn test_parse_ticker_price() {
        assert_eq!(
            parse_ticker_price(r#"{"symbol":"BTCUSDT","price":"43210.12"}"#).unwrap(),
            Some(43210.12)
        );
        assert_eq!(
            parse_ticker_price(r#"{"symbol":"BTCUSDT","price":"abc"}"#).unwrap(),
            None
        );
    }

    #[tokio::test]
    #[ignore = "live MEXC API"]
    async fn test_live_mexc_symbols() {
        let client = MexcClient::new();
        let symbols = client.usdt_symbols().await.unwrap();
        assert!(!symbols.is_empty(), "symbols should not be empty");
    }
}
