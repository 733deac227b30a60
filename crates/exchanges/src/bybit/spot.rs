use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::{BybitClient, BASE_URL};
use crate::{get_text, validate_price, ExchangeError, SpotExchange};
use interface::{ExchangeId, QUOTE_ASSET};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitInstrument {
    symbol: String,
    #[serde(default)]
    base_coin: String,
    #[serde(default)]
    quote_coin: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitSpotTicker {
    #[allow(dead_code)]
    symbol: String,
    #[serde(default)]
    last_price: String,
}

#[derive(Debug, Deserialize)]
struct BybitList<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitResponse<T> {
    ret_code: i32,
    #[serde(default)]
    ret_msg: String,
    result: Option<BybitList<T>>,
}

impl<T> BybitResponse<T> {
    fn into_list(self) -> Result<Vec<T>, ExchangeError> {
        if self.ret_code != 0 {
            return Err(ExchangeError::Api {
                code: self.ret_code.to_string(),
                msg: self.ret_msg,
            });
        }
        Ok(self.result.map(|r| r.list).unwrap_or_default())
    }
}

fn parse_instruments(body: &str) -> Result<HashMap<String, String>, ExchangeError> {
    let response: BybitResponse<BybitInstrument> =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;

    let mut out = HashMap::new();
    for instrument in response.into_list()? {
        if instrument.quote_coin != QUOTE_ASSET || instrument.base_coin.is_empty() {
            continue; // USDT 페어만
        }
        if !instrument.status.is_empty() && instrument.status != "Trading" {
            continue;
        }
        out.insert(instrument.base_coin.to_uppercase(), instrument.symbol);
    }

    Ok(out)
}

fn parse_ticker(body: &str) -> Result<Option<f64>, ExchangeError> {
    let response: BybitResponse<BybitSpotTicker> =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;

    Ok(response
        .into_list()?
        .first()
        .and_then(|ticker| validate_price(&ticker.last_price)))
}

#[async_trait]
impl SpotExchange for BybitClient {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bybit
    }

    async fn usdt_symbols(&self) -> Result<HashMap<String, String>, ExchangeError> {
        let url = format!("{BASE_URL}/v5/market/instruments-info?category=spot");
        let body = get_text(self.http.get(&url)).await?;
        parse_instruments(&body)
    }

    async fn last_price(&self, symbol: &str) -> Result<Option<f64>, ExchangeError> {
        let url = format!("{BASE_URL}/v5/market/tickers");
        let body = get_text(
            self.http
                .get(&url)
                .query(&[("category", "spot"), ("symbol", symbol)]),
        )
        .await?;
        parse_ticker(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bybit_client_id() {
        let client = BybitClient::new();
        assert_eq!(client.id(), ExchangeId::Bybit);
    }

    #[test]
    fn test_parse_instruments() {
        let body = r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[
            {"symbol":"BTCUSDT","baseCoin":"BTC","quoteCoin":"USDT","status":"Trading"},
            {"symbol":"BTCUSDC","baseCoin":"BTC","quoteCoin":"USDC","status":"Trading"},
            {"symbol":"XYZUSDT","baseCoin":"XYZ","quoteCoin":"USDT","status":"PreLaunch"}
        ]}}"#;
        let symbols = parse_instruments(body).unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols["BTC"], "BTCUSDT");
    }

    #[test]
    fn test_parse_ticker() {
        let body = r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[
            {"symbol":"BTCUSDT","lastPrice":"51.0"}
        ]}}"#;
        assert_eq!(parse_ticker(body).unwrap(), Some(51.0));

        let missing_field = r#"{"retCode":0,"retMsg":"OK","result":{"list":[{"symbol":"BTCUSDT"}]}}"#;
        assert_eq!(parse_ticker(missing_field).unwrap(), None);
    }

    #[test]
    fn test_parse_ticker_api_error() {
        let body = r#"{"retCode":10001,"retMsg":"Not supported symbols","result":{}}"#;
        assert!(matches!(
            parse_ticker(body),
            Err(ExchangeError::Api { .. })
        ));
    }

    #[test]
    fn test_parse_ticker_schema_error() {
        assert!(matches!(
            parse_ticker("<html>bad gateway</html>"),
            Err(ExchangeError::Schema(_))
        ));
    }

    #[tokio::test]
    #[ignore = "live Bybit API"]
    async fn test_live_bybit_symbols() {
        let client = BybitClient::new();
        let symbols = client.usdt_symbols().await.unwrap();
        assert!(!symbols.is_empty(), "symbols should not be empty");
        println!("Bybit USDT pairs: {}", symbols.len());
    }
}
