use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::{OkxClient, BASE_URL};
use crate::{get_text, validate_price, ExchangeError, SpotExchange};
use interface::{ExchangeId, QUOTE_ASSET};

#[derive(Debug, Deserialize)]
struct OkxResponse<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> OkxResponse<T> {
    fn into_data(self) -> Result<Vec<T>, ExchangeError> {
        if self.code != "0" {
            return Err(ExchangeError::Api {
                code: self.code,
                msg: self.msg,
            });
        }
        Ok(self.data)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OkxInstrument {
    inst_id: String,
    #[serde(default)]
    base_ccy: String,
    #[serde(default)]
    quote_ccy: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OkxSpotTicker {
    #[allow(dead_code)]
    inst_id: String,
    #[serde(default)]
    last: String,
}

fn parse_instruments(body: &str) -> Result<HashMap<String, String>, ExchangeError> {
    let response: OkxResponse<OkxInstrument> =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;

    let mut out = HashMap::new();
    for instrument in response.into_data()? {
        if instrument.quote_ccy != QUOTE_ASSET || instrument.base_ccy.is_empty() {
            continue; // USDT 페어만
        }
        // state가 비어있으면 허용, 명시적으로 live가 아니면 제외
        if !instrument.state.is_empty() && instrument.state != "live" {
            continue;
        }
        out.insert(instrument.base_ccy.to_uppercase(), instrument.inst_id);
    }

    Ok(out)
}

fn parse_ticker(body: &str) -> Result<Option<f64>, ExchangeError> {
    let response: OkxResponse<OkxSpotTicker> =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;

    Ok(response
        .into_data()?
        .first()
        .and_then(|ticker| validate_price(&ticker.last)))
}

#[async_trait]
impl SpotExchange for OkxClient {
    fn id(&self) -> ExchangeId {
        ExchangeId::Okx
    }

    async fn usdt_symbols(&self) -> Result<HashMap<String, String>, ExchangeError> {
        let url = format!("{BASE_URL}/api/v5/public/instruments?instType=SPOT");
        let body = get_text(self.http.get(&url)).await?;
        parse_instruments(&body)
    }

    async fn last_price(&self, symbol: &str) -> Result<Option<f64>, ExchangeError> {
        // OKX 심볼은 "BTC-USDT" 형식
        let url = format!("{BASE_URL}/api/v5/market/ticker");
        let body = get_text(self.http.get(&url).query(&[("instId", symbol)])).await?;
        parse_ticker(&body)
    }
}
