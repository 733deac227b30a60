use async_trait::async_trait;
use serde::Deserialize;

use super::{GateClient, BASE_URL};
use crate::{get_text, AssetStatusExchange, ExchangeError};
use interface::{ExchangeId, TransferStatus};

/// GET /api/v4/spot/currencies/{currency} 응답
#[derive(Debug, Deserialize)]
struct GateCurrency {
    #[allow(dead_code)]
    currency: String,
    #[serde(default)]
    delisted: bool,
    #[serde(default)]
    withdraw_disabled: bool,
    #[serde(default)]
    deposit_disabled: bool,
}

fn parse_currency(body: &str) -> Result<TransferStatus, ExchangeError> {
    let currency: GateCurrency =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;

    // 상장 폐지된 코인은 입출금 모두 막힌 것으로 본다
    Ok(TransferStatus {
        deposit_enabled: !currency.delisted && !currency.deposit_disabled,
        withdraw_enabled: !currency.delisted && !currency.withdraw_disabled,
    })
}

#[async_trait]
impl AssetStatusExchange for GateClient {
    fn id(&self) -> ExchangeId {
        ExchangeId::Gate
    }

    async fn transfer_status(&self, coin: &str) -> Result<TransferStatus, ExchangeError> {
        let url = format!("{BASE_URL}/api/v4/spot/currencies/{}", coin.to_uppercase());
        let body = get_text(self.http.get(&url)).await?;
        parse_currency(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency_open() {
        let body = r#"{"currency":"BTC","delisted":false,"withdraw_disabled":false,
            "withdraw_delayed":false,"deposit_disabled":false,"trade_disabled":false}"#;
        let status = parse_currency(body).unwrap();
        assert!(!status.is_restricted());
    }

    #[test]
    fn test_parse_currency_withdraw_disabled() {
        let body = r#"{"currency":"ABC","withdraw_disabled":true,"deposit_disabled":false}"#;
        let status = parse_currency(body).unwrap();
        assert!(status.deposit_enabled);
        assert!(!status.withdraw_enabled);
        assert!(status.is_restricted());
    }

    #[test]
    fn test_parse_currency_delisted() {
        let body = r#"{"currency":"OLD","delisted":true}"#;
        let status = parse_currency(body).unwrap();
        assert!(!status.deposit_enabled);
        assert!(!status.withdraw_enabled);
    }

    #[tokio::test]
    #[ignore = "live Gate.io API"]
    async fn test_live_gate_transfer_status() {
        let client = GateClient::new();
        let status = client.transfer_status("BTC").await.unwrap();
        println!("Gate BTC transfer status: {:?}", status);
    }
}
