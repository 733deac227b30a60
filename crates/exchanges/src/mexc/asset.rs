use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;

use interface::{ExchangeId, TransferStatus};

use super::{generate_signature, get_timestamp, MexcClient, BASE_URL, STATUS_CACHE_TTL};
use crate::{get_text, AssetStatusExchange, ExchangeError};

/// GET /api/v3/capital/config/getall 응답 항목
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MexcCoinConfig {
    coin: String,
    #[serde(default)]
    network_list: Vec<MexcNetwork>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MexcNetwork {
    #[serde(default)]
    deposit_enable: bool,
    #[serde(default)]
    withdraw_enable: bool,
}

/// 네트워크 중 하나라도 열려 있으면 해당 방향은 가능한 것으로 본다
fn parse_coin_configs(body: &str) -> Result<HashMap<String, TransferStatus>, ExchangeError> {
    let configs: Vec<MexcCoinConfig> =
        serde_json::from_str(body).map_err(|e| ExchangeError::schema(e, body))?;

    Ok(configs
        .into_iter()
        .map(|config| {
            let status = TransferStatus {
                deposit_enabled: config.network_list.iter().any(|n| n.deposit_enable),
                withdraw_enabled: config.network_list.iter().any(|n| n.withdraw_enable),
            };
            (config.coin.to_uppercase(), status)
        })
        .collect())
}

impl MexcClient {
    /// 전체 코인 입출금 설정 조회 후 캐시 갱신
    pub async fn refresh_transfer_statuses(
        &self,
    ) -> Result<HashMap<String, TransferStatus>, ExchangeError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ExchangeError::Other("API key not set. Use MexcClient::with_keys()".to_string())
        })?;
        let api_secret = self.api_secret.as_ref().ok_or_else(|| {
            ExchangeError::Other(
                "API secret not set. Use MexcClient::with_keys()".to_string(),
            )
        })?;

        let endpoint = "/api/v3/capital/config/getall";
        let query_string = format!("timestamp={}&recvWindow=5000", get_timestamp());
        let signature = generate_signature(&query_string, api_secret)?;
        let url = format!(
            "{}{}?{}&signature={}",
            BASE_URL, endpoint, query_string, signature
        );

        let body = get_text(
            self.http
                .get(&url)
                .header("X-MEXC-APIKEY", api_key.as_str())
                .header("Content-Type", "application/json"),
        )
        .await?;
        let statuses = parse_coin_configs(&body)?;

        tracing::debug!("Parsed {} coin transfer statuses from MEXC", statuses.len());

        *self.status_cache.write().await = Some((Instant::now(), statuses.clone()));

        Ok(statuses)
    }

    async fn cached_status(&self, coin: &str) -> Option<Option<TransferStatus>> {
        let guard = self.status_cache.read().await;
        match guard.as_ref() {
            Some((fetched_at, statuses)) if fetched_at.elapsed() < STATUS_CACHE_TTL => {
                Some(statuses.get(coin).copied())
            }
            _ => None,
        }
    }
}

#[async_trait]
impl AssetStatusExchange for MexcClient {
    fn id(&self) -> ExchangeId {
        ExchangeId::Mexc
    }

    async fn transfer_status(&self, coin: &str) -> Result<TransferStatus, ExchangeError> {
        let coin = coin.to_uppercase();

        let status = match self.cached_status(&coin).await {
            Some(status) => status,
            None => self.refresh_transfer_statuses().await?.get(&coin).copied(),
        };

        status.ok_or_else(|| ExchangeError::Other(format!("MEXC has no transfer config for {}", coin)))
    }
}
