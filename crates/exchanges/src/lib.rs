use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

pub use interface::ExchangeError;
use interface::{ExchangeId, PriceQuote, TransferStatus};

pub mod bybit;
pub mod gate;
pub mod mexc;
pub mod okx;

/// 기본 요청 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0";

#[async_trait]
pub trait SpotExchange: Send + Sync {
    fn id(&self) -> ExchangeId;

    /// USDT 현물 거래쌍 목록 (코인 티커 -> 거래소 고유 심볼)
    async fn usdt_symbols(&self) -> Result<HashMap<String, String>, ExchangeError>;

    /// 특정 심볼의 최근 체결가
    /// Ok(None)은 "값 없음" (상장 안 됨, 빈 응답, 0 이하 가격 등)
    async fn last_price(&self, symbol: &str) -> Result<Option<f64>, ExchangeError>;
}

#[async_trait]
pub trait AssetStatusExchange: Send + Sync {
    fn id(&self) -> ExchangeId;

    /// 특정 코인의 입출금 가능 여부
    /// coin: 코인 티커 (예: "BTC")
    async fn transfer_status(&self, coin: &str) -> Result<TransferStatus, ExchangeError>;
}

/// 거래소 공통 HTTP 클라이언트
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// GET 요청 후 본문을 문자열로 반환. 2xx가 아니면 Api 오류
pub(crate) async fn get_text(
    request: reqwest::RequestBuilder,
) -> Result<String, ExchangeError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ExchangeError::Api {
            code: status.as_u16().to_string(),
            msg: body.chars().take(200).collect(),
        });
    }

    Ok(body)
}

/// 문자열 가격을 파싱해서 유한한 양수일 때만 반환
pub fn validate_price(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price > 0.0)
}

/// 거래쌍 목록 조회 (fail-open)
/// 어떤 오류가 나도 빈 맵을 반환하고 원인은 로그로만 남긴다
pub async fn list_usdt_symbols(
    exchange: &dyn SpotExchange,
    timeout: Duration,
) -> HashMap<String, String> {
    match tokio::time::timeout(timeout, exchange.usdt_symbols()).await {
        Ok(Ok(symbols)) => {
            debug!("{} listed {} USDT pairs", exchange.id(), symbols.len());
            symbols
        }
        Ok(Err(e)) => {
            warn!("symbol listing error from {}: {}", exchange.id(), e);
            HashMap::new()
        }
        Err(_) => {
            warn!(
                "symbol listing error from {}: {}",
                exchange.id(),
                ExchangeError::Timeout(timeout)
            );
            HashMap::new()
        }
    }
}

/// 가격 조회 (fail-open)
/// 타임아웃, 전송 오류, 스키마 오류 모두 None
pub async fn fetch_last_price(
    exchange: &dyn SpotExchange,
    coin: &str,
    symbol: &str,
    timeout: Duration,
) -> Option<PriceQuote> {
    let result = match tokio::time::timeout(timeout, exchange.last_price(symbol)).await {
        Ok(result) => result,
        Err(_) => Err(ExchangeError::Timeout(timeout)),
    };

    match result {
        Ok(Some(price)) => Some(PriceQuote {
            exchange: exchange.id(),
            coin: coin.to_string(),
            price,
            timestamp: Utc::now(),
        }),
        Ok(None) => {
            debug!("{} has no price for {}", exchange.id(), symbol);
            None
        }
        Err(e) => {
            warn!("price fetch error from {} ({}): {}", exchange.id(), symbol, e);
            None
        }
    }
}

// Convenience re-exports
pub use bybit::BybitClient;
pub use gate::GateClient;
pub use mexc::MexcClient;
pub use okx::OkxClient;

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// 응답을 정해둔 가짜 거래소
    pub struct FakeExchange {
        pub id: ExchangeId,
        pub symbols: Result<HashMap<String, String>, String>,
        pub price: Result<Option<f64>, String>,
        pub delay: Duration,
    }

    #[async_trait]
    impl SpotExchange for FakeExchange {
        fn id(&self) -> ExchangeId {
            self.id
        }

        async fn usdt_symbols(&self) -> Result<HashMap<String, String>, ExchangeError> {
            tokio::time::sleep(self.delay).await;
            self.symbols.clone().map_err(ExchangeError::Other)
        }

        async fn last_price(&self, _symbol: &str) -> Result<Option<f64>, ExchangeError> {
            tokio::time::sleep(self.delay).await;
            self.price.clone().map_err(ExchangeError::Other)
        }
    }
}
