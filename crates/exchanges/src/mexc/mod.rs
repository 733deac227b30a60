use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;

use interface::TransferStatus;

use crate::ExchangeError;

pub mod asset;
pub mod spot;

pub(crate) const BASE_URL: &str = "https://api.mexc.com";

/// 입출금 상태 캐시 유지 시간
/// getall 응답은 모든 코인을 포함하므로 코인마다 다시 부르지 않는다
pub(crate) const STATUS_CACHE_TTL: Duration = Duration::from_secs(60);

pub(crate) type StatusCache = Arc<RwLock<Option<(Instant, HashMap<String, TransferStatus>)>>>;

/// MEXC 클라이언트
/// 시세 조회는 공개 API, 입출금 상태 조회는 API 키가 필요하다
#[derive(Clone)]
pub struct MexcClient {
    pub(crate) http: reqwest::Client,
    pub(crate) api_key: Option<String>,
    pub(crate) api_secret: Option<String>,
    pub(crate) status_cache: StatusCache,
}

impl MexcClient {
    /// 공개 API만 사용하는 경우
    pub fn new() -> Self {
        Self {
            http: crate::http_client(),
            api_key: None,
            api_secret: None,
            status_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// 인증이 필요한 API(입출금 상태)를 사용하는 경우
    pub fn with_keys(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_secret: Some(api_secret.into()),
            ..Self::new()
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

impl Default for MexcClient {
    fn default() -> Self {
        Self::new()
    }
}

type HmacSha256 = Hmac<Sha256>;

/// MEXC API 서명 생성
/// query_string: 쿼리 파라미터 문자열 (예: "timestamp=1234567890&recvWindow=5000")
pub fn generate_signature(query_string: &str, api_secret: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| ExchangeError::Other(format!("invalid MEXC secret: {}", e)))?;
    mac.update(query_string.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// 타임스탬프 생성 (밀리초)
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_signature_matches_reference() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let sig =
            generate_signature("The quick brown fox jumps over the lazy dog", "key").unwrap();
        assert_eq!(
            sig,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_credentials() {
        assert!(!MexcClient::new().has_credentials());
        assert!(MexcClient::with_keys("k", "s").has_credentials());
    }
}
