pub mod asset;
pub mod spot;

pub(crate) const BASE_URL: &str = "https://api.gateio.ws";

/// Gate.io 클라이언트 (현물 시세, 코인 입출금 상태 모두 공개 API)
#[derive(Clone)]
pub struct GateClient {
    pub(crate) http: reqwest::Client,
}

impl GateClient {
    pub fn new() -> Self {
        Self {
            http: crate::http_client(),
        }
    }
}

impl Default for GateClient {
    fn default() -> Self {
        Self::new()
    }
}
