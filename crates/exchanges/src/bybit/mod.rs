pub mod spot;

pub(crate) const BASE_URL: &str = "https://api.bybit.com";

#[derive(Clone)]
pub struct BybitClient {
    pub(crate) http: reqwest::Client,
}

impl BybitClient {
    pub fn new() -> Self {
        Self {
            http: crate::http_client(),
        }
    }
}

impl Default for BybitClient {
    fn default() -> Self {
        Self::new()
    }
}
