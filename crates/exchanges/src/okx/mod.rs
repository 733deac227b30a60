pub mod spot;

pub(crate) const BASE_URL: &str = "https://www.okx.com";

#[derive(Clone)]
pub struct OkxClient {
    pub(crate) http: reqwest::Client,
}

impl OkxClient {
    pub fn new() -> Self {
        Self {
            http: crate::http_client(),
        }
    }
}

impl Default for OkxClient {
    fn default() -> Self {
        Self::new()
    }
}
