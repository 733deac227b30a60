use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("api error: {code} - {msg}")]
    Api { code: String, msg: String },
    #[error("unexpected response: {0}")]
    Schema(String),
    #[error("other error: {0}")]
    Other(String),
}

impl ExchangeError {
    /// 응답 본문 일부를 포함한 스키마 오류 생성
    pub fn schema(err: impl std::fmt::Display, body: &str) -> Self {
        ExchangeError::Schema(format!(
            "{}, response: {}",
            err,
            body.chars().take(200).collect::<String>()
        ))
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Schema(err.to_string())
    }
}
