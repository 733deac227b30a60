use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("message to {recipient} timed out after {timeout:?}")]
    Timeout { recipient: String, timeout: Duration },
    #[error("message to {recipient} rejected: {description}")]
    Rejected {
        recipient: String,
        description: String,
    },
}

/// 텍스트 메시지를 수신자에게 보내는 알림 채널
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError>;
}

/// 모든 수신자에게 동시에 전송. 수신자별 실패는 서로 영향을 주지 않는다
/// 수신자마다 timeout이 걸리며 시간 초과는 전송 실패로 센다
/// 성공한 전송 수를 반환
pub async fn broadcast(
    notifier: &dyn Notifier,
    recipients: &[String],
    text: &str,
    timeout: Duration,
) -> usize {
    let results = join_all(recipients.iter().map(|recipient| async move {
        let result = match tokio::time::timeout(timeout, notifier.send(recipient, text)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout {
                recipient: recipient.clone(),
                timeout,
            }),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("notification to {} failed: {}", recipient, e);
                false
            }
        }
    }))
    .await;

    results.into_iter().filter(|delivered| *delivered).count()
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API sendMessage
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    token: String,
}

impl TelegramNotifier {
    /// timeout: 요청 하나당 제한 시간
    pub fn new(token: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            token: token.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{TELEGRAM_API_URL}/bot{}/sendMessage", self.token);
        // 오류 메시지에 토큰이 포함된 URL이 남지 않도록 제거
        let response: TelegramResponse = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "chat_id": recipient, "text": text }))
            .send()
            .await
            .map_err(|e| e.without_url())?
            .json()
            .await
            .map_err(|e| e.without_url())?;

        if !response.ok {
            return Err(NotifyError::Rejected {
                recipient: recipient.to_string(),
                description: response.description.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
