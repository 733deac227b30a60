use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use exchanges::{AssetStatusExchange, ExchangeError, SpotExchange};
use interface::{ExchangeId, TransferStatus};

use crate::notify::{Notifier, NotifyError};

/// 테스트용 가격 응답
#[derive(Clone)]
pub enum MockPrice {
    Price(f64),
    Absent,
    Fail,
    Hang,
}

/// 코인별 응답을 미리 정해둔 거래소
pub struct MockExchange {
    pub id: ExchangeId,
    pub listing: Mutex<Result<HashMap<String, String>, String>>,
    pub prices: Mutex<HashMap<String, MockPrice>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockExchange {
    pub fn new(id: ExchangeId) -> Self {
        Self {
            id,
            listing: Mutex::new(Ok(HashMap::new())),
            prices: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn listing(self, coins: &[&str]) -> Self {
        self.set_listing(coins);
        self
    }

    pub fn failing_listing(self) -> Self {
        self.set_listing_failing();
        self
    }

    pub fn set_listing(&self, coins: &[&str]) {
        *self.listing.lock().unwrap() = Ok(coins
            .iter()
            .map(|coin| (coin.to_string(), native_symbol(self.id, coin)))
            .collect());
    }

    pub fn set_listing_failing(&self) {
        *self.listing.lock().unwrap() = Err("listing down".to_string());
    }

    pub fn price(self, coin: &str, price: MockPrice) -> Self {
        self.set_price(coin, price);
        self
    }

    pub fn set_price(&self, coin: &str, price: MockPrice) {
        self.prices
            .lock()
            .unwrap()
            .insert(native_symbol(self.id, coin), price);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// 거래소별 심볼 형식
pub fn native_symbol(id: ExchangeId, coin: &str) -> String {
    match id {
        ExchangeId::Mexc | ExchangeId::Bybit => format!("{coin}USDT"),
        ExchangeId::Gate => format!("{coin}_USDT"),
        ExchangeId::Okx => format!("{coin}-USDT"),
    }
}

#[async_trait]
impl SpotExchange for MockExchange {
    fn id(&self) -> ExchangeId {
        self.id
    }

    async fn usdt_symbols(&self) -> Result<HashMap<String, String>, ExchangeError> {
        self.listing.lock().unwrap().clone().map_err(ExchangeError::Other)
    }

    async fn last_price(&self, symbol: &str) -> Result<Option<f64>, ExchangeError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        let price = self.prices.lock().unwrap().get(symbol).cloned();
        match price {
            Some(MockPrice::Price(p)) => Ok(Some(p)),
            Some(MockPrice::Absent) | None => Ok(None),
            Some(MockPrice::Fail) => Err(ExchangeError::Other("mock failure".to_string())),
            Some(MockPrice::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }
    }
}

/// 입출금 상태 응답을 정해둔 거래소
pub struct MockAssetStatus {
    pub id: ExchangeId,
    pub status: Result<TransferStatus, String>,
}

#[async_trait]
impl AssetStatusExchange for MockAssetStatus {
    fn id(&self) -> ExchangeId {
        self.id
    }

    async fn transfer_status(&self, _coin: &str) -> Result<TransferStatus, ExchangeError> {
        self.status.clone().map_err(ExchangeError::Other)
    }
}

/// 보낸 메시지를 기록하는 알림 채널
#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub failing: Vec<String>,
}

impl MockNotifier {
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        if self.failing.iter().any(|r| r == recipient) {
            return Err(NotifyError::Rejected {
                recipient: recipient.to_string(),
                description: "mock rejection".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

/// 지정한 수신자에게는 응답하지 않는 알림 채널
#[derive(Default)]
pub struct StalledNotifier {
    pub stalled: Vec<String>,
}

impl StalledNotifier {
    pub fn stalling_for(recipients: &[&str]) -> Self {
        Self {
            stalled: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Notifier for StalledNotifier {
    async fn send(&self, recipient: &str, _text: &str) -> Result<(), NotifyError> {
        if self.stalled.iter().any(|r| r == recipient) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
