use std::collections::{BTreeSet, HashMap};
use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tracing::{debug, warn};

use exchanges::{AssetStatusExchange, ExchangeError};
use interface::ExchangeId;

/// 입출금 상태 확인
///
/// 상태 조회를 지원하는 거래소만 확인한다. 조회 실패나 타임아웃은
/// "알 수 없음"이므로 제한된 것으로 표시한다.
pub struct TransferChecker {
    exchanges: HashMap<ExchangeId, Arc<dyn AssetStatusExchange>>,
    timeout: Duration,
}

impl TransferChecker {
    pub fn new(exchanges: Vec<Arc<dyn AssetStatusExchange>>, timeout: Duration) -> Self {
        Self {
            exchanges: exchanges.into_iter().map(|ex| (ex.id(), ex)).collect(),
            timeout,
        }
    }

    pub fn supports(&self, exchange: ExchangeId) -> bool {
        self.exchanges.contains_key(&exchange)
    }

    /// candidates 중 입출금이 막혔거나 확인할 수 없는 거래소 집합
    pub async fn restricted<I>(&self, coin: &str, candidates: I) -> BTreeSet<ExchangeId>
    where
        I: IntoIterator<Item = ExchangeId>,
    {
        let checks = candidates
            .into_iter()
            .filter_map(|id| self.exchanges.get(&id).map(|ex| (id, ex.clone())))
            .map(|(id, exchange)| async move {
                let result =
                    match tokio::time::timeout(self.timeout, exchange.transfer_status(coin)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ExchangeError::Timeout(self.timeout)),
                    };

                match result {
                    Ok(status) if status.is_restricted() => {
                        debug!("{} {}: transfer restricted {:?}", id, coin, status);
                        Some(id)
                    }
                    Ok(_) => None,
                    Err(e) => {
                        warn!("transfer status error from {} ({}): {}", id, coin, e);
                        Some(id)
                    }
                }
            });

        join_all(checks).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAssetStatus;
    use interface::TransferStatus;

    const OPEN: TransferStatus = TransferStatus {
        deposit_enabled: true,
        withdraw_enabled: true,
    };

    fn checker(statuses: Vec<(ExchangeId, Result<TransferStatus, String>)>) -> TransferChecker {
        let exchanges: Vec<Arc<dyn AssetStatusExchange>> = statuses
            .into_iter()
            .map(|(id, status)| Arc::new(MockAssetStatus { id, status }) as Arc<dyn AssetStatusExchange>)
            .collect();
        TransferChecker::new(exchanges, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_open_exchanges_not_restricted() {
        let checker = checker(vec![(ExchangeId::Gate, Ok(OPEN)), (ExchangeId::Mexc, Ok(OPEN))]);
        let restricted = checker.restricted("ABC", ExchangeId::ALL).await;
        assert!(restricted.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_and_failed_are_restricted() {
        let checker = checker(vec![
            (
                ExchangeId::Gate,
                Ok(TransferStatus {
                    deposit_enabled: true,
                    withdraw_enabled: false,
                }),
            ),
            (ExchangeId::Mexc, Err("network".to_string())),
        ]);
        let restricted = checker.restricted("ABC", ExchangeId::ALL).await;
        assert_eq!(
            restricted.into_iter().collect::<Vec<_>>(),
            vec![ExchangeId::Mexc, ExchangeId::Gate]
        );
    }

    #[tokio::test]
    async fn test_unsupported_and_unlisted_exchanges_skipped() {
        let checker = checker(vec![(ExchangeId::Mexc, Err("down".to_string()))]);
        assert!(!checker.supports(ExchangeId::Okx));

        // Mexc가 후보에 없으면 조회하지 않는다
        let restricted = checker
            .restricted("ABC", [ExchangeId::Okx, ExchangeId::Bybit])
            .await;
        assert!(restricted.is_empty());
    }
}
