use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tracing::info;

use exchanges::{list_usdt_symbols, SpotExchange};
use interface::CoinSymbolMap;

/// 모든 거래소의 USDT 거래쌍을 동시에 조회해서 코인 맵을 만든다
/// 실패한 거래소는 빈 목록으로 취급되므로 이 함수는 실패하지 않는다
pub async fn reconcile(exchanges: &[Arc<dyn SpotExchange>], timeout: Duration) -> CoinSymbolMap {
    let listings = join_all(exchanges.iter().map(|exchange| async move {
        let symbols = list_usdt_symbols(exchange.as_ref(), timeout).await;
        (exchange.id(), symbols)
    }))
    .await;

    for (exchange, symbols) in &listings {
        info!("{}: USDT 거래쌍 {}개", exchange, symbols.len());
    }

    let map = CoinSymbolMap::from_listings(listings);
    info!("2개 이상 거래소에 상장된 코인: {}개", map.len());
    map
}
