mod error;
mod exchange;
mod market;
mod spread;

pub use error::ExchangeError;
pub use exchange::{ExchangeId, ParseExchangeIdError};
pub use market::{CoinSymbolMap, PriceQuote, PriceSnapshot, TransferStatus};
pub use spread::{ArbitrageLeg, HistoryRecord, SpreadResult};

/// 모든 거래소에서 공통으로 사용하는 견적 통화
pub const QUOTE_ASSET: &str = "USDT";
