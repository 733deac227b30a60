use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 지원하는 현물 거래소
/// 선언 순서가 스냅샷 순회 순서가 된다
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Mexc,
    Gate,
    Bybit,
    Okx,
}

impl ExchangeId {
    pub const ALL: [ExchangeId; 4] = [
        ExchangeId::Mexc,
        ExchangeId::Gate,
        ExchangeId::Bybit,
        ExchangeId::Okx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Mexc => "mexc",
            ExchangeId::Gate => "gate",
            ExchangeId::Bybit => "bybit",
            ExchangeId::Okx => "okx",
        }
    }

    /// 리포트에 표시되는 이름 (예: "Bybit")
    pub fn label(&self) -> &'static str {
        match self {
            ExchangeId::Mexc => "Mexc",
            ExchangeId::Gate => "Gate",
            ExchangeId::Bybit => "Bybit",
            ExchangeId::Okx => "Okx",
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown exchange: {0}")]
pub struct ParseExchangeIdError(pub String);

impl FromStr for ExchangeId {
    type Err = ParseExchangeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mexc" => Ok(ExchangeId::Mexc),
            "gate" | "gateio" | "gate.io" => Ok(ExchangeId::Gate),
            "bybit" => Ok(ExchangeId::Bybit),
            "okx" => Ok(ExchangeId::Okx),
            other => Err(ParseExchangeIdError(other.to_string())),
        }
    }
}
