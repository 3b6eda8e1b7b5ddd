//! The fixed set of subscription channels and their endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MARKET_DATA_PATH: &str = "/trade-api-market-data-connector/api/v1/market-data/ws";

/// Kind of market data carried by a market-data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DataType {
    OrderBook = 0,
    LastCandle = 1,
    Trades = 2,
    Quotes = 3,
}

impl From<DataType> for u8 {
    fn from(data_type: DataType) -> Self {
        data_type as u8
    }
}

impl TryFrom<u8> for DataType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataType::OrderBook),
            1 => Ok(DataType::LastCandle),
            2 => Ok(DataType::Trades),
            3 => Ok(DataType::Quotes),
            other => Err(format!("unknown dataType {}", other)),
        }
    }
}

/// One named subscription stream. Each channel owns its own connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Limits,
    Portfolio,
    Executions,
    Transactions,
    Quotes,
    LastCandle,
    OrderBook,
    Trades,
    Margins,
}

impl Channel {
    pub const ALL: [Channel; 9] = [
        Channel::Limits,
        Channel::Portfolio,
        Channel::Executions,
        Channel::Transactions,
        Channel::Quotes,
        Channel::LastCandle,
        Channel::OrderBook,
        Channel::Trades,
        Channel::Margins,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Limits => "limits",
            Channel::Portfolio => "portfolio",
            Channel::Executions => "executions",
            Channel::Transactions => "transactions",
            Channel::Quotes => "quotes",
            Channel::LastCandle => "last_candle",
            Channel::OrderBook => "order_book",
            Channel::Trades => "trades",
            Channel::Margins => "margins",
        }
    }

    /// WebSocket path relative to the WS base URL.
    pub fn path(self) -> &'static str {
        match self {
            Channel::Limits => "/trade-api-bff-limit/api/v1/limits/ws",
            Channel::Portfolio => "/trade-api-bff-portfolio/api/v1/portfolio/ws",
            Channel::Executions => "/trade-api-bff-operations/api/v1/orders/execution/ws",
            Channel::Transactions => "/trade-api-bff-operations/api/v1/orders/transaction/ws",
            Channel::Quotes | Channel::LastCandle | Channel::OrderBook | Channel::Trades => {
                MARKET_DATA_PATH
            }
            Channel::Margins => {
                "/trade-api-bff-marginal-indicators/api/v1/marginal-indicators/ws"
            }
        }
    }

    /// `dataType` expected in control frames, for market-data channels.
    pub fn data_type(self) -> Option<DataType> {
        match self {
            Channel::Quotes => Some(DataType::Quotes),
            Channel::LastCandle => Some(DataType::LastCandle),
            Channel::OrderBook => Some(DataType::OrderBook),
            Channel::Trades => Some(DataType::Trades),
            _ => None,
        }
    }

    pub fn is_market_data(self) -> bool {
        self.data_type().is_some()
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| format!("unknown channel '{}'", s))
    }
}
