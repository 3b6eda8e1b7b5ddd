//! Control frames for market-data channels.

use serde::{Deserialize, Serialize};

use super::channel::DataType;

/// Depth requested when the caller leaves it unset. The broker serves 1..=20.
pub const DEFAULT_ORDER_BOOK_DEPTH: u8 = 20;

/// Add or remove interest in instruments on a shared connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SubscribeType {
    Subscribe = 0,
    Unsubscribe = 1,
}

impl From<SubscribeType> for u8 {
    fn from(subscribe_type: SubscribeType) -> Self {
        subscribe_type as u8
    }
}

impl TryFrom<u8> for SubscribeType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SubscribeType::Subscribe),
            1 => Ok(SubscribeType::Unsubscribe),
            other => Err(format!("unknown subscribeType {}", other)),
        }
    }
}

/// A tradable security: trading-mode code plus ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub class_code: String,
    pub ticker: String,
}

impl Instrument {
    pub fn new(class_code: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            class_code: class_code.into(),
            ticker: ticker.into(),
        }
    }
}

/// JSON filter frame sent over a market-data connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataRequest {
    pub subscribe_type: SubscribeType,
    pub data_type: DataType,
    pub instruments: Vec<Instrument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_frame: Option<String>,
}

impl MarketDataRequest {
    fn new(subscribe_type: SubscribeType, data_type: DataType, instruments: Vec<Instrument>) -> Self {
        Self {
            subscribe_type,
            data_type,
            instruments,
            depth: None,
            time_frame: None,
        }
    }

    pub fn quotes(subscribe_type: SubscribeType, instruments: Vec<Instrument>) -> Self {
        Self::new(subscribe_type, DataType::Quotes, instruments)
    }

    /// Last candle updates for `time_frame` (e.g. `M1`, `H1`, `D`).
    pub fn last_candle(
        subscribe_type: SubscribeType,
        instruments: Vec<Instrument>,
        time_frame: impl Into<String>,
    ) -> Self {
        Self {
            time_frame: Some(time_frame.into()),
            ..Self::new(subscribe_type, DataType::LastCandle, instruments)
        }
    }

    /// Order book snapshots. `depth` is sent as given; `None` means 20.
    pub fn order_book(
        subscribe_type: SubscribeType,
        instruments: Vec<Instrument>,
        depth: Option<u8>,
    ) -> Self {
        Self {
            depth: Some(depth.unwrap_or(DEFAULT_ORDER_BOOK_DEPTH)),
            ..Self::new(subscribe_type, DataType::OrderBook, instruments)
        }
    }

    pub fn trades(subscribe_type: SubscribeType, instruments: Vec<Instrument>) -> Self {
        Self::new(subscribe_type, DataType::Trades, instruments)
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sber() -> Vec<Instrument> {
        vec![Instrument::new("TQBR", "SBER")]
    }

    #[test]
    fn test_quotes_frame() {
        let request = MarketDataRequest::quotes(SubscribeType::Subscribe, sber());
        let value: serde_json::Value = serde_json::from_str(&request.to_frame().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "subscribeType": 0,
                "dataType": 3,
                "instruments": [{"classCode": "TQBR", "ticker": "SBER"}]
            })
        );
    }

    #[test]
    fn test_last_candle_frame_carries_time_frame() {
        let request = MarketDataRequest::last_candle(SubscribeType::Unsubscribe, sber(), "M5");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["subscribeType"], 1);
        assert_eq!(value["dataType"], 1);
        assert_eq!(value["timeFrame"], "M5");
        assert!(value.get("depth").is_none());
    }

    #[test]
    fn test_order_book_depth_defaults_to_twenty() {
        let default = MarketDataRequest::order_book(SubscribeType::Subscribe, sber(), None);
        assert_eq!(default.depth, Some(20));
        assert_eq!(serde_json::to_value(&default).unwrap()["dataType"], 0);
    }

    #[test]
    fn test_order_book_depth_sent_unchanged() {
        let shallow = MarketDataRequest::order_book(SubscribeType::Subscribe, sber(), Some(5));
        assert_eq!(serde_json::to_value(&shallow).unwrap()["depth"], 5);
        // Out-of-range values are left for the broker to reject.
        let deep = MarketDataRequest::order_book(SubscribeType::Subscribe, sber(), Some(50));
        assert_eq!(serde_json::to_value(&deep).unwrap()["depth"], 50);
    }

    #[test]
    fn test_trades_frame() {
        let request = MarketDataRequest::trades(SubscribeType::Subscribe, sber());
        assert_eq!(serde_json::to_value(&request).unwrap()["dataType"], 2);
    }
}
