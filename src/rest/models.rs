//! Request bodies for the order endpoints.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum OrderSide {
    Buy = 1,
    Sell = 2,
}

impl From<OrderSide> for u8 {
    fn from(side: OrderSide) -> Self {
        side as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum OrderType {
    Market = 1,
    Limit = 2,
}

impl From<OrderType> for u8 {
    fn from(order_type: OrderType) -> Self {
        order_type as u8
    }
}

fn new_client_order_id() -> String {
    Uuid::new_v4().to_string()
}

/// A new order. `price` is only sent for limit orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub client_order_id: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub order_quantity: u64,
    pub ticker: String,
    pub class_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl NewOrder {
    pub fn market(
        side: OrderSide,
        order_quantity: u64,
        ticker: impl Into<String>,
        class_code: impl Into<String>,
    ) -> Self {
        Self {
            client_order_id: new_client_order_id(),
            side,
            order_type: OrderType::Market,
            order_quantity,
            ticker: ticker.into(),
            class_code: class_code.into(),
            price: None,
        }
    }

    pub fn limit(
        side: OrderSide,
        order_quantity: u64,
        price: f64,
        ticker: impl Into<String>,
        class_code: impl Into<String>,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            ..Self::market(side, order_quantity, ticker, class_code)
        }
    }

    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = client_order_id.into();
        self
    }

    /// Copy with `price` dropped unless this is a limit order.
    pub(crate) fn normalized(&self) -> Self {
        let mut order = self.clone();
        if order.order_type != OrderType::Limit {
            order.price = None;
        }
        order
    }
}

/// Replacement parameters for an open order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOrder {
    pub client_order_id: String,
    pub price: f64,
    pub order_quantity: u64,
    pub class_code: String,
}

impl EditOrder {
    pub fn new(price: f64, order_quantity: u64, class_code: impl Into<String>) -> Self {
        Self {
            client_order_id: new_client_order_id(),
            price,
            order_quantity,
            class_code: class_code.into(),
        }
    }

    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = client_order_id.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CancelOrder {
    pub client_order_id: String,
}

impl CancelOrder {
    pub fn new(client_order_id: Option<String>) -> Self {
        Self {
            client_order_id: client_order_id.unwrap_or_else(new_client_order_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_market_order_has_no_price() {
        let order = NewOrder::market(OrderSide::Buy, 10, "SBER", "TQBR").with_client_order_id("id-1");
        assert_eq!(
            serde_json::to_value(&order).unwrap(),
            json!({
                "clientOrderId": "id-1",
                "side": 1,
                "orderType": 1,
                "orderQuantity": 10,
                "ticker": "SBER",
                "classCode": "TQBR"
            })
        );
    }

    #[test]
    fn test_limit_order_has_price() {
        let order = NewOrder::limit(OrderSide::Sell, 1, 250.5, "GAZP", "TQBR");
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["side"], 2);
        assert_eq!(value["orderType"], 2);
        assert_eq!(value["price"], 250.5);
    }

    #[test]
    fn test_normalized_drops_price_on_market() {
        let mut order = NewOrder::market(OrderSide::Buy, 1, "SBER", "TQBR");
        order.price = Some(1.0);
        assert_eq!(order.normalized().price, None);
    }

    #[test]
    fn test_client_order_ids_are_fresh_uuids() {
        let a = NewOrder::market(OrderSide::Buy, 1, "SBER", "TQBR");
        let b = NewOrder::market(OrderSide::Buy, 1, "SBER", "TQBR");
        assert_ne!(a.client_order_id, b.client_order_id);
        assert!(Uuid::parse_str(&a.client_order_id).is_ok());
        assert!(Uuid::parse_str(&CancelOrder::new(None).client_order_id).is_ok());
    }

    #[test]
    fn test_edit_order_body() {
        let edit = EditOrder::new(99.5, 3, "TQBR").with_client_order_id("edit-1");
        assert_eq!(
            serde_json::to_value(&edit).unwrap(),
            json!({"clientOrderId": "edit-1", "price": 99.5, "orderQuantity": 3, "classCode": "TQBR"})
        );
    }
}
