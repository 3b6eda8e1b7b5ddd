//! WebSocket subscription channels.
//!
//! - [`Channel`] names the nine streams and their endpoints
//! - [`MarketDataRequest`] is the filter frame for market-data channels
//! - [`SubscriptionManager`] owns the connections and dispatches frames to
//!   each channel's [`EventBus`](crate::events::EventBus)

pub mod channel;
pub mod manager;
pub mod request;

pub use channel::{Channel, DataType};
pub use manager::SubscriptionManager;
pub use request::{Instrument, MarketDataRequest, SubscribeType};
