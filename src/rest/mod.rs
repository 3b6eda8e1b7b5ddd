//! REST access: response normalization and the endpoint catalogue.

pub mod client;
pub mod models;
pub mod normalize;

pub use client::RestClient;
pub use models::{EditOrder, NewOrder, OrderSide, OrderType};
pub use normalize::{check_result, ApiResponse};
