//! REST endpoint catalogue.
//!
//! Thin wrappers that attach the bearer token, build the URL and hand the
//! result to [`check_result`]. A token failure is logged and yields `None`
//! like any other failed request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::models::{CancelOrder, EditOrder, NewOrder};
use super::normalize::{check_result, ApiResponse};
use crate::auth::TokenManager;
use crate::config::ClientConfig;
use crate::traits::{Headers, HttpClient};

const LIMITS: &str = "/trade-api-bff-limit/api/v1/limits";
const PORTFOLIO: &str = "/trade-api-bff-portfolio/api/v1/portfolio";
const ORDERS: &str = "/trade-api-bff-operations/api/v1/orders";
const CANDLES_CHART: &str = "/trade-api-market-data-connector/api/v1/candles-chart";
const INSTRUMENTS_BY_TICKERS: &str = "/trade-api-information-service/api/v1/instruments/by-tickers";
const INSTRUMENTS_BY_TYPE: &str = "/trade-api-information-service/api/v1/instruments/by-type";
const DAILY_SCHEDULE: &str =
    "/trade-api-information-service/api/v1/trading-schedule/daily-schedule";
const TRADING_STATUS: &str = "/trade-api-information-service/api/v1/trading-schedule/status";
const INSTRUMENTS_DISCOUNTS: &str = "/trade-api-bff-marginal-indicators/api/v1/instruments-discounts";

/// Append `query` to `path`, percent-encoding keys and values.
fn with_query(path: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let pairs: Vec<String> = query
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect();
    format!("{}?{}", path, pairs.join("&"))
}

pub struct RestClient {
    http: Arc<dyn HttpClient>,
    tokens: Arc<TokenManager>,
    config: ClientConfig,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("http_base", &self.config.http_base)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(http: Arc<dyn HttpClient>, tokens: Arc<TokenManager>, config: &ClientConfig) -> Self {
        Self {
            http,
            tokens,
            config: config.clone(),
        }
    }

    async fn auth_headers(&self, path: &str) -> Option<Headers> {
        match self.tokens.bearer_headers().await {
            Ok(headers) => Some(headers),
            Err(e) => {
                error!(code = e.error_code(), "No access token for {}: {}", path, e);
                None
            }
        }
    }

    /// Authenticated GET of `path` with `query`.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Option<ApiResponse> {
        let path = with_query(path, query);
        let headers = self.auth_headers(&path).await?;
        let result = self.http.get(&self.config.http_url(&path), &headers).await;
        check_result(&path, result)
    }

    /// Authenticated POST of `body` as JSON.
    pub async fn post_json<B>(&self, path: &str, body: &B) -> Option<ApiResponse>
    where
        B: Serialize + Sync + ?Sized,
    {
        let body = match serde_json::to_string(body) {
            Ok(body) => body,
            Err(e) => {
                error!("Could not serialize request for {}: {}", path, e);
                return None;
            }
        };
        let mut headers = self.auth_headers(path).await?;
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let result = self
            .http
            .post(&self.config.http_url(path), &body, &headers)
            .await;
        check_result(path, result)
    }

    /// Cash and position limits.
    pub async fn get_limits(&self) -> Option<ApiResponse> {
        self.get(LIMITS, &[]).await
    }

    pub async fn get_portfolio(&self) -> Option<ApiResponse> {
        self.get(PORTFOLIO, &[]).await
    }

    /// Place an order. `price` is dropped unless it is a limit order.
    pub async fn create_order(&self, order: &NewOrder) -> Option<ApiResponse> {
        self.post_json(ORDERS, &order.normalized()).await
    }

    /// Cancel the order placed as `original_client_order_id`. A fresh
    /// `clientOrderId` is generated when `client_order_id` is `None`.
    pub async fn cancel_order(
        &self,
        original_client_order_id: &str,
        client_order_id: Option<String>,
    ) -> Option<ApiResponse> {
        let path = format!(
            "{}/{}/cancel",
            ORDERS,
            urlencoding::encode(original_client_order_id)
        );
        self.post_json(&path, &CancelOrder::new(client_order_id)).await
    }

    pub async fn edit_order(
        &self,
        original_client_order_id: &str,
        edit: &EditOrder,
    ) -> Option<ApiResponse> {
        let path = format!("{}/{}", ORDERS, urlencoding::encode(original_client_order_id));
        self.post_json(&path, edit).await
    }

    /// Status of the order placed as `original_client_order_id`.
    pub async fn get_order(&self, original_client_order_id: &str) -> Option<ApiResponse> {
        let path = format!("{}/{}", ORDERS, urlencoding::encode(original_client_order_id));
        self.get(&path, &[]).await
    }

    /// Historical candles between `start` and `end`. `time_frame` is one of
    /// `M1 M5 M15 M30 H1 H4 D W MN`.
    pub async fn get_candles_chart(
        &self,
        class_code: &str,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        time_frame: &str,
    ) -> Option<ApiResponse> {
        let start = start.to_rfc3339();
        let end = end.to_rfc3339();
        self.get(
            CANDLES_CHART,
            &[
                ("classCode", class_code),
                ("ticker", ticker),
                ("startDate", start.as_str()),
                ("endDate", end.as_str()),
                ("timeFrame", time_frame),
            ],
        )
        .await
    }

    pub async fn get_instruments_by_tickers(&self, tickers: &[&str]) -> Option<ApiResponse> {
        self.post_json(INSTRUMENTS_BY_TICKERS, &json!({ "tickers": tickers }))
            .await
    }

    /// Instruments of `instrument_type` (`STOCK`, `BONDS`, `FUTURES`, ...).
    /// `base_asset_ticker` is required by the broker for `OPTIONS`.
    pub async fn get_instruments_by_type(
        &self,
        instrument_type: &str,
        base_asset_ticker: Option<&str>,
    ) -> Option<ApiResponse> {
        let mut query = vec![("type", instrument_type)];
        if let Some(base) = base_asset_ticker {
            query.push(("baseAssetTicker", base));
        }
        self.get(INSTRUMENTS_BY_TYPE, &query).await
    }

    pub async fn get_daily_schedule(&self, class_code: &str, ticker: &str) -> Option<ApiResponse> {
        self.get(DAILY_SCHEDULE, &[("classCode", class_code), ("ticker", ticker)])
            .await
    }

    pub async fn get_trading_status(&self, class_code: &str) -> Option<ApiResponse> {
        self.get(TRADING_STATUS, &[("classCode", class_code)]).await
    }

    pub async fn get_instruments_discounts(&self) -> Option<ApiResponse> {
        self.get(INSTRUMENTS_DISCOUNTS, &[]).await
    }
}
