//! REST client for the exchange's read-only market-data endpoints.
//!
//! Each call attempts exactly once; retry policy lives with the caller
//! (Registry retries forever with back-off, Poller skips to the next cycle)
//! per the error-handling design.

use std::time::Duration;

use reqwest::Client as HttpClient;
use tracing::debug;

use super::types::{ExchangeStatus, MarketDto, MarketsPage, OrderbookResponse};
use crate::error::Result;

pub struct RestClient {
    http: HttpClient,
    base_url: String,
}

impl RestClient {
    #[must_use]
    pub fn new(base_url: String, request_timeout: Duration) -> Self {
        let http = HttpClient::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self { http, base_url }
    }

    pub async fn exchange_status(&self) -> Result<ExchangeStatus> {
        let url = format!("{}/exchange/status", self.base_url);
        let status: ExchangeStatus = self.http.get(&url).send().await?.json().await?;
        Ok(status)
    }

    /// Fetches one page of instruments for a given status, following the
    /// exchange's opaque cursor.
    pub async fn markets_page(
        &self,
        status: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<MarketsPage> {
        let mut url = format!(
            "{}/markets?status={status}&limit={page_size}",
            self.base_url
        );
        if let Some(cursor) = cursor {
            url.push_str("&cursor=");
            url.push_str(cursor);
        }
        debug!(url = %url, "fetching markets page");
        let page: MarketsPage = self.http.get(&url).send().await?.json().await?;
        Ok(page)
    }

    pub async fn market(&self, ticker: &str) -> Result<MarketDto> {
        let url = format!("{}/markets/{ticker}", self.base_url);
        let market: MarketDto = self.http.get(&url).send().await?.json().await?;
        Ok(market)
    }

    pub async fn orderbook(&self, ticker: &str) -> Result<OrderbookResponse> {
        let url = format!("{}/markets/{ticker}/orderbook", self.base_url);
        let book: OrderbookResponse = self.http.get(&url).send().await?.json().await?;
        Ok(book)
    }
}
