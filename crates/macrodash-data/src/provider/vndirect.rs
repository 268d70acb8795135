//! VNDirect 현재가 조회.
//!
//! finfo v4 종가 엔드포인트를 먼저 시도하고, 실패하면 가격 스냅샷 서비스로 넘어갑니다.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{classify_status, http_client, PriceSource};
use crate::error::FetchError;

/// finfo v4 종가 엔드포인트
pub const DEFAULT_PRICES_URL: &str = "https://finfo-api.vndirect.com.vn/v4/stock_prices/";
/// 가격 스냅샷 엔드포인트
pub const DEFAULT_SNAPSHOT_URL: &str = "https://prices.vndirect.com.vn/priceservice/snapshot";

/// v4 응답에서 확인할 가격 키 (우선순위 순)
const V4_PRICE_KEYS: &[&str] = &["close", "adClose", "matchPrice", "last"];
/// 스냅샷 응답에서 확인할 가격 키 (우선순위 순)
const SNAPSHOT_PRICE_KEYS: &[&str] = &["lastPrice", "matchedPrice", "last"];

/// VNDirect 가격 클라이언트.
pub struct VndirectClient {
    client: Client,
    prices_url: String,
    snapshot_url: String,
}

impl VndirectClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(timeout)?,
            prices_url: DEFAULT_PRICES_URL.to_string(),
            snapshot_url: DEFAULT_SNAPSHOT_URL.to_string(),
        })
    }

    /// 엔드포인트 변경 (테스트/프록시용)
    pub fn with_urls(mut self, prices_url: impl Into<String>, snapshot_url: impl Into<String>) -> Self {
        self.prices_url = prices_url.into();
        self.snapshot_url = snapshot_url.into();
        self
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)], what: &str) -> Result<Value, FetchError> {
        let response = self.client.get(url).query(query).send().await?;
        if let Some(err) = classify_status(response.status(), what) {
            return Err(err);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Parse(format!("{} 형식 오류: {}", what, e)))
    }

    /// finfo v4 최신 종가
    pub async fn fetch_latest_close(&self, symbol: &str) -> Result<Decimal, FetchError> {
        let query = [
            ("q", format!("code:{}", symbol)),
            ("sort", "date:desc".to_string()),
            ("size", "1".to_string()),
        ];
        let json = self.get_json(&self.prices_url, &query, "VNDirect v4").await?;

        let item = json
            .get("data")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .ok_or_else(|| FetchError::NotFound(format!("VNDirect v4 가격 없음: {}", symbol)))?;

        first_price(item, V4_PRICE_KEYS)
            .ok_or_else(|| FetchError::Parse(format!("VNDirect v4 가격 필드 없음: {}", symbol)))
    }

    /// 스냅샷 서비스 현재가
    pub async fn fetch_snapshot_price(&self, symbol: &str) -> Result<Decimal, FetchError> {
        let query = [("symbols", symbol.to_string())];
        let json = self.get_json(&self.snapshot_url, &query, "VNDirect snapshot").await?;
        snapshot_price(&json, symbol)
            .ok_or_else(|| FetchError::NotFound(format!("VNDirect 스냅샷 가격 없음: {}", symbol)))
    }
}

#[async_trait]
impl PriceSource for VndirectClient {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, FetchError> {
        match self.fetch_latest_close(symbol).await {
            Ok(price) => Ok(price),
            Err(e) => {
                debug!(symbol, error = %e, "v4 가격 실패, 스냅샷 시도");
                self.fetch_snapshot_price(symbol).await
            }
        }
    }
}

fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn first_price(item: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter().find_map(|key| item.get(*key).and_then(decimal_of))
}

/// 스냅샷 응답은 배열이거나 `{"data": [...]}` 형태
fn snapshot_price(json: &Value, symbol: &str) -> Option<Decimal> {
    let items = json
        .as_array()
        .or_else(|| json.get("data").and_then(Value::as_array))?;

    items
        .iter()
        .filter(|item| {
            item.get("symbol")
                .or_else(|| item.get("code"))
                .and_then(Value::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case(symbol))
        })
        .find_map(|item| first_price(item, SNAPSHOT_PRICE_KEYS))
}
