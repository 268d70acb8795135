//! Alpha Vantage 경제 지표 어댑터.
//!
//! 시리즈 ID 형식: `FUNCTION` 또는 `FUNCTION:maturity`
//! (예: `CPI`, `TREASURY_YIELD:10year`).
//!
//! Alpha Vantage는 쿼터 초과나 프리미엄 전용 요청에도 HTTP 200을 돌려주고
//! 본문의 `Note` / `Information` 키로 알리므로 본문으로 분류합니다.

use async_trait::async_trait;
use macrodash_core::SourceKind;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{
    classify_status, http_client, parse_observation_date, parse_observation_value, Observation,
    SeriesSource,
};
use crate::error::FetchError;

/// Alpha Vantage 기본 URL
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage API 클라이언트.
pub struct AlphaVantageClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: SecretString::new(api_key.into().into_boxed_str()),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// 기본 URL 변경 (테스트/프록시용)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// 시리즈 ID를 (function, maturity)로 분리
fn split_series_id(series_id: &str) -> (&str, Option<&str>) {
    match series_id.split_once(':') {
        Some((function, maturity)) => (function, Some(maturity)),
        None => (series_id, None),
    }
}

/// 함수별 조회 간격 (없으면 API 기본값)
fn interval_for(function: &str) -> Option<&'static str> {
    match function {
        "TREASURY_YIELD" | "FEDERAL_FUNDS_RATE" => Some("daily"),
        "CPI" => Some("monthly"),
        "REAL_GDP" => Some("quarterly"),
        _ => None,
    }
}

#[async_trait]
impl SeriesSource for AlphaVantageClient {
    fn kind(&self) -> SourceKind {
        SourceKind::AlphaVantage
    }

    async fn fetch(&self, series_id: &str) -> Result<Observation, FetchError> {
        let (function, maturity) = split_series_id(series_id);

        let mut params: Vec<(&str, &str)> = vec![
            ("function", function),
            ("apikey", self.api_key.expose_secret()),
        ];
        if let Some(maturity) = maturity {
            params.push(("maturity", maturity));
        }
        if let Some(interval) = interval_for(function) {
            params.push(("interval", interval));
        }

        debug!(series = series_id, "Alpha Vantage 조회");
        let response = self.client.get(&self.base_url).query(&params).send().await?;

        if let Some(err) = classify_status(response.status(), &format!("Alpha Vantage {}", series_id)) {
            return Err(err);
        }

        let body = response.text().await?;
        parse_response(series_id, &body)
    }
}

/// 응답 본문 파싱
pub fn parse_response(series_id: &str, body: &str) -> Result<Observation, FetchError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("Alpha Vantage 응답 형식 오류 ({}): {}", series_id, e)))?;

    // 쿼터/프리미엄 안내
    for key in ["Note", "Information"] {
        if let Some(message) = json.get(key).and_then(Value::as_str) {
            return Err(FetchError::Auth(message.to_string()));
        }
    }

    if let Some(message) = json.get("Error Message").and_then(Value::as_str) {
        return Err(if message.to_lowercase().contains("apikey") {
            FetchError::Auth(message.to_string())
        } else {
            FetchError::NotFound(format!("Alpha Vantage {}: {}", series_id, message))
        });
    }

    let data = json
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse(format!("Alpha Vantage {}: data 배열 없음", series_id)))?;

    // 최신순 정렬, "." 결측 건너뜀
    data.iter()
        .find_map(|point| {
            let value = parse_observation_value(point.get("value")?.as_str()?)?;
            let date = parse_observation_date(point.get("date")?.as_str()?)?;
            Some(Observation {
                series_id: series_id.to_string(),
                value,
                date,
                source: SourceKind::AlphaVantage,
            })
        })
        .ok_or_else(|| FetchError::Parse(format!("Alpha Vantage {}: 유효한 관측값 없음", series_id)))
}
