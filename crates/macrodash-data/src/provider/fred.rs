//! FRED (Federal Reserve Economic Data) 어댑터.
//!
//! `series/observations` 엔드포인트에서 최신 관측값 하나를 가져옵니다.
//! FRED는 결측 관측값을 `"."`로 표시하므로 최근 몇 개를 받아 첫 유효값을 사용합니다.
//!
//! ```rust,ignore
//! let fred = FredClient::new("api-key", Duration::from_secs(10))?;
//! let obs = fred.fetch("FEDFUNDS").await?;
//! println!("Fed Funds: {} ({})", obs.value, obs.date);
//! ```

use async_trait::async_trait;
use macrodash_core::SourceKind;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{
    classify_status, http_client, parse_observation_date, parse_observation_value, Observation,
    SeriesSource,
};
use crate::error::FetchError;

/// FRED REST 기본 URL
pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred";

/// 최신순으로 받을 관측값 수 (결측 건너뛰기용)
const OBSERVATION_LIMIT: &str = "5";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct FredErrorBody {
    error_message: String,
}

/// FRED API 클라이언트.
pub struct FredClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl FredClient {
    /// 기본 URL로 생성
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: SecretString::new(api_key.into().into_boxed_str()),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// 기본 URL 변경 (테스트/프록시용)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SeriesSource for FredClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Fred
    }

    async fn fetch(&self, series_id: &str) -> Result<Observation, FetchError> {
        let url = format!("{}/series/observations", self.base_url);
        debug!(series = series_id, "FRED 조회");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.expose_secret()),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", OBSERVATION_LIMIT),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_error(status, &body, series_id));
        }

        parse_observations(series_id, &body)
    }
}

/// 오류 응답 분류. FRED는 잘못된 키/시리즈 모두 400과 메시지로 알려줌.
fn classify_error(status: StatusCode, body: &str, series_id: &str) -> FetchError {
    if let Ok(err) = serde_json::from_str::<FredErrorBody>(body) {
        let message = err.error_message.to_lowercase();
        if message.contains("api_key") || message.contains("api key") {
            return FetchError::Auth(err.error_message);
        }
        if message.contains("does not exist") {
            return FetchError::NotFound(format!("FRED 시리즈 {}", series_id));
        }
    }

    classify_status(status, &format!("FRED {}", series_id))
        .unwrap_or_else(|| FetchError::Transport(format!("FRED HTTP {}", status.as_u16())))
}

/// 관측값 응답 파싱 (최신순, 첫 유효값 사용)
pub fn parse_observations(series_id: &str, body: &str) -> Result<Observation, FetchError> {
    let response: ObservationsResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("FRED 응답 형식 오류 ({}): {}", series_id, e)))?;

    response
        .observations
        .iter()
        .find_map(|raw| {
            let value = parse_observation_value(&raw.value)?;
            let date = parse_observation_date(&raw.date)?;
            Some(Observation {
                series_id: series_id.to_string(),
                value,
                date,
                source: SourceKind::Fred,
            })
        })
        .ok_or_else(|| FetchError::Parse(format!("FRED {}: 유효한 관측값 없음", series_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_skips_missing_marker() {
        let body = r#"{"observations":[
            {"date":"2025-09-02","value":"."},
            {"date":"2025-09-01","value":"4.22"},
            {"date":"2025-08-01","value":"4.33"}
        ]}"#;

        let obs = parse_observations("FEDFUNDS", body).unwrap();
        assert_eq!(obs.value, dec!(4.22));
        assert_eq!(obs.date, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        assert_eq!(obs.source, SourceKind::Fred);
    }

    #[test]
    fn test_parse_all_missing_is_parse_error() {
        let body = r#"{"observations":[{"date":"2025-09-02","value":"."}]}"#;
        assert!(matches!(
            parse_observations("FEDFUNDS", body),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            parse_observations("FEDFUNDS", "<html>"),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_classify_error_messages() {
        let bad_key = r#"{"error_code":400,"error_message":"Bad Request.  The value for variable api_key is not registered."}"#;
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, bad_key, "GDP"),
            FetchError::Auth(_)
        ));

        let missing = r#"{"error_code":400,"error_message":"Bad Request.  The series does not exist."}"#;
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, missing, "NOPE"),
            FetchError::NotFound(_)
        ));

        assert!(matches!(
            classify_error(StatusCode::SERVICE_UNAVAILABLE, "", "GDP"),
            FetchError::Transport(_)
        ));
    }
}
