//! 데모 모드용 고정 값 소스.
//!
//! `data_mode = mock`일 때 카탈로그의 모든 지표가 이 소스 하나만 사용합니다.
//! 시리즈 ID는 지표 이름이며 관측일은 조회 당일입니다.

use async_trait::async_trait;
use chrono::Utc;
use macrodash_core::SourceKind;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::{Observation, SeriesSource};
use crate::error::FetchError;

/// 기본 데모 값 (지표 이름, 가수, 소수 자릿수)
const DEMO_VALUES: &[(&str, i64, u32)] = &[
    ("fed_funds_rate", 525, 2),
    ("treasury_3m", 525, 2),
    ("treasury_6m", 530, 2),
    ("treasury_1y", 515, 2),
    ("treasury_2y", 485, 2),
    ("treasury_5y", 445, 2),
    ("treasury_10y", 425, 2),
    ("treasury_30y", 435, 2),
    ("cpi", 32, 1),
    ("core_cpi", 38, 1),
    ("pce", 28, 1),
    ("core_pce", 32, 1),
    ("ppi", 21, 1),
    ("core_ppi", 28, 1),
    ("nonfarm_payrolls", 150_000, 0),
    ("unemployment_rate", 38, 1),
    ("labor_force_participation", 628, 1),
    ("gdp", 28_000, 0),
    ("real_gdp", 21, 1),
    ("industrial_production", 4, 1),
    ("capacity_utilization", 785, 1),
    ("retail_sales", 7, 1),
    ("retail_sales_ex_auto", 5, 1),
    ("consumer_sentiment", 1023, 1),
    ("housing_starts", 1_400_000, 0),
    ("building_permits", 1_450_000, 0),
];

/// 고정 값 소스.
#[derive(Debug, Clone)]
pub struct MockSource {
    values: HashMap<String, Decimal>,
}

impl MockSource {
    /// 기본 데모 값으로 생성
    pub fn new() -> Self {
        let values = DEMO_VALUES
            .iter()
            .map(|&(name, mantissa, scale)| (name.to_string(), Decimal::new(mantissa, scale)))
            .collect();
        Self { values }
    }

    /// 값 추가/교체
    pub fn with_value(mut self, indicator: impl Into<String>, value: Decimal) -> Self {
        self.values.insert(indicator.into(), value);
        self
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeriesSource for MockSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Mock
    }

    async fn fetch(&self, series_id: &str) -> Result<Observation, FetchError> {
        let value = self
            .values
            .get(series_id)
            .copied()
            .ok_or_else(|| FetchError::NotFound(format!("목업 값 없음: {}", series_id)))?;

        Ok(Observation {
            series_id: series_id.to_string(),
            value,
            date: Utc::now().date_naive(),
            source: SourceKind::Mock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrodash_core::IndicatorCatalog;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_covers_builtin_catalog() {
        let source = MockSource::new();
        let catalog = IndicatorCatalog::builtin().unwrap();

        for name in catalog.names() {
            assert!(source.fetch(name).await.is_ok(), "목업 값 누락: {}", name);
        }
    }

    #[tokio::test]
    async fn test_mock_values() {
        let source = MockSource::new().with_value("cpi", dec!(2.9));

        assert_eq!(source.fetch("treasury_10y").await.unwrap().value, dec!(4.25));
        assert_eq!(source.fetch("cpi").await.unwrap().value, dec!(2.9));
        assert!(matches!(source.fetch("vix").await, Err(FetchError::NotFound(_))));
    }
}
