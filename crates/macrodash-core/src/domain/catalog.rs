//! 지표 카탈로그 (검증된 정적 지표 테이블).
//!
//! 지표 → 소스별 시리즈 매핑을 생성 시점에 검증하므로,
//! 매핑 누락은 조회 전에 설정 에러로 드러납니다.

use std::collections::{HashMap, HashSet};

use super::indicator::{IndicatorSpec, SeriesRef, SourceKind, TtlClass};
use crate::error::{DashError, DashResult};

/// 검증된 지표 목록.
#[derive(Debug, Clone)]
pub struct IndicatorCatalog {
    specs: Vec<IndicatorSpec>,
    index: HashMap<String, usize>,
}

impl IndicatorCatalog {
    /// 지표 목록을 검증하여 카탈로그를 생성합니다.
    ///
    /// 다음 경우 `DashError::Config`를 반환합니다:
    /// - 빈 지표 이름 또는 중복 이름
    /// - 소스가 하나도 없는 지표
    /// - 빈 시리즈 ID
    /// - 한 지표 안에서 (소스, 시리즈) 중복
    pub fn new(specs: Vec<IndicatorSpec>) -> DashResult<Self> {
        let mut index = HashMap::with_capacity(specs.len());

        for (pos, spec) in specs.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(DashError::Config(format!("{}번째 지표 이름이 비어 있습니다", pos)));
            }
            if spec.sources.is_empty() {
                return Err(DashError::Config(format!(
                    "지표 '{}'에 소스가 없습니다",
                    spec.name
                )));
            }

            let mut seen: HashSet<&SeriesRef> = HashSet::new();
            for series in &spec.sources {
                if series.series_id.trim().is_empty() {
                    return Err(DashError::Config(format!(
                        "지표 '{}'의 {} 시리즈 ID가 비어 있습니다",
                        spec.name, series.source
                    )));
                }
                if !seen.insert(series) {
                    return Err(DashError::Config(format!(
                        "지표 '{}'에 중복 소스: {}",
                        spec.name, series
                    )));
                }
            }

            if index.insert(spec.name.clone(), pos).is_some() {
                return Err(DashError::Config(format!("중복 지표: {}", spec.name)));
            }
        }

        Ok(Self { specs, index })
    }

    /// 기본 내장 지표 카탈로그.
    pub fn builtin() -> DashResult<Self> {
        Self::new(builtin_specs())
    }

    /// 이름으로 지표 조회
    pub fn get(&self, name: &str) -> Option<&IndicatorSpec> {
        self.index.get(name).map(|&pos| &self.specs[pos])
    }

    /// 설정 순서대로 순회
    pub fn iter(&self) -> impl Iterator<Item = &IndicatorSpec> {
        self.specs.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// 지정한 지표만 남긴 카탈로그. 알 수 없는 이름은 에러.
    pub fn select(&self, names: &[String]) -> DashResult<Self> {
        let mut specs = Vec::with_capacity(names.len());
        for name in names {
            let spec = self
                .get(name)
                .ok_or_else(|| DashError::NotFound(format!("알 수 없는 지표: {}", name)))?;
            specs.push(spec.clone());
        }
        Self::new(specs)
    }

    /// 모든 지표의 소스를 목업 소스 하나로 교체한 카탈로그 (데모 모드).
    pub fn with_mock_sources(&self) -> Self {
        let specs: Vec<IndicatorSpec> = self
            .specs
            .iter()
            .map(|spec| IndicatorSpec {
                name: spec.name.clone(),
                sources: vec![SeriesRef::new(SourceKind::Mock, spec.name.clone())],
                ttl_class: spec.ttl_class,
            })
            .collect();

        Self {
            specs,
            index: self.index.clone(),
        }
    }
}

/// 스크래핑 소스: FRED 그래프 CSV (API 키 불필요)
fn fred_graph(series: &str) -> String {
    format!("fred_graph:{}", series)
}

/// 스크래핑 소스: 미 재무부 일별 국채 수익률 표
fn treasury_daily(column: &str) -> String {
    format!("treasury_daily:{}", column)
}

fn fred_indicator(name: &str, ttl: TtlClass, fred_id: &str) -> IndicatorSpec {
    IndicatorSpec::new(name, ttl).source(SourceKind::Fred, fred_id)
}

fn treasury_indicator(
    name: &str,
    fred_id: &str,
    av_maturity: Option<&str>,
    column: &str,
) -> IndicatorSpec {
    let mut spec = fred_indicator(name, TtlClass::Short, fred_id);
    if let Some(maturity) = av_maturity {
        spec = spec.source(
            SourceKind::AlphaVantage,
            format!("TREASURY_YIELD:{}", maturity),
        );
    }
    spec.source(SourceKind::Scraped, treasury_daily(column))
}

fn builtin_specs() -> Vec<IndicatorSpec> {
    use TtlClass::{Long, Short};

    vec![
        // 정책 금리
        fred_indicator("fed_funds_rate", Short, "FEDFUNDS")
            .source(SourceKind::AlphaVantage, "FEDERAL_FUNDS_RATE")
            .source(SourceKind::Scraped, fred_graph("FEDFUNDS")),
        // 국채 수익률
        treasury_indicator("treasury_3m", "DGS3MO", Some("3month"), "3 Mo"),
        treasury_indicator("treasury_6m", "DGS6MO", None, "6 Mo"),
        treasury_indicator("treasury_1y", "DGS1", None, "1 Yr"),
        treasury_indicator("treasury_2y", "DGS2", Some("2year"), "2 Yr"),
        treasury_indicator("treasury_5y", "DGS5", Some("5year"), "5 Yr"),
        treasury_indicator("treasury_10y", "DGS10", Some("10year"), "10 Yr"),
        treasury_indicator("treasury_30y", "DGS30", Some("30year"), "30 Yr"),
        // 물가
        fred_indicator("cpi", Long, "CPIAUCSL")
            .source(SourceKind::AlphaVantage, "CPI")
            .source(SourceKind::Scraped, fred_graph("CPIAUCSL")),
        fred_indicator("core_cpi", Long, "CPILFESL")
            .source(SourceKind::Scraped, fred_graph("CPILFESL")),
        fred_indicator("pce", Long, "PCEPI").source(SourceKind::Scraped, fred_graph("PCEPI")),
        fred_indicator("core_pce", Long, "PCEPILFE")
            .source(SourceKind::Scraped, fred_graph("PCEPILFE")),
        fred_indicator("ppi", Long, "PPIACO").source(SourceKind::Scraped, fred_graph("PPIACO")),
        fred_indicator("core_ppi", Long, "PPIFGS")
            .source(SourceKind::Scraped, fred_graph("PPIFGS")),
        // 고용
        fred_indicator("nonfarm_payrolls", Long, "PAYEMS")
            .source(SourceKind::AlphaVantage, "NONFARM_PAYROLL")
            .source(SourceKind::Scraped, fred_graph("PAYEMS")),
        fred_indicator("unemployment_rate", Long, "UNRATE")
            .source(SourceKind::AlphaVantage, "UNEMPLOYMENT")
            .source(SourceKind::Scraped, fred_graph("UNRATE")),
        fred_indicator("labor_force_participation", Long, "CIVPART")
            .source(SourceKind::Scraped, fred_graph("CIVPART")),
        // 성장
        fred_indicator("gdp", Long, "GDP").source(SourceKind::Scraped, fred_graph("GDP")),
        fred_indicator("real_gdp", Long, "GDPC1")
            .source(SourceKind::AlphaVantage, "REAL_GDP")
            .source(SourceKind::Scraped, fred_graph("GDPC1")),
        fred_indicator("industrial_production", Long, "INDPRO")
            .source(SourceKind::Scraped, fred_graph("INDPRO")),
        fred_indicator("capacity_utilization", Long, "TCU")
            .source(SourceKind::Scraped, fred_graph("TCU")),
        // 소비
        fred_indicator("retail_sales", Long, "RSAFS")
            .source(SourceKind::AlphaVantage, "RETAIL_SALES")
            .source(SourceKind::Scraped, fred_graph("RSAFS")),
        fred_indicator("retail_sales_ex_auto", Long, "RSFSXMV")
            .source(SourceKind::Scraped, fred_graph("RSFSXMV")),
        fred_indicator("consumer_sentiment", Long, "UMCSENT")
            .source(SourceKind::Scraped, fred_graph("UMCSENT")),
        // 주택
        fred_indicator("housing_starts", Long, "HOUST")
            .source(SourceKind::Scraped, fred_graph("HOUST")),
        fred_indicator("building_permits", Long, "PERMIT")
            .source(SourceKind::Scraped, fred_graph("PERMIT")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = IndicatorCatalog::builtin().unwrap();

        assert!(catalog.len() >= 20);
        let fed = catalog.get("fed_funds_rate").unwrap();
        assert_eq!(fed.ttl_class, TtlClass::Short);
        assert_eq!(fed.sources[0], SeriesRef::new(SourceKind::Fred, "FEDFUNDS"));
        assert_eq!(fed.sources.last().unwrap().source, SourceKind::Scraped);
    }

    #[test]
    fn test_builtin_api_sources_precede_scraped() {
        let catalog = IndicatorCatalog::builtin().unwrap();

        for spec in catalog.iter() {
            let first_scraped = spec
                .sources
                .iter()
                .position(|s| s.source == SourceKind::Scraped)
                .unwrap_or(spec.sources.len());
            assert!(
                spec.sources[first_scraped..].iter().all(|s| !s.source.is_api()),
                "{}: API 소스가 스크래핑 소스 뒤에 있음",
                spec.name
            );
        }
    }

    #[test]
    fn test_rejects_indicator_without_sources() {
        let result = IndicatorCatalog::new(vec![IndicatorSpec::new("gdp", TtlClass::Long)]);
        assert!(matches!(result, Err(DashError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_series_id() {
        let spec = IndicatorSpec::new("gdp", TtlClass::Long).source(SourceKind::Fred, " ");
        assert!(IndicatorCatalog::new(vec![spec]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_names_and_sources() {
        let a = IndicatorSpec::new("gdp", TtlClass::Long).source(SourceKind::Fred, "GDP");
        assert!(IndicatorCatalog::new(vec![a.clone(), a.clone()]).is_err());

        let dup_source = a.clone().source(SourceKind::Fred, "GDP");
        assert!(IndicatorCatalog::new(vec![dup_source]).is_err());
    }

    #[test]
    fn test_select_and_mock_sources() {
        let catalog = IndicatorCatalog::builtin().unwrap();

        let selected = catalog
            .select(&["cpi".to_string(), "treasury_10y".to_string()])
            .unwrap();
        assert_eq!(selected.names().collect::<Vec<_>>(), vec!["cpi", "treasury_10y"]);
        assert!(catalog.select(&["vix".to_string()]).is_err());

        let mock = selected.with_mock_sources();
        let cpi = mock.get("cpi").unwrap();
        assert_eq!(cpi.sources, vec![SeriesRef::new(SourceKind::Mock, "cpi")]);
        assert_eq!(cpi.ttl_class, TtlClass::Long);
    }
}
