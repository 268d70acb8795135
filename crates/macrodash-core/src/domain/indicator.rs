//! 매크로 지표 정의와 지표 값.
//!
//! - [`IndicatorSpec`]: 지표 이름, 소스별 시리즈 ID(우선순위 순), TTL 등급
//! - [`IndicatorValue`]: 한 번의 성공적인 조회 결과 (불변, 다음 조회로 대체됨)

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 업스트림 데이터 소스 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// FRED (St. Louis Fed) REST API
    Fred,
    /// Alpha Vantage REST API
    AlphaVantage,
    /// 정부/중앙은행 통계 페이지 스크래핑 (HTML/CSV)
    Scraped,
    /// 데모용 고정 값
    Mock,
}

impl SourceKind {
    /// 공식 API 소스 여부 (스크래핑/목업 제외)
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Fred | Self::AlphaVantage)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fred => write!(f, "FRED"),
            Self::AlphaVantage => write!(f, "AlphaVantage"),
            Self::Scraped => write!(f, "Scraped"),
            Self::Mock => write!(f, "Mock"),
        }
    }
}

/// 캐시 유효 기간 등급.
///
/// 업스트림 통계의 실제 갱신 주기에 따라 지표별로 지정합니다.
/// 일별 시장 데이터는 `Short`, 월/분기 정부 발표 통계는 `Long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// 30분
    Short,
    /// 120분
    Long,
}

impl fmt::Display for TtlClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short => write!(f, "short"),
            Self::Long => write!(f, "long"),
        }
    }
}

/// TTL 등급별 유효 기간.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub short: Duration,
    pub long: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            short: Duration::minutes(30),
            long: Duration::minutes(120),
        }
    }
}

impl TtlPolicy {
    pub fn new(short: Duration, long: Duration) -> Self {
        Self { short, long }
    }

    /// 등급에 해당하는 TTL
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Short => self.short,
            TtlClass::Long => self.long,
        }
    }
}

/// 특정 소스에서의 시리즈 식별자.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesRef {
    /// 소스 종류
    pub source: SourceKind,
    /// 소스 내 시리즈 ID (예: FRED "FEDFUNDS", 스크래핑 "fred_graph:FEDFUNDS")
    pub series_id: String,
}

impl SeriesRef {
    pub fn new(source: SourceKind, series_id: impl Into<String>) -> Self {
        Self {
            source,
            series_id: series_id.into(),
        }
    }
}

impl fmt::Display for SeriesRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.series_id)
    }
}

/// 지표 정의 (정적 설정, 로드 후 불변).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    /// 지표 이름 (예: "fed_funds_rate")
    pub name: String,
    /// 소스 목록 (우선순위 순: 공식 API → 보조 API → 스크래핑)
    pub sources: Vec<SeriesRef>,
    /// TTL 등급
    pub ttl_class: TtlClass,
}

impl IndicatorSpec {
    pub fn new(name: impl Into<String>, ttl_class: TtlClass) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            ttl_class,
        }
    }

    /// 다음 우선순위 소스를 추가합니다.
    pub fn source(mut self, source: SourceKind, series_id: impl Into<String>) -> Self {
        self.sources.push(SeriesRef::new(source, series_id));
        self
    }
}

/// 한 번의 성공적인 조회 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorValue {
    /// 지표 이름
    pub indicator: String,
    /// 값
    pub value: Decimal,
    /// 관측일 (업스트림 기준)
    pub observation_date: NaiveDate,
    /// 조회 시각
    pub fetched_at: DateTime<Utc>,
    /// 사용된 소스
    pub source: SourceKind,
}
