//! 외부 데이터 소스 어댑터.
//!
//! 매크로 지표 소스는 모두 [`SeriesSource`]를 구현합니다.
//! 어댑터는 전송과 파싱만 담당하며 캐싱이나 폴백, 재시도를 하지 않습니다.
//!
//! - [`FredClient`]: FRED REST API
//! - [`AlphaVantageClient`]: Alpha Vantage REST API
//! - [`ScrapedSource`]: 정부 통계 페이지 (CSV/HTML 표)
//! - [`MockSource`]: 데모용 고정 값
//!
//! 베트남 주식 스캔용 소스는 [`tcbs`], [`vndirect`], [`vietnam_web`]에 있습니다.

pub mod alpha_vantage;
pub mod fred;
pub mod mock;
pub mod scraped;
pub mod tcbs;
pub mod vietnam_web;
pub mod vndirect;

pub use alpha_vantage::AlphaVantageClient;
pub use fred::FredClient;
pub use mock::MockSource;
pub use scraped::{ScrapeFormat, ScrapePage, ScrapedSource};
pub use tcbs::TcbsClient;
pub use vietnam_web::VietnamWebScraper;
pub use vndirect::VndirectClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use macrodash_core::SourceKind;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

use crate::error::FetchError;

/// 브라우저 흉내 User-Agent (스크래핑 대상 사이트가 기본 UA를 거부함)
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 어댑터 한 번의 조회 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// 요청한 시리즈 ID
    pub series_id: String,
    pub value: Decimal,
    /// 업스트림 관측일
    pub date: NaiveDate,
    pub source: SourceKind,
}

/// 시리즈 단위 데이터 소스.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// 소스 종류
    fn kind(&self) -> SourceKind;

    /// 시리즈의 최신 관측값 조회 (요청 1회, 재시도 없음)
    async fn fetch(&self, series_id: &str) -> Result<Observation, FetchError>;
}

/// 종목 재무 데이터 (재무비율 + 연간 손익 + 현금흐름).
///
/// 비율은 분수(0.15 = 15%), 금액은 십억 VND 단위.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fundamentals {
    pub pe: Option<Decimal>,
    pub pb: Option<Decimal>,
    pub ev_ebitda: Option<Decimal>,
    pub eps: Option<Decimal>,
    pub book_value_per_share: Option<Decimal>,
    pub roe: Option<Decimal>,
    pub roa: Option<Decimal>,
    pub gross_margin: Option<Decimal>,
    pub operating_margin: Option<Decimal>,
    pub net_margin: Option<Decimal>,
    pub debt_to_equity: Option<Decimal>,
    pub debt_to_asset: Option<Decimal>,
    pub current_ratio: Option<Decimal>,
    pub quick_ratio: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
    pub npl_ratio: Option<Decimal>,
    pub llr: Option<Decimal>,
    /// 연간 매출 (오래된 연도부터)
    pub yearly_revenue: Vec<Decimal>,
    /// 연간 순이익 (오래된 연도부터)
    pub yearly_profit: Vec<Decimal>,
    pub operating_cash_flow: Option<Decimal>,
    pub free_cash_flow: Option<Decimal>,
}

/// 웹 페이지에서 수집하는 시장 정보.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketProfile {
    pub company_name: Option<String>,
    /// 유통 주식 비율 (분수)
    pub free_float: Option<Decimal>,
    /// 외국인 보유율 (분수)
    pub foreign_ownership: Option<Decimal>,
    /// 시가총액 (십억 VND)
    pub market_cap: Option<Decimal>,
    /// 평균 거래대금 (십억 VND)
    pub avg_trading_value: Option<Decimal>,
}

impl MarketProfile {
    /// 비어 있는 필드만 다른 프로필 값으로 채움
    pub fn fill_missing(&mut self, other: MarketProfile) {
        self.company_name = self.company_name.take().or(other.company_name);
        self.free_float = self.free_float.or(other.free_float);
        self.foreign_ownership = self.foreign_ownership.or(other.foreign_ownership);
        self.market_cap = self.market_cap.or(other.market_cap);
        self.avg_trading_value = self.avg_trading_value.or(other.avg_trading_value);
    }
}

/// 종목 재무 데이터 소스 (스캔 성공 여부를 결정).
#[async_trait]
pub trait FundamentalSource: Send + Sync {
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, FetchError>;
}

/// 종목 현재가 소스 (VND).
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, FetchError>;
}

/// 종목 시장 정보 소스.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, symbol: &str) -> Result<MarketProfile, FetchError>;
}

/// 타임아웃이 설정된 HTTP 클라이언트 생성
pub fn http_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .map_err(|e| FetchError::Transport(format!("HTTP 클라이언트 생성 실패: {}", e)))
}

/// 본문을 읽기 전 상태 코드 분류 (성공이면 `None`)
pub(crate) fn classify_status(status: StatusCode, what: &str) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            FetchError::Auth(format!("{} 거부 (HTTP {})", what, status.as_u16()))
        }
        StatusCode::NOT_FOUND => FetchError::NotFound(format!("{} (HTTP 404)", what)),
        _ => FetchError::Transport(format!("{} 실패 (HTTP {})", what, status.as_u16())),
    })
}

/// 업스트림 숫자 문자열 파싱 ("." / "" / "N/A"는 결측)
pub(crate) fn parse_observation_value(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed.eq_ignore_ascii_case("N/A") {
        return None;
    }
    let cleaned = trimmed.replace(',', "");
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// 관측일 파싱 (`YYYY-MM-DD` 또는 `MM/DD/YYYY`)
pub(crate) fn parse_observation_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .ok()
}
