//! TCBS 재무 분석 API 클라이언트.
//!
//! 종목별 연간 재무비율, 손익계산서, 현금흐름표를 조회합니다.
//!
//! ## 엔드포인트
//! - `/{symbol}/financialratio?yearly=1&isAll=true`
//! - `/{symbol}/incomestatement?yearly=1&isAll=true`
//! - `/{symbol}/cashflow?yearly=1&isAll=true`
//!
//! 재무비율 조회 실패만 종목 실패로 취급하고, 손익/현금흐름 실패는 해당 필드를 비워 둡니다.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{classify_status, http_client, FundamentalSource, Fundamentals};
use crate::error::FetchError;

/// TCBS 재무 분석 기본 URL
pub const DEFAULT_BASE_URL: &str = "https://apipubaws.tcbs.com.vn/tcanalysis/v1/finance";

/// 연간 재무비율 (금액 단위: 십억 VND, 비율: 분수)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcbsRatio {
    pub year: i32,
    pub price_to_earning: Option<Decimal>,
    pub price_to_book: Option<Decimal>,
    pub value_before_ebitda: Option<Decimal>,
    pub dividend: Option<Decimal>,
    pub roe: Option<Decimal>,
    pub roa: Option<Decimal>,
    pub current_payment: Option<Decimal>,
    pub quick_payment: Option<Decimal>,
    pub gross_profit_margin: Option<Decimal>,
    pub operating_profit_margin: Option<Decimal>,
    pub post_tax_margin: Option<Decimal>,
    pub debt_on_equity: Option<Decimal>,
    pub debt_on_asset: Option<Decimal>,
    pub earning_per_share: Option<Decimal>,
    pub book_value_per_share: Option<Decimal>,
    /// 은행 부실채권 비율
    pub bad_debt_percentage: Option<Decimal>,
    /// 은행 대손충당금 / 부실채권
    pub provision_on_bad_debt: Option<Decimal>,
}

/// 연간 손익계산서
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcbsIncomeStatement {
    pub year: i32,
    pub revenue: Option<Decimal>,
    pub post_tax_profit: Option<Decimal>,
    pub share_holder_income: Option<Decimal>,
}

/// 연간 현금흐름표
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcbsCashFlow {
    pub year: i32,
    /// 영업활동 현금흐름
    pub from_sale: Option<Decimal>,
    pub free_cash_flow: Option<Decimal>,
}

/// TCBS API 클라이언트.
pub struct TcbsClient {
    client: Client,
    base_url: String,
}

impl TcbsClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// 기본 URL 변경 (테스트/프록시용)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_report<T: DeserializeOwned>(
        &self,
        symbol: &str,
        report: &str,
    ) -> Result<Vec<T>, FetchError> {
        let url = format!("{}/{}/{}", self.base_url, symbol, report);
        debug!(symbol, report, "TCBS 조회");

        let response = self
            .client
            .get(&url)
            .query(&[("yearly", "1"), ("isAll", "true")])
            .send()
            .await?;
        if let Some(err) = classify_status(response.status(), &format!("TCBS {} {}", symbol, report)) {
            return Err(err);
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| FetchError::Parse(format!("TCBS {} {} 형식 오류: {}", symbol, report, e)))
    }

    pub async fn fetch_ratios(&self, symbol: &str) -> Result<Vec<TcbsRatio>, FetchError> {
        self.fetch_report(symbol, "financialratio").await
    }

    pub async fn fetch_income_statements(
        &self,
        symbol: &str,
    ) -> Result<Vec<TcbsIncomeStatement>, FetchError> {
        self.fetch_report(symbol, "incomestatement").await
    }

    pub async fn fetch_cash_flows(&self, symbol: &str) -> Result<Vec<TcbsCashFlow>, FetchError> {
        self.fetch_report(symbol, "cashflow").await
    }
}

#[async_trait]
impl FundamentalSource for TcbsClient {
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, FetchError> {
        let ratios = self.fetch_ratios(symbol).await?;

        let income = self.fetch_income_statements(symbol).await.unwrap_or_else(|e| {
            warn!(symbol, error = %e, "손익계산서 조회 실패, 성장률 생략");
            Vec::new()
        });
        let cash_flows = self.fetch_cash_flows(symbol).await.unwrap_or_else(|e| {
            warn!(symbol, error = %e, "현금흐름표 조회 실패, 현금흐름 생략");
            Vec::new()
        });

        build_fundamentals(symbol, ratios, income, cash_flows)
    }
}

/// 세 보고서를 하나의 재무 데이터로 합침 (최신 연도 비율 사용)
pub fn build_fundamentals(
    symbol: &str,
    ratios: Vec<TcbsRatio>,
    mut income: Vec<TcbsIncomeStatement>,
    cash_flows: Vec<TcbsCashFlow>,
) -> Result<Fundamentals, FetchError> {
    let latest = ratios
        .into_iter()
        .max_by_key(|r| r.year)
        .ok_or_else(|| FetchError::NotFound(format!("TCBS 재무비율 없음: {}", symbol)))?;

    income.sort_by_key(|s| s.year);
    income.dedup_by_key(|s| s.year);
    let yearly_revenue = income.iter().filter_map(|s| s.revenue).collect();
    let yearly_profit = income
        .iter()
        .filter_map(|s| s.share_holder_income.or(s.post_tax_profit))
        .collect();

    let latest_cash = cash_flows.into_iter().max_by_key(|c| c.year);

    Ok(Fundamentals {
        pe: latest.price_to_earning,
        pb: latest.price_to_book,
        ev_ebitda: latest.value_before_ebitda,
        eps: latest.earning_per_share,
        book_value_per_share: latest.book_value_per_share,
        roe: latest.roe,
        roa: latest.roa,
        gross_margin: latest.gross_profit_margin,
        operating_margin: latest.operating_profit_margin,
        net_margin: latest.post_tax_margin,
        debt_to_equity: latest.debt_on_equity,
        debt_to_asset: latest.debt_on_asset,
        current_ratio: latest.current_payment,
        quick_ratio: latest.quick_payment,
        dividend_yield: latest.dividend,
        npl_ratio: latest.bad_debt_percentage,
        llr: latest.provision_on_bad_debt,
        yearly_revenue,
        yearly_profit,
        operating_cash_flow: latest_cash.as_ref().and_then(|c| c.from_sale),
        free_cash_flow: latest_cash.and_then(|c| c.free_cash_flow),
    })
}
