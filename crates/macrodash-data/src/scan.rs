//! 베트남 주식 스캔.
//!
//! 종목마다 재무 데이터, 현재가, 시장 정보를 조합하여 [`ScreeningRow`]를 만듭니다.
//! 세 소스는 서로 다른 필드를 채우며, 재무 데이터 조회가 실패한 종목만 실패로 기록합니다.
//! 한 종목의 실패가 나머지 종목의 스캔을 중단시키지 않습니다.

use chrono::{DateTime, Utc};
use macrodash_core::{cagr, peg, Exchange, ScreeningRow};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::provider::{FundamentalSource, Fundamentals, MarketProfile, PriceSource, ProfileSource};

/// CAGR 계산 기간 (년)
pub const CAGR_YEARS: usize = 3;

/// 스캔 실패 종목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub symbol: String,
    pub error: String,
}

/// 거래소 한 곳의 스캔 결과.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub exchange: Exchange,
    pub rows: Vec<ScreeningRow>,
    pub failures: Vec<ScanFailure>,
    pub scanned_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn total(&self) -> usize {
        self.rows.len() + self.failures.len()
    }
}

/// 종목 스캐너.
pub struct EquityScanner {
    fundamentals: Arc<dyn FundamentalSource>,
    prices: Arc<dyn PriceSource>,
    profiles: Arc<dyn ProfileSource>,
}

impl EquityScanner {
    pub fn new(
        fundamentals: Arc<dyn FundamentalSource>,
        prices: Arc<dyn PriceSource>,
        profiles: Arc<dyn ProfileSource>,
    ) -> Self {
        Self {
            fundamentals,
            prices,
            profiles,
        }
    }

    /// 종목 목록 스캔
    ///
    /// `delay`는 종목 사이의 대기 시간입니다 (원격 서버 부하 방지).
    pub async fn scan(
        &self,
        exchange: Exchange,
        symbols: &[String],
        delay: Duration,
        now: DateTime<Utc>,
    ) -> ScanReport {
        info!(exchange = %exchange, symbols = symbols.len(), "종목 스캔 시작");

        let mut rows = Vec::with_capacity(symbols.len());
        let mut failures = Vec::new();

        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.scan_symbol(exchange, symbol, now).await {
                Ok(row) => {
                    debug!(symbol = %symbol, pe = ?row.pe, roe = ?row.roe, "종목 스캔 완료");
                    rows.push(row);
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "종목 스캔 실패");
                    failures.push(ScanFailure {
                        symbol: symbol.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            exchange = %exchange,
            success = rows.len(),
            failed = failures.len(),
            "종목 스캔 완료"
        );

        ScanReport {
            exchange,
            rows,
            failures,
            scanned_at: now,
        }
    }

    /// 종목 하나 스캔
    pub async fn scan_symbol(
        &self,
        exchange: Exchange,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<ScreeningRow, FetchError> {
        let fundamentals = self.fundamentals.fetch_fundamentals(symbol).await?;

        let price = match self.prices.fetch_price(symbol).await {
            Ok(price) => Some(price),
            Err(e) => {
                debug!(symbol, error = %e, "현재가 없음");
                None
            }
        };

        let profile = match self.profiles.fetch_profile(symbol).await {
            Ok(profile) => profile,
            Err(e) => {
                debug!(symbol, error = %e, "시장 정보 없음");
                MarketProfile::default()
            }
        };

        Ok(build_row(symbol, exchange, fundamentals, price, profile, now))
    }
}

/// 조회 결과를 행으로 조합하고 파생 지표를 계산
pub fn build_row(
    symbol: &str,
    exchange: Exchange,
    fundamentals: Fundamentals,
    price: Option<rust_decimal::Decimal>,
    profile: MarketProfile,
    now: DateTime<Utc>,
) -> ScreeningRow {
    let revenue_cagr_3y = cagr(&fundamentals.yearly_revenue, CAGR_YEARS);
    let profit_cagr_3y = cagr(&fundamentals.yearly_profit, CAGR_YEARS);
    let peg = match (fundamentals.pe, profit_cagr_3y) {
        (Some(pe), Some(growth)) => peg(pe, growth),
        _ => None,
    };

    let mut row = ScreeningRow::empty(symbol.to_uppercase(), exchange, now);
    row.company_name = profile.company_name;
    row.price_vnd = price;
    row.market_cap = profile.market_cap;
    row.pe = fundamentals.pe;
    row.pb = fundamentals.pb;
    row.peg = peg;
    row.ev_ebitda = fundamentals.ev_ebitda;
    row.eps = fundamentals.eps;
    row.book_value_per_share = fundamentals.book_value_per_share;
    row.revenue_cagr_3y = revenue_cagr_3y;
    row.profit_cagr_3y = profit_cagr_3y;
    row.roe = fundamentals.roe;
    row.roa = fundamentals.roa;
    row.gross_margin = fundamentals.gross_margin;
    row.operating_margin = fundamentals.operating_margin;
    row.net_margin = fundamentals.net_margin;
    row.debt_to_equity = fundamentals.debt_to_equity;
    row.debt_to_asset = fundamentals.debt_to_asset;
    row.current_ratio = fundamentals.current_ratio;
    row.quick_ratio = fundamentals.quick_ratio;
    row.operating_cash_flow = fundamentals.operating_cash_flow;
    row.free_cash_flow = fundamentals.free_cash_flow;
    row.dividend_yield = fundamentals.dividend_yield;
    row.foreign_ownership = profile.foreign_ownership;
    row.free_float = profile.free_float;
    row.avg_trading_value = profile.avg_trading_value;
    row.npl_ratio = fundamentals.npl_ratio;
    row.llr = fundamentals.llr;
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct StubFundamentals;

    #[async_trait]
    impl FundamentalSource for StubFundamentals {
        async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, FetchError> {
            if symbol == "BAD" {
                return Err(FetchError::NotFound(format!("no ratios: {}", symbol)));
            }
            Ok(Fundamentals {
                pe: Some(dec!(12)),
                roe: Some(dec!(0.21)),
                yearly_revenue: vec![dec!(100), dec!(110), dec!(121), dec!(133.1)],
                yearly_profit: vec![dec!(10), dec!(12), dec!(14.4), dec!(17.28)],
                ..Fundamentals::default()
            })
        }
    }

    struct StubPrices;

    #[async_trait]
    impl PriceSource for StubPrices {
        async fn fetch_price(&self, symbol: &str) -> Result<Decimal, FetchError> {
            match symbol {
                "FPT" => Ok(dec!(120500)),
                _ => Err(FetchError::Transport("timeout".into())),
            }
        }
    }

    struct FailingProfiles;

    #[async_trait]
    impl ProfileSource for FailingProfiles {
        async fn fetch_profile(&self, _symbol: &str) -> Result<MarketProfile, FetchError> {
            Err(FetchError::Parse("layout changed".into()))
        }
    }

    fn scanner() -> EquityScanner {
        EquityScanner::new(
            Arc::new(StubFundamentals),
            Arc::new(StubPrices),
            Arc::new(FailingProfiles),
        )
    }

    #[tokio::test]
    async fn test_symbol_failure_does_not_abort_batch() {
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 5, 0, 0).unwrap();
        let symbols = vec!["FPT".to_string(), "BAD".to_string(), "VNM".to_string()];

        let report = scanner().scan(Exchange::Hose, &symbols, Duration::ZERO, now).await;

        assert_eq!(report.total(), 3);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].symbol, "BAD");
        assert!(report.rows.iter().all(|r| r.scan_timestamp == now));
    }

    #[tokio::test]
    async fn test_price_and_profile_failures_leave_fields_empty() {
        let now = Utc::now();
        let row = scanner().scan_symbol(Exchange::Hose, "VNM", now).await.unwrap();

        assert_eq!(row.price_vnd, None);
        assert_eq!(row.free_float, None);
        assert_eq!(row.roe, Some(dec!(0.21)));
    }

    #[test]
    fn test_build_row_derives_growth_and_peg() {
        let fundamentals = Fundamentals {
            pe: Some(dec!(12)),
            yearly_revenue: vec![dec!(100), dec!(110), dec!(121), dec!(133.1)],
            yearly_profit: vec![dec!(10), dec!(12), dec!(14.4), dec!(17.28)],
            ..Fundamentals::default()
        };
        let profile = MarketProfile {
            company_name: Some("FPT Corp".into()),
            ..MarketProfile::default()
        };

        let row = build_row("fpt", Exchange::Hose, fundamentals, Some(dec!(120500)), profile, Utc::now());

        assert_eq!(row.symbol, "FPT");
        assert_eq!(row.revenue_cagr_3y, Some(dec!(0.1)));
        assert_eq!(row.profit_cagr_3y, Some(dec!(0.2)));
        // 12 / 20
        assert_eq!(row.peg, Some(dec!(0.6)));
        assert_eq!(row.company_name.as_deref(), Some("FPT Corp"));
    }
}
