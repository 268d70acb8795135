//! 베트남 주식 스크리닝 도메인.
//!
//! - [`Exchange`]: 거래소 구분 (거래소마다 별도 테이블)
//! - [`ScreeningRow`]: 종목 하나의 재무 비율 묶음 (스캔마다 통째로 덮어씀)
//! - [`ScreeningCriteria`]: 임계값 기반 필터
//!
//! 비율 단위: ROE, 마진, CAGR, 보유율 등 백분율 성격의 값은 분수로 저장합니다
//! (0.15 = 15%). 금액은 십억 VND 단위.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// VN30 구성 종목 (기본 스캔 대상).
pub const VN30_SYMBOLS: &[&str] = &[
    "ACB", "BCM", "BID", "BVH", "CTG", "FPT", "GAS", "GVR", "HDB", "HPG", "MBB", "MSN", "MWG",
    "PLX", "POW", "SAB", "SSI", "STB", "TCB", "TPB", "VCB", "VHM", "VIB", "VIC", "VJC", "VNM",
    "VPB", "VRE", "VSH", "VTO",
];

/// 거래소 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    /// 호찌민 증권거래소
    Hose,
    /// 하노이 증권거래소
    Hnx,
    /// 비상장 공개시장
    Upcom,
    /// VN30 지수 구성 종목
    Vn30,
}

impl Exchange {
    pub const ALL: [Exchange; 4] = [Exchange::Hose, Exchange::Hnx, Exchange::Upcom, Exchange::Vn30];

    /// 거래소 코드 ("HOSE" 등)
    pub fn code(&self) -> &'static str {
        match self {
            Self::Hose => "HOSE",
            Self::Hnx => "HNX",
            Self::Upcom => "UPCOM",
            Self::Vn30 => "VN30",
        }
    }

    /// 저장 테이블 이름 (고정 목록이므로 SQL에 직접 삽입해도 안전)
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Hose => "stocks_hose",
            Self::Hnx => "stocks_hnx",
            Self::Upcom => "stocks_upcom",
            Self::Vn30 => "stocks_vn30",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HOSE" | "HSX" => Ok(Self::Hose),
            "HNX" => Ok(Self::Hnx),
            "UPCOM" => Ok(Self::Upcom),
            "VN30" => Ok(Self::Vn30),
            _ => Err(format!("Unknown exchange: {}", s)),
        }
    }
}

/// 종목 하나의 스크리닝 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningRow {
    /// 종목 코드 (거래소 테이블 내 유일)
    pub symbol: String,
    pub exchange: Exchange,
    pub company_name: Option<String>,

    // 가격 / 규모
    pub price_vnd: Option<Decimal>,
    /// 시가총액 (십억 VND)
    pub market_cap: Option<Decimal>,

    // 밸류에이션
    pub pe: Option<Decimal>,
    pub pb: Option<Decimal>,
    pub peg: Option<Decimal>,
    pub ev_ebitda: Option<Decimal>,
    pub eps: Option<Decimal>,
    pub book_value_per_share: Option<Decimal>,

    // 성장성
    pub revenue_cagr_3y: Option<Decimal>,
    pub profit_cagr_3y: Option<Decimal>,

    // 수익성
    pub roe: Option<Decimal>,
    pub roa: Option<Decimal>,
    pub gross_margin: Option<Decimal>,
    pub operating_margin: Option<Decimal>,
    pub net_margin: Option<Decimal>,

    // 재무 구조
    pub debt_to_equity: Option<Decimal>,
    pub debt_to_asset: Option<Decimal>,
    pub current_ratio: Option<Decimal>,
    pub quick_ratio: Option<Decimal>,

    // 현금흐름 (십억 VND)
    pub operating_cash_flow: Option<Decimal>,
    pub free_cash_flow: Option<Decimal>,

    // 배당
    pub dividend_yield: Option<Decimal>,

    // 보유 구조 / 유동성
    pub foreign_ownership: Option<Decimal>,
    pub free_float: Option<Decimal>,
    /// 평균 거래대금 (십억 VND)
    pub avg_trading_value: Option<Decimal>,

    // 은행 전용
    pub npl_ratio: Option<Decimal>,
    pub llr: Option<Decimal>,

    /// 스캔 시각
    pub scan_timestamp: DateTime<Utc>,
}

impl ScreeningRow {
    /// 모든 비율이 비어 있는 행
    pub fn empty(symbol: impl Into<String>, exchange: Exchange, scan_timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
            company_name: None,
            price_vnd: None,
            market_cap: None,
            pe: None,
            pb: None,
            peg: None,
            ev_ebitda: None,
            eps: None,
            book_value_per_share: None,
            revenue_cagr_3y: None,
            profit_cagr_3y: None,
            roe: None,
            roa: None,
            gross_margin: None,
            operating_margin: None,
            net_margin: None,
            debt_to_equity: None,
            debt_to_asset: None,
            current_ratio: None,
            quick_ratio: None,
            operating_cash_flow: None,
            free_cash_flow: None,
            dividend_yield: None,
            foreign_ownership: None,
            free_float: None,
            avg_trading_value: None,
            npl_ratio: None,
            llr: None,
            scan_timestamp,
        }
    }

    /// 스캔 시각만 제외하고 값이 같은지 비교
    pub fn same_metrics(&self, other: &ScreeningRow) -> bool {
        let mut other = other.clone();
        other.scan_timestamp = self.scan_timestamp;
        *self == other
    }
}

/// 임계값 기반 스크리닝 조건.
///
/// `_pct` 접미사가 붙은 값은 백분율(15 = 15%)이며, 행의 분수 값과 비교할 때 변환합니다.
/// 설정된 조건에 해당 지표가 없으면 그 종목은 탈락합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningCriteria {
    pub min_revenue_cagr_3y_pct: Option<Decimal>,
    pub min_profit_cagr_3y_pct: Option<Decimal>,
    pub min_roe_pct: Option<Decimal>,
    pub min_roa_pct: Option<Decimal>,
    pub max_pb: Option<Decimal>,
    pub max_pe: Option<Decimal>,
    pub max_peg: Option<Decimal>,
    pub max_ev_ebitda: Option<Decimal>,
    pub min_gross_margin_pct: Option<Decimal>,
    pub min_operating_margin_pct: Option<Decimal>,
    pub max_debt_to_equity: Option<Decimal>,
    pub min_current_ratio: Option<Decimal>,
    pub min_quick_ratio: Option<Decimal>,
    pub min_dividend_yield_pct: Option<Decimal>,
    pub min_free_float_pct: Option<Decimal>,
    pub min_foreign_ownership_pct: Option<Decimal>,
    /// 최소 시가총액 (십억 VND)
    pub min_market_cap: Option<Decimal>,
    /// 최소 평균 거래대금 (십억 VND)
    pub min_avg_trading_value: Option<Decimal>,
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            min_revenue_cagr_3y_pct: Some(dec!(10)),
            min_profit_cagr_3y_pct: Some(dec!(15)),
            min_roe_pct: Some(dec!(15)),
            min_roa_pct: Some(dec!(8)),
            max_pb: Some(dec!(3)),
            max_pe: Some(dec!(20)),
            max_peg: Some(dec!(2)),
            max_ev_ebitda: Some(dec!(15)),
            min_gross_margin_pct: Some(dec!(20)),
            min_operating_margin_pct: Some(dec!(10)),
            max_debt_to_equity: Some(dec!(1)),
            min_current_ratio: Some(dec!(1.2)),
            min_quick_ratio: Some(dec!(1)),
            min_dividend_yield_pct: Some(dec!(2)),
            min_free_float_pct: Some(dec!(15)),
            min_foreign_ownership_pct: Some(dec!(5)),
            min_market_cap: Some(dec!(1)),
            min_avg_trading_value: Some(dec!(1)),
        }
    }
}

impl ScreeningCriteria {
    /// 아무 조건도 없는 필터
    pub fn none() -> Self {
        Self {
            min_revenue_cagr_3y_pct: None,
            min_profit_cagr_3y_pct: None,
            min_roe_pct: None,
            min_roa_pct: None,
            max_pb: None,
            max_pe: None,
            max_peg: None,
            max_ev_ebitda: None,
            min_gross_margin_pct: None,
            min_operating_margin_pct: None,
            max_debt_to_equity: None,
            min_current_ratio: None,
            min_quick_ratio: None,
            min_dividend_yield_pct: None,
            min_free_float_pct: None,
            min_foreign_ownership_pct: None,
            min_market_cap: None,
            min_avg_trading_value: None,
        }
    }

    /// 설정된 모든 조건을 만족하는지
    pub fn matches(&self, row: &ScreeningRow) -> bool {
        at_least_pct(row.revenue_cagr_3y, self.min_revenue_cagr_3y_pct)
            && at_least_pct(row.profit_cagr_3y, self.min_profit_cagr_3y_pct)
            && at_least_pct(row.roe, self.min_roe_pct)
            && at_least_pct(row.roa, self.min_roa_pct)
            && positive_at_most(row.pb, self.max_pb)
            && positive_at_most(row.pe, self.max_pe)
            && positive_at_most(row.peg, self.max_peg)
            && positive_at_most(row.ev_ebitda, self.max_ev_ebitda)
            && at_least_pct(row.gross_margin, self.min_gross_margin_pct)
            && at_least_pct(row.operating_margin, self.min_operating_margin_pct)
            && at_most(row.debt_to_equity, self.max_debt_to_equity)
            && at_least(row.current_ratio, self.min_current_ratio)
            && at_least(row.quick_ratio, self.min_quick_ratio)
            && at_least_pct(row.dividend_yield, self.min_dividend_yield_pct)
            && at_least_pct(row.free_float, self.min_free_float_pct)
            && at_least_pct(row.foreign_ownership, self.min_foreign_ownership_pct)
            && at_least(row.market_cap, self.min_market_cap)
            && at_least(row.avg_trading_value, self.min_avg_trading_value)
    }

    /// 조건을 만족하는 행만 반환
    pub fn screen<'a>(&self, rows: &'a [ScreeningRow]) -> Vec<&'a ScreeningRow> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

fn at_least(metric: Option<Decimal>, min: Option<Decimal>) -> bool {
    match min {
        None => true,
        Some(min) => metric.is_some_and(|v| v >= min),
    }
}

fn at_most(metric: Option<Decimal>, max: Option<Decimal>) -> bool {
    match max {
        None => true,
        Some(max) => metric.is_some_and(|v| v <= max),
    }
}

fn at_least_pct(fraction: Option<Decimal>, min_pct: Option<Decimal>) -> bool {
    at_least(fraction.map(|v| v * dec!(100)), min_pct)
}

// 음수 배수(적자 기업)는 상한 조건을 통과하지 않음
fn positive_at_most(metric: Option<Decimal>, max: Option<Decimal>) -> bool {
    match max {
        None => true,
        Some(max) => metric.is_some_and(|v| v > Decimal::ZERO && v <= max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quality_row() -> ScreeningRow {
        let ts = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        ScreeningRow {
            revenue_cagr_3y: Some(dec!(0.18)),
            profit_cagr_3y: Some(dec!(0.22)),
            roe: Some(dec!(0.27)),
            roa: Some(dec!(0.12)),
            pb: Some(dec!(2.5)),
            pe: Some(dec!(14)),
            peg: Some(dec!(0.7)),
            ev_ebitda: Some(dec!(9)),
            gross_margin: Some(dec!(0.38)),
            operating_margin: Some(dec!(0.17)),
            debt_to_equity: Some(dec!(0.4)),
            current_ratio: Some(dec!(1.5)),
            quick_ratio: Some(dec!(1.3)),
            dividend_yield: Some(dec!(0.025)),
            free_float: Some(dec!(0.6)),
            foreign_ownership: Some(dec!(0.49)),
            market_cap: Some(dec!(150000)),
            avg_trading_value: Some(dec!(300)),
            ..ScreeningRow::empty("FPT", Exchange::Hose, ts)
        }
    }

    #[test]
    fn test_default_criteria_accepts_quality_row() {
        assert!(ScreeningCriteria::default().matches(&quality_row()));
    }

    #[test]
    fn test_missing_metric_fails_set_threshold() {
        let mut row = quality_row();
        row.roe = None;

        assert!(!ScreeningCriteria::default().matches(&row));
        assert!(ScreeningCriteria::none().matches(&row));
    }

    #[test]
    fn test_percent_threshold_compares_fraction() {
        let criteria = ScreeningCriteria {
            min_roe_pct: Some(dec!(15)),
            ..ScreeningCriteria::none()
        };
        let mut row = quality_row();

        row.roe = Some(dec!(0.15));
        assert!(criteria.matches(&row));
        row.roe = Some(dec!(0.149));
        assert!(!criteria.matches(&row));
    }

    #[test]
    fn test_negative_pe_fails_max_pe() {
        let criteria = ScreeningCriteria {
            max_pe: Some(dec!(20)),
            ..ScreeningCriteria::none()
        };
        let mut row = quality_row();
        row.pe = Some(dec!(-5));

        assert!(!criteria.matches(&row));
    }

    #[test]
    fn test_screen_filters_rows() {
        let good = quality_row();
        let mut expensive = quality_row();
        expensive.symbol = "VIC".to_string();
        expensive.pe = Some(dec!(80));

        let rows = vec![good, expensive];
        let passed = ScreeningCriteria::default().screen(&rows);
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].symbol, "FPT");
    }

    #[test]
    fn test_exchange_parse_and_table() {
        assert_eq!("hsx".parse::<Exchange>().unwrap(), Exchange::Hose);
        assert_eq!(Exchange::Upcom.table_name(), "stocks_upcom");
        assert!("NYSE".parse::<Exchange>().is_err());
    }

    #[test]
    fn test_same_metrics_ignores_scan_timestamp() {
        let a = quality_row();
        let mut b = quality_row();
        b.scan_timestamp = a.scan_timestamp + chrono::Duration::hours(1);

        assert!(a.same_metrics(&b));
        b.pe = Some(dec!(15));
        assert!(!a.same_metrics(&b));
    }
}
