//! 재무 비율 계산 유틸리티.
//!
//! 결과가 정의되지 않는 경우(데이터 부족, 0 또는 음수 기준값, 표현 범위 초과)는 `None`을 반환합니다.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// 연평균 성장률 (분수, 0.12 = 12%).
///
/// `yearly`는 오래된 연도부터 정렬된 연간 값입니다.
/// 마지막 값과 `years`년 전 값으로 계산하며, 값이 `years + 1`개 미만이거나
/// 기준값이 0 이하이면 `None`.
pub fn cagr(yearly: &[Decimal], years: usize) -> Option<Decimal> {
    if years == 0 || yearly.len() < years + 1 {
        return None;
    }

    let start = yearly[yearly.len() - 1 - years];
    let end = yearly[yearly.len() - 1];
    if start <= Decimal::ZERO || end < Decimal::ZERO {
        return None;
    }

    // Decimal은 분수 거듭제곱이 없으므로 f64로 계산
    let ratio = end.checked_div(start)?.to_f64()?;
    let growth = ratio.powf(1.0 / years as f64) - 1.0;

    Decimal::from_f64(growth).map(|d| d.round_dp(4))
}

/// PEG = P/E ÷ (이익 성장률 × 100).
///
/// P/E나 성장률이 0 이하이면 `None`.
pub fn peg(pe: Decimal, profit_growth: Decimal) -> Option<Decimal> {
    if pe <= Decimal::ZERO || profit_growth <= Decimal::ZERO {
        return None;
    }
    let growth_pct = profit_growth.checked_mul(Decimal::ONE_HUNDRED)?;
    pe.checked_div(growth_pct).map(|d| d.round_dp(4))
}

/// 0으로 나누기를 피하는 비율 계산
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    numerator.checked_div(denominator).map(|d| d.round_dp(4))
}
