//! 저장된 스크리닝 결과 조회 모듈.

use macrodash_core::{Exchange, ScreeningCriteria, ScreeningRow};
use macrodash_data::DataManager;
use rust_decimal::Decimal;
use std::fmt::Write as _;
use tracing::info;

use crate::Result;

/// 거래소의 저장된 행 조회 (`criteria`가 있으면 필터링)
pub async fn load_screening(
    manager: &DataManager,
    exchange: Exchange,
    criteria: Option<&ScreeningCriteria>,
) -> Result<Vec<ScreeningRow>> {
    let rows = manager.load_latest(exchange).await?;
    let total = rows.len();

    let rows = match criteria {
        Some(criteria) => criteria.screen(&rows).into_iter().cloned().collect(),
        None => rows,
    };

    info!(exchange = %exchange, total, shown = rows.len(), "스크리닝 결과 조회");
    Ok(rows)
}

fn cell(value: Option<Decimal>) -> String {
    value.map(|v| v.round_dp(2).to_string()).unwrap_or_else(|| "-".to_string())
}

fn pct(value: Option<Decimal>) -> String {
    value
        .map(|v| format!("{}%", (v * Decimal::ONE_HUNDRED).round_dp(1)))
        .unwrap_or_else(|| "-".to_string())
}

/// 주요 지표 표 형태 문자열
pub fn render_rows(rows: &[ScreeningRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:>12} {:>8} {:>8} {:>8} {:>9} {:>9} {:>8} {:>8}",
        "SYMBOL", "PRICE", "P/E", "P/B", "PEG", "REV 3Y", "NPAT 3Y", "ROE", "ROA"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<8} {:>12} {:>8} {:>8} {:>8} {:>9} {:>9} {:>8} {:>8}",
            row.symbol,
            cell(row.price_vnd),
            cell(row.pe),
            cell(row.pb),
            cell(row.peg),
            pct(row.revenue_cagr_3y),
            pct(row.profit_cagr_3y),
            pct(row.roe),
            pct(row.roa),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_render_rows_formats_ratios_as_percent() {
        let mut row = ScreeningRow::empty("FPT", Exchange::Hose, Utc::now());
        row.pe = Some(dec!(21.437));
        row.roe = Some(dec!(0.2812));

        let text = render_rows(&[row]);

        assert!(text.contains("21.44"));
        assert!(text.contains("28.1%"));
        assert!(text.lines().nth(1).unwrap().contains('-'));
    }
}
