//! 베트남 거래소 종목 스캔 모듈.

use macrodash_core::Exchange;
use macrodash_data::DataManager;
use std::time::Instant;
use tracing::{error, info};

use crate::{CollectionStats, CollectorError, Result};

/// 쉼표로 구분된 종목 목록 파싱 (공백 제거, 대문자, 빈 항목 무시)
pub fn parse_symbols(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|sym| sym.trim().to_uppercase())
            .filter(|sym| !sym.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// 거래소별 스캔 후 저장
///
/// 한 거래소의 저장이 실패해도 나머지 거래소는 계속 진행하며,
/// 실패한 거래소가 있으면 모두 진행한 뒤 [`CollectorError::ScanNotSaved`]를 반환합니다.
pub async fn scan_exchanges(
    manager: &DataManager,
    exchanges: &[Exchange],
    symbols: &[String],
) -> Result<Vec<(Exchange, CollectionStats)>> {
    let mut results = Vec::with_capacity(exchanges.len());
    let mut not_saved = Vec::new();

    for &exchange in exchanges {
        let start = Instant::now();
        info!(exchange = %exchange, "거래소 스캔 시작");

        match manager.scan_exchange(exchange, symbols).await {
            Ok(report) => {
                for failure in &report.failures {
                    info!(symbol = %failure.symbol, error = %failure.error, "스캔 실패 종목");
                }
                let stats = CollectionStats::from_scan(&report, start.elapsed());
                stats.log_summary(&format!("{} 스캔", exchange));
                results.push((exchange, stats));
            }
            Err(e) => {
                error!(exchange = %exchange, error = %e, "스캔 결과 저장 실패");
                not_saved.push(format!("{} ({})", exchange, e));
            }
        }
    }

    if !not_saved.is_empty() {
        return Err(CollectorError::ScanNotSaved(not_saved));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_symbols(Some(" vnm, FPT ,,hpg")), vec!["VNM", "FPT", "HPG"]);
        assert!(parse_symbols(None).is_empty());
        assert!(parse_symbols(Some(" , ")).is_empty());
    }
}
