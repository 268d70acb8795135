//! 매크로 지표 갱신 모듈.
//!
//! 1회 갱신과 자동 갱신 데몬을 제공합니다.
//! 데몬은 주기마다 만료된 지표만 갱신하고, stdin에서 Enter를 받으면 전체를 강제 갱신합니다.

use macrodash_core::{IndicatorCatalog, IndicatorStatus, Snapshot};
use macrodash_data::{DataManager, RefreshMode};
use std::fmt::Write as _;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::{CollectionStats, Result};

/// 갱신 사이클 한 번 실행
pub async fn run_refresh(manager: &DataManager, mode: RefreshMode) -> (Snapshot, CollectionStats) {
    let start = Instant::now();
    let snapshot = manager.refresh(mode).await;
    let stats = CollectionStats::from_snapshot(&snapshot, start.elapsed());
    (snapshot, stats)
}

/// 자동 갱신 데몬 (Ctrl-C로 종료)
pub async fn run_daemon(manager: &DataManager, interval: Duration) -> Result<()> {
    info!(
        "=== 자동 갱신 데몬 시작 (주기: {}분, Enter = 즉시 전체 갱신) ===",
        interval.as_secs() / 60
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = ticker.tick() => {
                let (snapshot, stats) = run_refresh(manager, RefreshMode::IfStale).await;
                stats.log_summary("자동 갱신");
                println!("{}", render_snapshot(&snapshot));
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => {
                        info!("수동 갱신 요청");
                        let (snapshot, stats) = run_refresh(manager, RefreshMode::Force).await;
                        stats.log_summary("수동 갱신");
                        println!("{}", render_snapshot(&snapshot));
                    }
                    Ok(None) => {
                        // stdin이 닫혀도 자동 갱신은 계속
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin 읽기 실패, 수동 갱신 비활성화");
                        stdin_open = false;
                    }
                }
            }
        }
    }

    Ok(())
}

/// 스냅샷을 표 형태 문자열로 변환
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Snapshot @ {} (fresh {}, stale {}, no data {})",
        snapshot.taken_at().format("%Y-%m-%d %H:%M:%S UTC"),
        snapshot.fresh_count(),
        snapshot.stale_count(),
        snapshot.no_data_count()
    );
    let _ = writeln!(
        out,
        "{:<26} {:>12} {:<12} {:<13} {}",
        "INDICATOR", "VALUE", "OBSERVED", "SOURCE", "STATUS"
    );

    for (name, status) in snapshot.iter() {
        let line = match status {
            IndicatorStatus::Fresh { value, from_cache } => format!(
                "{:<26} {:>12} {:<12} {:<13} {}",
                name,
                value.value.to_string(),
                value.observation_date.to_string(),
                value.source.to_string(),
                if *from_cache { "cached" } else { "fresh" }
            ),
            IndicatorStatus::Stale { value, reason } => format!(
                "{:<26} {:>12} {:<12} {:<13} stale ({})",
                name,
                value.value.to_string(),
                value.observation_date.to_string(),
                value.source.to_string(),
                reason
            ),
            IndicatorStatus::NoData { reason } => {
                format!("{:<26} {:>12} {:<12} {:<13} no data ({})", name, "-", "-", "-", reason)
            }
        };
        let _ = writeln!(out, "{}", line);
    }

    out
}

/// 지표 카탈로그 출력용 문자열
pub fn render_catalog(catalog: &IndicatorCatalog) -> String {
    let mut out = String::new();
    for spec in catalog.iter() {
        let sources: Vec<String> = spec
            .sources
            .iter()
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(out, "{:<26} ttl={:<5} {}", spec.name, spec.ttl_class.to_string(), sources.join(" → "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use macrodash_core::{IndicatorValue, SnapshotBuilder, SourceKind};
    use rust_decimal_macros::dec;

    #[test]
    fn test_render_snapshot_lists_every_state() {
        let taken_at = Utc.with_ymd_and_hms(2025, 9, 2, 9, 0, 0).unwrap();
        let value = IndicatorValue {
            indicator: "fed_funds_rate".to_string(),
            value: dec!(4.22),
            observation_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            fetched_at: taken_at,
            source: SourceKind::Fred,
        };
        let mut builder = SnapshotBuilder::new(taken_at);
        builder
            .record("fed_funds_rate", IndicatorStatus::Fresh { value, from_cache: false })
            .record("vix", IndicatorStatus::NoData { reason: "all sources failed".into() });

        let text = render_snapshot(&builder.build());

        assert!(text.contains("2025-09-02 09:00:00 UTC"));
        assert!(text.contains("4.22"));
        assert!(text.contains("FRED"));
        assert!(text.contains("no data (all sources failed)"));
    }

    #[test]
    fn test_render_builtin_catalog() {
        let catalog = IndicatorCatalog::builtin().unwrap();
        let text = render_catalog(&catalog);

        assert_eq!(text.lines().count(), catalog.len());
        assert!(text.contains("fed_funds_rate"));
    }
}
