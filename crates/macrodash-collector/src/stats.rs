//! 수집 통계 구조체.

use macrodash_core::{IndicatorStatus, Snapshot};
use macrodash_data::ScanReport;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 수집 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 총 대상 수
    pub total: usize,
    /// 성공 횟수 (방금 조회)
    pub success: usize,
    /// 캐시 적중 (조회 생략)
    pub cached: usize,
    /// 이전 값 제공 (갱신 실패)
    pub stale: usize,
    /// 에러 횟수 (값 없음 / 종목 실패)
    pub errors: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 지표 스냅샷 통계
    pub fn from_snapshot(snapshot: &Snapshot, elapsed: Duration) -> Self {
        let mut stats = Self {
            total: snapshot.len(),
            elapsed,
            ..Self::default()
        };
        for (_, status) in snapshot.iter() {
            match status {
                IndicatorStatus::Fresh { from_cache: true, .. } => stats.cached += 1,
                IndicatorStatus::Fresh { from_cache: false, .. } => stats.success += 1,
                IndicatorStatus::Stale { .. } => stats.stale += 1,
                IndicatorStatus::NoData { .. } => stats.errors += 1,
            }
        }
        stats
    }

    /// 종목 스캔 통계
    pub fn from_scan(report: &ScanReport, elapsed: Duration) -> Self {
        Self {
            total: report.total(),
            success: report.rows.len(),
            errors: report.failures.len(),
            elapsed,
            ..Self::default()
        }
    }

    /// 성공률 계산 (%). 캐시 적중과 이전 값 제공도 값이 있으므로 포함
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            ((self.total - self.errors) as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            cached = self.cached,
            stale = self.stale,
            errors = self.errors,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}
