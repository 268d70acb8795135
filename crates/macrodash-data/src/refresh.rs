//! 갱신 오케스트레이터.
//!
//! 카탈로그의 모든 지표를 캐시 계층에 요청하여 한 사이클의 [`Snapshot`]을 만듭니다.
//! 지표 하나의 실패가 사이클 전체를 중단시키지 않습니다.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use macrodash_core::{IndicatorStatus, Snapshot, SnapshotBuilder};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::cache::{Freshness, IndicatorCache};

/// 갱신 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    /// 만료된 지표만 조회 (자동 갱신)
    #[default]
    IfStale,
    /// 모든 지표 조회 (수동 갱신)
    Force,
}

/// 갱신 오케스트레이터.
pub struct RefreshOrchestrator {
    cache: Arc<IndicatorCache>,
    /// 동시에 처리할 지표 수 (1 = 순차)
    concurrency: usize,
}

impl RefreshOrchestrator {
    pub fn new(cache: Arc<IndicatorCache>) -> Self {
        Self {
            cache,
            concurrency: 1,
        }
    }

    /// 동시 처리 지표 수 설정 (0은 1로 취급)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<IndicatorCache> {
        &self.cache
    }

    /// 전체 지표 갱신
    ///
    /// 결과는 카탈로그 순서와 무관하게 지표 이름으로 조회합니다.
    pub async fn refresh_all(&self, now: DateTime<Utc>, mode: RefreshMode) -> Snapshot {
        let started = Instant::now();
        self.cache.resolver().begin_cycle();

        let names: Vec<String> = self
            .cache
            .resolver()
            .catalog()
            .names()
            .map(str::to_string)
            .collect();
        info!(indicators = names.len(), mode = ?mode, "지표 갱신 사이클 시작");

        let cache = &self.cache;
        let results: Vec<(String, IndicatorStatus)> = stream::iter(names)
            .map(|name| async move {
                let result = match mode {
                    RefreshMode::IfStale => cache.get_or_refresh(&name, now).await,
                    RefreshMode::Force => cache.refresh(&name, now).await,
                };
                let status = match result {
                    Ok(cached) => match cached.freshness {
                        Freshness::Cached => IndicatorStatus::Fresh {
                            value: cached.value,
                            from_cache: true,
                        },
                        Freshness::Refreshed => IndicatorStatus::Fresh {
                            value: cached.value,
                            from_cache: false,
                        },
                        Freshness::Stale { reason } => IndicatorStatus::Stale {
                            value: cached.value,
                            reason,
                        },
                    },
                    Err(no_data) => IndicatorStatus::NoData {
                        reason: no_data.to_string(),
                    },
                };
                (name, status)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut builder = SnapshotBuilder::new(now);
        for (name, status) in results {
            builder.record(name, status);
        }
        let snapshot = builder.build();

        if snapshot.no_data_count() > 0 || snapshot.stale_count() > 0 {
            warn!(
                fresh = snapshot.fresh_count(),
                stale = snapshot.stale_count(),
                no_data = snapshot.no_data_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "지표 갱신 사이클 완료 (일부 실패)"
            );
        } else {
            info!(
                fresh = snapshot.fresh_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "지표 갱신 사이클 완료"
            );
        }

        snapshot
    }
}
