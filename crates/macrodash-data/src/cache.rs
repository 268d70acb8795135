//! 지표 캐시 계층.
//!
//! 지표 이름 → (마지막 정상 값, 만료 시각)을 보관합니다.
//!
//! # 상태 전이
//!
//! ```text
//! {없음} ─조회 성공→ {유효} ─TTL 경과→ {만료, 이전 값 제공}
//!                                     ├─조회 성공→ {유효}
//!                                     └─조회 실패→ {만료, 이전 값 제공, 실패 기록}
//! ```
//!
//! 한 번이라도 값을 얻은 지표는 업스트림이 모두 실패해도 이전 값을 `Stale`로 돌려주며,
//! 값을 한 번도 얻지 못한 경우에만 [`NoData`]를 반환합니다.
//!
//! # 동시성
//!
//! 지표마다 별도의 비동기 Mutex를 두어 같은 지표의 조회를 직렬화합니다 (single-flight).
//! 잠금을 기다린 호출자는 잠금 획득 후 유효성을 다시 확인하므로,
//! 자동 갱신과 수동 갱신이 겹쳐도 같은 지표에 대한 업스트림 조회는 한 번뿐입니다.
//!
//! 캐시 항목은 조회 잠금과 분리된 `RwLock`에 보관합니다.
//! [`IndicatorCache::peek`]은 조회가 진행 중이어도 기다리지 않고 마지막 값을 읽습니다.

use chrono::{DateTime, Utc};
use macrodash_core::{IndicatorValue, TtlPolicy};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{NoData, ResolveError};
use crate::resolver::FallbackResolver;

/// 캐시 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub value: IndicatorValue,
    /// 만료 시각 (`now < expires_at`이면 유효)
    pub expires_at: DateTime<Utc>,
    /// 마지막 갱신 실패 사유 (성공 시 초기화)
    pub last_error: Option<String>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// 반환 값의 출처.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Freshness {
    /// 유효 기간 내 캐시 값 (조회 없음)
    Cached,
    /// 방금 조회한 값
    Refreshed,
    /// 갱신 실패로 이전 값 제공
    Stale { reason: String },
}

/// 캐시 조회 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedIndicator {
    pub value: IndicatorValue,
    pub freshness: Freshness,
    pub expires_at: DateTime<Utc>,
}

impl CachedIndicator {
    pub fn is_stale(&self) -> bool {
        matches!(self.freshness, Freshness::Stale { .. })
    }
}

/// 지표 하나의 캐시 칸.
#[derive(Default)]
struct SlotState {
    /// 업스트림 조회 직렬화
    fetch: Mutex<()>,
    /// 마지막 항목 (조회 중에도 읽기 가능)
    entry: RwLock<Option<CacheEntry>>,
}

impl SlotState {
    fn current(&self) -> Option<CacheEntry> {
        self.entry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn has_value(&self) -> bool {
        self.entry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    fn store(&self, entry: CacheEntry) {
        *self.entry.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(entry);
    }
}

type Slot = Arc<SlotState>;

/// 지표 캐시.
///
/// 프로세스 시작 시 한 번 생성하여 `Arc`로 갱신기와 표시 계층에 공유합니다.
pub struct IndicatorCache {
    resolver: Arc<FallbackResolver>,
    ttl: TtlPolicy,
    slots: RwLock<HashMap<String, Slot>>,
}

impl IndicatorCache {
    pub fn new(resolver: Arc<FallbackResolver>, ttl: TtlPolicy) -> Self {
        Self {
            resolver,
            ttl,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        self.ttl
    }

    /// 유효한 캐시 값이 있으면 반환하고, 없으면 조회합니다.
    ///
    /// 조회 실패 시 이전 값이 있으면 `Stale`로 반환하며, 없을 때만 `NoData`.
    pub async fn get_or_refresh(
        &self,
        indicator: &str,
        now: DateTime<Utc>,
    ) -> Result<CachedIndicator, NoData> {
        self.load(indicator, now, false).await
    }

    /// 유효 기간을 무시하고 조회합니다 (수동 갱신).
    ///
    /// 실패 시 동작은 [`get_or_refresh`](Self::get_or_refresh)와 같습니다.
    pub async fn refresh(
        &self,
        indicator: &str,
        now: DateTime<Utc>,
    ) -> Result<CachedIndicator, NoData> {
        self.load(indicator, now, true).await
    }

    /// 조회 없이 현재 캐시 항목 확인 (진행 중인 조회를 기다리지 않음)
    pub fn peek(&self, indicator: &str) -> Option<CacheEntry> {
        self.existing_slot(indicator)?.current()
    }

    /// 값이 있는 지표 수
    pub fn len(&self) -> usize {
        self.read_slots().values().filter(|slot| slot.has_value()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_slots(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.slots.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn existing_slot(&self, indicator: &str) -> Option<Slot> {
        self.read_slots().get(indicator).cloned()
    }

    fn slot(&self, indicator: &str) -> Slot {
        if let Some(slot) = self.existing_slot(indicator) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(indicator.to_string()).or_default().clone()
    }

    async fn load(
        &self,
        indicator: &str,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<CachedIndicator, NoData> {
        let spec = self.resolver.catalog().get(indicator).ok_or_else(|| NoData {
            source: ResolveError::UnknownIndicator(indicator.to_string()),
        })?;
        let ttl = self.ttl.ttl_for(spec.ttl_class);

        let slot = self.slot(indicator);
        let _fetching = slot.fetch.lock().await;

        // 잠금을 기다리는 동안 다른 호출자가 갱신했을 수 있으므로 잠금 후 판단
        let entry = slot.current();
        if let Some(current) = entry.as_ref() {
            let already_refreshed = force && current.value.fetched_at >= now;
            if (!force && current.is_fresh(now)) || already_refreshed {
                debug!(indicator, expires_at = %current.expires_at, "캐시 적중");
                return Ok(CachedIndicator {
                    value: current.value.clone(),
                    freshness: Freshness::Cached,
                    expires_at: current.expires_at,
                });
            }
        }

        match self.resolver.resolve(indicator, now).await {
            Ok(value) => {
                let candidate = now + ttl;
                // 만료 시각은 줄어들지 않음
                let expires_at = match entry.as_ref() {
                    Some(previous) if previous.expires_at > candidate => previous.expires_at,
                    _ => candidate,
                };
                info!(
                    indicator,
                    value = %value.value,
                    source = %value.source,
                    expires_at = %expires_at,
                    "지표 갱신"
                );
                slot.store(CacheEntry {
                    value: value.clone(),
                    expires_at,
                    last_error: None,
                });
                Ok(CachedIndicator {
                    value,
                    freshness: Freshness::Refreshed,
                    expires_at,
                })
            }
            Err(error) => match entry {
                Some(mut previous) => {
                    let reason = error.to_string();
                    warn!(
                        indicator,
                        fetched_at = %previous.value.fetched_at,
                        error = %reason,
                        "갱신 실패, 이전 값 제공"
                    );
                    previous.last_error = Some(reason.clone());
                    let stale = CachedIndicator {
                        value: previous.value.clone(),
                        freshness: Freshness::Stale { reason },
                        expires_at: previous.expires_at,
                    };
                    slot.store(previous);
                    Ok(stale)
                }
                None => {
                    warn!(indicator, error = %error, "갱신 실패, 캐시 값 없음");
                    Err(NoData { source: error })
                }
            },
        }
    }
}
