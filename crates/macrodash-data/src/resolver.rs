//! 지표 폴백 해석기.
//!
//! 지표에 설정된 소스를 우선순위 순서(공식 API → 보조 API → 스크래핑)로 시도하여
//! 첫 성공을 즉시 반환합니다. 이후 소스는 호출하지 않습니다.
//! 모두 실패하면 소스별 실패 목록을 순서대로 담아 반환합니다.
//!
//! 인증/쿼터 오류를 낸 소스는 같은 사이클 동안 다시 호출하지 않습니다.
//! [`FallbackResolver::begin_cycle`]이 차단 목록을 초기화합니다.

use chrono::{DateTime, Utc};
use macrodash_core::{IndicatorCatalog, IndicatorValue, SourceKind};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::{FetchError, ResolveError, SourceFailure};
use crate::provider::SeriesSource;

/// 우선순위 기반 폴백 해석기.
pub struct FallbackResolver {
    catalog: Arc<IndicatorCatalog>,
    sources: HashMap<SourceKind, Arc<dyn SeriesSource>>,
    /// 이번 사이클에서 인증 오류로 차단된 소스
    blocked: Mutex<HashSet<SourceKind>>,
}

impl FallbackResolver {
    pub fn new(catalog: Arc<IndicatorCatalog>) -> Self {
        Self {
            catalog,
            sources: HashMap::new(),
            blocked: Mutex::new(HashSet::new()),
        }
    }

    /// 소스 어댑터 등록 (같은 종류면 교체)
    pub fn with_source(mut self, source: Arc<dyn SeriesSource>) -> Self {
        self.sources.insert(source.kind(), source);
        self
    }

    pub fn catalog(&self) -> &IndicatorCatalog {
        &self.catalog
    }

    /// 등록된 소스 종류
    pub fn source_kinds(&self) -> Vec<SourceKind> {
        let mut kinds: Vec<SourceKind> = self.sources.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// 새 갱신 사이클 시작 (인증 차단 목록 초기화)
    pub fn begin_cycle(&self) {
        self.blocked_sources().clear();
    }

    /// 이번 사이클에서 차단된 소스인지
    pub fn is_blocked(&self, kind: SourceKind) -> bool {
        self.blocked_sources().contains(&kind)
    }

    fn blocked_sources(&self) -> std::sync::MutexGuard<'_, HashSet<SourceKind>> {
        // 잠금 중 패닉이 나도 집합 자체는 유효함
        self.blocked.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 지표 해석
    ///
    /// `now`는 결과 값의 조회 시각으로 기록됩니다.
    pub async fn resolve(
        &self,
        indicator: &str,
        now: DateTime<Utc>,
    ) -> Result<IndicatorValue, ResolveError> {
        let spec = self
            .catalog
            .get(indicator)
            .ok_or_else(|| ResolveError::UnknownIndicator(indicator.to_string()))?;

        let mut failures = Vec::new();

        for series in &spec.sources {
            let failure = |error: FetchError| SourceFailure {
                source: series.source,
                series_id: series.series_id.clone(),
                error,
            };

            let Some(adapter) = self.sources.get(&series.source) else {
                failures.push(failure(FetchError::NotFound("source not configured".to_string())));
                continue;
            };

            if self.is_blocked(series.source) {
                failures.push(failure(FetchError::Auth(
                    "이번 사이클에서 인증 실패로 차단됨".to_string(),
                )));
                continue;
            }

            match adapter.fetch(&series.series_id).await {
                Ok(observation) => {
                    debug!(
                        indicator,
                        source = %series.source,
                        value = %observation.value,
                        date = %observation.date,
                        "지표 조회 성공"
                    );
                    return Ok(IndicatorValue {
                        indicator: indicator.to_string(),
                        value: observation.value,
                        observation_date: observation.date,
                        fetched_at: now,
                        source: series.source,
                    });
                }
                Err(error) => {
                    warn!(
                        indicator,
                        source = %series.source,
                        series = %series.series_id,
                        error = %error,
                        "소스 조회 실패, 다음 소스 시도"
                    );
                    if error.is_auth() {
                        self.blocked_sources().insert(series.source);
                    }
                    failures.push(failure(error));
                }
            }
        }

        Err(ResolveError::Exhausted {
            indicator: indicator.to_string(),
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Observation;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use macrodash_core::{IndicatorSpec, TtlClass};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        kind: SourceKind,
        result: Result<Observation, FetchError>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(kind: SourceKind, result: Result<Observation, FetchError>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SeriesSource for FixedSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(&self, _series_id: &str) -> Result<Observation, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn observation(kind: SourceKind, value: rust_decimal::Decimal) -> Observation {
        Observation {
            series_id: "x".to_string(),
            value,
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            source: kind,
        }
    }

    fn catalog() -> Arc<IndicatorCatalog> {
        let specs = vec![
            IndicatorSpec::new("cpi", TtlClass::Long)
                .source(SourceKind::Fred, "CPIAUCSL")
                .source(SourceKind::AlphaVantage, "CPI")
                .source(SourceKind::Scraped, "fred_graph:CPIAUCSL"),
            IndicatorSpec::new("gdp", TtlClass::Long)
                .source(SourceKind::Fred, "GDP")
                .source(SourceKind::Scraped, "fred_graph:GDP"),
        ];
        Arc::new(IndicatorCatalog::new(specs).unwrap())
    }

    #[tokio::test]
    async fn test_missing_adapter_recorded_and_skipped() {
        let scraped = FixedSource::new(SourceKind::Scraped, Ok(observation(SourceKind::Scraped, dec!(3.1))));
        let resolver = FallbackResolver::new(catalog()).with_source(scraped.clone());
        let now = Utc.with_ymd_and_hms(2025, 9, 2, 0, 0, 0).unwrap();

        let value = resolver.resolve("cpi", now).await.unwrap();
        assert_eq!(value.source, SourceKind::Scraped);
        assert_eq!(value.fetched_at, now);
        assert_eq!(value.indicator, "cpi");
    }

    #[tokio::test]
    async fn test_auth_failure_blocks_source_for_cycle() {
        let fred = FixedSource::new(SourceKind::Fred, Err(FetchError::Auth("bad key".into())));
        let scraped = FixedSource::new(SourceKind::Scraped, Ok(observation(SourceKind::Scraped, dec!(1))));
        let resolver = FallbackResolver::new(catalog())
            .with_source(fred.clone())
            .with_source(scraped.clone());
        let now = Utc.with_ymd_and_hms(2025, 9, 2, 0, 0, 0).unwrap();

        resolver.resolve("cpi", now).await.unwrap();
        resolver.resolve("gdp", now).await.unwrap();
        assert_eq!(fred.calls(), 1);
        assert!(resolver.is_blocked(SourceKind::Fred));

        resolver.begin_cycle();
        resolver.resolve("gdp", now).await.unwrap();
        assert_eq!(fred.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_indicator() {
        let resolver = FallbackResolver::new(catalog());
        let now = Utc::now();

        assert_eq!(
            resolver.resolve("vix", now).await,
            Err(ResolveError::UnknownIndicator("vix".to_string()))
        );
    }

    #[tokio::test]
    async fn test_exhausted_lists_every_source_in_order() {
        let fred = FixedSource::new(SourceKind::Fred, Err(FetchError::Transport("timeout".into())));
        let scraped = FixedSource::new(SourceKind::Scraped, Err(FetchError::Parse("layout".into())));
        let resolver = FallbackResolver::new(catalog())
            .with_source(fred)
            .with_source(scraped);

        let err = resolver.resolve("cpi", Utc::now()).await.unwrap_err();
        let sources: Vec<SourceKind> = err.failures().iter().map(|f| f.source).collect();
        assert_eq!(
            sources,
            vec![SourceKind::Fred, SourceKind::AlphaVantage, SourceKind::Scraped]
        );
        assert_eq!(
            err.failures()[1].error,
            FetchError::NotFound("source not configured".to_string())
        );
    }
}
