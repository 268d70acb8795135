//! 데이터 매니저.
//!
//! 설정으로부터 소스 어댑터, 폴백 해석기, 캐시, 오케스트레이터, 스캐너, 저장소를 조립합니다.
//! 캐시는 프로세스 시작 시 한 번 만들어지고 매니저가 소유합니다.

use chrono::{DateTime, Utc};
use macrodash_core::{AppConfig, DataMode, Exchange, IndicatorCatalog, ScreeningRow, Snapshot};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::IndicatorCache;
use crate::error::Result;
use crate::provider::{
    AlphaVantageClient, FredClient, MockSource, ScrapedSource, TcbsClient, VietnamWebScraper,
    VndirectClient,
};
use crate::refresh::{RefreshMode, RefreshOrchestrator};
use crate::resolver::FallbackResolver;
use crate::scan::{EquityScanner, ScanReport};
use crate::storage::{MemoryScreeningStore, PgScreeningStore, ScreeningStore};

/// 설정에 맞는 폴백 해석기 생성.
///
/// - `live`: API 키가 있는 API 소스와 스크래핑 소스를 등록
/// - `mock`: 모든 지표의 소스를 목업 하나로 교체
pub fn build_resolver(config: &AppConfig, catalog: IndicatorCatalog) -> Result<FallbackResolver> {
    match config.refresh.data_mode {
        DataMode::Mock => {
            info!("목업 데이터 모드");
            let resolver = FallbackResolver::new(Arc::new(catalog.with_mock_sources()))
                .with_source(Arc::new(MockSource::new()));
            Ok(resolver)
        }
        DataMode::Live => {
            let api = &config.api;
            let timeout = api.request_timeout();
            let mut resolver = FallbackResolver::new(Arc::new(catalog));

            match api.fred_api_key.as_deref() {
                Some(key) => {
                    let client = FredClient::new(key, timeout)?.with_base_url(&api.fred_base_url);
                    resolver = resolver.with_source(Arc::new(client));
                }
                None => warn!("FRED API 키가 없습니다. FRED 소스를 건너뜁니다"),
            }

            match api.alpha_vantage_api_key.as_deref() {
                Some(key) => {
                    let client = AlphaVantageClient::new(key, timeout)?
                        .with_base_url(&api.alpha_vantage_base_url);
                    resolver = resolver.with_source(Arc::new(client));
                }
                None => warn!("Alpha Vantage API 키가 없습니다. Alpha Vantage 소스를 건너뜁니다"),
            }

            resolver = resolver.with_source(Arc::new(ScrapedSource::new(timeout)?));
            info!(sources = ?resolver.source_kinds(), "지표 소스 등록 완료");
            Ok(resolver)
        }
    }
}

/// 베트남 주식 스캐너 생성 (TCBS + VNDirect + Vietstock/CafeF)
pub fn build_scanner(config: &AppConfig) -> Result<EquityScanner> {
    let timeout = config.api.request_timeout();
    Ok(EquityScanner::new(
        Arc::new(TcbsClient::new(timeout)?),
        Arc::new(VndirectClient::new(timeout)?),
        Arc::new(VietnamWebScraper::new(timeout, config.scan.request_delay())?),
    ))
}

/// 설정에 맞는 저장소 생성 (DB URL이 없으면 메모리)
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn ScreeningStore>> {
    if config.database.url.is_none() {
        warn!("database.url이 없습니다. 메모리 저장소를 사용합니다 (프로세스 종료 시 사라짐)");
        return Ok(Arc::new(MemoryScreeningStore::new()));
    }

    let store = PgScreeningStore::connect(&config.database).await?;
    store.ensure_all_schemas().await?;
    Ok(Arc::new(store))
}

/// 지표 갱신과 주식 스캔을 묶는 중앙 매니저.
pub struct DataManager {
    config: AppConfig,
    orchestrator: RefreshOrchestrator,
    scanner: EquityScanner,
    store: Arc<dyn ScreeningStore>,
}

impl DataManager {
    /// 설정으로부터 전체 파이프라인 생성
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing DataManager...");

        let resolver = build_resolver(&config, IndicatorCatalog::builtin()?)?;
        let scanner = build_scanner(&config)?;
        let store = build_store(&config).await?;

        Ok(Self::from_parts(config, resolver, scanner, store))
    }

    /// 구성 요소를 직접 지정하여 생성
    pub fn from_parts(
        config: AppConfig,
        resolver: FallbackResolver,
        scanner: EquityScanner,
        store: Arc<dyn ScreeningStore>,
    ) -> Self {
        let cache = Arc::new(IndicatorCache::new(
            Arc::new(resolver),
            config.refresh.ttl_policy(),
        ));
        let orchestrator =
            RefreshOrchestrator::new(cache).with_concurrency(config.refresh.concurrency);

        Self {
            config,
            orchestrator,
            scanner,
            store,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<IndicatorCache> {
        self.orchestrator.cache()
    }

    pub fn store(&self) -> &Arc<dyn ScreeningStore> {
        &self.store
    }

    /// 지표 갱신 사이클 한 번 실행
    pub async fn refresh(&self, mode: RefreshMode) -> Snapshot {
        self.orchestrator.refresh_all(Utc::now(), mode).await
    }

    /// 거래소 스캔 후 저장
    ///
    /// `symbols`가 비어 있으면 설정의 기본 종목 목록을 사용합니다.
    pub async fn scan_exchange(&self, exchange: Exchange, symbols: &[String]) -> Result<ScanReport> {
        let symbols = if symbols.is_empty() {
            self.config.scan.symbols_for(exchange)
        } else {
            symbols.iter().map(|s| s.trim().to_uppercase()).collect()
        };

        let now: DateTime<Utc> = Utc::now();
        let report = self
            .scanner
            .scan(exchange, &symbols, self.config.scan.request_delay(), now)
            .await;

        self.store.upsert(exchange, &report.rows, report.scanned_at).await?;
        Ok(report)
    }

    /// 저장된 스크리닝 결과
    pub async fn load_latest(&self, exchange: Exchange) -> Result<Vec<ScreeningRow>> {
        self.store.load_latest(exchange).await
    }
}
