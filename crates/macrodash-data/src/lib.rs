//! 데이터 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 외부 소스 어댑터 (FRED, Alpha Vantage, 정부 통계 페이지 스크래핑, 목업)
//! - 우선순위 기반 폴백 해석기
//! - TTL 등급별 지표 캐시 (실패 시 이전 값 제공)
//! - 지표 갱신 오케스트레이터 (스냅샷 생성)
//! - 베트남 주식 스캔 (TCBS, VNDirect, Vietstock/CafeF)
//! - 스크리닝 결과 저장소 (PostgreSQL, 메모리)

pub mod cache;
pub mod error;
pub mod manager;
pub mod provider;
pub mod refresh;
pub mod resolver;
pub mod scan;
pub mod storage;

pub use error::{DataError, FetchError, NoData, ResolveError, Result, SourceFailure};
pub use manager::*;

pub use cache::{CacheEntry, CachedIndicator, Freshness, IndicatorCache};
pub use refresh::{RefreshMode, RefreshOrchestrator};
pub use resolver::FallbackResolver;
pub use scan::{EquityScanner, ScanFailure, ScanReport};

// 저장소 타입 재내보내기
pub use storage::{MemoryScreeningStore, PgScreeningStore, ScreeningStore};

// 소스 어댑터 재내보내기
pub use provider::{
    AlphaVantageClient, FredClient, FundamentalSource, Fundamentals, MarketProfile, MockSource,
    Observation, PriceSource, ProfileSource, ScrapeFormat, ScrapePage, ScrapedSource,
    SeriesSource, TcbsClient, VietnamWebScraper, VndirectClient,
};
