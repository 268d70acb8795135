//! 스크리닝 결과 저장소.
//!
//! 거래소마다 종목 코드를 키로 하는 테이블 하나를 둡니다.
//! 쓰기는 사람이 실행하는 스캔에서만 발생하므로 "마지막 쓰기 우선"으로 충분합니다.

pub mod memory;
pub mod screening;

pub use memory::MemoryScreeningStore;
pub use screening::PgScreeningStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use macrodash_core::{Exchange, ScreeningRow};

use crate::error::Result;

/// 스크리닝 결과 저장소.
#[async_trait]
pub trait ScreeningStore: Send + Sync {
    /// 거래소 테이블을 이번 스캔 결과로 교체
    ///
    /// 같은 종목은 갱신하고 없으면 삽입하며, `rows`에 없는 종목 행은 삭제합니다.
    /// `rows`가 비어 있으면 아무것도 바꾸지 않습니다.
    /// 모든 행의 `scan_timestamp`는 `scan_ts`로 기록됩니다. 반환값은 저장한 행 수.
    async fn upsert(
        &self,
        exchange: Exchange,
        rows: &[ScreeningRow],
        scan_ts: DateTime<Utc>,
    ) -> Result<usize>;

    /// 거래소의 저장된 전체 행 (종목 코드 순)
    async fn load_latest(&self, exchange: Exchange) -> Result<Vec<ScreeningRow>>;

    /// 거래소의 마지막 스캔 시각
    async fn latest_scan_timestamp(&self, exchange: Exchange) -> Result<Option<DateTime<Utc>>>;
}
