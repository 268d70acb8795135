//! 메모리 스크리닝 저장소.
//!
//! 데이터베이스 URL이 없을 때 수집기가 사용하며, PostgreSQL 저장소와 같은 의미를 따릅니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use macrodash_core::{Exchange, ScreeningRow};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use super::ScreeningStore;
use crate::error::Result;

/// 거래소별 종목 행을 메모리에 보관하는 저장소.
#[derive(Default)]
pub struct MemoryScreeningStore {
    tables: RwLock<HashMap<Exchange, BTreeMap<String, ScreeningRow>>>,
}

impl MemoryScreeningStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScreeningStore for MemoryScreeningStore {
    async fn upsert(
        &self,
        exchange: Exchange,
        rows: &[ScreeningRow],
        scan_ts: DateTime<Utc>,
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        // 쓰기 잠금 하나로 전체 교체 (읽는 쪽은 중간 상태를 보지 않음)
        let mut tables = self.tables.write().await;
        let table = tables.entry(exchange).or_default();

        // 이번 스캔에 없는 종목은 제거
        let before = table.len();
        table.retain(|symbol, _| rows.iter().any(|row| &row.symbol == symbol));
        let removed = before - table.len();

        for row in rows {
            let mut row = row.clone();
            row.exchange = exchange;
            row.scan_timestamp = scan_ts;
            table.insert(row.symbol.clone(), row);
        }

        debug!(exchange = %exchange, rows = rows.len(), removed, "메모리 저장소 갱신");
        Ok(rows.len())
    }

    async fn load_latest(&self, exchange: Exchange) -> Result<Vec<ScreeningRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&exchange)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn latest_scan_timestamp(&self, exchange: Exchange) -> Result<Option<DateTime<Utc>>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&exchange)
            .and_then(|table| table.values().map(|row| row.scan_timestamp).max()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn row(symbol: &str, pe: rust_decimal::Decimal) -> ScreeningRow {
        let mut row = ScreeningRow::empty(symbol, Exchange::Hose, Utc::now());
        row.pe = Some(pe);
        row
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_symbol() {
        let store = MemoryScreeningStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 10, 1, 5, 0, 0).unwrap();

        store.upsert(Exchange::Hose, &[row("VNM", dec!(15)), row("FPT", dec!(20))], t0).await.unwrap();
        store
            .upsert(Exchange::Hose, &[row("FPT", dec!(18)), row("VNM", dec!(16))], t0 + Duration::hours(1))
            .await
            .unwrap();

        let rows = store.load_latest(Exchange::Hose).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "FPT");
        assert_eq!(rows[0].pe, Some(dec!(18)));
        assert_eq!(rows[1].scan_timestamp, t0 + Duration::hours(1));
        assert_eq!(
            store.latest_scan_timestamp(Exchange::Hose).await.unwrap(),
            Some(t0 + Duration::hours(1))
        );
    }

    #[tokio::test]
    async fn test_upsert_drops_symbols_missing_from_new_scan() {
        let store = MemoryScreeningStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        let t1 = t0 + Duration::hours(1);

        store.upsert(Exchange::Hose, &[row("VNM", dec!(15)), row("FPT", dec!(20))], t0).await.unwrap();
        store.upsert(Exchange::Hose, &[row("VNM", dec!(16))], t1).await.unwrap();

        let rows = store.load_latest(Exchange::Hose).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "VNM");
        assert_eq!(rows[0].scan_timestamp, t1);
    }

    #[tokio::test]
    async fn test_empty_scan_keeps_previous_rows() {
        let store = MemoryScreeningStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();

        store.upsert(Exchange::Hnx, &[row("SHS", dec!(9))], t0).await.unwrap();
        assert_eq!(store.upsert(Exchange::Hnx, &[], t0 + Duration::hours(1)).await.unwrap(), 0);

        assert_eq!(store.load_latest(Exchange::Hnx).await.unwrap().len(), 1);
        assert_eq!(store.latest_scan_timestamp(Exchange::Hnx).await.unwrap(), Some(t0));
    }

    #[tokio::test]
    async fn test_exchanges_are_separate_tables() {
        let store = MemoryScreeningStore::new();
        store.upsert(Exchange::Hnx, &[row("SHS", dec!(9))], Utc::now()).await.unwrap();

        assert!(store.load_latest(Exchange::Hose).await.unwrap().is_empty());
        assert_eq!(store.load_latest(Exchange::Hnx).await.unwrap()[0].exchange, Exchange::Hnx);
        assert_eq!(store.latest_scan_timestamp(Exchange::Upcom).await.unwrap(), None);
    }
}
