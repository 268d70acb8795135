//! PostgreSQL screening store tests.
//!
//! Requires a running PostgreSQL and `DATABASE_URL`:
//! `DATABASE_URL=postgres://... cargo test -p macrodash-data --test pg_store -- --ignored`

use chrono::{Duration, TimeZone, Utc};
use macrodash_core::{DatabaseConfig, Exchange, ScreeningRow};
use macrodash_data::{PgScreeningStore, ScreeningStore};
use rust_decimal_macros::dec;

async fn store() -> PgScreeningStore {
    let config = DatabaseConfig {
        url: Some(std::env::var("DATABASE_URL").expect("DATABASE_URL not set")),
        max_connections: 2,
    };
    let store = PgScreeningStore::connect(&config).await.unwrap();
    store.ensure_schema(Exchange::Upcom).await.unwrap();
    store
}

#[tokio::test]
#[ignore]
async fn test_ensure_schema_twice_is_harmless() {
    let store = store().await;
    store.ensure_schema(Exchange::Upcom).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_upsert_idempotent_round() {
    let store = store().await;
    let t0 = Utc.with_ymd_and_hms(2025, 10, 1, 5, 0, 0).unwrap();

    let mut row = ScreeningRow::empty("ZZTEST", Exchange::Upcom, t0);
    row.company_name = Some("Test JSC".to_string());
    row.pe = Some(dec!(11.5));
    row.foreign_ownership = Some(dec!(0.0312));

    store.upsert(Exchange::Upcom, &[row.clone()], t0).await.unwrap();
    let first: Vec<ScreeningRow> = store
        .load_latest(Exchange::Upcom)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.symbol == "ZZTEST")
        .collect();

    let t1 = t0 + Duration::hours(1);
    store.upsert(Exchange::Upcom, &[row], t1).await.unwrap();
    let second: Vec<ScreeningRow> = store
        .load_latest(Exchange::Upcom)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.symbol == "ZZTEST")
        .collect();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert!(first[0].same_metrics(&second[0]));
    assert_eq!(second[0].scan_timestamp, t1);
    assert!(store.latest_scan_timestamp(Exchange::Upcom).await.unwrap() >= Some(t1));

    sqlx::query("DELETE FROM stocks_upcom WHERE symbol = 'ZZTEST'")
        .execute(store.pool())
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn test_upsert_removes_symbols_absent_from_scan() {
    let store = store().await;
    store.ensure_schema(Exchange::Hnx).await.unwrap();
    let t0 = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
    let t1 = t0 + Duration::hours(1);

    let vnm = ScreeningRow::empty("VNM", Exchange::Hnx, t0);
    let fpt = ScreeningRow::empty("FPT", Exchange::Hnx, t0);

    store.upsert(Exchange::Hnx, &[vnm.clone(), fpt], t0).await.unwrap();
    store.upsert(Exchange::Hnx, &[vnm], t1).await.unwrap();

    let rows = store.load_latest(Exchange::Hnx).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "VNM");
    assert_eq!(rows[0].scan_timestamp, t1);

    sqlx::query("DELETE FROM stocks_hnx WHERE symbol = 'VNM'")
        .execute(store.pool())
        .await
        .unwrap();
}
