//! PostgreSQL 스크리닝 저장소.
//!
//! 거래소별 테이블(`stocks_hose`, `stocks_hnx`, `stocks_upcom`, `stocks_vn30`)에
//! 종목 코드를 기본 키로 저장합니다.
//!
//! 스키마 변경은 추가만 합니다. 새 비율은 `ADD COLUMN IF NOT EXISTS`로 nullable 컬럼을
//! 붙이므로 기존 행이 깨지지 않으며 여러 번 실행해도 같은 결과입니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use macrodash_core::{DatabaseConfig, Exchange, ScreeningRow};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::ScreeningStore;
use crate::error::{DataError, Result};

/// 비율/금액 컬럼 (모두 NUMERIC, nullable)
pub const METRIC_COLUMNS: [&str; 27] = [
    "price_vnd",
    "market_cap",
    "pe",
    "pb",
    "peg",
    "ev_ebitda",
    "eps",
    "book_value_per_share",
    "revenue_cagr_3y",
    "profit_cagr_3y",
    "roe",
    "roa",
    "gross_margin",
    "operating_margin",
    "net_margin",
    "debt_to_equity",
    "debt_to_asset",
    "current_ratio",
    "quick_ratio",
    "operating_cash_flow",
    "free_cash_flow",
    "dividend_yield",
    "foreign_ownership",
    "free_float",
    "avg_trading_value",
    "npl_ratio",
    "llr",
];

/// [`METRIC_COLUMNS`] 순서의 값
pub(crate) fn metric_values(row: &ScreeningRow) -> [Option<Decimal>; 27] {
    [
        row.price_vnd,
        row.market_cap,
        row.pe,
        row.pb,
        row.peg,
        row.ev_ebitda,
        row.eps,
        row.book_value_per_share,
        row.revenue_cagr_3y,
        row.profit_cagr_3y,
        row.roe,
        row.roa,
        row.gross_margin,
        row.operating_margin,
        row.net_margin,
        row.debt_to_equity,
        row.debt_to_asset,
        row.current_ratio,
        row.quick_ratio,
        row.operating_cash_flow,
        row.free_cash_flow,
        row.dividend_yield,
        row.foreign_ownership,
        row.free_float,
        row.avg_trading_value,
        row.npl_ratio,
        row.llr,
    ]
}

/// [`METRIC_COLUMNS`] 순서의 필드
fn metric_fields(row: &mut ScreeningRow) -> [&mut Option<Decimal>; 27] {
    [
        &mut row.price_vnd,
        &mut row.market_cap,
        &mut row.pe,
        &mut row.pb,
        &mut row.peg,
        &mut row.ev_ebitda,
        &mut row.eps,
        &mut row.book_value_per_share,
        &mut row.revenue_cagr_3y,
        &mut row.profit_cagr_3y,
        &mut row.roe,
        &mut row.roa,
        &mut row.gross_margin,
        &mut row.operating_margin,
        &mut row.net_margin,
        &mut row.debt_to_equity,
        &mut row.debt_to_asset,
        &mut row.current_ratio,
        &mut row.quick_ratio,
        &mut row.operating_cash_flow,
        &mut row.free_cash_flow,
        &mut row.dividend_yield,
        &mut row.foreign_ownership,
        &mut row.free_float,
        &mut row.avg_trading_value,
        &mut row.npl_ratio,
        &mut row.llr,
    ]
}

/// 테이블 생성 SQL (기본 컬럼만)
fn create_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            symbol TEXT PRIMARY KEY,
            company_name TEXT,
            scan_timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
    )
}

/// 비율 컬럼 추가 SQL (멱등)
fn add_columns_sql(table: &str) -> Vec<String> {
    METRIC_COLUMNS
        .iter()
        .map(|column| format!("ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {column} NUMERIC"))
        .collect()
}

/// upsert SQL: `$1` symbol, `$2` company_name, `$3..$29` 비율, `$30` scan_timestamp
fn upsert_sql(table: &str) -> String {
    let columns = METRIC_COLUMNS.join(", ");
    let placeholders = (0..METRIC_COLUMNS.len())
        .map(|i| format!("${}", i + 3))
        .collect::<Vec<_>>()
        .join(", ");
    let scan_param = METRIC_COLUMNS.len() + 3;
    let updates = METRIC_COLUMNS
        .iter()
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect::<Vec<_>>()
        .join(",\n                ");

    format!(
        r#"
        INSERT INTO {table} (symbol, company_name, {columns}, scan_timestamp, created_at, updated_at)
        VALUES ($1, $2, {placeholders}, ${scan_param}, NOW(), NOW())
        ON CONFLICT (symbol) DO UPDATE SET
                company_name = EXCLUDED.company_name,
                {updates},
                scan_timestamp = EXCLUDED.scan_timestamp,
                updated_at = NOW()
        "#
    )
}

fn delete_missing_sql(table: &str) -> String {
    format!("DELETE FROM {table} WHERE symbol <> ALL($1)")
}

fn select_sql(table: &str) -> String {
    format!(
        "SELECT symbol, company_name, {}, scan_timestamp FROM {table} ORDER BY symbol",
        METRIC_COLUMNS.join(", ")
    )
}

fn row_from_pg(exchange: Exchange, record: &PgRow) -> Result<ScreeningRow> {
    let symbol: String = record.try_get("symbol")?;
    let scan_timestamp: DateTime<Utc> = record.try_get("scan_timestamp")?;

    let mut row = ScreeningRow::empty(symbol, exchange, scan_timestamp);
    row.company_name = record.try_get("company_name")?;
    for (column, field) in METRIC_COLUMNS.iter().zip(metric_fields(&mut row)) {
        *field = record.try_get(*column)?;
    }
    Ok(row)
}

/// PostgreSQL 스크리닝 저장소.
#[derive(Clone)]
pub struct PgScreeningStore {
    pool: PgPool,
}

impl PgScreeningStore {
    /// 연결 풀 생성
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| DataError::ConfigError("database.url이 설정되지 않았습니다".to_string()))?;

        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;
        info!("Database connection established");

        Ok(Self { pool })
    }

    /// 기존 연결 풀 재사용
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 거래소 테이블 생성 및 누락 컬럼 추가
    pub async fn ensure_schema(&self, exchange: Exchange) -> Result<()> {
        let table = exchange.table_name();

        sqlx::query(&create_table_sql(table))
            .execute(&self.pool)
            .await
            .map_err(|e| DataError::MigrationError(format!("{}: {}", table, e)))?;

        for sql in add_columns_sql(table) {
            sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DataError::MigrationError(format!("{}: {}", table, e)))?;
        }

        debug!(table, columns = METRIC_COLUMNS.len(), "스키마 확인 완료");
        Ok(())
    }

    /// 모든 거래소 테이블 스키마 확인
    pub async fn ensure_all_schemas(&self) -> Result<()> {
        for exchange in Exchange::ALL {
            self.ensure_schema(exchange).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ScreeningStore for PgScreeningStore {
    #[instrument(skip(self, rows), fields(exchange = %exchange, count = rows.len()))]
    async fn upsert(
        &self,
        exchange: Exchange,
        rows: &[ScreeningRow],
        scan_ts: DateTime<Utc>,
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let table = exchange.table_name();
        let sql = upsert_sql(table);
        let symbols: Vec<String> = rows.iter().map(|row| row.symbol.clone()).collect();

        // 읽는 쪽이 절반만 바뀐 테이블을 보지 않도록 거래소 단위 트랜잭션
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(&delete_missing_sql(table))
            .bind(&symbols)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for row in rows {
            let mut query = sqlx::query(&sql).bind(&row.symbol).bind(&row.company_name);
            for value in metric_values(row) {
                query = query.bind(value);
            }
            query.bind(scan_ts).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!(exchange = %exchange, rows = rows.len(), removed, "스크리닝 결과 저장 완료");
        Ok(rows.len())
    }

    async fn load_latest(&self, exchange: Exchange) -> Result<Vec<ScreeningRow>> {
        let records = sqlx::query(&select_sql(exchange.table_name()))
            .fetch_all(&self.pool)
            .await?;

        records.iter().map(|record| row_from_pg(exchange, record)).collect()
    }

    async fn latest_scan_timestamp(&self, exchange: Exchange) -> Result<Option<DateTime<Utc>>> {
        let sql = format!("SELECT MAX(scan_timestamp) FROM {}", exchange.table_name());
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_metric_values_and_fields_share_order() {
        let mut row = ScreeningRow::empty("VNM", Exchange::Hose, Utc::now());
        for (i, field) in metric_fields(&mut row).into_iter().enumerate() {
            *field = Some(Decimal::from(i as i64));
        }

        let values = metric_values(&row);
        for (i, value) in values.iter().enumerate() {
            assert_eq!(*value, Some(Decimal::from(i as i64)), "column {}", METRIC_COLUMNS[i]);
        }
        assert_eq!(row.pe, Some(dec!(2)));
        assert_eq!(row.llr, Some(dec!(26)));
    }

    #[test]
    fn test_upsert_sql_shape() {
        let sql = upsert_sql("stocks_hose");
        assert!(sql.contains("INSERT INTO stocks_hose"));
        assert!(sql.contains("ON CONFLICT (symbol) DO UPDATE SET"));
        assert!(sql.contains("$30"));
        assert!(!sql.contains("$31"));
        // created_at은 갱신하지 않음
        assert!(!sql.contains("created_at = "));
    }

    #[test]
    fn test_delete_missing_sql_binds_symbol_array() {
        assert_eq!(
            delete_missing_sql("stocks_hose"),
            "DELETE FROM stocks_hose WHERE symbol <> ALL($1)"
        );
    }

    #[test]
    fn test_schema_evolution_is_additive() {
        let statements = add_columns_sql("stocks_hnx");
        assert_eq!(statements.len(), METRIC_COLUMNS.len());
        assert!(statements
            .iter()
            .all(|s| s.starts_with("ALTER TABLE stocks_hnx ADD COLUMN IF NOT EXISTS")));
        assert!(create_table_sql("stocks_hnx").contains("CREATE TABLE IF NOT EXISTS stocks_hnx"));
    }
}
