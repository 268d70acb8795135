//! 정부 통계 페이지 스크래핑 어댑터 (최후 폴백).
//!
//! 시리즈 ID 형식: `page:column`
//! - `fred_graph:FEDFUNDS`: FRED 그래프 CSV 다운로드 (API 키 불필요)
//! - `treasury_daily:10 Yr`: 미 재무부 일별 국채 수익률 표 (HTML)
//!
//! 페이지 구조 변경은 예상된 실패이므로 `FetchError::Parse`로 보고하고 패닉하지 않습니다.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use macrodash_core::SourceKind;
use reqwest::Client;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{
    classify_status, http_client, parse_observation_date, parse_observation_value, Observation,
    SeriesSource,
};
use crate::error::FetchError;

/// 페이지 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeFormat {
    /// 첫 열이 날짜, 헤더로 값 열을 찾는 CSV
    Csv,
    /// 헤더 행으로 열을 찾고 첫 셀이 날짜인 HTML 표
    HtmlTable,
}

/// 스크래핑 대상 페이지 설정.
///
/// `url_template` 치환자:
/// - `{series}`: 시리즈 ID의 열 이름 부분
/// - `{yyyymm}`: 조회 시점의 연월 (예: 202509)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapePage {
    pub key: String,
    pub url_template: String,
    pub format: ScrapeFormat,
}

impl ScrapePage {
    pub fn new(key: impl Into<String>, url_template: impl Into<String>, format: ScrapeFormat) -> Self {
        Self {
            key: key.into(),
            url_template: url_template.into(),
            format,
        }
    }

    /// FRED 그래프 CSV
    pub fn fred_graph() -> Self {
        Self::new(
            "fred_graph",
            "https://fred.stlouisfed.org/graph/fredgraph.csv?id={series}",
            ScrapeFormat::Csv,
        )
    }

    /// 미 재무부 일별 국채 수익률 (당월)
    pub fn treasury_daily() -> Self {
        Self::new(
            "treasury_daily",
            "https://home.treasury.gov/resource-center/data-chart-center/interest-rates/TextView?type=daily_treasury_yield_curve&field_tdr_date_value_month={yyyymm}",
            ScrapeFormat::HtmlTable,
        )
    }

    fn url_for(&self, column: &str, today: NaiveDate) -> String {
        self.url_template
            .replace("{series}", column)
            .replace("{yyyymm}", &today.format("%Y%m").to_string())
    }
}

/// 스크래핑 소스.
pub struct ScrapedSource {
    client: Client,
    pages: HashMap<String, ScrapePage>,
}

impl ScrapedSource {
    /// 기본 페이지(fred_graph, treasury_daily)를 등록하여 생성
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let source = Self {
            client: http_client(timeout)?,
            pages: HashMap::new(),
        };
        Ok(source
            .with_page(ScrapePage::fred_graph())
            .with_page(ScrapePage::treasury_daily()))
    }

    /// 페이지 추가 (같은 key면 교체)
    pub fn with_page(mut self, page: ScrapePage) -> Self {
        self.pages.insert(page.key.clone(), page);
        self
    }

    pub fn page(&self, key: &str) -> Option<&ScrapePage> {
        self.pages.get(key)
    }
}

#[async_trait]
impl SeriesSource for ScrapedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Scraped
    }

    async fn fetch(&self, series_id: &str) -> Result<Observation, FetchError> {
        let (page_key, column) = series_id
            .split_once(':')
            .ok_or_else(|| FetchError::NotFound(format!("잘못된 스크래핑 시리즈 ID: {}", series_id)))?;
        let page = self
            .pages
            .get(page_key)
            .ok_or_else(|| FetchError::NotFound(format!("등록되지 않은 페이지: {}", page_key)))?;

        let url = page.url_for(column, Utc::now().date_naive());
        debug!(series = series_id, url = %url, "스크래핑 조회");

        let response = self.client.get(&url).send().await?;
        if let Some(err) = classify_status(response.status(), &format!("페이지 {}", page_key)) {
            return Err(err);
        }
        let body = response.text().await?;

        let (date, value) = match page.format {
            ScrapeFormat::Csv => parse_csv(&body, column)?,
            ScrapeFormat::HtmlTable => parse_html_table(&body, column)?,
        };

        Ok(Observation {
            series_id: series_id.to_string(),
            value,
            date,
            source: SourceKind::Scraped,
        })
    }
}

fn normalize_header(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect()
}

fn latest(rows: impl Iterator<Item = (NaiveDate, Decimal)>) -> Option<(NaiveDate, Decimal)> {
    rows.max_by_key(|(date, _)| *date)
}

/// CSV 파싱: 지정 열의 최신 날짜 값
pub fn parse_csv(body: &str, column: &str) -> Result<(NaiveDate, Decimal), FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FetchError::Parse(format!("CSV 헤더 읽기 실패: {}", e)))?
        .clone();
    let index = headers
        .iter()
        .position(|h| normalize_header(h).eq_ignore_ascii_case(column))
        .ok_or_else(|| FetchError::Parse(format!("CSV 열 없음: {}", column)))?;

    let rows = reader.records().filter_map(|record| {
        let record = record.ok()?;
        let date = parse_observation_date(record.get(0)?)?;
        let value = parse_observation_value(record.get(index)?)?;
        Some((date, value))
    });

    latest(rows).ok_or_else(|| FetchError::Parse(format!("CSV 유효 행 없음: {}", column)))
}

/// HTML 표 파싱: 헤더 행에서 열을 찾고 최신 날짜 값
pub fn parse_html_table(body: &str, column: &str) -> Result<(NaiveDate, Decimal), FetchError> {
    let document = Html::parse_document(body);
    let selector = |s: &str| {
        Selector::parse(s).map_err(|e| FetchError::Parse(format!("셀렉터 오류 {}: {:?}", s, e)))
    };
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let header_sel = selector("th")?;
    let cell_sel = selector("td")?;

    for table in document.select(&table_sel) {
        let mut rows = table.select(&row_sel);

        let Some(header_row) = rows.next() else {
            continue;
        };
        let headers: Vec<String> = header_row
            .select(&header_sel)
            .map(|th| normalize_header(&cell_text(th)))
            .collect();
        let Some(index) = headers.iter().position(|h| h.eq_ignore_ascii_case(column)) else {
            continue;
        };

        let values = rows.filter_map(|row| {
            let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
            let date = parse_observation_date(cells.first()?)?;
            let value = parse_observation_value(cells.get(index)?)?;
            Some((date, value))
        });

        return latest(values)
            .ok_or_else(|| FetchError::Parse(format!("표에 유효 행 없음: {}", column)));
    }

    Err(FetchError::Parse(format!("열을 가진 표 없음: {}", column)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_fred_graph_csv() {
        let body = "observation_date,FEDFUNDS\n2025-07-01,4.33\n2025-08-01,4.33\n2025-09-01,4.22\n2025-10-01,.\n";

        let (date, value) = parse_csv(body, "FEDFUNDS").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        assert_eq!(value, dec!(4.22));
    }

    #[test]
    fn test_parse_csv_missing_column_is_parse_error() {
        let body = "DATE,GDP\n2025-04-01,30000\n";
        assert!(matches!(parse_csv(body, "FEDFUNDS"), Err(FetchError::Parse(_))));
        assert!(matches!(parse_csv("DATE,GDP\n", "GDP"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_parse_treasury_html_table() {
        let body = r#"
            <html><body>
            <table class="usa-table">
              <thead><tr><th>Date</th><th>1 Mo</th><th>3 Mo</th><th>10
                  Yr</th></tr></thead>
              <tbody>
                <tr><td>09/02/2025</td><td>4.36</td><td>4.14</td><td>4.28</td></tr>
                <tr><td>09/03/2025</td><td>4.35</td><td>4.13</td><td>4.22</td></tr>
              </tbody>
            </table>
            </body></html>"#;

        let (date, value) = parse_html_table(body, "10 Yr").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 9, 3).unwrap());
        assert_eq!(value, dec!(4.22));

        assert!(matches!(parse_html_table(body, "7 Yr"), Err(FetchError::Parse(_))));
        assert!(matches!(parse_html_table("<p>maintenance</p>", "10 Yr"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_url_template_placeholders() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        assert_eq!(
            ScrapePage::fred_graph().url_for("UNRATE", today),
            "https://fred.stlouisfed.org/graph/fredgraph.csv?id=UNRATE"
        );
        assert!(ScrapePage::treasury_daily()
            .url_for("10 Yr", today)
            .ends_with("field_tdr_date_value_month=202509"));
    }
}
