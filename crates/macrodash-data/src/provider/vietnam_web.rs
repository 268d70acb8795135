//! Vietstock / CafeF 기업 개요 페이지 크롤러.
//!
//! API로 얻을 수 없는 유통 주식 비율, 외국인 보유율, 시가총액, 평균 거래대금을
//! 라벨 텍스트 기준으로 추출합니다. Vietstock을 먼저 읽고 CafeF로 빈 값을 보완합니다.
//!
//! 페이지 구조가 자주 바뀌므로 라벨 후보를 여러 개 두고, 못 찾은 값은 `None`으로 둡니다.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

use super::{http_client, MarketProfile, ProfileSource};
use crate::error::FetchError;

pub const DEFAULT_VIETSTOCK_URL: &str = "https://finance.vietstock.vn";
pub const DEFAULT_CAFEF_URL: &str = "https://s.cafef.vn";

const FREE_FLOAT_LABELS: &[&str] = &[
    "Tỷ lệ cổ phiếu lưu hành",
    "Tỷ lệ lưu hành",
    "Free float",
];
const MARKET_CAP_LABELS: &[&str] = &[
    "Vốn hóa thị trường (tỷ đồng)",
    "Vốn hóa thị trường",
    "Giá trị vốn hóa",
    "Market cap",
    "Vốn hóa",
];
const FOREIGN_LABELS: &[&str] = &[
    "Tỷ lệ sở hữu nước ngoài",
    "Sở hữu nước ngoài",
    "Tỷ lệ nước ngoài",
    "Foreign ownership",
];
const TRADING_VALUE_LABELS: &[&str] = &[
    "Giá trị giao dịch TB",
    "Khối lượng giao dịch TB",
    "Khối lượng TB",
    "GTGD TB",
    "KLGD TB",
    "Trading volume",
];

/// Vietstock 페이지가 없을 때 표시되는 문구
const VIETSTOCK_NOT_FOUND: &str = "Page or Company not found";

/// 베트남 금융 포털 크롤러.
pub struct VietnamWebScraper {
    client: Client,
    vietstock_url: String,
    cafef_url: String,
    /// 사이트 간 요청 딜레이
    request_delay: Duration,
}

impl VietnamWebScraper {
    pub fn new(timeout: Duration, request_delay: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(timeout)?,
            vietstock_url: DEFAULT_VIETSTOCK_URL.to_string(),
            cafef_url: DEFAULT_CAFEF_URL.to_string(),
            request_delay,
        })
    }

    /// 사이트 기본 URL 변경 (테스트용)
    pub fn with_base_urls(mut self, vietstock: impl Into<String>, cafef: impl Into<String>) -> Self {
        self.vietstock_url = vietstock.into().trim_end_matches('/').to_string();
        self.cafef_url = cafef.into().trim_end_matches('/').to_string();
        self
    }

    /// 후보 URL을 차례로 시도해 조건을 만족하는 첫 페이지 본문 반환
    async fn first_page(&self, urls: &[String], accept: impl Fn(&str) -> bool) -> Option<String> {
        for url in urls {
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) if accept(&body) => return Some(body),
                    Ok(_) => debug!(url = %url, "페이지 내용 불일치"),
                    Err(e) => debug!(url = %url, error = %e, "본문 읽기 실패"),
                },
                Ok(response) => debug!(url = %url, status = %response.status(), "페이지 응답 실패"),
                Err(e) => debug!(url = %url, error = %e, "페이지 요청 실패"),
            }
        }
        None
    }

    async fn fetch_vietstock(&self, symbol: &str) -> Option<MarketProfile> {
        let lower = symbol.to_lowercase();
        let urls = [
            format!("{}/doanh-nghiep-a/{}-cong-ty-co-phan.htm", self.vietstock_url, lower),
            format!("{}/doanh-nghiep-a/{}.htm", self.vietstock_url, lower),
        ];
        let body = self
            .first_page(&urls, |body| !body.contains(VIETSTOCK_NOT_FOUND))
            .await?;
        Some(parse_profile_page(&body))
    }

    async fn fetch_cafef(&self, symbol: &str) -> Option<MarketProfile> {
        let lower = symbol.to_lowercase();
        let upper = symbol.to_uppercase();
        let urls: Vec<String> = ["hose", "hnx", "upcom"]
            .iter()
            .map(|board| format!("{}/{}/{}-ctcp.chn", self.cafef_url, board, lower))
            .collect();
        let body = self.first_page(&urls, |body| body.contains(&upper)).await?;
        Some(parse_profile_page(&body))
    }
}

#[async_trait]
impl ProfileSource for VietnamWebScraper {
    async fn fetch_profile(&self, symbol: &str) -> Result<MarketProfile, FetchError> {
        let vietstock = self.fetch_vietstock(symbol).await;
        if vietstock.is_none() {
            warn!(symbol, "Vietstock 페이지 접근 실패");
        }

        tokio::time::sleep(self.request_delay).await;

        let cafef = self.fetch_cafef(symbol).await;
        if cafef.is_none() {
            warn!(symbol, "CafeF 페이지 접근 실패");
        }

        match (vietstock, cafef) {
            (None, None) => Err(FetchError::NotFound(format!("기업 개요 페이지 없음: {}", symbol))),
            (Some(mut profile), Some(extra)) => {
                profile.fill_missing(extra);
                Ok(profile)
            }
            (Some(profile), None) | (None, Some(profile)) => Ok(profile),
        }
    }
}

/// 개요 페이지에서 라벨 기반으로 값 추출
pub fn parse_profile_page(body: &str) -> MarketProfile {
    let document = Html::parse_document(body);

    let company_name = Selector::parse("h1")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|h1| normalize_text(&h1.text().collect::<String>()))
        .filter(|name| !name.is_empty());

    MarketProfile {
        company_name,
        free_float: extract_by_labels(&document, FREE_FLOAT_LABELS).and_then(|t| parse_percentage(&t)),
        foreign_ownership: extract_by_labels(&document, FOREIGN_LABELS)
            .and_then(|t| parse_percentage(&t)),
        market_cap: extract_by_labels(&document, MARKET_CAP_LABELS).and_then(|t| parse_market_cap(&t)),
        avg_trading_value: extract_by_labels(&document, TRADING_VALUE_LABELS)
            .and_then(|t| parse_trading_value(&t)),
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<String>())
}

fn extract_by_labels(document: &Html, labels: &[&str]) -> Option<String> {
    labels.iter().find_map(|label| extract_by_label(document, label))
}

/// 라벨 다음 값 추출
///
/// 1. 표: 라벨 셀 다음 셀
/// 2. div/span/dt: 라벨 요소의 다음 형제 요소
fn extract_by_label(document: &Html, label: &str) -> Option<String> {
    let label_lower = label.to_lowercase();

    if let Ok(row_sel) = Selector::parse("tr") {
        let cell_sel = Selector::parse("td, th").ok()?;
        for row in document.select(&row_sel) {
            let cells: Vec<String> = row.select(&cell_sel).map(element_text).collect();
            for (i, cell) in cells.iter().enumerate() {
                if cell.to_lowercase().contains(&label_lower) {
                    if let Some(value) = cells.get(i + 1).filter(|v| !v.is_empty()) {
                        return Some(value.clone());
                    }
                }
            }
        }
    }

    let block_sel = Selector::parse("div, span, dt, label, p").ok()?;
    for element in document.select(&block_sel) {
        let text = element_text(element);
        // 라벨만 담은 짧은 요소만 (페이지 전체를 감싼 div 제외)
        if text.len() > label.len() + 40 || !text.to_lowercase().contains(&label_lower) {
            continue;
        }
        let sibling = element
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .map(element_text)
            .find(|v| !v.is_empty() && !v.eq_ignore_ascii_case(label));
        if sibling.is_some() {
            return sibling;
        }
    }

    None
}

/// 텍스트에서 첫 번째 숫자 추출 (쉼표 제거)
fn first_number(text: &str) -> Option<Decimal> {
    let cleaned = text.replace(',', "");
    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let number: String = cleaned[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number.trim_end_matches('.').parse().ok()
}

/// 백분율 텍스트 → 분수 ("45.2%" → 0.452), [0, 1]로 제한
pub fn parse_percentage(text: &str) -> Option<Decimal> {
    let mut value = first_number(text)?;
    if value > Decimal::ONE {
        value /= Decimal::ONE_HUNDRED;
    }
    Some(value.clamp(Decimal::ZERO, Decimal::ONE))
}

/// 시가총액 텍스트 → 십억 VND
pub fn parse_market_cap(text: &str) -> Option<Decimal> {
    let lower = text.to_lowercase();
    let value = first_number(&lower)?;

    if lower.contains("nghìn tỷ") || lower.contains("thousand billion") {
        Some(value * Decimal::ONE_THOUSAND)
    } else if lower.contains("triệu") || lower.contains("million") {
        Some(value / Decimal::ONE_THOUSAND)
    } else {
        // "tỷ" 또는 단위 없음: 십억 VND
        Some(value)
    }
}

/// 평균 거래대금 텍스트 → 십억 VND
pub fn parse_trading_value(text: &str) -> Option<Decimal> {
    let lower = text.to_lowercase();
    let value = first_number(&lower)?;

    if lower.contains("triệu") || lower.contains("million") {
        Some(value / Decimal::ONE_THOUSAND)
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("45.2%"), Some(dec!(0.452)));
        assert_eq!(parse_percentage("0.3"), Some(dec!(0.3)));
        assert_eq!(parse_percentage("150 %"), Some(dec!(1)));
        assert_eq!(parse_percentage("N/A"), None);
    }

    #[test]
    fn test_parse_market_cap_units() {
        assert_eq!(parse_market_cap("1,234.5 tỷ"), Some(dec!(1234.5)));
        assert_eq!(parse_market_cap("150 nghìn tỷ"), Some(dec!(150000)));
        assert_eq!(parse_market_cap("500 triệu"), Some(dec!(0.5)));
        assert_eq!(parse_market_cap("980"), Some(dec!(980)));
    }

    #[test]
    fn test_parse_trading_value_units() {
        assert_eq!(parse_trading_value("250 tỷ"), Some(dec!(250)));
        assert_eq!(parse_trading_value("800 triệu"), Some(dec!(0.8)));
    }

    #[test]
    fn test_parse_profile_from_table_and_divs() {
        let body = r#"
            <html><body>
              <h1>CTCP FPT</h1>
              <table>
                <tr><td>Vốn hóa thị trường (tỷ đồng)</td><td>180,512</td></tr>
                <tr><td>Tỷ lệ sở hữu nước ngoài</td><td>49.0%</td></tr>
              </table>
              <div class="row"><span>Free float</span><span>82.5%</span></div>
            </body></html>"#;

        let profile = parse_profile_page(body);
        assert_eq!(profile.company_name.as_deref(), Some("CTCP FPT"));
        assert_eq!(profile.market_cap, Some(dec!(180512)));
        assert_eq!(profile.foreign_ownership, Some(dec!(0.49)));
        assert_eq!(profile.free_float, Some(dec!(0.825)));
        assert_eq!(profile.avg_trading_value, None);
    }

    #[test]
    fn test_fill_missing_keeps_primary_values() {
        let mut primary = MarketProfile {
            market_cap: Some(dec!(100)),
            ..Default::default()
        };
        primary.fill_missing(MarketProfile {
            market_cap: Some(dec!(999)),
            avg_trading_value: Some(dec!(12)),
            ..Default::default()
        });

        assert_eq!(primary.market_cap, Some(dec!(100)));
        assert_eq!(primary.avg_trading_value, Some(dec!(12)));
    }
}
