//! 설정 관리.
//!
//! TOML 설정 파일(선택)과 `MACRODASH__<섹션>__<키>` 환경 변수를 병합합니다.
//! API 키와 데이터베이스 URL은 관례적인 환경 변수
//! (`FRED_API_KEY`, `ALPHA_VANTAGE_API_KEY`, `DATABASE_URL`)도 인식합니다.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::domain::{Exchange, TtlPolicy, VN30_SYMBOLS};
use crate::error::{DashError, DashResult};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 외부 API 설정
    pub api: ApiConfig,
    /// 지표 갱신 설정
    pub refresh: RefreshConfig,
    /// 주식 스캔 설정
    pub scan: ScanConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 외부 API 설정.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// FRED API 키
    pub fred_api_key: Option<String>,
    /// Alpha Vantage API 키
    pub alpha_vantage_api_key: Option<String>,
    /// FRED REST 기본 URL
    pub fred_base_url: String,
    /// Alpha Vantage REST 기본 URL
    pub alpha_vantage_base_url: String,
    /// HTTP 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            fred_api_key: None,
            alpha_vantage_api_key: None,
            fred_base_url: "https://api.stlouisfed.org/fred".to_string(),
            alpha_vantage_base_url: "https://www.alphavantage.co/query".to_string(),
            request_timeout_secs: 10,
        }
    }
}

// API 키가 로그에 찍히지 않도록 Debug를 직접 구현
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(key: &Option<String>) -> &'static str {
            if key.is_some() {
                "[REDACTED]"
            } else {
                "None"
            }
        }

        f.debug_struct("ApiConfig")
            .field("fred_api_key", &mask(&self.fred_api_key))
            .field("alpha_vantage_api_key", &mask(&self.alpha_vantage_api_key))
            .field("fred_base_url", &self.fred_base_url)
            .field("alpha_vantage_base_url", &self.alpha_vantage_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ApiConfig {
    /// HTTP 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// 데이터 소스 모드 (실데이터 / 데모용 목업).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// 외부 API 및 스크래핑 소스 사용
    #[default]
    Live,
    /// 고정 목업 값 사용
    Mock,
}

impl std::str::FromStr for DataMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown data mode: {}", s)),
        }
    }
}

/// 지표 갱신 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// 데이터 소스 모드
    pub data_mode: DataMode,
    /// 자동 갱신 주기 (분)
    pub auto_refresh_minutes: u64,
    /// 동시에 갱신할 지표 수 (1 = 순차)
    pub concurrency: usize,
    /// 단기 TTL 등급 (분)
    pub short_ttl_minutes: i64,
    /// 장기 TTL 등급 (분)
    pub long_ttl_minutes: i64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            data_mode: DataMode::Live,
            auto_refresh_minutes: 5,
            concurrency: 1,
            short_ttl_minutes: 30,
            long_ttl_minutes: 120,
        }
    }
}

impl RefreshConfig {
    /// 자동 갱신 주기를 Duration으로 반환
    pub fn auto_refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.auto_refresh_minutes * 60)
    }

    /// TTL 등급별 유효 기간
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::new(
            Duration::minutes(self.short_ttl_minutes),
            Duration::minutes(self.long_ttl_minutes),
        )
    }
}

/// 주식 스캔 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 종목 간 요청 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 기본 스캔 대상 거래소
    pub exchanges: Vec<Exchange>,
    /// 거래소별 종목 목록 (키: "HOSE" 등). 없으면 VN30 사용
    pub symbols: HashMap<String, Vec<String>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 1000,
            exchanges: vec![Exchange::Hose],
            symbols: HashMap::new(),
        }
    }
}

impl ScanConfig {
    /// 종목 간 요청 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_delay_ms)
    }

    /// 거래소의 스캔 대상 종목 목록.
    pub fn symbols_for(&self, exchange: Exchange) -> Vec<String> {
        self.symbols
            .get(exchange.code())
            .filter(|symbols| !symbols.is_empty())
            .cloned()
            .unwrap_or_else(|| VN30_SYMBOLS.iter().map(|s| s.to_string()).collect())
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. 없으면 메모리 저장소 사용
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일(선택)과 환경 변수에서 설정을 로드합니다.
    pub fn load(path: Option<&Path>) -> DashResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("MACRODASH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app: AppConfig = config.try_deserialize()?;
        app.apply_env_fallbacks();
        app.validate()?;

        Ok(app)
    }

    /// 관례적인 환경 변수로 비어 있는 값을 채웁니다.
    fn apply_env_fallbacks(&mut self) {
        fill_from_env(&mut self.api.fred_api_key, "FRED_API_KEY");
        fill_from_env(&mut self.api.alpha_vantage_api_key, "ALPHA_VANTAGE_API_KEY");
        fill_from_env(&mut self.database.url, "DATABASE_URL");
    }

    /// 값 범위를 검증합니다.
    pub fn validate(&self) -> DashResult<()> {
        if self.refresh.concurrency == 0 {
            return Err(DashError::Config(
                "refresh.concurrency는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.refresh.auto_refresh_minutes == 0 {
            return Err(DashError::Config(
                "refresh.auto_refresh_minutes는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.refresh.short_ttl_minutes <= 0 || self.refresh.long_ttl_minutes <= 0 {
            return Err(DashError::Config(
                "TTL은 0보다 커야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

/// 값이 없거나 빈 문자열이면 환경 변수 값으로 대체
fn fill_from_env(slot: &mut Option<String>, key: &str) {
    if slot.as_deref().map_or(true, |v| v.trim().is_empty()) {
        *slot = std::env::var(key).ok().filter(|v| !v.trim().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.refresh.auto_refresh_minutes, 5);
        assert_eq!(config.refresh.concurrency, 1);
        assert_eq!(config.refresh.data_mode, DataMode::Live);
        assert_eq!(config.api.request_timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ttl_policy_from_minutes() {
        let refresh = RefreshConfig {
            short_ttl_minutes: 15,
            long_ttl_minutes: 240,
            ..Default::default()
        };
        let policy = refresh.ttl_policy();

        assert_eq!(policy.short, Duration::minutes(15));
        assert_eq!(policy.long, Duration::minutes(240));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = AppConfig::default();
        config.refresh.concurrency = 0;

        assert!(matches!(config.validate(), Err(DashError::Config(_))));
    }

    #[test]
    fn test_api_debug_redacts_keys() {
        let api = ApiConfig {
            fred_api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", api);

        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_symbols_for_defaults_to_vn30() {
        let mut scan = ScanConfig::default();
        assert_eq!(scan.symbols_for(Exchange::Hose).len(), VN30_SYMBOLS.len());

        scan.symbols
            .insert("HNX".to_string(), vec!["SHS".to_string(), "PVS".to_string()]);
        assert_eq!(scan.symbols_for(Exchange::Hnx), vec!["SHS", "PVS"]);
    }

    #[test]
    fn test_data_mode_from_str() {
        assert_eq!("MOCK".parse::<DataMode>().unwrap(), DataMode::Mock);
        assert!("paper".parse::<DataMode>().is_err());
    }
}
