//! 설정 로드 모듈.
//!
//! `.env`를 먼저 읽은 뒤 설정 파일(선택)과 `MACRODASH__*` 환경 변수를 합칩니다.

use macrodash_core::AppConfig;
use std::path::PathBuf;
use std::time::Duration;

use crate::Result;

/// 설정 파일 경로를 지정하는 환경 변수
pub const CONFIG_PATH_ENV: &str = "MACRODASH_CONFIG";

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 애플리케이션 설정
    pub app: AppConfig,
    /// 사용한 설정 파일
    pub config_path: Option<PathBuf>,
}

impl CollectorConfig {
    /// 환경 변수(및 `.env`)에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load(path)
    }

    /// 지정한 설정 파일로 로드 (`.env`는 항상 먼저 읽음)
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let app = AppConfig::load(config_path.as_deref())?;
        Ok(Self { app, config_path })
    }

    /// 자동 갱신 주기
    pub fn auto_refresh_interval(&self) -> Duration {
        self.app.refresh.auto_refresh_interval()
    }
}
