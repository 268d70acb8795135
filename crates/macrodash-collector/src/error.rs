//! 에러 타입 정의.

use macrodash_core::DashError;
use macrodash_data::DataError;
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 데이터 계층 에러 (저장소, 소스 구성)
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 입출력 에러 (stdin, stdout)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 일부 거래소의 스캔 결과 저장 실패
    #[error("Scan results not saved for {}", .0.join(", "))]
    ScanNotSaved(Vec<String>),

    /// 출력 직렬화 에러
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<DashError> for CollectorError {
    fn from(err: DashError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
