//! 대시보드 공통 에러 타입.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum DashError {
    /// 설정 에러 (지표 카탈로그 검증 실패 포함)
    #[error("설정 에러: {0}")]
    Config(String),

    /// 데이터 에러
    #[error("데이터 에러: {0}")]
    Data(String),

    /// 인증 에러 (잘못된 API 키, 쿼터 초과)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 찾을 수 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),
}

/// 대시보드 작업을 위한 Result 타입.
pub type DashResult<T> = Result<T, DashError>;

impl DashError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DashError::Network(_))
    }

    /// 사용자에게 설정 문제로 노출해야 하는 에러인지 확인합니다.
    pub fn is_critical(&self) -> bool {
        matches!(self, DashError::Auth(_) | DashError::Config(_))
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for DashError {
    fn from(err: config::ConfigError) -> Self {
        DashError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let network_err = DashError::Network("timeout".to_string());
        assert!(network_err.is_retryable());

        let auth_err = DashError::Auth("invalid key".to_string());
        assert!(!auth_err.is_retryable());
    }

    #[test]
    fn test_error_critical() {
        assert!(DashError::Auth("quota exceeded".to_string()).is_critical());
        assert!(DashError::Config("missing series".to_string()).is_critical());
        assert!(!DashError::Data("empty".to_string()).is_critical());
    }
}
