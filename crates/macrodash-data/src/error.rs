//! 데이터 모듈 오류 타입.
//!
//! - [`FetchError`]: 소스 어댑터 한 번의 조회 실패
//! - [`ResolveError`]: 모든 소스 실패 시 소스별 실패 목록
//! - [`NoData`]: 캐시에 값이 한 번도 없는 상태에서의 실패 (캐시 계층의 유일한 실패)
//! - [`DataError`]: 저장소/스캔/설정 오류

use macrodash_core::{DashError, SourceKind};
use std::fmt;
use thiserror::Error;

/// 소스 어댑터 조회 오류.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// 네트워크/타임아웃 (다음 소스로 넘어가면 됨)
    #[error("전송 오류: {0}")]
    Transport(String),

    /// 잘못된 API 키 또는 쿼터 초과 (사이클 내 재시도 불가)
    #[error("인증/쿼터 거부: {0}")]
    Auth(String),

    /// 업스트림 응답 형식 변경
    #[error("파싱 실패: {0}")]
    Parse(String),

    /// 시리즈/종목 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),
}

impl FetchError {
    /// 재시도 가능한 오류인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// 설정 문제로 사용자에게 보여야 하는 오류인지 확인
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// 소스 하나의 실패 기록.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: SourceKind,
    pub series_id: String,
    pub error: FetchError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.source, self.series_id, self.error)
    }
}

/// 지표 해석 오류.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// 카탈로그에 없는 지표
    #[error("알 수 없는 지표: {0}")]
    UnknownIndicator(String),

    /// 모든 소스 실패 (우선순위 순 실패 목록)
    #[error("모든 소스 실패 ({indicator}): {}", format_failures(.failures))]
    Exhausted {
        indicator: String,
        failures: Vec<SourceFailure>,
    },
}

impl ResolveError {
    /// 소스별 실패 목록 (우선순위 순)
    pub fn failures(&self) -> &[SourceFailure] {
        match self {
            Self::UnknownIndicator(_) => &[],
            Self::Exhausted { failures, .. } => failures,
        }
    }

    /// 인증 오류가 하나라도 있는지 (설정 문제 표시용)
    pub fn has_auth_failure(&self) -> bool {
        self.failures().iter().any(|f| f.error.is_auth())
    }
}

fn format_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// 캐시된 값이 한 번도 없는 지표의 조회 실패.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("데이터 없음: {source}")]
pub struct NoData {
    #[source]
    pub source: ResolveError,
}

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 레코드를 찾을 수 없음
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 마이그레이션 오류
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// 외부 소스 조회 오류
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Database(db_err) => DataError::QueryError(db_err.message().to_string()),
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

impl From<DashError> for DataError {
    fn from(err: DashError) -> Self {
        DataError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_classification() {
        assert!(FetchError::Transport("timeout".into()).is_retryable());
        assert!(!FetchError::Auth("bad key".into()).is_retryable());
        assert!(!FetchError::Parse("schema".into()).is_retryable());
        assert!(FetchError::Auth("bad key".into()).is_auth());
    }

    #[test]
    fn test_exhausted_keeps_failure_order() {
        let err = ResolveError::Exhausted {
            indicator: "cpi".to_string(),
            failures: vec![
                SourceFailure {
                    source: SourceKind::Fred,
                    series_id: "CPIAUCSL".to_string(),
                    error: FetchError::Auth("invalid api_key".into()),
                },
                SourceFailure {
                    source: SourceKind::Scraped,
                    series_id: "fred_graph:CPIAUCSL".to_string(),
                    error: FetchError::Transport("timeout".into()),
                },
            ],
        };

        assert_eq!(err.failures()[0].source, SourceKind::Fred);
        assert_eq!(err.failures()[1].source, SourceKind::Scraped);
        assert!(err.has_auth_failure());

        let message = err.to_string();
        assert!(message.find("FRED").unwrap() < message.find("Scraped").unwrap());
    }
}
