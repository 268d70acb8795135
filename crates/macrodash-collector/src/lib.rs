//! Standalone collector for the macro dashboard.
//!
//! 이 crate는 대시보드와 독립적으로 실행되는 바이너리를 제공합니다:
//! - 매크로 지표 갱신 (1회 / 자동 갱신 데몬)
//! - 베트남 거래소 종목 스캔 및 저장
//! - 저장된 스크리닝 결과 조회

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
