//! # MacroDash Core
//!
//! 매크로 대시보드의 핵심 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! - 지표 설정 (`IndicatorSpec`, `IndicatorCatalog`) 및 TTL 등급
//! - 지표 값 / 스냅샷 타입
//! - 베트남 주식 스크리닝 행 및 임계값 기반 스크리닝
//! - 파생 지표 계산 (CAGR, PEG)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
