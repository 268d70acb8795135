//! 갱신 사이클 스냅샷.
//!
//! 한 번의 전체 갱신 결과이며 생성 후 변경되지 않습니다.
//! 모든 항목은 같은 사이클에서 조회(또는 캐시 제공)된 값입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::indicator::IndicatorValue;

/// 스냅샷 내 지표 하나의 상태.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndicatorStatus {
    /// 유효 기간 내 값 (`from_cache`: 이번 사이클에 조회하지 않고 캐시에서 제공)
    Fresh {
        value: IndicatorValue,
        from_cache: bool,
    },
    /// 갱신 실패, 마지막 정상 값 제공
    Stale { value: IndicatorValue, reason: String },
    /// 한 번도 값을 얻지 못함
    NoData { reason: String },
}

impl IndicatorStatus {
    /// 표시 가능한 값 (Stale 포함)
    pub fn value(&self) -> Option<&IndicatorValue> {
        match self {
            Self::Fresh { value, .. } | Self::Stale { value, .. } => Some(value),
            Self::NoData { .. } => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }
}

/// 불변 갱신 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    taken_at: DateTime<Utc>,
    entries: BTreeMap<String, IndicatorStatus>,
}

impl Snapshot {
    /// 스냅샷 생성 시각 (사이클 기준 시각)
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn get(&self, indicator: &str) -> Option<&IndicatorStatus> {
        self.entries.get(indicator)
    }

    /// 지표의 표시 가능한 값
    pub fn value(&self, indicator: &str) -> Option<&IndicatorValue> {
        self.entries.get(indicator).and_then(IndicatorStatus::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndicatorStatus)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fresh_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, IndicatorStatus::Fresh { .. }))
            .count()
    }

    pub fn stale_count(&self) -> usize {
        self.entries.values().filter(|s| s.is_stale()).count()
    }

    pub fn no_data_count(&self) -> usize {
        self.entries.values().filter(|s| s.is_no_data()).count()
    }

    /// 모든 지표가 유효 기간 내 값인지
    pub fn is_complete(&self) -> bool {
        self.fresh_count() == self.entries.len()
    }
}

/// 스냅샷 빌더. 한 사이클 안에서만 사용합니다.
#[derive(Debug)]
pub struct SnapshotBuilder {
    taken_at: DateTime<Utc>,
    entries: BTreeMap<String, IndicatorStatus>,
}

impl SnapshotBuilder {
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            entries: BTreeMap::new(),
        }
    }

    /// 지표 상태 기록. 같은 지표가 다시 기록되면 덮어씁니다.
    pub fn record(&mut self, indicator: impl Into<String>, status: IndicatorStatus) -> &mut Self {
        self.entries.insert(indicator.into(), status);
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot {
            taken_at: self.taken_at,
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceKind;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn value(name: &str) -> IndicatorValue {
        IndicatorValue {
            indicator: name.to_string(),
            value: dec!(4.22),
            observation_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            fetched_at: Utc.with_ymd_and_hms(2025, 9, 2, 0, 0, 0).unwrap(),
            source: SourceKind::Fred,
        }
    }

    #[test]
    fn test_counts_and_values() {
        let now = Utc.with_ymd_and_hms(2025, 9, 2, 0, 0, 0).unwrap();
        let mut builder = SnapshotBuilder::new(now);
        builder
            .record(
                "fed_funds_rate",
                IndicatorStatus::Fresh {
                    value: value("fed_funds_rate"),
                    from_cache: false,
                },
            )
            .record(
                "cpi",
                IndicatorStatus::Stale {
                    value: value("cpi"),
                    reason: "timeout".to_string(),
                },
            )
            .record(
                "gdp",
                IndicatorStatus::NoData {
                    reason: "all sources failed".to_string(),
                },
            );
        let snapshot = builder.build();

        assert_eq!(snapshot.taken_at(), now);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.fresh_count(), 1);
        assert_eq!(snapshot.stale_count(), 1);
        assert_eq!(snapshot.no_data_count(), 1);
        assert!(!snapshot.is_complete());
        assert_eq!(snapshot.value("cpi").unwrap().value, dec!(4.22));
        assert!(snapshot.value("gdp").is_none());
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let status = IndicatorStatus::NoData {
            reason: "x".to_string(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "no_data");
    }
}
