//! SLA evaluation for files based on age and per-classification thresholds.
//!
//! Age is counted in whole days since creation. Ingested files report the age
//! frozen at ingestion time. The threshold comes from the file configuration
//! of the file's classification: the AI classification once the file has
//! reached a post-extraction status, the rule classification before that.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::file::{FileRecord, FileStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlaStatus {
    #[serde(rename = "Within SLA")]
    WithinSla,
    #[serde(rename = "On SLA")]
    OnSla,
    #[serde(rename = "SLA Breached")]
    Breached,
}

/// Age bucket used for ageing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AgeTier {
    T0,
    T1,
    T2,
    T3,
    #[serde(rename = "T3+")]
    T3Plus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaResult {
    pub age_days: i64,
    pub sla_days: Option<i32>,
    pub display: String,
    pub status: Option<SlaStatus>,
    pub tier: AgeTier,
}

pub fn age_tier(age_days: i64) -> AgeTier {
    match age_days {
        i64::MIN..=0 => AgeTier::T0,
        1 => AgeTier::T1,
        2 => AgeTier::T2,
        3 => AgeTier::T3,
        _ => AgeTier::T3Plus,
    }
}

/// Evaluate an age against an optional threshold. Zero or negative
/// thresholds mean no SLA applies.
pub fn evaluate(age_days: i64, sla_days: Option<i32>) -> SlaResult {
    let threshold = sla_days.filter(|d| *d > 0);
    let (display, status) = match threshold {
        Some(days) => {
            let days_i64 = i64::from(days);
            let status = match age_days.cmp(&days_i64) {
                std::cmp::Ordering::Less => SlaStatus::WithinSla,
                std::cmp::Ordering::Equal => SlaStatus::OnSla,
                std::cmp::Ordering::Greater => SlaStatus::Breached,
            };
            (format!("{age_days}/{days}"), Some(status))
        }
        None => (age_days.to_string(), None),
    };

    SlaResult {
        age_days,
        sla_days: threshold,
        display,
        status,
        tier: age_tier(age_days),
    }
}

/// Statuses at which the AI classification drives the SLA lookup.
fn uses_ai_classification(status: &FileStatus) -> bool {
    matches!(
        status,
        FileStatus::Linked
            | FileStatus::Approved
            | FileStatus::Ingested
            | FileStatus::Completed
            | FileStatus::Ignored
    )
}

/// Classification name used to look up the file's SLA threshold.
pub fn classification_key(file: &FileRecord) -> Option<&str> {
    if uses_ai_classification(&file.status) {
        file.ai_classification.as_deref()
    } else {
        file.rule_classification.as_deref()
    }
}

/// Age of the file in whole days as of `now`.
pub fn file_age(file: &FileRecord, now: DateTime<Utc>) -> i64 {
    match (&file.status, file.age) {
        (FileStatus::Ingested, Some(frozen)) => i64::from(frozen),
        _ => (now - file.created_at).num_days(),
    }
}

/// Full SLA evaluation of a file against the configured thresholds.
pub fn for_file(file: &FileRecord, thresholds: &HashMap<String, i32>, now: DateTime<Utc>) -> SlaResult {
    let sla_days = classification_key(file).and_then(|key| thresholds.get(key).copied());
    evaluate(file_age(file, now), sla_days)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::file::fixtures::file;
    use crate::models::file::FileStage;

    // -- Evaluation --

    #[test]
    fn within_on_and_breached() {
        assert_eq!(evaluate(1, Some(3)).status, Some(SlaStatus::WithinSla));
        assert_eq!(evaluate(3, Some(3)).status, Some(SlaStatus::OnSla));
        assert_eq!(evaluate(4, Some(3)).status, Some(SlaStatus::Breached));
    }

    #[test]
    fn display_with_and_without_threshold() {
        assert_eq!(evaluate(2, Some(5)).display, "2/5");
        assert_eq!(evaluate(2, None).display, "2");
        assert_eq!(evaluate(2, Some(0)).display, "2");
        assert!(evaluate(2, Some(0)).status.is_none());
    }

    #[test]
    fn status_is_monotonic_in_age() {
        let rank = |s: Option<SlaStatus>| match s {
            Some(SlaStatus::WithinSla) => 0,
            Some(SlaStatus::OnSla) => 1,
            Some(SlaStatus::Breached) => 2,
            None => unreachable!(),
        };
        for sla in 1..6 {
            let mut last = 0;
            for age in 0..12 {
                let r = rank(evaluate(age, Some(sla)).status);
                assert!(r >= last, "age {age} sla {sla}");
                last = r;
            }
        }
    }

    #[test]
    fn tiers_by_age() {
        assert_eq!(age_tier(0), AgeTier::T0);
        assert_eq!(age_tier(1), AgeTier::T1);
        assert_eq!(age_tier(2), AgeTier::T2);
        assert_eq!(age_tier(3), AgeTier::T3);
        assert_eq!(age_tier(9), AgeTier::T3Plus);
    }

    #[test]
    fn sla_status_serializes_as_label() {
        assert_eq!(serde_json::to_value(SlaStatus::Breached).unwrap(), "SLA Breached");
        assert_eq!(serde_json::to_value(AgeTier::T3Plus).unwrap(), "T3+");
    }

    // -- File inputs --

    #[test]
    fn early_statuses_use_rule_classification() {
        let mut f = file(FileStatus::Captured, FileStage::ExtractReady);
        f.rule_classification = Some("NAV".to_string());
        f.ai_classification = Some("Invoice".to_string());
        assert_eq!(classification_key(&f), Some("NAV"));
    }

    #[test]
    fn late_statuses_use_ai_classification() {
        for status in [
            FileStatus::Linked,
            FileStatus::Approved,
            FileStatus::Ingested,
            FileStatus::Completed,
            FileStatus::Ignored,
        ] {
            let mut f = file(status, FileStage::Approved);
            f.rule_classification = Some("NAV".to_string());
            f.ai_classification = Some("Invoice".to_string());
            assert_eq!(classification_key(&f), Some("Invoice"));
        }
    }

    #[test]
    fn ingested_file_uses_frozen_age() {
        let now = Utc::now();
        let mut f = file(FileStatus::Ingested, FileStage::Completed);
        f.created_at = now - Duration::days(30);
        f.age = Some(2);
        assert_eq!(file_age(&f, now), 2);
    }

    #[test]
    fn other_files_age_from_creation() {
        let now = Utc::now();
        let mut f = file(FileStatus::Approved, FileStage::Approved);
        f.created_at = now - Duration::days(4) - Duration::hours(3);
        f.age = Some(1);
        assert_eq!(file_age(&f, now), 4);
    }

    #[test]
    fn unknown_classification_has_no_threshold() {
        let now = Utc::now();
        let mut f = file(FileStatus::Captured, FileStage::ExtractReady);
        f.created_at = now - Duration::days(2);
        f.rule_classification = Some("Unconfigured".to_string());
        let thresholds = HashMap::from([("NAV".to_string(), 1)]);
        let result = for_file(&f, &thresholds, now);
        assert_eq!(result.display, "2");
        assert!(result.status.is_none());
    }

    #[test]
    fn configured_classification_is_evaluated() {
        let now = Utc::now();
        let mut f = file(FileStatus::Captured, FileStage::ExtractReady);
        f.created_at = now - Duration::days(2);
        f.rule_classification = Some("NAV".to_string());
        let thresholds = HashMap::from([("NAV".to_string(), 1)]);
        let result = for_file(&f, &thresholds, now);
        assert_eq!(result.display, "2/1");
        assert_eq!(result.status, Some(SlaStatus::Breached));
    }
}
