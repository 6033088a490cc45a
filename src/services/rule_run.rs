//! Classification and ignore rule run over files awaiting rule processing.
//!
//! Every active file at `DocReady` is matched against the active
//! classification and ignore rules. An ignore match wins over a
//! classification match. Matched and unmatched files alike leave the run at
//! `ExtractReady` unless ignored. The run is a single transaction: any
//! failure rolls back every file and the caller retries the whole batch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::db;
use crate::errors::{ActionResult, AppError};
use crate::models::file::{
    FileRecord, FileStage, FileStatus, RULE_PROCESSOR, SYSTEM_ACTOR, UNKNOWN_CLASSIFICATION,
};
use crate::models::rule::{BusinessRule, RuleType};
use crate::services::audit::{self, AuditEntry};
use crate::services::rule_matcher::RuleMatcher;

pub const MSG_IGNORED: &str = "File match With ignored Rule";
pub const MSG_CLASSIFIED: &str = "File match With Classified Rule";
pub const MSG_EXTRACT_READY: &str = "File is ExtractReady";
pub const MSG_UNMATCHED: &str = "File Not match with classified and ignore.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Classified,
    Ignored,
    Unmatched,
}

/// Planned mutation of one file.
#[derive(Debug, Clone)]
pub struct FilePlan {
    pub file: FileRecord,
    pub entries: Vec<AuditEntry>,
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleRunSummary {
    pub processed: usize,
    pub classified: usize,
    pub ignored: usize,
    pub unmatched: usize,
}

impl RuleRunSummary {
    fn add(&mut self, outcome: RunOutcome) {
        self.processed += 1;
        match outcome {
            RunOutcome::Classified => self.classified += 1,
            RunOutcome::Ignored => self.ignored += 1,
            RunOutcome::Unmatched => self.unmatched += 1,
        }
    }
}

/// Decide the new state of `file` given the rules that matched it.
pub fn plan_file(
    mut file: FileRecord,
    classification_hit: Option<&BusinessRule>,
    ignore_hit: Option<&BusinessRule>,
    at: DateTime<Utc>,
) -> FilePlan {
    let mut classified_by: Option<&BusinessRule> = None;

    if let Some(rule) = classification_hit {
        let target = rule.classification.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if let Some(target) = target {
            if file.stage != FileStage::Classified {
                file.move_to(file.status.clone(), FileStage::Classified, at);
                file.file_process_stage = Some(RULE_PROCESSOR.to_string());
                file.rule_classification = Some(target.to_string());
                file.file_type = Some(target.to_string());
                file.applied_rule = Some(rule.unique_rule_id.clone());
                file.business_rule_applied_at = Some(at);
                file.status_comment = Some(format!(
                    "File matched with classified rule and updated File Type as {target}"
                ));
                classified_by = Some(rule);
            }
        }
    }

    let mut entries = Vec::with_capacity(2);

    let outcome = match ignore_hit {
        Some(rule) if file.stage != FileStage::Ignored => {
            file.move_to(FileStatus::Ignored, FileStage::Ignored, at);
            file.file_process_stage = Some(RULE_PROCESSOR.to_string());
            file.ignored_by = Some(SYSTEM_ACTOR.to_string());
            file.ignored_on = Some(at);
            file.applied_rule = Some(rule.unique_rule_id.clone());
            file.business_rule_applied_at = Some(at);
            file.status_comment = Some(MSG_IGNORED.to_string());
            entries.push(
                AuditEntry::for_file(&file, MSG_IGNORED, SYSTEM_ACTOR, at)
                    .with_rule(rule.unique_rule_id.as_str()),
            );
            RunOutcome::Ignored
        }
        // Classification rows leave the rule id unset; the rule code lives
        // in the file's applied rule.
        _ => match classified_by {
            Some(_) => {
                entries.push(AuditEntry::for_file(&file, MSG_CLASSIFIED, SYSTEM_ACTOR, at));
                file.move_to(file.status.clone(), FileStage::ExtractReady, at);
                file.status_comment = Some(MSG_EXTRACT_READY.to_string());
                entries.push(AuditEntry::for_file(&file, MSG_EXTRACT_READY, SYSTEM_ACTOR, at));
                RunOutcome::Classified
            }
            None => {
                file.rule_classification = Some(UNKNOWN_CLASSIFICATION.to_string());
                file.file_process_stage = Some(RULE_PROCESSOR.to_string());
                file.move_to(file.status.clone(), FileStage::NotMatchRule, at);
                file.status_comment = Some(MSG_UNMATCHED.to_string());
                entries.push(AuditEntry::for_file(&file, MSG_UNMATCHED, SYSTEM_ACTOR, at));
                file.move_to(file.status.clone(), FileStage::ExtractReady, at);
                file.status_comment = Some(MSG_EXTRACT_READY.to_string());
                entries.push(AuditEntry::for_file(&file, MSG_EXTRACT_READY, SYSTEM_ACTOR, at));
                RunOutcome::Unmatched
            }
        },
    };

    file.updated_by = Some(SYSTEM_ACTOR.to_string());

    FilePlan {
        file,
        entries,
        outcome,
    }
}

/// Match one file against both rule sets. Unreadable metadata matches nothing.
pub fn match_file<'a>(
    file: &FileRecord,
    classification: &RuleMatcher<'a>,
    ignore: &RuleMatcher<'a>,
) -> (Option<&'a BusinessRule>, Option<&'a BusinessRule>) {
    let metadata = match file.parsed_metadata() {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(
                file_uid = %file.file_uid,
                error = %e,
                "File metadata is not valid JSON, treating as unmatched"
            );
            return (None, None);
        }
    };
    let email = file.is_email_source();
    (
        classification.find_match(&metadata, email),
        ignore.find_match(&metadata, email),
    )
}

/// Run classification and ignore rules over every file at `DocReady`.
pub async fn run(pool: &PgPool) -> Result<ActionResult<RuleRunSummary>, AppError> {
    let mut tx = pool.begin().await?;

    let classification_rules =
        db::rules::list_active_by_type(&mut *tx, RuleType::Classification).await?;
    let ignore_rules = db::rules::list_active_by_type(&mut *tx, RuleType::Ignore).await?;
    let classification = RuleMatcher::new(&classification_rules);
    let ignore = RuleMatcher::new(&ignore_rules);
    if classification.is_empty() && ignore.is_empty() {
        tracing::warn!("No active rules, files will pass through unmatched");
    }

    let files = db::files::find_at_stage(&mut *tx, &FileStage::DocReady).await?;
    let mut summary = RuleRunSummary::default();

    for file in files {
        let (classification_hit, ignore_hit) = match_file(&file, &classification, &ignore);
        let plan = plan_file(file, classification_hit, ignore_hit, Utc::now());
        audit::apply(&mut *tx, &plan.file, &plan.entries).await?;
        tracing::debug!(
            file_uid = %plan.file.file_uid,
            outcome = ?plan.outcome,
            stage = %plan.file.stage,
            "Rule run updated file"
        );
        summary.add(plan.outcome);
    }

    tx.commit().await?;

    tracing::info!(
        processed = summary.processed,
        classified = summary.classified,
        ignored = summary.ignored,
        unmatched = summary.unmatched,
        "Rule run complete"
    );

    let count = summary.processed;
    Ok(ActionResult::ok(
        format!("{count} files processed"),
        count,
        Some(summary),
    ))
}
