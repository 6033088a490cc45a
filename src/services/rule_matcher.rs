//! Wildcard rule matching against harvested file metadata.
//!
//! A rule pattern is a wildcard string where `*` stands for any sequence of
//! characters. Patterns are compiled to case-insensitive regexes and searched
//! (substring semantics). Rules are tried in the order supplied and the first
//! match wins.
//!
//! Files from a mailbox are matched on every populated email field: each
//! field (Subject, sender, body, file name) is tested against every populated
//! pattern of the rule. Files from other sources only compare the rule's
//! `FileName` pattern with the file name.

use regex::{Regex, RegexBuilder};

use crate::models::file::FileMetadata;
use crate::models::rule::{BusinessRule, RuleExpression};

/// A rule with its patterns compiled once for the whole run.
#[derive(Debug)]
struct CompiledRule<'a> {
    rule: &'a BusinessRule,
    /// Keyed patterns in evaluation order. Empty when the rule is unusable.
    patterns: Vec<(&'static str, Regex)>,
}

/// Matches file metadata against an ordered set of rules of one type.
#[derive(Debug)]
pub struct RuleMatcher<'a> {
    rules: Vec<CompiledRule<'a>>,
}

/// Translate a wildcard pattern into a case-insensitive regex.
///
/// Returns `None` for blank patterns. Other regex metacharacters in the
/// pattern keep their regex meaning.
pub fn compile_wildcard(pattern: &str) -> Option<Result<Regex, regex::Error>> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        RegexBuilder::new(&trimmed.replace('*', ".*"))
            .case_insensitive(true)
            .build(),
    )
}

impl<'a> RuleMatcher<'a> {
    /// Compile `rules`, keeping their order.
    ///
    /// A rule whose expression JSON is malformed never matches. A pattern that
    /// does not compile is skipped; the rule's other patterns stay usable.
    pub fn new(rules: &'a [BusinessRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CompiledRule {
                rule,
                patterns: compile_rule(rule),
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching `metadata`, if any.
    pub fn find_match(&self, metadata: &FileMetadata, email_source: bool) -> Option<&'a BusinessRule> {
        self.rules
            .iter()
            .find(|compiled| matches_rule(compiled, metadata, email_source))
            .map(|compiled| compiled.rule)
    }
}

fn compile_rule(rule: &BusinessRule) -> Vec<(&'static str, Regex)> {
    let expression: RuleExpression = match serde_json::from_str(&rule.rule_expressions) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(
                rule = %rule.unique_rule_id,
                error = %e,
                "Rule expression is not valid JSON, rule will never match"
            );
            return Vec::new();
        }
    };

    expression
        .patterns()
        .into_iter()
        .filter_map(|(key, pattern)| match compile_wildcard(pattern)? {
            Ok(re) => Some((key, re)),
            Err(e) => {
                tracing::warn!(
                    rule = %rule.unique_rule_id,
                    field = key,
                    error = %e,
                    "Rule pattern does not compile, skipping"
                );
                None
            }
        })
        .collect()
}

fn matches_rule(compiled: &CompiledRule<'_>, metadata: &FileMetadata, email_source: bool) -> bool {
    if email_source {
        let fields = [
            metadata.subject.as_deref(),
            metadata.sender_address.as_deref(),
            metadata.email_body.as_deref(),
            metadata.file_name.as_deref(),
        ];
        fields
            .into_iter()
            .flatten()
            .filter(|value| !value.trim().is_empty())
            .any(|value| compiled.patterns.iter().any(|(_, re)| re.is_match(value)))
    } else {
        let Some(file_name) = metadata.file_name.as_deref().filter(|v| !v.trim().is_empty())
        else {
            return false;
        };
        compiled
            .patterns
            .iter()
            .filter(|(key, _)| *key == "FileName")
            .any(|(_, re)| re.is_match(file_name))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::rule;
    use super::*;
    use crate::models::rule::RuleType;

    fn named(file_name: &str) -> FileMetadata {
        FileMetadata {
            file_name: Some(file_name.to_string()),
            ..FileMetadata::default()
        }
    }

    // -- Wildcard compilation --

    #[test]
    fn star_matches_any_sequence() {
        let re = compile_wildcard("draft*").unwrap().unwrap();
        assert!(re.is_match("draft_invoice.pdf"));
        assert!(re.is_match("DRAFT"));
    }

    #[test]
    fn search_is_substring() {
        let re = compile_wildcard("invoice").unwrap().unwrap();
        assert!(re.is_match("q3_invoice_final.pdf"));
    }

    #[test]
    fn blank_pattern_compiles_to_nothing() {
        assert!(compile_wildcard("   ").is_none());
    }

    #[test]
    fn broken_pattern_is_an_error() {
        assert!(compile_wildcard("stmt(").unwrap().is_err());
    }

    // -- Non-email sources --

    #[test]
    fn draft_invoice_matches_draft_rule() {
        let rules = vec![rule(1, RuleType::Ignore, r#"{"FileName":"draft*"}"#, None)];
        let matcher = RuleMatcher::new(&rules);
        let hit = matcher.find_match(&named("draft_invoice.pdf"), false);
        assert_eq!(hit.map(|r| r.id), Some(1));
    }

    #[test]
    fn non_email_ignores_other_keys() {
        let rules = vec![rule(
            1,
            RuleType::Classification,
            r#"{"Subject":"statement"}"#,
            Some("Statement"),
        )];
        let matcher = RuleMatcher::new(&rules);
        let meta = FileMetadata {
            subject: Some("monthly statement".to_string()),
            file_name: Some("statement.pdf".to_string()),
            ..FileMetadata::default()
        };
        assert!(matcher.find_match(&meta, false).is_none());
    }

    #[test]
    fn missing_file_name_never_matches() {
        let rules = vec![rule(1, RuleType::Ignore, r#"{"FileName":"*"}"#, None)];
        let matcher = RuleMatcher::new(&rules);
        assert!(matcher.find_match(&FileMetadata::default(), false).is_none());
        assert!(matcher.find_match(&named(""), false).is_none());
    }

    #[test]
    fn first_rule_in_order_wins() {
        let rules = vec![
            rule(3, RuleType::Classification, r#"{"FileName":"nav"}"#, Some("NAV")),
            rule(7, RuleType::Classification, r#"{"FileName":"nav*"}"#, Some("Other")),
        ];
        let matcher = RuleMatcher::new(&rules);
        let hit = matcher.find_match(&named("nav_2024.xlsx"), false).unwrap();
        assert_eq!(hit.classification.as_deref(), Some("NAV"));
    }

    // -- Email sources --

    #[test]
    fn email_matches_on_sender() {
        let rules = vec![rule(
            1,
            RuleType::Classification,
            r#"{"SenderAddress":"*@custodian.test"}"#,
            Some("Custody"),
        )];
        let matcher = RuleMatcher::new(&rules);
        let meta = FileMetadata {
            sender_address: Some("Reports@Custodian.test".to_string()),
            file_name: Some("x.pdf".to_string()),
            ..FileMetadata::default()
        };
        assert!(matcher.find_match(&meta, true).is_some());
    }

    #[test]
    fn email_pattern_is_tried_on_every_field() {
        let rules = vec![rule(1, RuleType::Ignore, r#"{"Subject":"unsubscribe"}"#, None)];
        let matcher = RuleMatcher::new(&rules);
        let meta = FileMetadata {
            subject: Some("Newsletter".to_string()),
            email_body: Some("click to unsubscribe".to_string()),
            ..FileMetadata::default()
        };
        assert!(matcher.find_match(&meta, true).is_some());
    }

    #[test]
    fn email_without_fields_never_matches() {
        let rules = vec![rule(1, RuleType::Ignore, r#"{"Subject":"*"}"#, None)];
        let matcher = RuleMatcher::new(&rules);
        assert!(matcher.find_match(&FileMetadata::default(), true).is_none());
    }

    // -- Bad rules --

    #[test]
    fn malformed_rule_json_is_a_non_match() {
        let rules = vec![
            rule(1, RuleType::Ignore, "{FileName: draft", None),
            rule(2, RuleType::Ignore, r#"{"FileName":"draft"}"#, None),
        ];
        let matcher = RuleMatcher::new(&rules);
        let hit = matcher.find_match(&named("draft.pdf"), false).unwrap();
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn broken_pattern_does_not_disable_rule() {
        let rules = vec![rule(
            1,
            RuleType::Ignore,
            r#"{"Subject":"(unclosed","FileName":"tmp"}"#,
            None,
        )];
        let matcher = RuleMatcher::new(&rules);
        let meta = FileMetadata {
            subject: Some("(unclosed".to_string()),
            file_name: Some("tmp_upload.csv".to_string()),
            ..FileMetadata::default()
        };
        assert!(matcher.find_match(&meta, true).is_some());
    }

    #[test]
    fn empty_rule_set_matches_nothing() {
        let matcher = RuleMatcher::new(&[]);
        assert!(matcher.is_empty());
        assert!(matcher.find_match(&named("a.pdf"), false).is_none());
    }
}
