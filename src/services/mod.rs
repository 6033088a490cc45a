//! Business logic: rule matching, lifecycle transitions, audit and SLA.

pub mod approval;
pub mod audit;
pub mod duplicates;
pub mod file;
pub mod file_configuration;
pub mod history;
pub mod intake;
pub mod lifecycle;
pub mod rule;
pub mod rule_matcher;
pub mod rule_run;
pub mod sla;
pub mod storage;
