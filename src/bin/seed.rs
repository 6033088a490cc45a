//! Seed script for development: populates a fresh database with sample data.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires the `DATABASE_URL` environment variable (reads .env).

use anyhow::Context;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fileflow::models::file::{FailureStage, FileMetadata, FileStage, FileStatus};
use fileflow::models::file_configuration::UpsertFileConfiguration;
use fileflow::models::rule::{CreateRule, RuleExpression, RuleType};
use fileflow::services;

const SEED_ACTOR: &str = "seed";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Run migrations first
    sqlx::migrate!("./migrations").run(&pool).await?;

    println!("=== fileflow Seed Script ===");

    seed_file_configurations(&pool).await?;
    seed_rules(&pool).await?;
    seed_files(&pool).await?;

    println!("\n=== Seed complete! ===");
    println!("Run the rule processor: POST /api/v1/rules/run");

    Ok(())
}

async fn seed_file_configurations(pool: &PgPool) -> anyhow::Result<()> {
    let configurations = [
        ("Bank Statement", "Daily bank statements", 1, "High"),
        ("Custody Report", "Custodian holdings reports", 2, "Medium"),
        ("Capital Call", "Fund capital call notices", 3, "Medium"),
        ("Tax Document", "Annual tax documents", 10, "Low"),
    ];

    for (name, description, sla_days, priority) in configurations {
        services::file_configuration::upsert(
            pool,
            &UpsertFileConfiguration {
                configuration_name: name.to_string(),
                description: Some(description.to_string()),
                sla_days: Some(sla_days),
                sla_priority: Some(priority.to_string()),
                is_active: Some(true),
            },
        )
        .await?;
    }

    println!("[done] Upserted {} file configurations", configurations.len());
    Ok(())
}

async fn seed_rules(pool: &PgPool) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM business_rules")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Rules already exist ({count})");
        return Ok(());
    }

    let rules = [
        (
            RuleType::Classification,
            RuleExpression {
                file_name: Some("*statement*".to_string()),
                ..Default::default()
            },
            Some("Bank Statement"),
        ),
        (
            RuleType::Classification,
            RuleExpression {
                subject: Some("*holdings*".to_string()),
                sender_address: Some("*@custodian.example".to_string()),
                ..Default::default()
            },
            Some("Custody Report"),
        ),
        (
            RuleType::Classification,
            RuleExpression {
                file_name: Some("*capital*call*".to_string()),
                ..Default::default()
            },
            Some("Capital Call"),
        ),
        (
            RuleType::Ignore,
            RuleExpression {
                subject: Some("*newsletter*".to_string()),
                ..Default::default()
            },
            None,
        ),
        (
            RuleType::Ignore,
            RuleExpression {
                file_name: Some("*.png".to_string()),
                ..Default::default()
            },
            None,
        ),
    ];

    for (rule_type, rule_expressions, classification) in rules {
        let rule = services::rule::create(
            pool,
            &CreateRule {
                rule_type,
                rule_expressions,
                classification: classification.map(str::to_string),
                password: None,
                group_code: None,
                created_by: SEED_ACTOR.to_string(),
            },
        )
        .await?;
        println!("  {} ({})", rule.unique_rule_id, rule.rule_type);
    }

    println!("[done] Created sample rules");
    Ok(())
}

/// Sample files waiting for the rule processor, plus one failed file to replay.
async fn seed_files(pool: &PgPool) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Files already exist ({count})");
        return Ok(());
    }

    let now = Utc::now();
    let samples = [
        ("daily_statement_0412.pdf", None, FileStatus::Captured, FileStage::DocReady, None),
        (
            "positions.xlsx",
            Some(("Monthly holdings", "ops@custodian.example")),
            FileStatus::Captured,
            FileStage::DocReady,
            None,
        ),
        (
            "weekly.html",
            Some(("Market newsletter", "news@research.example")),
            FileStatus::Captured,
            FileStage::DocReady,
            None,
        ),
        ("unknown_scan.pdf", None, FileStatus::Captured, FileStage::DocReady, None),
        (
            "fund_capital_call.pdf",
            None,
            FileStatus::Failed,
            FileStage::ExtractReady,
            Some(FailureStage::FailedExtraction),
        ),
    ];

    let total = samples.len();
    for (i, (file_name, email, status, stage, failure_stage)) in samples.into_iter().enumerate() {
        let (source, metadata) = match email {
            Some((subject, sender)) => (
                "Email",
                FileMetadata {
                    subject: Some(subject.to_string()),
                    sender_address: Some(sender.to_string()),
                    email_body: None,
                    file_name: Some(file_name.to_string()),
                },
            ),
            None => (
                "Upload",
                FileMetadata {
                    file_name: Some(file_name.to_string()),
                    ..Default::default()
                },
            ),
        };
        let created_at = now - Duration::days(i as i64);

        sqlx::query(
            "INSERT INTO files
                (file_uid, file_name, harvest_source, metadata, status, stage, failure_stage,
                 status_date, created_at, updated_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $8, $9)",
        )
        .bind(Uuid::now_v7())
        .bind(file_name)
        .bind(source)
        .bind(serde_json::to_string(&metadata)?)
        .bind(status)
        .bind(stage)
        .bind(failure_stage)
        .bind(created_at)
        .bind(SEED_ACTOR)
        .execute(pool)
        .await?;
    }

    println!("[done] Created {total} sample files");
    Ok(())
}
