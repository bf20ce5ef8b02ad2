//! Migration script to copy legacy feedback questions into the new question table.
//!
//! Old model: PK="FEEDBACK_QUESTION", SK="{course}#{session}#{question_id}"
//! New model: PK="QUESTION",          SK="{course}#{session}#{question_id}"
//!
//! The target and preview flag are set in `src/configuration.rs`. Preview is on
//! by default; turn it off and rebuild to actually write.
//!
//! Usage:
//!   DYNAMODB_TABLE=teammates-staging cargo run --bin migrate-feedback-questions

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use chrono::Utc;
use question_migration::configuration::MigrationConfig;
use question_migration::migration::MigrationRunner;
use question_migration::storage::DynamoStorage;
use std::env;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse()?),
        )
        .init();

    // Misconfiguration fails here, before anything is read.
    let config = MigrationConfig::from_static()?;

    let table_name =
        env::var("DYNAMODB_TABLE").context("DYNAMODB_TABLE environment variable must be set")?;

    println!("Migration: Feedback questions -> Questions");
    println!("Table: {}", table_name);
    println!();

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let dynamodb_client = aws_sdk_dynamodb::Client::new(&aws_config);
    let storage = Arc::new(DynamoStorage::new(dynamodb_client, table_name));

    let report = MigrationRunner::new(storage, config)
        .run(Utc::now())
        .await?;

    println!("Processed {} question(s)", report.len());

    Ok(())
}
