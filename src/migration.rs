//! Copies legacy feedback questions into the new question table.
//!
//! Each selected legacy question is matched to its owning session. Questions
//! whose session is gone are reported and skipped; the rest are either
//! previewed or written, depending on [`MigrationConfig::preview`].

use crate::configuration::MigrationConfig;
use crate::selection::Selection;
use crate::storage::{CreateOutcome, Storage};
use crate::types::{LegacyQuestion, NewQuestion};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What happened to a single legacy question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// No owning session; nothing was created.
    SessionMissing,
    /// Preview only: the question would be created.
    WillCreate,
    /// The new question already exists (found in preview, or rejected as a
    /// duplicate on create).
    AlreadyExists,
    Created,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    /// `(identification string, outcome)` in processing order.
    pub outcomes: Vec<(String, RecordOutcome)>,
}

impl MigrationReport {
    pub fn count(&self, outcome: RecordOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

pub struct MigrationRunner<S> {
    storage: Arc<S>,
    config: MigrationConfig,
}

impl<S: Storage> MigrationRunner<S> {
    pub fn new(storage: Arc<S>, config: MigrationConfig) -> Self {
        Self { storage, config }
    }

    /// Run the migration against the questions selected as of `now`.
    ///
    /// Stops at the first question that can't be written for a reason other
    /// than a duplicate; questions after it are not processed.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<MigrationReport> {
        println!("Mode: {}", self.config.mode());
        println!("Target: {}", self.config.selection);

        let questions = self.select(now).await?;
        println!("Size of legacy questions = {}", questions.len());

        let mut report = MigrationReport::default();
        for (i, legacy) in questions.iter().enumerate() {
            let outcome = self.process(i + 1, legacy).await?;
            report
                .outcomes
                .push((legacy.identification_string(), outcome));
        }

        println!();
        println!("Migration complete!");
        if self.config.preview {
            println!("  Will create:    {}", report.count(RecordOutcome::WillCreate));
        } else {
            println!("  Created:        {}", report.count(RecordOutcome::Created));
        }
        println!(
            "  Already exists: {}",
            report.count(RecordOutcome::AlreadyExists)
        );
        println!(
            "  Skipped:        {}",
            report.count(RecordOutcome::SessionMissing)
        );

        Ok(report)
    }

    /// Fetch the legacy questions targeted by the configured selection.
    pub async fn select(&self, now: DateTime<Utc>) -> Result<Vec<LegacyQuestion>> {
        info!(selection = %self.config.selection, "Selecting legacy questions");

        let questions = match &self.config.selection {
            Selection::ByTime { days } => {
                let since = TimeDelta::try_days(i64::from(*days))
                    .and_then(|window| now.checked_sub_signed(window))
                    .with_context(|| format!("BY_TIME window of {} days is out of range", days))?;
                self.storage
                    .get_legacy_questions_updated_since(since)
                    .await?
            }
            Selection::ByCourse { course_id } => {
                self.storage
                    .get_legacy_questions_for_course(course_id)
                    .await?
            }
            Selection::All => self.storage.get_all_legacy_questions().await?,
        };

        info!(count = questions.len(), "Selected legacy questions");
        Ok(questions)
    }

    async fn process(&self, i: usize, legacy: &LegacyQuestion) -> Result<RecordOutcome> {
        let Some(session) = self
            .storage
            .get_session(&legacy.feedback_session_name, &legacy.course_id)
            .await?
        else {
            warn!(question = %legacy.identification_string(), "Owning session not found");
            println!("{}. Question: {}", i, legacy.identification_string());
            println!(
                "Error finding session {}:{}",
                legacy.feedback_session_name, legacy.course_id
            );
            println!("possibly due to orphaned responses");
            return Ok(RecordOutcome::SessionMissing);
        };

        if self.config.preview {
            let existing = self
                .storage
                .get_question(
                    &legacy.feedback_session_name,
                    &legacy.course_id,
                    &legacy.question_id,
                )
                .await?;

            return Ok(match existing {
                None => {
                    println!("{}. Will create question: {}", i, legacy.identification_string());
                    RecordOutcome::WillCreate
                }
                Some(existing) => {
                    println!(
                        "{}. New question type entity already exists for question: {}",
                        i,
                        existing.identification_string()
                    );
                    RecordOutcome::AlreadyExists
                }
            });
        }

        let question = NewQuestion::from_legacy(&session, legacy);
        let cause = match self.storage.create_question(&question).await? {
            CreateOutcome::Created => {
                println!("{}. Created question: {}", i, legacy.identification_string());
                return Ok(RecordOutcome::Created);
            }
            CreateOutcome::AlreadyExists => {
                println!(
                    "{}. New question type entity already exists for question: {}",
                    i,
                    legacy.identification_string()
                );
                return Ok(RecordOutcome::AlreadyExists);
            }
            CreateOutcome::MissingReference(reason) => {
                anyhow!("Missing referenced entity: {}", reason)
            }
            CreateOutcome::InvalidInput(errors) => {
                anyhow!("Invalid question: {}", errors.join("; "))
            }
        };

        error!(
            session = %session.identification_string(),
            question = %legacy.identification_string(),
            error = %cause,
            "Aborting migration"
        );
        Err(cause.context(format!(
            "{}. Unable to update existing session {} with question {}",
            i,
            session.identification_string(),
            legacy.identification_string()
        )))
    }
}
