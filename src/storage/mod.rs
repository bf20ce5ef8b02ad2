use crate::types::{LegacyQuestion, NewQuestion, Session};
use anyhow::Result;
use chrono::{DateTime, Utc};

pub mod dynamo;
pub use dynamo::DynamoStorage;

/// Result of attempting to create a question in the new table.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The question was written.
    Created,
    /// A question with the same key is already present; nothing was written.
    AlreadyExists,
    /// An entity the question refers to (its session) does not exist.
    MissingReference(String),
    /// The question failed validation. Holds one message per problem.
    InvalidInput(Vec<String>),
}

// ============================================================================
// Storage trait
// ============================================================================

#[allow(async_fn_in_trait)]
pub trait Storage: Send + Sync {
    async fn get_legacy_questions_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<LegacyQuestion>>;
    async fn get_legacy_questions_for_course(&self, course_id: &str)
    -> Result<Vec<LegacyQuestion>>;
    async fn get_all_legacy_questions(&self) -> Result<Vec<LegacyQuestion>>;

    async fn get_session(
        &self,
        feedback_session_name: &str,
        course_id: &str,
    ) -> Result<Option<Session>>;

    async fn get_question(
        &self,
        feedback_session_name: &str,
        course_id: &str,
        question_id: &str,
    ) -> Result<Option<NewQuestion>>;

    /// Create `question` unless one with the same key exists.
    ///
    /// Recoverable and fatal rejections are both reported through
    /// [`CreateOutcome`]; `Err` is reserved for transport failures.
    async fn create_question(&self, question: &NewQuestion) -> Result<CreateOutcome>;
}

// ============================================================================
// Test utilities — InMemoryStorage for in-crate tests
// ============================================================================
