use super::{CreateOutcome, Storage};
use crate::types::{LegacyQuestion, NewQuestion, Session};
use anyhow::{Context, Result};
use aws_sdk_dynamodb::{Client, types::AttributeValue};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

const LEGACY_QUESTION_PARTITION_KEY: &str = "FEEDBACK_QUESTION";
const SESSION_PARTITION_KEY: &str = "FEEDBACK_SESSION";
const QUESTION_PARTITION_KEY: &str = "QUESTION";

// ============================================================================
// DynamoStorage — DynamoDB-backed Storage implementation
// ============================================================================

pub struct DynamoStorage {
    client: Client,
    table_name: String,
}

impl DynamoStorage {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    /// Run a paginated query over the legacy question partition.
    async fn query_legacy_questions(
        &self,
        key_condition: &str,
        filter: Option<&str>,
        mut values: HashMap<String, AttributeValue>,
    ) -> Result<Vec<LegacyQuestion>> {
        values.insert(
            ":pk".to_string(),
            AttributeValue::S(LEGACY_QUESTION_PARTITION_KEY.to_string()),
        );

        let mut questions = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let mut req = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression(key_condition)
                .set_filter_expression(filter.map(str::to_string))
                .set_expression_attribute_values(Some(values.clone()));

            if let Some(start_key) = exclusive_start_key {
                req = req.set_exclusive_start_key(Some(start_key));
            }

            let output = req
                .send()
                .await
                .context("Failed to query legacy questions")?;

            if let Some(items) = output.items {
                for item in items {
                    questions.push(from_item(item).context("Invalid legacy question record")?);
                }
            }

            exclusive_start_key = output.last_evaluated_key;
            if exclusive_start_key.is_none() {
                break;
            }
        }

        Ok(questions)
    }
}

impl Storage for DynamoStorage {
    async fn get_legacy_questions_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<LegacyQuestion>> {
        self.query_legacy_questions(
            "PK = :pk",
            Some("updated_at >= :since"),
            HashMap::from([(
                ":since".to_string(),
                AttributeValue::N(since.timestamp_millis().to_string()),
            )]),
        )
        .await
    }

    async fn get_legacy_questions_for_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<LegacyQuestion>> {
        // begins_with narrows the read; the filter makes the match exact.
        self.query_legacy_questions(
            "PK = :pk AND begins_with(SK, :prefix)",
            Some("course_id = :course_id"),
            HashMap::from([
                (
                    ":prefix".to_string(),
                    AttributeValue::S(format!("{}#", course_id)),
                ),
                (
                    ":course_id".to_string(),
                    AttributeValue::S(course_id.to_string()),
                ),
            ]),
        )
        .await
    }

    async fn get_all_legacy_questions(&self) -> Result<Vec<LegacyQuestion>> {
        self.query_legacy_questions("PK = :pk", None, HashMap::new())
            .await
    }

    async fn get_session(
        &self,
        feedback_session_name: &str,
        course_id: &str,
    ) -> Result<Option<Session>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "PK",
                AttributeValue::S(SESSION_PARTITION_KEY.to_string()),
            )
            .key(
                "SK",
                AttributeValue::S(session_sk(course_id, feedback_session_name)),
            )
            .send()
            .await
            .context("Failed to get feedback session")?;

        output
            .item
            .map(|item| from_item(item).context("Invalid feedback session record"))
            .transpose()
    }

    async fn get_question(
        &self,
        feedback_session_name: &str,
        course_id: &str,
        question_id: &str,
    ) -> Result<Option<NewQuestion>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "PK",
                AttributeValue::S(QUESTION_PARTITION_KEY.to_string()),
            )
            .key(
                "SK",
                AttributeValue::S(question_sk(course_id, feedback_session_name, question_id)),
            )
            .send()
            .await
            .context("Failed to get question")?;

        output
            .item
            .map(|item| from_item(item).context("Invalid question record"))
            .transpose()
    }

    async fn create_question(&self, question: &NewQuestion) -> Result<CreateOutcome> {
        if self
            .get_session(&question.feedback_session_name, &question.course_id)
            .await?
            .is_none()
        {
            return Ok(CreateOutcome::MissingReference(format!(
                "Session [{}/{}] does not exist",
                question.course_id, question.feedback_session_name
            )));
        }

        let errors = question.invalidity_info();
        if !errors.is_empty() {
            return Ok(CreateOutcome::InvalidInput(errors));
        }

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(question_to_item(question)?))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    Ok(CreateOutcome::AlreadyExists)
                } else {
                    Err(anyhow::Error::new(service_err).context("Failed to create question"))
                }
            }
        }
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

fn session_sk(course_id: &str, feedback_session_name: &str) -> String {
    format!("{}#{}", course_id, feedback_session_name)
}

fn question_sk(course_id: &str, feedback_session_name: &str, question_id: &str) -> String {
    format!("{}#{}#{}", course_id, feedback_session_name, question_id)
}

pub(crate) fn question_to_item(question: &NewQuestion) -> Result<HashMap<String, AttributeValue>> {
    let mut item = to_item(question)?;
    item.insert(
        "PK".to_string(),
        AttributeValue::S(QUESTION_PARTITION_KEY.to_string()),
    );
    item.insert(
        "SK".to_string(),
        AttributeValue::S(question_sk(
            &question.course_id,
            &question.feedback_session_name,
            &question.question_id,
        )),
    );
    Ok(item)
}

fn to_item<T: Serialize>(value: &T) -> Result<HashMap<String, AttributeValue>> {
    match json_to_av(&serde_json::to_value(value)?)? {
        AttributeValue::M(map) => Ok(map),
        _ => anyhow::bail!("Record did not serialize to a map"),
    }
}

/// Decode a DynamoDB item into a record. `PK`/`SK` and any other
/// attributes the record doesn't declare are ignored.
pub(crate) fn from_item<T: DeserializeOwned>(item: HashMap<String, AttributeValue>) -> Result<T> {
    let json = av_to_json(&AttributeValue::M(item))?;
    Ok(serde_json::from_value(json)?)
}

fn json_to_av(json: &serde_json::Value) -> Result<AttributeValue> {
    Ok(match json {
        serde_json::Value::Null => AttributeValue::Null(true),
        serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
        serde_json::Value::Number(n) => AttributeValue::N(n.to_string()),
        serde_json::Value::String(s) => AttributeValue::S(s.clone()),
        serde_json::Value::Array(arr) => {
            AttributeValue::L(arr.iter().map(json_to_av).collect::<Result<_>>()?)
        }
        serde_json::Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| json_to_av(v).map(|av| (k.clone(), av)))
                .collect::<Result<_>>()?,
        ),
    })
}

fn av_to_json(av: &AttributeValue) -> Result<serde_json::Value> {
    Ok(match av {
        AttributeValue::Null(_) => serde_json::Value::Null,
        AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
        AttributeValue::N(n) => n
            .parse::<i64>()
            .map(Into::into)
            .or_else(|_| n.parse::<f64>().map(Into::into))
            .unwrap_or_else(|_| serde_json::Value::String(n.clone())),
        AttributeValue::S(s) => serde_json::Value::String(s.clone()),
        AttributeValue::Ss(list) => serde_json::Value::Array(
            list.iter()
                .cloned()
                .map(serde_json::Value::String)
                .collect(),
        ),
        AttributeValue::L(list) => {
            serde_json::Value::Array(list.iter().map(av_to_json).collect::<Result<_>>()?)
        }
        AttributeValue::M(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| av_to_json(v).map(|json| (k.clone(), json)))
                .collect::<Result<_>>()?,
        ),
        _ => serde_json::Value::Null, // Ignore binary/number-set types (non-exhaustive enum)
    })
}

// ============================================================================
// Tests — DynamoDB serialization helpers (no network required)
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::{legacy_question, session};
    use chrono::TimeZone;

    fn make_session_item(
        course: &str,
        name: &str,
        created_ms: i64,
    ) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                "PK".to_string(),
                AttributeValue::S(SESSION_PARTITION_KEY.to_string()),
            ),
            (
                "SK".to_string(),
                AttributeValue::S(session_sk(course, name)),
            ),
            (
                "feedback_session_name".to_string(),
                AttributeValue::S(name.to_string()),
            ),
            ("course_id".to_string(), AttributeValue::S(course.to_string())),
            (
                "creator_email".to_string(),
                AttributeValue::S("instructor@example.com".to_string()),
            ),
            (
                "created_at".to_string(),
                AttributeValue::N(created_ms.to_string()),
            ),
        ])
    }

    #[test]
    fn session_from_item_valid() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let item = make_session_item("CS101", "Midterm", created.timestamp_millis());

        let s: Session = from_item(item).unwrap();

        assert_eq!(s.course_id, "CS101");
        assert_eq!(s.feedback_session_name, "Midterm");
        assert_eq!(s.created_at, created);
    }

    #[test]
    fn session_from_item_missing_course() {
        let mut item = make_session_item("CS101", "Midterm", 0);
        item.remove("course_id");
        assert!(from_item::<Session>(item).is_err());
    }

    #[test]
    fn question_to_item_sets_keys_and_native_types() {
        let q = NewQuestion::from_legacy(
            &session("CS101", "Midterm"),
            &legacy_question("CS101", "Midterm", "q1"),
        );

        let item = question_to_item(&q).unwrap();

        assert_eq!(item["PK"], AttributeValue::S("QUESTION".to_string()));
        assert_eq!(item["SK"], AttributeValue::S("CS101#Midterm#q1".to_string()));
        assert_eq!(
            item["updated_at"],
            AttributeValue::N(q.updated_at.timestamp_millis().to_string())
        );
        assert_eq!(
            item["number_of_entities_to_give_feedback_to"],
            AttributeValue::N("-1".to_string())
        );
        assert!(matches!(item["question_details"], AttributeValue::M(_)));
        assert!(matches!(item["show_response_to"], AttributeValue::L(ref l) if l.len() == 2));
    }

    #[test]
    fn legacy_question_from_item_reads_string_set_visibility() {
        let q = NewQuestion::from_legacy(
            &session("CS101", "Midterm"),
            &legacy_question("CS101", "Midterm", "q1"),
        );
        let mut item = question_to_item(&q).unwrap();
        item.insert(
            "show_giver_name_to".to_string(),
            AttributeValue::Ss(vec!["INSTRUCTORS".to_string()]),
        );

        let legacy: LegacyQuestion = from_item(item).unwrap();

        assert_eq!(legacy.question_id, "q1");
        assert_eq!(legacy.show_giver_name_to, vec!["INSTRUCTORS".to_string()]);
        assert_eq!(legacy.question_details, q.question_details);
        assert_eq!(legacy.updated_at, q.updated_at);
    }

    #[test]
    fn legacy_question_from_item_rejects_bad_number() {
        let q = NewQuestion::from_legacy(
            &session("CS101", "Midterm"),
            &legacy_question("CS101", "Midterm", "q1"),
        );
        let mut item = question_to_item(&q).unwrap();
        item.insert(
            "question_number".to_string(),
            AttributeValue::S("first".to_string()),
        );

        assert!(from_item::<LegacyQuestion>(item).is_err());
    }
}
