use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Participant types accepted as a question's giver or recipient.
pub const PARTICIPANT_TYPES: &[&str] = &[
    "SELF",
    "STUDENTS",
    "INSTRUCTORS",
    "TEAMS",
    "OWN_TEAM",
    "OWN_TEAM_MEMBERS",
    "OWN_TEAM_MEMBERS_INCLUDING_SELF",
    "RECEIVER",
    "RECEIVER_TEAM_MEMBERS",
    "NONE",
];

/// Sentinel for `number_of_entities_to_give_feedback_to` meaning "no limit".
pub const UNLIMITED_ENTITIES: i32 = -1;

/// A question stored in the old per-question table.
/// PK="FEEDBACK_QUESTION", SK="{course_id}#{feedback_session_name}#{question_id}"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyQuestion {
    pub question_id: String,
    pub feedback_session_name: String,
    pub course_id: String,
    pub creator_email: String,
    pub question_number: u32,
    pub question_text: String,
    pub question_details: serde_json::Value,
    pub giver_type: String,
    pub recipient_type: String,
    pub number_of_entities_to_give_feedback_to: i32,
    pub show_response_to: Vec<String>,
    pub show_giver_name_to: Vec<String>,
    pub show_recipient_name_to: Vec<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl LegacyQuestion {
    pub fn identification_string(&self) -> String {
        question_identification(
            &self.course_id,
            &self.feedback_session_name,
            &self.question_id,
        )
    }
}

/// The feedback session that owns a set of questions.
/// PK="FEEDBACK_SESSION", SK="{course_id}#{feedback_session_name}"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub feedback_session_name: String,
    pub course_id: String,
    pub creator_email: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn identification_string(&self) -> String {
        format!("[{}/{}]", self.course_id, self.feedback_session_name)
    }
}

/// A question in the new table, created as a copy of a [`LegacyQuestion`]
/// under its owning [`Session`].
/// PK="QUESTION", SK="{course_id}#{feedback_session_name}#{question_id}"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_id: String,
    pub feedback_session_name: String,
    pub course_id: String,
    pub creator_email: String,
    pub question_number: u32,
    pub question_text: String,
    pub question_details: serde_json::Value,
    pub giver_type: String,
    pub recipient_type: String,
    pub number_of_entities_to_give_feedback_to: i32,
    pub show_response_to: Vec<String>,
    pub show_giver_name_to: Vec<String>,
    pub show_recipient_name_to: Vec<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl NewQuestion {
    /// Build the new-table copy of `legacy`, keyed under `session`.
    pub fn from_legacy(session: &Session, legacy: &LegacyQuestion) -> Self {
        Self {
            question_id: legacy.question_id.clone(),
            feedback_session_name: session.feedback_session_name.clone(),
            course_id: session.course_id.clone(),
            creator_email: legacy.creator_email.clone(),
            question_number: legacy.question_number,
            question_text: legacy.question_text.clone(),
            question_details: legacy.question_details.clone(),
            giver_type: legacy.giver_type.clone(),
            recipient_type: legacy.recipient_type.clone(),
            number_of_entities_to_give_feedback_to: legacy.number_of_entities_to_give_feedback_to,
            show_response_to: legacy.show_response_to.clone(),
            show_giver_name_to: legacy.show_giver_name_to.clone(),
            show_recipient_name_to: legacy.show_recipient_name_to.clone(),
            created_at: legacy.created_at,
            updated_at: legacy.updated_at,
        }
    }

    pub fn identification_string(&self) -> String {
        question_identification(
            &self.course_id,
            &self.feedback_session_name,
            &self.question_id,
        )
    }

    /// Returns the reasons this question would be rejected on write.
    /// Empty when the question is valid.
    pub fn invalidity_info(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("question_id", &self.question_id),
            ("feedback_session_name", &self.feedback_session_name),
            ("course_id", &self.course_id),
            ("creator_email", &self.creator_email),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{} must not be empty", field));
            }
        }

        if self.question_text.trim().is_empty() {
            errors.push("question_text must not be empty".to_string());
        }

        if self.question_number == 0 {
            errors.push("question_number must be at least 1".to_string());
        }

        for (field, value) in [
            ("giver_type", &self.giver_type),
            ("recipient_type", &self.recipient_type),
        ] {
            if !PARTICIPANT_TYPES.contains(&value.as_str()) {
                errors.push(format!("{} '{}' is not a known participant type", field, value));
            }
        }

        let n = self.number_of_entities_to_give_feedback_to;
        if n != UNLIMITED_ENTITIES && n < 1 {
            errors.push(format!(
                "number_of_entities_to_give_feedback_to must be positive or {}, got {}",
                UNLIMITED_ENTITIES, n
            ));
        }

        errors
    }
}

fn question_identification(course_id: &str, session_name: &str, question_id: &str) -> String {
    format!("[{}/{}] {}", course_id, session_name, question_id)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{legacy_question, session};
    use super::*;

    #[test]
    fn from_legacy_copies_fields() {
        let s = session("CS101", "Midterm");
        let legacy = legacy_question("CS101", "Midterm", "q1");

        let q = NewQuestion::from_legacy(&s, &legacy);

        assert_eq!(q.question_id, "q1");
        assert_eq!(q.course_id, "CS101");
        assert_eq!(q.feedback_session_name, "Midterm");
        assert_eq!(q.question_text, legacy.question_text);
        assert_eq!(q.question_details, legacy.question_details);
        assert_eq!(q.show_response_to, legacy.show_response_to);
        assert_eq!(q.updated_at, legacy.updated_at);
        assert!(q.invalidity_info().is_empty());
    }

    #[test]
    fn identification_strings() {
        let legacy = legacy_question("CS101", "Midterm", "q1");
        assert_eq!(legacy.identification_string(), "[CS101/Midterm] q1");
        assert_eq!(
            session("CS101", "Midterm").identification_string(),
            "[CS101/Midterm]"
        );
    }

    #[test]
    fn invalidity_info_reports_blank_text_and_zero_number() {
        let mut legacy = legacy_question("CS101", "Midterm", "q1");
        legacy.question_text = "   ".to_string();
        legacy.question_number = 0;

        let q = NewQuestion::from_legacy(&session("CS101", "Midterm"), &legacy);
        let errors = q.invalidity_info();

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("question_text")));
        assert!(errors.iter().any(|e| e.contains("question_number")));
    }

    #[test]
    fn invalidity_info_rejects_unknown_participant_type() {
        let mut legacy = legacy_question("CS101", "Midterm", "q1");
        legacy.giver_type = "ALIENS".to_string();

        let q = NewQuestion::from_legacy(&session("CS101", "Midterm"), &legacy);
        let errors = q.invalidity_info();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("ALIENS"));
    }

    #[test]
    fn invalidity_info_entity_count() {
        let s = session("CS101", "Midterm");
        let mut legacy = legacy_question("CS101", "Midterm", "q1");

        legacy.number_of_entities_to_give_feedback_to = 3;
        assert!(NewQuestion::from_legacy(&s, &legacy).invalidity_info().is_empty());

        legacy.number_of_entities_to_give_feedback_to = 0;
        assert_eq!(NewQuestion::from_legacy(&s, &legacy).invalidity_info().len(), 1);

        legacy.number_of_entities_to_give_feedback_to = -2;
        assert_eq!(NewQuestion::from_legacy(&s, &legacy).invalidity_info().len(), 1);
    }
}
