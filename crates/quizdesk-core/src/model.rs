//! Core data model types for quizdesk.
//!
//! These are the records both services hand out: accounts, syllabus topics,
//! questions, and the immutable test results that make up the ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access level of an account.
///
/// Serialized as `"master"` / `"student"`, which is the format the session
/// cache has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "master")]
    Admin,
    #[serde(rename = "student")]
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "master"),
            Role::Student => write!(f, "student"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "master" | "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Login identifier, unique across the registry.
    pub unique_id: String,
    pub role: Role,
}

impl Account {
    pub fn new(unique_id: impl Into<String>, role: Role) -> Self {
        Self {
            unique_id: unique_id.into(),
            role,
        }
    }

    pub fn student(unique_id: impl Into<String>) -> Self {
        Self::new(unique_id, Role::Student)
    }

    pub fn admin(unique_id: impl Into<String>) -> Self {
        Self::new(unique_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// Category given to topics that do not name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Category of topics added at runtime without one.
pub const CUSTOM_CATEGORY: &str = "Custom";

/// How demanding a topic is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "Beginner")]
    Beginner,
    #[default]
    #[serde(alias = "Intermediate")]
    Intermediate,
    #[serde(alias = "Advanced")]
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "Beginner"),
            Difficulty::Intermediate => write!(f, "Intermediate"),
            Difficulty::Advanced => write!(f, "Advanced"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A named syllabus unit with one fixed-order quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Topic {
    /// A topic in the default category at intermediate difficulty.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: default_category(),
            difficulty: Difficulty::default(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>, difficulty: Difficulty) -> Self {
        self.category = category.into();
        self.difficulty = difficulty;
        self
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question_text: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_answer_index: usize,
    /// Shown with a result once the quiz is submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// Whether `answer` selects the correct option.
    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_answer_index)
    }
}

/// One choice per question; `None` marks a question left unanswered.
pub type AnswerSet = Vec<Option<usize>>;

/// Wire value used for an unanswered question.
pub const UNANSWERED: i64 = -1;

/// Immutable record of one completed quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    pub student_id: String,
    pub topic_id: String,
    /// Title of the topic at submission time.
    pub topic_title: String,
    /// Percentage score, 0 through 100.
    pub score: u32,
    pub submitted_at: DateTime<Utc>,
}

/// A topic together with its quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTopic {
    pub id: String,
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl BankTopic {
    pub fn topic(&self) -> Topic {
        Topic::new(self.id.clone(), self.title.clone())
            .with_category(self.category.clone(), self.difficulty)
    }
}

/// A collection of topics and their questions, loaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topics: Vec<BankTopic>,
}

impl QuestionBank {
    /// Total number of questions across all topics.
    pub fn question_count(&self) -> usize {
        self.topics.iter().map(|t| t.questions.len()).sum()
    }

    /// Append the topics of `other` after this bank's topics.
    pub fn merge(&mut self, other: QuestionBank) {
        self.topics.extend(other.topics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display_and_parse() {
        assert_eq!(Role::Admin.to_string(), "master");
        assert_eq!(Role::Student.to_string(), "student");
        assert_eq!("master".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("STUDENT".parse::<Role>().unwrap(), Role::Student);
        assert!("principal".parse::<Role>().is_err());
    }

    #[test]
    fn account_serializes_in_session_format() {
        let account = Account::admin("KRURA");
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, r#"{"uniqueId":"KRURA","role":"master"}"#);

        let back: Account = serde_json::from_str(r#"{"uniqueId":"s1","role":"student"}"#).unwrap();
        assert_eq!(back, Account::student("s1"));
    }

    #[test]
    fn question_correctness() {
        let q = Question {
            id: "q".into(),
            question_text: "?".into(),
            options: vec!["a".into(), "b".into()],
            correct_answer_index: 1,
            explanation: None,
        };
        assert!(q.is_correct(Some(1)));
        assert!(!q.is_correct(Some(0)));
        assert!(!q.is_correct(None));
    }

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Advanced.to_string(), "Advanced");
        assert_eq!("beginner".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert_eq!("INTERMEDIATE".parse::<Difficulty>().unwrap(), Difficulty::Intermediate);
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn topic_defaults_category_and_difficulty() {
        let topic = Topic::new("topic-1", "Reading");
        assert_eq!(topic.category, DEFAULT_CATEGORY);
        assert_eq!(topic.difficulty, Difficulty::Intermediate);

        let back: Topic = serde_json::from_str(r#"{"id":"t","title":"T"}"#).unwrap();
        assert_eq!(back, Topic::new("t", "T"));
    }

    #[test]
    fn bank_topic_carries_category_into_topic() {
        let entry = BankTopic {
            id: "speaking-3".into(),
            title: "Argumentative Speaking".into(),
            category: "Speaking".into(),
            difficulty: Difficulty::Advanced,
            questions: Vec::new(),
        };
        let topic = entry.topic();
        assert_eq!(topic.category, "Speaking");
        assert_eq!(topic.difficulty, Difficulty::Advanced);
    }
}
