//! Built-in seed data: the starting accounts and question bank.

use crate::model::{Account, BankTopic, Difficulty, Question, QuestionBank};

/// Unique ID of the seeded master account.
pub const DEFAULT_ADMIN_ID: &str = "KRURA";

/// Seed accounts: one master plus two students.
pub fn default_accounts() -> Vec<Account> {
    accounts(DEFAULT_ADMIN_ID, ["student1", "student2"])
}

/// Build a seed list with a single admin followed by students.
pub fn accounts<I, S>(admin_id: &str, students: I) -> Vec<Account>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    std::iter::once(Account::admin(admin_id))
        .chain(students.into_iter().map(Account::student))
        .collect()
}

fn question(
    id: &str,
    text: &str,
    options: [&str; 4],
    correct: usize,
    explanation: &str,
) -> Question {
    Question {
        id: id.to_string(),
        question_text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer_index: correct,
        explanation: Some(explanation.to_string()),
    }
}

/// The built-in question bank: three topics, five questions.
pub fn default_question_bank() -> QuestionBank {
    QuestionBank {
        id: "default".into(),
        name: "Default Syllabus".into(),
        description: "Built-in reading, listening and writing quizzes".into(),
        topics: vec![
            BankTopic {
                id: "topic-1".into(),
                title: "Reading Comprehension".into(),
                category: "Reading".into(),
                difficulty: Difficulty::Beginner,
                questions: vec![
                    question(
                        "q1-1",
                        "What is the main idea of a passage?",
                        [
                            "The primary point the author is making",
                            "A minor detail",
                            "The author's name",
                            "The publisher",
                        ],
                        0,
                        "The main idea is the central point the whole passage supports.",
                    ),
                    question(
                        "q1-2",
                        "An inference is:",
                        [
                            "Something stated directly",
                            "A conclusion based on evidence",
                            "A summary of the plot",
                            "A character's name",
                        ],
                        1,
                        "An inference is a logical conclusion drawn from evidence in the text.",
                    ),
                ],
            },
            BankTopic {
                id: "topic-2".into(),
                title: "Listening Skills".into(),
                category: "Listening".into(),
                difficulty: Difficulty::Beginner,
                questions: vec![question(
                    "q2-1",
                    "Active listening involves:",
                    [
                        "Hearing the words",
                        "Waiting for your turn to speak",
                        "Focusing fully on the speaker",
                        "Ignoring non-verbal cues",
                    ],
                    2,
                    "Active listening means full attention and engagement with the speaker.",
                )],
            },
            BankTopic {
                id: "topic-3".into(),
                title: "Writing and Grammar".into(),
                category: "Writing".into(),
                difficulty: Difficulty::Intermediate,
                questions: vec![
                    question(
                        "q3-1",
                        "Which of the following is a complete sentence?",
                        [
                            "Running in the park.",
                            "She runs.",
                            "Because it was raining.",
                            "And then went home.",
                        ],
                        1,
                        "A complete sentence needs both a subject and a predicate.",
                    ),
                    question(
                        "q3-2",
                        "What does a noun refer to?",
                        [
                            "An action",
                            "A person, place, or thing",
                            "A descriptive word",
                            "A connecting word",
                        ],
                        1,
                        "Nouns name people, places, things, or ideas.",
                    ),
                ],
            },
        ],
    }
}
