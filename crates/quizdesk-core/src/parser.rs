//! TOML question-bank parser.
//!
//! Loads question banks from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{BankTopic, Difficulty, Question, QuestionBank, DEFAULT_CATEGORY};

/// Intermediate TOML structure for parsing question-bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    topics: Vec<TomlTopic>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlTopic {
    id: String,
    title: String,
    category: Option<String>,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    text: String,
    #[serde(default)]
    options: Vec<String>,
    correct: usize,
    explanation: Option<String>,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_question_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_question_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank`.
pub fn parse_question_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let topics = parsed
        .topics
        .into_iter()
        .map(|t| BankTopic {
            id: t.id,
            title: t.title,
            category: t
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            difficulty: t.difficulty,
            questions: t
                .questions
                .into_iter()
                .map(|q| Question {
                    id: q.id,
                    question_text: q.text,
                    options: q.options,
                    correct_answer_index: q.correct,
                    explanation: q.explanation,
                })
                .collect(),
        })
        .collect();

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        topics,
    })
}

/// Recursively load all `.toml` question-bank files from a directory.
///
/// Files are visited in path order so topic order is stable. Files that fail
/// to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_question_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank from a file, or merge every bank found under a directory.
pub fn load_banks(path: &Path) -> Result<QuestionBank> {
    if path.is_dir() {
        let mut banks = load_bank_directory(path)?.into_iter();
        let Some(mut merged) = banks.next() else {
            anyhow::bail!("no question banks found in {}", path.display());
        };
        for bank in banks {
            merged.merge(bank);
        }
        Ok(merged)
    } else {
        parse_question_bank(path)
    }
}

/// A warning from question-bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Topic the warning relates to, if any.
    pub topic_id: Option<String>,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    fn topic(topic_id: &str, message: String) -> Self {
        Self {
            topic_id: Some(topic_id.to_string()),
            message,
        }
    }
}

/// Validate a question bank and return any warnings.
pub fn validate_question_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut topic_ids = HashSet::new();

    if bank.topics.is_empty() {
        warnings.push(ValidationWarning {
            topic_id: None,
            message: "question bank has no topics".into(),
        });
    }

    for topic in &bank.topics {
        if !topic_ids.insert(topic.id.as_str()) {
            warnings.push(ValidationWarning::topic(
                &topic.id,
                format!("duplicate topic ID: {}", topic.id),
            ));
        }

        if topic.title.trim().is_empty() {
            warnings.push(ValidationWarning::topic(&topic.id, "empty title".into()));
        }

        if topic.questions.is_empty() {
            warnings.push(ValidationWarning::topic(&topic.id, "topic has no questions".into()));
        }

        let mut question_ids = HashSet::new();
        for q in &topic.questions {
            if !question_ids.insert(q.id.as_str()) {
                warnings.push(ValidationWarning::topic(
                    &topic.id,
                    format!("duplicate question ID: {}", q.id),
                ));
            }

            if q.options.is_empty() {
                warnings.push(ValidationWarning::topic(
                    &topic.id,
                    format!("question {} has no options", q.id),
                ));
            } else if q.correct_answer_index >= q.options.len() {
                warnings.push(ValidationWarning::topic(
                    &topic.id,
                    format!(
                        "question {} has correct index {} but only {} options",
                        q.id,
                        q.correct_answer_index,
                        q.options.len()
                    ),
                ));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SAMPLE_TOML: &str = r#"
[bank]
id = "wida"
name = "WIDA Basics"
description = "Starter bank"

[[topics]]
id = "topic-1"
title = "Reading Comprehension"
category = "Reading"
difficulty = "Beginner"

[[topics.questions]]
id = "q1-1"
text = "What is the main idea of a passage?"
options = ["The primary point", "A minor detail"]
correct = 0
explanation = "The main idea is what the passage is mostly about."

[[topics.questions]]
id = "q1-2"
text = "An inference is:"
options = ["Stated directly", "A conclusion based on evidence"]
correct = 1

[[topics]]
id = "topic-2"
title = "Listening Skills"
"#;

    #[test]
    fn parse_sample_bank() {
        let bank = parse_question_bank_str(SAMPLE_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(bank.id, "wida");
        assert_eq!(bank.name, "WIDA Basics");
        assert_eq!(bank.topics.len(), 2);
        assert_eq!(bank.question_count(), 2);
        assert_eq!(bank.topics[0].questions[1].correct_answer_index, 1);
        assert_eq!(bank.topics[0].questions[0].question_text, "What is the main idea of a passage?");
        assert!(bank.topics[1].questions.is_empty());
    }

    #[test]
    fn parse_topic_metadata_and_explanations() {
        let bank = parse_question_bank_str(SAMPLE_TOML, &PathBuf::from("test.toml")).unwrap();
        let reading = &bank.topics[0];
        assert_eq!(reading.category, "Reading");
        assert_eq!(reading.difficulty, Difficulty::Beginner);
        assert_eq!(
            reading.questions[0].explanation.as_deref(),
            Some("The main idea is what the passage is mostly about.")
        );
        assert!(reading.questions[1].explanation.is_none());

        let listening = &bank.topics[1];
        assert_eq!(listening.category, DEFAULT_CATEGORY);
        assert_eq!(listening.difficulty, Difficulty::Intermediate);
    }

    #[test]
    fn parse_unknown_difficulty_fails() {
        let toml = "[bank]\nid = \"b\"\nname = \"B\"\n\n[[topics]]\nid = \"t\"\ntitle = \"T\"\ndifficulty = \"expert\"\n";
        assert!(parse_question_bank_str(toml, &PathBuf::from("x.toml")).is_err());
    }

    #[test]
    fn parse_missing_header_fails() {
        let result = parse_question_bank_str("[[topics]]\nid = \"t\"\ntitle = \"T\"\n", &PathBuf::from("x.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn validate_reports_problems() {
        let mut bank = parse_question_bank_str(SAMPLE_TOML, &PathBuf::from("test.toml")).unwrap();
        bank.topics[0].questions[1].correct_answer_index = 5;
        bank.topics.push(bank.topics[0].clone());

        let warnings = validate_question_bank(&bank);
        let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("no questions")));
        assert!(messages.iter().any(|m| m.contains("correct index 5")));
        assert!(messages.iter().any(|m| m.contains("duplicate topic ID: topic-1")));
    }

    #[test]
    fn validate_clean_bank() {
        let mut bank = parse_question_bank_str(SAMPLE_TOML, &PathBuf::from("test.toml")).unwrap();
        bank.topics.truncate(1);
        assert!(validate_question_bank(&bank).is_empty());
    }

    #[test]
    fn load_directory_merges_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), SAMPLE_TOML).unwrap();
        std::fs::write(
            dir.path().join("b.toml"),
            "[bank]\nid = \"extra\"\nname = \"Extra\"\n\n[[topics]]\nid = \"topic-9\"\ntitle = \"Grammar\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not = [valid").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let banks = load_bank_directory(dir.path()).unwrap();
        assert_eq!(banks.len(), 2);

        let merged = load_banks(dir.path()).unwrap();
        assert_eq!(merged.id, "wida");
        let ids: Vec<&str> = merged.topics.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["topic-1", "topic-2", "topic-9"]);
    }

    #[test]
    fn load_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_banks(dir.path()).is_err());
    }
}
