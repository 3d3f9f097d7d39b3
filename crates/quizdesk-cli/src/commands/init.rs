//! The `quizdesk init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("quizdesk.toml").exists() {
        println!("quizdesk.toml already exists, skipping.");
    } else {
        std::fs::write("quizdesk.toml", SAMPLE_CONFIG)?;
        println!("Created quizdesk.toml");
    }

    std::fs::create_dir_all("question-banks")?;
    let example_path = std::path::Path::new("question-banks/example.toml");
    if example_path.exists() {
        println!("question-banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created question-banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit quizdesk.toml to set the master ID and seed students");
    println!("  2. Run: quizdesk validate --bank question-banks");
    println!("  3. Run: quizdesk shell");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizdesk configuration

latency_ms = 500
admin_id = "KRURA"
students = ["student1", "student2"]
question_banks = "question-banks"

[store]
type = "file"
path = "./.quizdesk/session.json"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example"
name = "Example Syllabus"
description = "A small question bank to get started"

[[topics]]
id = "topic-1"
title = "Reading Comprehension"
category = "Reading"
difficulty = "Beginner"

[[topics.questions]]
id = "q1-1"
text = "What is the main idea of a passage?"
options = ["The primary point the author is making", "A minor detail", "The author's name", "The publisher"]
correct = 0
explanation = "The main idea is the central point the whole passage supports."

[[topics.questions]]
id = "q1-2"
text = "An inference is:"
options = ["Something stated directly", "A conclusion based on evidence", "A summary of the plot", "A character's name"]
correct = 1

[[topics]]
id = "topic-2"
title = "Listening Skills"
category = "Listening"
difficulty = "Intermediate"

[[topics.questions]]
id = "q2-1"
text = "Active listening involves:"
options = ["Hearing the words", "Waiting for your turn to speak", "Focusing fully on the speaker", "Ignoring non-verbal cues"]
correct = 2
explanation = "Active listening means full attention and engagement with the speaker."
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn example_bank_is_valid() {
        let bank =
            quizdesk_core::parser::parse_question_bank_str(EXAMPLE_BANK, Path::new("example.toml"))
                .unwrap();
        assert_eq!(bank.topics.len(), 2);
        assert!(quizdesk_core::parser::validate_question_bank(&bank).is_empty());
    }

    #[test]
    fn sample_config_parses() {
        let config = load_from_tempfile(SAMPLE_CONFIG);
        assert_eq!(config.admin_id, "KRURA");
    }

    fn load_from_tempfile(s: &str) -> quizdesk_store::QuizdeskConfig {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizdesk.toml");
        std::fs::write(&path, s).unwrap();
        quizdesk_store::config::load_config_from(Some(&path)).unwrap()
    }
}
