//! The `quizdesk validate` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizdesk_core::model::QuestionBank;
use quizdesk_core::parser::{self, ValidationWarning};

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let banks = if bank_path.is_dir() {
        parser::load_bank_directory(&bank_path)?
    } else {
        vec![parser::parse_question_bank(&bank_path)?]
    };

    let warnings: usize = banks.iter().map(report_bank).sum();
    if warnings == 0 {
        println!("All question banks valid.");
    } else {
        println!("\n{warnings} warning(s) found.");
    }

    Ok(())
}

/// Print one bank's topics and warnings; returns the warning count.
fn report_bank(bank: &QuestionBank) -> usize {
    println!(
        "Question bank: {} ({} topics, {} questions)",
        bank.name,
        bank.topics.len(),
        bank.question_count()
    );

    if !bank.topics.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Topic", "Title", "Category", "Difficulty", "Questions"]);
        for topic in &bank.topics {
            table.add_row(vec![
                Cell::new(&topic.id),
                Cell::new(&topic.title),
                Cell::new(&topic.category),
                Cell::new(topic.difficulty),
                Cell::new(topic.questions.len()),
            ]);
        }
        println!("{table}");
    }

    let warnings = parser::validate_question_bank(bank);
    for w in &warnings {
        println!("{}", warning_line(w));
    }
    warnings.len()
}

fn warning_line(w: &ValidationWarning) -> String {
    match &w.topic_id {
        Some(id) => format!("  [{id}] WARNING: {}", w.message),
        None => format!("   WARNING: {}", w.message),
    }
}
