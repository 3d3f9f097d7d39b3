//! The `quizdesk shell` command.
//!
//! Reads one command per line from stdin and drives the identity and catalog
//! services. What a command may do depends on the role of the logged-in
//! account. Removing an account and submitting a partly answered test ask
//! for a `y` on the next line unless `--yes` is given.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader};

use quizdesk_core::model::{Account, AnswerSet, Difficulty, Role, TestResult, CUSTOM_CATEGORY};
use quizdesk_core::scoring::{answers_from_indices, pad_answers};
use quizdesk_core::{CatalogService, IdentityService, ResultFilter};
use quizdesk_store::config::load_config_from;
use quizdesk_store::create_store;

#[derive(Parser)]
#[command(name = "quizdesk", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Log in with a unique ID
    Login { unique_id: String },

    /// End the current session
    Logout,

    /// Show the logged-in account
    Whoami,

    /// Register a new student account
    Register { unique_id: String },

    /// List accounts (master only)
    Accounts,

    /// Remove a student account (master only)
    Remove {
        unique_id: String,

        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List syllabus topics
    Topics {
        /// Only topics in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Add a syllabus topic (master only)
    AddTopic {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,

        /// Topic category [default: Custom]
        #[arg(long)]
        category: Option<String>,

        /// beginner, intermediate or advanced
        #[arg(long, default_value = "intermediate")]
        difficulty: Difficulty,
    },

    /// Show the questions of a topic's test
    Test { topic_id: String },

    /// Submit answers for a topic's test (students only); -1 leaves a question unanswered
    Submit {
        topic_id: String,
        #[arg(allow_negative_numbers = true)]
        answers: Vec<i64>,

        /// Submit without confirming unanswered questions
        #[arg(short, long)]
        yes: bool,
    },

    /// List results, most recent first
    Results {
        /// Only results of this student (master only)
        #[arg(long)]
        student: Option<String>,

        /// Only results for this topic
        #[arg(long)]
        topic: Option<String>,
    },

    /// Show a single result with its answer key
    #[command(name = "result")]
    ShowResult { result_id: String },

    /// Score analytics
    Analytics,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// What the shell should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Output(String),
    Quit,
}

/// An action waiting for a `y` on the next line.
#[derive(Debug)]
enum Pending {
    Remove(String),
    Submit { topic_id: String, answers: AnswerSet },
}

/// Presentation layer over the two services.
pub struct Shell {
    identity: Arc<IdentityService>,
    catalog: Arc<CatalogService>,
    pending: Mutex<Option<Pending>>,
}

impl Shell {
    pub fn new(identity: Arc<IdentityService>, catalog: Arc<CatalogService>) -> Self {
        Self {
            identity,
            catalog,
            pending: Mutex::new(None),
        }
    }

    /// Parse and run one input line.
    ///
    /// If the previous line asked for confirmation, this line answers it and
    /// is not parsed as a command.
    pub async fn handle_line(&self, line: &str) -> Step {
        let line = line.trim();

        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(pending) = pending {
            return Step::Output(match line.to_lowercase().as_str() {
                "y" | "yes" => self.confirm(pending),
                _ => "Cancelled.".to_string(),
            });
        }

        if line.is_empty() || line.starts_with('#') {
            return Step::Output(String::new());
        }

        match ShellLine::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => self.dispatch(parsed.command).await,
            Err(e) => Step::Output(e.to_string().trim_end().to_string()),
        }
    }

    async fn dispatch(&self, command: ShellCommand) -> Step {
        let output = match command {
            ShellCommand::Quit => return Step::Quit,
            ShellCommand::Login { unique_id } => match self.identity.authenticate(&unique_id).await {
                Ok(account) => format!("Logged in as {} ({})", account.unique_id, account.role),
                Err(e) => format!("Error: {e}"),
            },
            ShellCommand::Logout => {
                self.identity.end_session().await;
                "Logged out.".to_string()
            }
            ShellCommand::Whoami => match self.identity.current_session() {
                Some(account) => format!("{} ({})", account.unique_id, account.role),
                None => NOT_LOGGED_IN.to_string(),
            },
            ShellCommand::Register { unique_id } => match self.identity.register(&unique_id).await {
                Ok(()) => format!("Registered {}. You can now log in.", unique_id.trim()),
                Err(e) => format!("Error: {e}"),
            },
            ShellCommand::Accounts => self.with_admin(|me| self.accounts(me)),
            ShellCommand::Remove { unique_id, yes } => {
                self.with_admin(|me| self.remove(me, &unique_id, yes))
            }
            ShellCommand::Topics { category } => {
                self.with_session(|_| self.topics(category.as_deref()))
            }
            ShellCommand::AddTopic {
                title,
                category,
                difficulty,
            } => self.with_admin(|_| {
                self.add_topic(&title.join(" "), category.as_deref(), difficulty)
            }),
            ShellCommand::Test { topic_id } => self.with_session(|_| self.test(&topic_id)),
            ShellCommand::Submit {
                topic_id,
                answers,
                yes,
            } => self.with_session(|me| self.submit(me, &topic_id, &answers, yes)),
            ShellCommand::Results { student, topic } => {
                self.with_session(|me| self.results(me, student, topic))
            }
            ShellCommand::ShowResult { result_id } => {
                self.with_session(|me| self.show_result(me, &result_id))
            }
            ShellCommand::Analytics => self.with_session(|me| self.analytics(me)),
        };
        Step::Output(output)
    }

    fn with_session(&self, f: impl FnOnce(&Account) -> String) -> String {
        match self.identity.current_session() {
            Some(account) => f(&account),
            None => NOT_LOGGED_IN.to_string(),
        }
    }

    fn with_admin(&self, f: impl FnOnce(&Account) -> String) -> String {
        self.with_session(|account| match account.role {
            Role::Admin => f(account),
            Role::Student => MASTER_ONLY.to_string(),
        })
    }

    fn ask(&self, pending: Pending, question: String) -> String {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(pending);
        format!("{question} [y/N]")
    }

    fn confirm(&self, pending: Pending) -> String {
        match pending {
            Pending::Remove(unique_id) => self.with_admin(|_| self.remove_now(&unique_id)),
            Pending::Submit { topic_id, answers } => self.with_session(|me| match me.role {
                Role::Student => self.submit_now(me, &topic_id, &answers),
                Role::Admin => STUDENTS_ONLY.to_string(),
            }),
        }
    }

    fn accounts(&self, me: &Account) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Unique ID", "Role"]);
        for account in self
            .identity
            .list_accounts()
            .into_iter()
            .filter(|a| a.unique_id != me.unique_id)
        {
            table.add_row(vec![account.unique_id, account.role.to_string()]);
        }
        table.to_string()
    }

    fn remove(&self, me: &Account, unique_id: &str, yes: bool) -> String {
        if unique_id == me.unique_id {
            return "Error: you cannot remove your own account".to_string();
        }

        let removable = self
            .identity
            .list_accounts()
            .iter()
            .any(|a| a.unique_id == unique_id && a.role == Role::Student);
        if removable && !yes {
            return self.ask(
                Pending::Remove(unique_id.to_string()),
                format!("Remove student {unique_id}?"),
            );
        }
        self.remove_now(unique_id)
    }

    fn remove_now(&self, unique_id: &str) -> String {
        match self.identity.remove_account(unique_id) {
            Ok(()) => format!("Removed {unique_id}"),
            Err(e) => format!("Error: {e}"),
        }
    }

    fn topics(&self, category: Option<&str>) -> String {
        let topics = match category {
            Some(category) => self.catalog.topics_by_category(category),
            None => self.catalog.list_topics(),
        };
        if topics.is_empty() {
            return match category {
                Some(category) => format!("No topics in category {category}."),
                None => "No syllabus topics available yet.".to_string(),
            };
        }

        let mut table = Table::new();
        table.set_header(vec!["ID", "Title", "Category", "Difficulty", "Questions"]);
        for topic in topics {
            let questions = self
                .catalog
                .get_test(&topic.id)
                .map_or(0, |questions| questions.len());
            table.add_row(vec![
                Cell::new(&topic.id),
                Cell::new(&topic.title),
                Cell::new(&topic.category),
                Cell::new(topic.difficulty),
                Cell::new(questions),
            ]);
        }
        table.to_string()
    }

    fn add_topic(&self, title: &str, category: Option<&str>, difficulty: Difficulty) -> String {
        let category = category.unwrap_or(CUSTOM_CATEGORY);
        match self.catalog.add_topic_with(title, category, difficulty) {
            Ok(topic) => format!(
                "Added topic {}: {} ({}, {})",
                topic.id, topic.title, topic.category, topic.difficulty
            ),
            Err(e) => format!("Error: {e}"),
        }
    }

    fn test(&self, topic_id: &str) -> String {
        let (Some(topic), Some(questions)) =
            (self.catalog.get_topic(topic_id), self.catalog.get_test(topic_id))
        else {
            return format!("Error: no test for topic {topic_id}");
        };

        let mut lines = vec![format!("{} ({} questions)", topic.title, questions.len())];
        for (i, question) in questions.iter().enumerate() {
            lines.push(String::new());
            lines.push(format!("{}. {}", i + 1, question.question_text));
            lines.extend(
                question
                    .options
                    .iter()
                    .enumerate()
                    .map(|(j, option)| format!("   [{j}] {option}")),
            );
        }
        lines.join("\n")
    }

    fn submit(&self, me: &Account, topic_id: &str, indices: &[i64], yes: bool) -> String {
        match me.role {
            Role::Student => {}
            Role::Admin => return STUDENTS_ONLY.to_string(),
        }

        let Some(questions) = self.catalog.get_test(topic_id) else {
            return format!("Error: no test for topic {topic_id}");
        };
        let answers = pad_answers(answers_from_indices(indices), questions.len());

        let unanswered = answers.iter().filter(|a| a.is_none()).count();
        if unanswered > 0 && !yes {
            return self.ask(
                Pending::Submit {
                    topic_id: topic_id.to_string(),
                    answers,
                },
                format!("Warning: {unanswered} unanswered question(s). Submit anyway?"),
            );
        }
        self.submit_now(me, topic_id, &answers)
    }

    fn submit_now(&self, me: &Account, topic_id: &str, answers: &[Option<usize>]) -> String {
        match self
            .catalog
            .submit_test_detailed(&me.unique_id, topic_id, answers)
        {
            Ok((result, sheet)) => [
                format!(
                    "Score: {}% ({}/{} correct)",
                    result.score, sheet.correct, sheet.total
                ),
                format!("Result ID: {}", result.id),
            ]
            .join("\n"),
            Err(e) => format!("Error: {e}"),
        }
    }

    fn results(&self, me: &Account, student: Option<String>, topic: Option<String>) -> String {
        let filter = match me.role {
            Role::Admin => ResultFilter {
                student_id: student,
                topic_id: topic,
            },
            Role::Student => {
                if student.as_deref().is_some_and(|s| s != me.unique_id) {
                    return MASTER_ONLY.to_string();
                }
                ResultFilter {
                    student_id: Some(me.unique_id.clone()),
                    topic_id: topic,
                }
            }
        };

        let results = self.catalog.query_results(&filter);
        if results.is_empty() {
            return "No results found.".to_string();
        }
        results_table(&results)
    }

    fn show_result(&self, me: &Account, result_id: &str) -> String {
        let visible = self.catalog.get_result_by_id(result_id).filter(|r| match me.role {
            Role::Admin => true,
            Role::Student => r.student_id == me.unique_id,
        });
        let Some(r) = visible else {
            return format!("Error: result not found: {result_id}");
        };

        let mut lines = vec![
            format!("Result {}", r.id),
            format!("  Student: {}", r.student_id),
            format!("  Topic: {} ({})", r.topic_title, r.topic_id),
            format!("  Score: {}%", r.score),
            format!("  Submitted: {}", r.submitted_at.format("%Y-%m-%d %H:%M:%S")),
        ];

        if let Some(questions) = self.catalog.get_test(&r.topic_id) {
            lines.push(String::new());
            lines.push("Answer key".to_string());
            for (i, q) in questions.iter().enumerate() {
                let answer = q
                    .options
                    .get(q.correct_answer_index)
                    .map_or("?", String::as_str);
                lines.push(format!("  {}. {} -> {answer}", i + 1, q.question_text));
                if let Some(explanation) = &q.explanation {
                    lines.push(format!("     {explanation}"));
                }
            }
        }
        lines.join("\n")
    }

    fn analytics(&self, me: &Account) -> String {
        match me.role {
            Role::Admin => {
                let mut averages = Table::new();
                averages.set_header(vec!["Topic", "Attempts", "Average"]);
                for point in self.catalog.topic_averages() {
                    averages.add_row(vec![
                        Cell::new(&point.topic_title),
                        Cell::new(point.attempts),
                        Cell::new(format!("{}%", point.average_score)),
                    ]);
                }
                let mut sections = vec![format!("Average score per topic\n{averages}")];

                let summaries = self.catalog.student_summaries();
                if summaries.is_empty() {
                    sections.push("No student has taken a test yet.".to_string());
                    return sections.join("\n\n");
                }

                let mut categories = Table::new();
                categories.set_header(vec!["Category", "Tests", "Average"]);
                for c in self.catalog.category_averages() {
                    categories.add_row(vec![
                        Cell::new(&c.key),
                        Cell::new(c.attempts),
                        Cell::new(format!("{}%", c.average_score)),
                    ]);
                }
                sections.push(format!("Performance by category\n{categories}"));

                let mut difficulties = Table::new();
                difficulties.set_header(vec!["Difficulty", "Tests", "Average"]);
                for d in self.catalog.difficulty_averages() {
                    difficulties.add_row(vec![
                        Cell::new(d.key),
                        Cell::new(d.attempts),
                        Cell::new(format!("{}%", d.average_score)),
                    ]);
                }
                sections.push(format!("Performance by difficulty\n{difficulties}"));

                let mut students = Table::new();
                students.set_header(vec!["Student", "Tests", "Average", "Best"]);
                for s in summaries {
                    students.add_row(vec![
                        Cell::new(&s.student_id),
                        Cell::new(s.total_tests),
                        Cell::new(format!("{}%", s.average_score)),
                        Cell::new(format!("{}%", s.best_score)),
                    ]);
                }
                sections.push(format!("Students\n{students}"));
                sections.join("\n\n")
            }
            Role::Student => {
                let progress = self.catalog.student_progress(&me.unique_id);
                let noun = if progress.total_tests == 1 { "test" } else { "tests" };
                let mut lines = vec![format!(
                    "You have completed {} {noun}. Average score: {}%",
                    progress.total_tests, progress.average_score
                )];
                if !progress.trend.is_empty() {
                    let trend: Vec<String> = progress.trend.iter().map(|s| s.to_string()).collect();
                    lines.push(format!("Recent scores: {}", trend.join(", ")));
                }
                lines.extend(
                    progress
                        .categories
                        .iter()
                        .map(|c| format!("Category {}: {}% over {} test(s)", c.key, c.average_score, c.attempts)),
                );
                lines.extend(
                    progress
                        .strengths
                        .iter()
                        .map(|t| format!("Strength: {} ({}%)", t.topic_title, t.average_score)),
                );
                lines.extend(
                    progress
                        .needs_work
                        .iter()
                        .map(|t| format!("Needs work: {} ({}%)", t.topic_title, t.average_score)),
                );
                lines.join("\n")
            }
        }
    }
}

const NOT_LOGGED_IN: &str = "Not logged in.";
const MASTER_ONLY: &str = "Permission denied: master accounts only.";
const STUDENTS_ONLY: &str = "Only students can take tests.";

fn results_table(results: &[TestResult]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Result", "Student", "Topic", "Score", "Submitted"]);
    for r in results {
        table.add_row(vec![
            Cell::new(&r.id),
            Cell::new(&r.student_id),
            Cell::new(&r.topic_title),
            Cell::new(format!("{}%", r.score)),
            Cell::new(r.submitted_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    table.to_string()
}

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config.store);
    tracing::debug!(store = store.name(), latency_ms = config.latency_ms, "starting shell");
    let identity = Arc::new(
        IdentityService::new(config.seed_accounts(), store).with_latency(config.latency()),
    );
    let catalog = Arc::new(CatalogService::new(config.load_question_bank()?));

    if let Some(account) = identity.restore_session().await {
        println!("Welcome back, {} ({})", account.unique_id, account.role);
    }

    let shell = Shell::new(identity, catalog);
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            print!("quizdesk> ");
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match shell.handle_line(&line).await {
            Step::Output(text) if text.is_empty() => {}
            Step::Output(text) => println!("{text}"),
            Step::Quit => break,
        }
    }

    Ok(())
}
