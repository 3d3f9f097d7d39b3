//! Catalog & assessment service: topics, question banks, and the result
//! ledger.
//!
//! Every operation here is synchronous. Topics and results are append-only;
//! the question lists are read-only once the service is built.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::error::{SubmissionError, TopicError};
use crate::model::{Difficulty, Question, QuestionBank, TestResult, Topic, CUSTOM_CATEGORY};
use crate::scoring::{score_answers, ScoreSheet};
use crate::statistics::{self, GroupAverage, StudentProgress, StudentSummary, TopicAverage};
use crate::traits::{Clock, SystemClock};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Optional filters for result queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
    pub student_id: Option<String>,
    pub topic_id: Option<String>,
}

impl ResultFilter {
    pub fn student(student_id: impl Into<String>) -> Self {
        Self {
            student_id: Some(student_id.into()),
            topic_id: None,
        }
    }

    pub fn matches(&self, result: &TestResult) -> bool {
        self.student_id
            .as_deref()
            .map_or(true, |s| result.student_id == s)
            && self.topic_id.as_deref().map_or(true, |t| result.topic_id == t)
    }
}

/// Owns syllabus topics, their quizzes, and the ledger of submitted results.
pub struct CatalogService {
    topics: RwLock<Vec<Topic>>,
    tests: HashMap<String, Vec<Question>>,
    /// Results in submission order.
    ledger: RwLock<Vec<TestResult>>,
    next_topic: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    /// Build a catalog from a question bank using wall-clock timestamps.
    pub fn new(bank: QuestionBank) -> Self {
        Self::with_clock(bank, Arc::new(SystemClock))
    }

    /// Build a catalog with an explicit timestamp source.
    ///
    /// A topic whose ID repeats an earlier one is dropped with its questions.
    pub fn with_clock(bank: QuestionBank, clock: Arc<dyn Clock>) -> Self {
        let mut topics: Vec<Topic> = Vec::with_capacity(bank.topics.len());
        let mut tests = HashMap::new();

        for entry in bank.topics {
            if topics.iter().any(|t| t.id == entry.id) {
                tracing::warn!(topic_id = %entry.id, "skipping duplicate topic in question bank");
                continue;
            }
            topics.push(entry.topic());
            if !entry.questions.is_empty() {
                tests.insert(entry.id, entry.questions);
            }
        }

        let next_topic = topics.len() as u64 + 1;
        Self {
            topics: RwLock::new(topics),
            tests,
            ledger: RwLock::new(Vec::new()),
            next_topic: AtomicU64::new(next_topic),
            clock,
        }
    }

    /// Topics in creation order.
    pub fn list_topics(&self) -> Vec<Topic> {
        read(&self.topics).clone()
    }

    pub fn get_topic(&self, topic_id: &str) -> Option<Topic> {
        read(&self.topics).iter().find(|t| t.id == topic_id).cloned()
    }

    /// Topics in one category, in creation order.
    pub fn topics_by_category(&self, category: &str) -> Vec<Topic> {
        read(&self.topics)
            .iter()
            .filter(|t| t.category == category)
            .cloned()
            .collect()
    }

    /// Append a new topic with a fresh `topic-N` ID, in the custom category
    /// at intermediate difficulty.
    ///
    /// New topics start without a quiz.
    pub fn add_topic(&self, title: &str) -> Result<Topic, TopicError> {
        self.add_topic_with(title, CUSTOM_CATEGORY, Difficulty::Intermediate)
    }

    /// Like [`add_topic`](Self::add_topic) with an explicit category and
    /// difficulty. A blank category falls back to the custom one.
    pub fn add_topic_with(
        &self,
        title: &str,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<Topic, TopicError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TopicError::EmptyTitle);
        }

        let mut topics = write(&self.topics);
        let id = loop {
            let n = self.next_topic.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("topic-{n}");
            if !topics.iter().any(|t| t.id == candidate) && !self.tests.contains_key(&candidate) {
                break candidate;
            }
        };

        let category = match category.trim() {
            "" => CUSTOM_CATEGORY,
            c => c,
        };
        let topic = Topic::new(id, title).with_category(category, difficulty);
        topics.push(topic.clone());
        tracing::info!(
            topic_id = %topic.id,
            title = %topic.title,
            category = %topic.category,
            difficulty = %topic.difficulty,
            "added topic"
        );
        Ok(topic)
    }

    /// The quiz for `topic_id`, or `None` if the topic has none.
    pub fn get_test(&self, topic_id: &str) -> Option<Vec<Question>> {
        self.tests.get(topic_id).cloned()
    }

    /// Score `answers` for `topic_id` and append the result to the ledger.
    ///
    /// Position `i` of `answers` answers question `i`. Answer sets shorter
    /// than the quiz count the missing questions as wrong.
    pub fn submit_test(
        &self,
        student_id: &str,
        topic_id: &str,
        answers: &[Option<usize>],
    ) -> Result<TestResult, SubmissionError> {
        self.submit_test_detailed(student_id, topic_id, answers)
            .map(|(result, _)| result)
    }

    /// Like [`submit_test`](Self::submit_test), also returning the score sheet.
    pub fn submit_test_detailed(
        &self,
        student_id: &str,
        topic_id: &str,
        answers: &[Option<usize>],
    ) -> Result<(TestResult, ScoreSheet), SubmissionError> {
        let not_found = || SubmissionError::NotFound(topic_id.to_string());
        let questions = self.tests.get(topic_id).ok_or_else(not_found)?;
        let topic = self.get_topic(topic_id).ok_or_else(not_found)?;

        let sheet = score_answers(questions, answers);
        let result = TestResult {
            id: format!("result-{}", Uuid::new_v4().simple()),
            student_id: student_id.to_string(),
            topic_id: topic.id,
            topic_title: topic.title,
            score: sheet.score,
            submitted_at: self.clock.now(),
        };

        write(&self.ledger).push(result.clone());
        tracing::info!(
            result_id = %result.id,
            student_id,
            topic_id,
            score = result.score,
            correct = sheet.correct,
            total = sheet.total,
            "test submitted"
        );
        Ok((result, sheet))
    }

    /// A student's results, most recent first.
    pub fn get_results_for_student(&self, student_id: &str) -> Vec<TestResult> {
        self.query_results(&ResultFilter::student(student_id))
    }

    /// The whole ledger, most recent first.
    pub fn get_all_results(&self) -> Vec<TestResult> {
        self.query_results(&ResultFilter::default())
    }

    /// Results matching `filter`, most recent first.
    ///
    /// Results with equal timestamps come out in reverse submission order.
    pub fn query_results(&self, filter: &ResultFilter) -> Vec<TestResult> {
        let mut matched: Vec<TestResult> = read(&self.ledger)
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        tracing::debug!(?filter, count = matched.len(), "queried results");
        matched
    }

    pub fn get_result_by_id(&self, result_id: &str) -> Option<TestResult> {
        read(&self.ledger).iter().find(|r| r.id == result_id).cloned()
    }

    /// Sorted, de-duplicated IDs of every student with a result.
    pub fn unique_student_ids(&self) -> Vec<String> {
        read(&self.ledger)
            .iter()
            .map(|r| r.student_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Average score per topic across the whole ledger.
    pub fn topic_averages(&self) -> Vec<TopicAverage> {
        statistics::topic_averages(&read(&self.topics), &read(&self.ledger))
    }

    pub fn category_averages(&self) -> Vec<GroupAverage<String>> {
        statistics::category_averages(&read(&self.topics), &read(&self.ledger))
    }

    pub fn difficulty_averages(&self) -> Vec<GroupAverage<Difficulty>> {
        statistics::difficulty_averages(&read(&self.topics), &read(&self.ledger))
    }

    pub fn student_summaries(&self) -> Vec<StudentSummary> {
        statistics::student_summaries(&read(&self.ledger))
    }

    pub fn student_progress(&self, student_id: &str) -> StudentProgress {
        statistics::student_progress(student_id, &read(&self.topics), &read(&self.ledger))
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("topics", &read(&self.topics).len())
            .field("tests", &self.tests.len())
            .field("results", &read(&self.ledger).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::model::{BankTopic, DEFAULT_CATEGORY, UNANSWERED};
    use crate::scoring::answers_from_indices;
    use crate::seed::default_question_bank;
    use crate::traits::SteppingClock;

    fn catalog() -> CatalogService {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        CatalogService::with_clock(
            default_question_bank(),
            Arc::new(SteppingClock::new(start, Duration::seconds(1))),
        )
    }

    #[test]
    fn lists_seed_topics_in_order() {
        let titles: Vec<String> = catalog().list_topics().into_iter().map(|t| t.title).collect();
        assert_eq!(
            titles,
            vec!["Reading Comprehension", "Listening Skills", "Writing and Grammar"]
        );
    }

    #[test]
    fn add_topic_appends_with_fresh_id() {
        let catalog = catalog();
        let before: Vec<String> = catalog.list_topics().into_iter().map(|t| t.id).collect();

        let topic = catalog.add_topic("Grammar").unwrap();
        let topics = catalog.list_topics();
        assert_eq!(topics.last(), Some(&topic));
        assert_eq!(topic.title, "Grammar");
        assert!(!before.contains(&topic.id));

        let second = catalog.add_topic("Vocabulary").unwrap();
        assert_ne!(second.id, topic.id);
        assert!(catalog.get_test(&topic.id).is_none());
    }

    #[test]
    fn add_topic_skips_taken_ids() {
        let mut bank = default_question_bank();
        bank.topics.push(BankTopic {
            id: "topic-4".into(),
            title: "Preloaded".into(),
            category: DEFAULT_CATEGORY.into(),
            difficulty: Difficulty::default(),
            questions: vec![],
        });
        bank.topics.push(BankTopic {
            id: "topic-6".into(),
            title: "Also preloaded".into(),
            category: DEFAULT_CATEGORY.into(),
            difficulty: Difficulty::default(),
            questions: vec![],
        });
        let catalog = CatalogService::new(bank);

        // Five topics loaded, so numbering starts at 6, which is taken.
        assert_eq!(catalog.add_topic("New").unwrap().id, "topic-7");
    }

    #[test]
    fn add_topic_rejects_blank_title() {
        let catalog = catalog();
        assert_eq!(catalog.add_topic("  "), Err(TopicError::EmptyTitle));
        assert_eq!(catalog.list_topics().len(), 3);
    }

    #[test]
    fn added_topics_carry_category_and_difficulty() {
        let catalog = catalog();

        let custom = catalog.add_topic("Debate").unwrap();
        assert_eq!(custom.category, CUSTOM_CATEGORY);
        assert_eq!(custom.difficulty, Difficulty::Intermediate);

        let speaking = catalog
            .add_topic_with("Oral Presentations", "Speaking", Difficulty::Advanced)
            .unwrap();
        assert_eq!(speaking.category, "Speaking");
        assert_eq!(catalog.get_topic(&speaking.id), Some(speaking.clone()));

        let blank = catalog.add_topic_with("Idioms", "   ", Difficulty::Beginner).unwrap();
        assert_eq!(blank.category, CUSTOM_CATEGORY);

        let ids: Vec<String> = catalog
            .topics_by_category(CUSTOM_CATEGORY)
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![custom.id, blank.id]);
        assert_eq!(catalog.topics_by_category("Speaking"), vec![speaking]);
        assert!(catalog.topics_by_category(DEFAULT_CATEGORY).is_empty());
    }

    #[test]
    fn category_and_difficulty_analytics() {
        let catalog = catalog();
        catalog.submit_test("s1", "topic-1", &[Some(0), Some(1)]).unwrap();
        catalog.submit_test("s1", "topic-2", &[Some(0)]).unwrap();
        catalog.submit_test("s2", "topic-3", &[Some(1), None]).unwrap();

        let categories: Vec<(String, u32)> = catalog
            .category_averages()
            .into_iter()
            .map(|c| (c.key, c.average_score))
            .collect();
        assert_eq!(
            categories,
            vec![
                ("Reading".to_string(), 100),
                ("Listening".to_string(), 0),
                ("Writing".to_string(), 50),
            ]
        );

        let difficulties = catalog.difficulty_averages();
        assert_eq!(difficulties[0].key, Difficulty::Beginner);
        assert_eq!(difficulties[0].attempts, 2);
        assert_eq!(difficulties[0].average_score, 50);
        assert_eq!(difficulties[1].key, Difficulty::Intermediate);
        assert_eq!(difficulties[1].average_score, 50);
    }

    #[test]
    fn get_test_known_and_unknown() {
        let catalog = catalog();
        assert_eq!(catalog.get_test("topic-1").unwrap().len(), 2);
        assert!(catalog.get_test("topic-404").is_none());
    }

    #[test]
    fn submit_scores_against_answer_key() {
        let catalog = catalog();
        let full = catalog.submit_test("student1", "topic-1", &[Some(0), Some(1)]).unwrap();
        let half = catalog.submit_test("student1", "topic-1", &[Some(0), Some(0)]).unwrap();
        let none = catalog
            .submit_test("student1", "topic-1", &answers_from_indices(&[UNANSWERED, UNANSWERED]))
            .unwrap();

        assert_eq!(full.score, 100);
        assert_eq!(half.score, 50);
        assert_eq!(none.score, 0);
        assert_eq!(full.topic_title, "Reading Comprehension");
        assert_eq!(full.student_id, "student1");
        assert!(full.id.starts_with("result-"));
        assert_ne!(full.id, half.id);
    }

    #[test]
    fn submit_tolerates_short_answer_sets() {
        let catalog = catalog();
        let (result, sheet) = catalog
            .submit_test_detailed("student2", "topic-3", &[Some(1)])
            .unwrap();
        assert_eq!(result.score, 50);
        assert_eq!(sheet.unanswered, 1);
    }

    #[test]
    fn submit_unknown_topic_leaves_ledger_untouched() {
        let catalog = catalog();
        assert_eq!(
            catalog.submit_test("student1", "topic-404", &[Some(0)]),
            Err(SubmissionError::NotFound("topic-404".into()))
        );

        // A topic without a quiz is just as unknown.
        let topic = catalog.add_topic("Empty").unwrap();
        assert!(catalog.submit_test("student1", &topic.id, &[]).is_err());
        assert!(catalog.get_all_results().is_empty());
    }

    #[test]
    fn student_results_are_filtered_and_newest_first() {
        let catalog = catalog();
        catalog.submit_test("student1", "topic-1", &[Some(0), Some(1)]).unwrap();
        catalog.submit_test("student2", "topic-2", &[Some(2)]).unwrap();
        catalog.submit_test("student1", "topic-2", &[Some(0)]).unwrap();
        catalog.submit_test("student1", "topic-3", &[Some(1), Some(1)]).unwrap();

        let results = catalog.get_results_for_student("student1");
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.student_id == "student1"));
        assert!(results
            .windows(2)
            .all(|w| w[0].submitted_at >= w[1].submitted_at));
        assert_eq!(results[0].topic_id, "topic-3");

        let all = catalog.get_all_results();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].submitted_at >= w[1].submitted_at));
    }

    #[test]
    fn equal_timestamps_list_latest_submission_first() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let catalog = CatalogService::with_clock(
            default_question_bank(),
            Arc::new(SteppingClock::new(start, Duration::zero())),
        );
        let first = catalog.submit_test("s", "topic-2", &[Some(2)]).unwrap();
        let second = catalog.submit_test("s", "topic-2", &[Some(1)]).unwrap();

        let ids: Vec<String> = catalog.get_all_results().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn query_by_topic_and_student() {
        let catalog = catalog();
        catalog.submit_test("student1", "topic-1", &[Some(0), Some(1)]).unwrap();
        catalog.submit_test("student2", "topic-1", &[Some(0), Some(0)]).unwrap();
        catalog.submit_test("student2", "topic-2", &[Some(2)]).unwrap();

        let filter = ResultFilter {
            student_id: Some("student2".into()),
            topic_id: Some("topic-1".into()),
        };
        let results = catalog.query_results(&filter);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 50);

        let by_topic = catalog.query_results(&ResultFilter {
            student_id: None,
            topic_id: Some("topic-1".into()),
        });
        assert_eq!(by_topic.len(), 2);

        assert_eq!(catalog.unique_student_ids(), vec!["student1", "student2"]);
    }

    #[test]
    fn result_lookup_by_id() {
        let catalog = catalog();
        let result = catalog.submit_test("student1", "topic-2", &[Some(2)]).unwrap();
        assert_eq!(catalog.get_result_by_id(&result.id), Some(result));
        assert_eq!(catalog.get_result_by_id("result-missing"), None);
    }

    #[test]
    fn topic_averages_cover_every_topic() {
        let catalog = catalog();
        catalog.submit_test("student1", "topic-1", &[Some(0), Some(1)]).unwrap();
        catalog.submit_test("student2", "topic-1", &[Some(0), Some(0)]).unwrap();
        catalog.add_topic("Grammar").unwrap();

        let averages = catalog.topic_averages();
        assert_eq!(averages.len(), 4);
        assert_eq!(averages[0].average_score, 75);
        assert_eq!(averages[1].average_score, 0);
        assert_eq!(averages[3].topic_title, "Grammar");
        assert_eq!(averages[3].average_score, 0);
    }
}
