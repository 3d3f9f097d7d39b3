//! Aggregate statistics over the result ledger.
//!
//! Feeds the analytics views: per-topic averages for every topic, averages per
//! category and difficulty, per-student summaries, and a single student's
//! progress report.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, TestResult, Topic};
use crate::scoring::rounded_mean;

/// Topic averages at or above this are reported as strengths.
pub const STRENGTH_THRESHOLD: u32 = 80;

/// Topic averages below this are reported as needing work.
pub const IMPROVEMENT_THRESHOLD: u32 = 60;

/// How many recent scores a progress trend shows.
pub const TREND_LEN: usize = 10;

/// Average score for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAverage {
    pub topic_id: String,
    pub topic_title: String,
    /// Rounded mean score, 0 when nobody attempted the topic.
    pub average_score: u32,
    pub attempts: usize,
}

/// Compute one average per topic, in topic order.
///
/// Topics nobody attempted report an average of 0. Results whose topic is not
/// in `topics` are ignored.
pub fn topic_averages(topics: &[Topic], results: &[TestResult]) -> Vec<TopicAverage> {
    let mut totals: HashMap<&str, (u64, usize)> = topics
        .iter()
        .map(|t| (t.id.as_str(), (0u64, 0usize)))
        .collect();

    for r in results {
        if let Some((sum, count)) = totals.get_mut(r.topic_id.as_str()) {
            *sum += u64::from(r.score);
            *count += 1;
        }
    }

    topics
        .iter()
        .map(|t| {
            let (sum, count) = totals.get(t.id.as_str()).copied().unwrap_or((0, 0));
            TopicAverage {
                topic_id: t.id.clone(),
                topic_title: t.title.clone(),
                average_score: rounded_mean(sum, count),
                attempts: count,
            }
        })
        .collect()
}

/// Average score over every attempt in one group of topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAverage<K> {
    pub key: K,
    pub average_score: u32,
    pub attempts: usize,
}

fn group_averages<K, F>(topics: &[Topic], results: &[TestResult], key: F) -> Vec<GroupAverage<K>>
where
    K: Clone + PartialEq,
    F: Fn(&Topic) -> K,
{
    let by_topic: HashMap<&str, &Topic> = topics.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut groups: Vec<(K, u64, usize)> = Vec::new();

    for r in results {
        let Some(topic) = by_topic.get(r.topic_id.as_str()) else {
            continue;
        };
        let k = key(topic);
        match groups.iter_mut().find(|(g, _, _)| *g == k) {
            Some((_, sum, count)) => {
                *sum += u64::from(r.score);
                *count += 1;
            }
            None => groups.push((k, u64::from(r.score), 1)),
        }
    }

    groups
        .into_iter()
        .map(|(key, sum, count)| GroupAverage {
            key,
            average_score: rounded_mean(sum, count),
            attempts: count,
        })
        .collect()
}

/// Average per topic category, for categories with at least one attempt.
///
/// Categories appear in the order their first result does. Results whose
/// topic is not in `topics` are ignored.
pub fn category_averages(topics: &[Topic], results: &[TestResult]) -> Vec<GroupAverage<String>> {
    group_averages(topics, results, |t| t.category.clone())
}

/// Average per difficulty level, easiest first. Levels without attempts are
/// left out.
pub fn difficulty_averages(
    topics: &[Topic],
    results: &[TestResult],
) -> Vec<GroupAverage<Difficulty>> {
    let mut averages = group_averages(topics, results, |t| t.difficulty);
    averages.sort_by_key(|a| a.key);
    averages
}

/// Summary of one student's attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub student_id: String,
    pub total_tests: usize,
    pub average_score: u32,
    pub best_score: u32,
}

/// Summarize every student that appears in `results`, ordered by student ID.
pub fn student_summaries(results: &[TestResult]) -> Vec<StudentSummary> {
    let mut grouped: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for r in results {
        grouped.entry(r.student_id.as_str()).or_default().push(r.score);
    }

    grouped
        .into_iter()
        .map(|(student_id, scores)| StudentSummary {
            student_id: student_id.to_string(),
            total_tests: scores.len(),
            average_score: rounded_mean(scores.iter().map(|&s| u64::from(s)).sum(), scores.len()),
            best_score: scores.iter().copied().max().unwrap_or(0),
        })
        .collect()
}

/// Progress report for a single student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProgress {
    pub student_id: String,
    pub total_tests: usize,
    pub average_score: u32,
    /// Up to the last [`TREND_LEN`] scores, oldest first.
    pub trend: Vec<u32>,
    /// Attempted topics averaging at least [`STRENGTH_THRESHOLD`].
    pub strengths: Vec<TopicAverage>,
    /// Attempted topics averaging below [`IMPROVEMENT_THRESHOLD`].
    pub needs_work: Vec<TopicAverage>,
    /// The student's average in each category they attempted.
    pub categories: Vec<GroupAverage<String>>,
}

/// Build a progress report for `student_id` from the full ledger.
pub fn student_progress(
    student_id: &str,
    topics: &[Topic],
    results: &[TestResult],
) -> StudentProgress {
    let mut own: Vec<&TestResult> = results.iter().filter(|r| r.student_id == student_id).collect();
    own.sort_by_key(|r| r.submitted_at);

    let total: u64 = own.iter().map(|r| u64::from(r.score)).sum();
    let trend = own
        .iter()
        .skip(own.len().saturating_sub(TREND_LEN))
        .map(|r| r.score)
        .collect();

    let own_results: Vec<TestResult> = own.iter().map(|r| (*r).clone()).collect();
    let attempted: Vec<TopicAverage> = topic_averages(topics, &own_results)
        .into_iter()
        .filter(|t| t.attempts > 0)
        .collect();

    let strengths = attempted
        .iter()
        .filter(|t| t.average_score >= STRENGTH_THRESHOLD)
        .cloned()
        .collect();
    let needs_work = attempted
        .iter()
        .filter(|t| t.average_score < IMPROVEMENT_THRESHOLD)
        .cloned()
        .collect();
    let categories = category_averages(topics, &own_results);

    StudentProgress {
        student_id: student_id.to_string(),
        total_tests: own.len(),
        average_score: rounded_mean(total, own.len()),
        trend,
        strengths,
        needs_work,
        categories,
    }
}
