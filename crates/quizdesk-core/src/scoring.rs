//! Answer-set scoring.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerSet, Question};

/// Outcome of scoring one answer set against a question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    /// Questions answered correctly.
    pub correct: usize,
    /// Questions in the test.
    pub total: usize,
    /// Questions with no answer, including positions past the end of a
    /// short answer set.
    pub unanswered: usize,
    /// Percentage score, 0 through 100.
    pub score: u32,
}

/// Integer percentage of `part / whole`, rounded half up.
///
/// Returns 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u64;
    let whole = whole as u64;
    ((200 * part + whole) / (2 * whole)) as u32
}

/// Integer mean of `sum / count`, rounded half up. Returns 0 for no samples.
pub fn rounded_mean(sum: u64, count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    let count = count as u64;
    ((2 * sum + count) / (2 * count)) as u32
}

/// Score `answers` against `questions` position by position.
///
/// An answer counts only when it equals the question's correct index.
/// Unanswered entries, wrong indices, and missing trailing entries all count
/// as incorrect; entries beyond the question count are ignored.
pub fn score_answers(questions: &[Question], answers: &[Option<usize>]) -> ScoreSheet {
    let mut correct = 0;
    let mut unanswered = 0;

    for (i, question) in questions.iter().enumerate() {
        let answer = answers.get(i).copied().flatten();
        if answer.is_none() {
            unanswered += 1;
        }
        if question.is_correct(answer) {
            correct += 1;
        }
    }

    ScoreSheet {
        correct,
        total: questions.len(),
        unanswered,
        score: percentage(correct, questions.len()),
    }
}

/// Convert wire-format indices into an answer set; negative values mean
/// unanswered.
pub fn answers_from_indices(indices: &[i64]) -> AnswerSet {
    indices
        .iter()
        .map(|&i| usize::try_from(i).ok())
        .collect()
}

/// Extend `answers` with unanswered entries up to `len`.
pub fn pad_answers(mut answers: AnswerSet, len: usize) -> AnswerSet {
    if answers.len() < len {
        answers.resize(len, None);
    }
    answers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UNANSWERED;

    fn question(correct: usize) -> Question {
        Question {
            id: format!("q{correct}"),
            question_text: String::new(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer_index: correct,
            explanation: None,
        }
    }

    #[test]
    fn full_half_and_empty_marks() {
        let questions = vec![question(0), question(1)];
        assert_eq!(score_answers(&questions, &[Some(0), Some(1)]).score, 100);
        assert_eq!(score_answers(&questions, &[Some(0), Some(0)]).score, 50);

        let blank = score_answers(&questions, &answers_from_indices(&[UNANSWERED, UNANSWERED]));
        assert_eq!(blank.score, 0);
        assert_eq!(blank.unanswered, 2);
    }

    #[test]
    fn short_answer_set_counts_missing_as_wrong() {
        let questions = vec![question(2), question(2), question(2)];
        let sheet = score_answers(&questions, &[Some(2)]);
        assert_eq!(sheet.correct, 1);
        assert_eq!(sheet.unanswered, 2);
        assert_eq!(sheet.score, 33);
    }

    #[test]
    fn extra_answers_are_ignored() {
        let questions = vec![question(1)];
        let sheet = score_answers(&questions, &[Some(1), Some(3), Some(0)]);
        assert_eq!(sheet.correct, 1);
        assert_eq!(sheet.total, 1);
        assert_eq!(sheet.score, 100);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(rounded_mean(140, 2), 70);
        assert_eq!(rounded_mean(101, 2), 51); // 50.5
        assert_eq!(rounded_mean(0, 0), 0);
    }

    #[test]
    fn matches_float_rounding_across_sizes() {
        for total in 1..=40usize {
            for correct in 0..=total {
                let expected = (100.0 * correct as f64 / total as f64 + 0.5).floor() as u32;
                assert_eq!(percentage(correct, total), expected, "{correct}/{total}");
            }
        }
    }

    #[test]
    fn negative_indices_become_unanswered() {
        assert_eq!(answers_from_indices(&[0, -1, 3, -7]), vec![Some(0), None, Some(3), None]);
    }

    #[test]
    fn padding_fills_with_unanswered() {
        assert_eq!(pad_answers(vec![Some(1)], 3), vec![Some(1), None, None]);
        assert_eq!(pad_answers(vec![Some(1), Some(2)], 1), vec![Some(1), Some(2)]);
    }
}
