//! Answer scoring.
//!
//! A correct answer earns [`BASE_SCORE`] plus a time bonus of up to
//! [`MAX_TIME_BONUS`] proportional to the time left on the clock. Wrong and
//! empty answers earn nothing.

use super::question::AnswerOption;

/// Points for a correct answer before the time bonus.
pub const BASE_SCORE: i32 = 100;

/// Maximum time bonus, earned by answering instantly.
pub const MAX_TIME_BONUS: i32 = 50;

/// Result of scoring one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredAnswer {
    /// Whether the choice was correct.
    pub is_correct: bool,
    /// Points awarded.
    pub score: i32,
}

/// Scores one submission against the correct letter.
///
/// `response_time` is in seconds; `time_per_question <= 0` disables the
/// time bonus.
#[must_use]
pub fn score_answer(
    selected: Option<AnswerOption>,
    correct: AnswerOption,
    response_time: f64,
    time_per_question: i32,
) -> ScoredAnswer {
    let is_correct = selected == Some(correct);
    if !is_correct {
        return ScoredAnswer {
            is_correct,
            score: 0,
        };
    }

    ScoredAnswer {
        is_correct,
        score: BASE_SCORE + time_bonus(response_time, time_per_question),
    }
}

fn time_bonus(response_time: f64, time_per_question: i32) -> i32 {
    if time_per_question <= 0 {
        return 0;
    }
    let limit = f64::from(time_per_question);
    let remaining = (limit - response_time).max(0.0);
    // Bounded to 0..=MAX_TIME_BONUS, truncation is the intended floor.
    #[allow(clippy::cast_possible_truncation)]
    let bonus = ((remaining / limit) * f64::from(MAX_TIME_BONUS)) as i32;
    bonus.clamp(0, MAX_TIME_BONUS)
}

/// Normalizes a client-reported response time: non-negative and finite.
///
/// Returns `None` for NaN or infinite input.
#[must_use]
pub fn normalize_response_time(raw: f64) -> Option<f64> {
    raw.is_finite().then(|| raw.max(0.0))
}
