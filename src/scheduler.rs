//! # Spaced-Repetition Scheduler
//!
//! Pure functions mapping an answer to the next progress record of a word.
//! The current date is always passed in, so the policy is deterministic and
//! testable without a clock.

use chrono::{Days, NaiveDate};

use crate::config::{HintPolicy, SchedulerPolicy};
use crate::word_model::ProgressRecord;

/// Terminal outcome of presenting a study item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Known,
    Unknown,
}

/// Compute the progress record that follows `answer` on `today`
///
/// # Policy
///
/// - `Unknown`, or a hint used under [`HintPolicy::Failure`]: score drops to 0
///   and the interval resets to the base interval.
/// - `Known` without hint: score grows by one and the interval grows by the
///   multiplier, clamped to the maximum on every step. A zero interval is the
///   "never answered" sentinel and becomes the base interval.
/// - `Known` with a hint under [`HintPolicy::FreezeInterval`]: score and
///   interval stay, the word is rescheduled from today.
///
/// The skip flag is never touched here.
pub fn next_progress(
    policy: &SchedulerPolicy,
    current: &ProgressRecord,
    answer: Answer,
    hint_used: bool,
    today: NaiveDate,
) -> ProgressRecord {
    let base = base_interval(policy);

    let (score, check_interval) = match (answer, hint_used, policy.hint_policy) {
        (Answer::Unknown, _, _) | (Answer::Known, true, HintPolicy::Failure) => (0, base),
        (Answer::Known, true, HintPolicy::FreezeInterval) => {
            let frozen = current.check_interval.clamp(base, policy.max_interval.max(base));
            (current.score, frozen)
        }
        (Answer::Known, false, _) => (
            current.score.saturating_add(1),
            grown_interval(policy, current.check_interval),
        ),
    };

    ProgressRecord {
        score,
        check_interval,
        next_check_date: Some(add_days(today, check_interval)),
        is_skipped: current.is_skipped,
    }
}

/// Base interval, never above the ceiling
fn base_interval(policy: &SchedulerPolicy) -> u32 {
    policy.base_interval.max(1).min(policy.max_interval.max(1))
}

fn grown_interval(policy: &SchedulerPolicy, previous: u32) -> u32 {
    let base = base_interval(policy);
    let ceiling = policy.max_interval.max(base);

    if previous == 0 {
        return base;
    }

    let previous = previous.min(ceiling);
    let multiplier = if policy.multiplier.is_finite() && policy.multiplier >= 1.0 {
        policy.multiplier
    } else {
        1.0
    };
    let grown = (f64::from(previous) * multiplier).ceil();

    // f64 -> u32 casts saturate, the clamp keeps the result inside the window
    (grown as u32).clamp(previous.max(base), ceiling)
}

fn add_days(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn policy() -> SchedulerPolicy {
        SchedulerPolicy {
            base_interval: 1,
            multiplier: 2.0,
            max_interval: 32,
            hint_policy: HintPolicy::Failure,
        }
    }

    #[test]
    fn test_known_streak_doubles() {
        let policy = policy();
        let mut record = ProgressRecord::default();
        let mut intervals = Vec::new();

        for _ in 0..3 {
            record = next_progress(&policy, &record, Answer::Known, false, today());
            intervals.push(record.check_interval);
        }

        assert_eq!(intervals, vec![1, 2, 4]);
        assert_eq!(record.score, 3);
        assert_eq!(record.next_check_date, NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn test_known_then_unknown_resets() {
        let policy = policy();
        let first = next_progress(&policy, &ProgressRecord::default(), Answer::Known, false, today());
        let second = next_progress(&policy, &first, Answer::Unknown, false, today());

        assert_eq!(first.check_interval, 1);
        assert_eq!(second.check_interval, 1);
        assert_eq!(second.score, 0);
    }

    #[test]
    fn test_interval_clamped_at_ceiling() {
        let policy = policy();
        let record = ProgressRecord {
            score: 9,
            check_interval: 32,
            ..Default::default()
        };
        let next = next_progress(&policy, &record, Answer::Known, false, today());
        assert_eq!(next.check_interval, 32);

        let stale = ProgressRecord {
            check_interval: 500,
            ..Default::default()
        };
        let next = next_progress(&policy, &stale, Answer::Known, false, today());
        assert_eq!(next.check_interval, 32);
    }

    #[test]
    fn test_hint_counts_as_failure() {
        let policy = policy();
        let record = ProgressRecord {
            score: 4,
            check_interval: 8,
            ..Default::default()
        };
        let next = next_progress(&policy, &record, Answer::Known, true, today());
        assert_eq!(next.score, 0);
        assert_eq!(next.check_interval, 1);
    }

    #[test]
    fn test_freeze_policy_keeps_interval() {
        let policy = SchedulerPolicy {
            hint_policy: HintPolicy::FreezeInterval,
            ..policy()
        };
        let record = ProgressRecord {
            score: 4,
            check_interval: 8,
            ..Default::default()
        };
        let next = next_progress(&policy, &record, Answer::Known, true, today());
        assert_eq!(next.score, 4);
        assert_eq!(next.check_interval, 8);
        assert_eq!(next.next_check_date, NaiveDate::from_ymd_opt(2024, 3, 9));

        // Unknown still resets under the lenient policy
        let next = next_progress(&policy, &record, Answer::Unknown, true, today());
        assert_eq!(next.check_interval, 1);
    }

    #[test]
    fn test_fractional_multiplier_rounds_up() {
        let policy = SchedulerPolicy {
            multiplier: 1.5,
            ..policy()
        };
        let mut record = ProgressRecord::default();
        let mut intervals = Vec::new();
        for _ in 0..5 {
            record = next_progress(&policy, &record, Answer::Known, false, today());
            intervals.push(record.check_interval);
        }
        assert_eq!(intervals, vec![1, 2, 3, 5, 8]);
    }

    #[test]
    fn test_skip_flag_preserved() {
        let record = ProgressRecord {
            is_skipped: true,
            ..Default::default()
        };
        let next = next_progress(&policy(), &record, Answer::Unknown, false, today());
        assert!(next.is_skipped);
    }

    #[test]
    fn test_far_future_date_does_not_panic() {
        let record = ProgressRecord {
            check_interval: 16,
            ..Default::default()
        };
        let next = next_progress(&policy(), &record, Answer::Known, false, NaiveDate::MAX);
        assert_eq!(next.next_check_date, Some(NaiveDate::MAX));
    }
}
