// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The review state machine. Given a card's memory state and a grade, decide
//! the card's next state and due date.
//!
//! Everything here is a pure function of its inputs. Fuzz is drawn from a
//! generator seeded by the card and the review date, so the same review
//! always gives the same result.

use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::fsrs;
use crate::fsrs::Difficulty;
use crate::fsrs::Grade;
use crate::fsrs::Recall;
use crate::fsrs::Stability;
use crate::legacy;
use crate::types::card::CardState;
use crate::types::date::Date;
use crate::types::timestamp::Timestamp;

pub const MIN_RETENTION: Recall = 0.70;
pub const MAX_RETENTION: Recall = 0.97;
pub const DEFAULT_RETENTION: Recall = 0.9;

/// Longest interval, in days.
pub const MAX_INTERVAL: u32 = 36500;

/// Fuzz scales intervals by a factor in `1 ± FUZZ_RATIO`.
const FUZZ_RATIO: f64 = 0.05;

/// Intervals shorter than this are never fuzzed.
const FUZZ_THRESHOLD: u32 = 3;

/// Answers at or under this many seconds count as fluent.
const FAST_RESPONSE_SECS: f64 = 3.0;

/// Answers at or over this many seconds count as laboured.
const SLOW_RESPONSE_SECS: f64 = 15.0;

/// Largest change to difficulty from response time alone.
const RESPONSE_ADJUSTMENT: Difficulty = 0.5;

const MINUTES_PER_DAY: f64 = 1440.0;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SchedulerOptions {
    desired_retention: Recall,
    fuzz: bool,
}

impl SchedulerOptions {
    /// Retention outside `[MIN_RETENTION, MAX_RETENTION]` is clamped.
    pub fn new(desired_retention: Recall, fuzz: bool) -> Self {
        Self {
            desired_retention: clamp_retention(desired_retention),
            fuzz,
        }
    }

    pub fn desired_retention(&self) -> Recall {
        self.desired_retention
    }

    pub fn fuzz(&self) -> bool {
        self.fuzz
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION, true)
    }
}

pub fn clamp_retention(r: Recall) -> Recall {
    if r.is_nan() {
        DEFAULT_RETENTION
    } else {
        r.clamp(MIN_RETENTION, MAX_RETENTION)
    }
}

/// A card's memory state going into a review.
#[derive(Clone, PartialEq, Debug)]
pub struct ReviewInput {
    pub state: CardState,
    pub difficulty: Difficulty,
    pub stability: Stability,
    pub last_review: Option<Date>,
    pub lapses: u32,
    pub reps: u32,
    pub review_count: u32,
    pub legacy_ease: u32,
    /// Seeds the interval fuzz. Stable per card.
    pub fuzz_seed: u64,
    /// How long the user took to answer, if known.
    pub response_time: Option<Duration>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ReviewResult {
    pub next_review: Date,
    pub reviewed_on: Date,
    /// Days until the next review, in `1..=MAX_INTERVAL`.
    pub interval: u32,
    pub difficulty: Difficulty,
    pub stability: Stability,
    /// The recall probability just before this review.
    pub retrievability: Recall,
    pub elapsed_days: u32,
    pub scheduled_days: u32,
    pub lapses: u32,
    pub reps: u32,
    pub review_count: u32,
    pub state: CardState,
    pub legacy_ease: u32,
    /// For cards still being learned: how soon to show the card again
    /// within the same session.
    pub retry_after: Option<chrono::Duration>,
}

/// The memory state a grade leads to, before intervals are assigned.
#[derive(Clone, Copy, Debug)]
struct Outcome {
    state: CardState,
    difficulty: Difficulty,
    stability: Stability,
}

/// Review a card.
pub fn schedule(
    input: &ReviewInput,
    grade: Grade,
    now: Timestamp,
    options: &SchedulerOptions,
) -> ReviewResult {
    let today = now.local_date();
    let elapsed = elapsed_days(input, today);
    let recall = match input.state {
        CardState::New => 0.0,
        _ => fsrs::retrievability(elapsed as f64, input.stability),
    };
    let outcomes = outcomes(input, elapsed, recall);
    let mut intervals = intervals(&outcomes, options.desired_retention);
    if options.fuzz {
        let mut rng = StdRng::seed_from_u64(input.fuzz_seed ^ (today.ordinal() as u64));
        intervals = fuzz(intervals, &mut rng);
    }

    let outcome = outcomes[grade.index()];
    let interval = intervals[grade.index()];
    let difficulty = match (grade, input.response_time) {
        (Grade::Again, _) | (_, None) => outcome.difficulty,
        (_, Some(t)) => fsrs::clamp_difficulty(outcome.difficulty + response_adjustment(t)),
    };
    let lapsed = grade == Grade::Again;
    let retry_after = match outcome.state {
        CardState::Learning | CardState::Relearning => Some(retry_delay(
            outcome.stability,
            grade,
            options.desired_retention,
        )),
        _ => None,
    };

    let result = ReviewResult {
        next_review: today.add_days(i64::from(interval)),
        reviewed_on: today,
        interval,
        difficulty,
        stability: outcome.stability,
        retrievability: recall,
        elapsed_days: u32::try_from(elapsed).unwrap_or(u32::MAX),
        scheduled_days: interval,
        lapses: if lapsed {
            input.lapses.saturating_add(1)
        } else {
            input.lapses
        },
        reps: if lapsed {
            0
        } else {
            input.reps.saturating_add(1)
        },
        review_count: input.review_count.saturating_add(1),
        state: outcome.state,
        legacy_ease: legacy::next_ease(input.legacy_ease, grade),
        retry_after,
    };
    log::debug!(
        "Reviewed {} card as {}: D={:.2} S={:.2} R={:.2} interval={}d state={}",
        input.state.as_str(),
        grade.as_str(),
        result.difficulty,
        result.stability,
        result.retrievability,
        result.interval,
        result.state.as_str(),
    );
    result
}

/// The unfuzzed interval each grade would give, in `Grade::ALL` order.
pub fn preview(input: &ReviewInput, now: Timestamp, options: &SchedulerOptions) -> [u32; 4] {
    let elapsed = elapsed_days(input, now.local_date());
    let recall = match input.state {
        CardState::New => 0.0,
        _ => fsrs::retrievability(elapsed as f64, input.stability),
    };
    intervals(&outcomes(input, elapsed, recall), options.desired_retention)
}

/// Whole days since the last review. Zero for unreviewed cards and for
/// clocks that have gone backwards.
fn elapsed_days(input: &ReviewInput, today: Date) -> i64 {
    match (input.state, input.last_review) {
        (CardState::New, _) | (_, None) => 0,
        (_, Some(last)) => today.days_since(last).max(0),
    }
}

fn outcomes(input: &ReviewInput, elapsed: i64, recall: Recall) -> [Outcome; 4] {
    Grade::ALL.map(|grade| match input.state {
        CardState::New => first_review(grade),
        state => subsequent_review(input, state, elapsed, recall, grade),
    })
}

fn first_review(grade: Grade) -> Outcome {
    Outcome {
        state: match grade {
            Grade::Again => CardState::Learning,
            _ => CardState::Review,
        },
        difficulty: fsrs::initial_difficulty(grade),
        stability: fsrs::initial_stability(grade),
    }
}

fn subsequent_review(
    input: &ReviewInput,
    state: CardState,
    elapsed: i64,
    recall: Recall,
    grade: Grade,
) -> Outcome {
    let d = fsrs::clamp_difficulty(input.difficulty);
    let s = input.stability;
    let stability = if elapsed == 0 {
        fsrs::short_term_stability(s, grade)
    } else if grade == Grade::Again {
        fsrs::lapse_stability(d, s, recall)
    } else {
        fsrs::recall_stability(d, s, recall, grade)
    };
    let state = match (grade, state) {
        (Grade::Again, CardState::Learning) => CardState::Learning,
        (Grade::Again, _) => CardState::Relearning,
        _ => CardState::Review,
    };
    Outcome {
        state,
        difficulty: fsrs::new_difficulty(d, grade),
        stability,
    }
}

/// Intervals for all four grades. Again always comes back tomorrow; the
/// others solve the forgetting curve for the desired retention.
fn intervals(outcomes: &[Outcome; 4], retention: Recall) -> [u32; 4] {
    let retention = clamp_retention(retention);
    let days = |outcome: &Outcome| {
        let t = fsrs::interval(retention, outcome.stability).round();
        if t.is_nan() {
            1
        } else {
            t.clamp(1.0, f64::from(MAX_INTERVAL)) as u32
        }
    };
    order([
        1,
        days(&outcomes[1]),
        days(&outcomes[2]),
        days(&outcomes[3]),
    ])
}

/// Enforce `again < hard <= good < easy` within `1..=MAX_INTERVAL`.
fn order([again, hard, good, easy]: [u32; 4]) -> [u32; 4] {
    let again = again.clamp(1, MAX_INTERVAL - 3);
    let hard = hard.min(good).max(again + 1).min(MAX_INTERVAL - 2);
    let good = good.max(hard).min(MAX_INTERVAL - 1);
    let easy = easy.max(good + 1).min(MAX_INTERVAL);
    [again, hard, good, easy]
}

/// Scale every interval of at least `FUZZ_THRESHOLD` days by one random
/// factor, then restore the ordering.
fn fuzz(intervals: [u32; 4], rng: &mut impl Rng) -> [u32; 4] {
    let factor: f64 = rng.random_range(1.0 - FUZZ_RATIO..=1.0 + FUZZ_RATIO);
    order(intervals.map(|days| {
        if days < FUZZ_THRESHOLD {
            days
        } else {
            (f64::from(days) * factor).round() as u32
        }
    }))
}

/// Fluent answers make a card easier, laboured ones harder.
fn response_adjustment(response_time: Duration) -> Difficulty {
    let secs = response_time.as_secs_f64();
    let span = SLOW_RESPONSE_SECS - FAST_RESPONSE_SECS;
    let position = ((secs - FAST_RESPONSE_SECS) / span).clamp(0.0, 1.0);
    RESPONSE_ADJUSTMENT * (2.0 * position - 1.0)
}

/// Same-session delay for a card still being learned: the short-term
/// stability solved at the desired retention, between a minute and a day.
fn retry_delay(stability: Stability, grade: Grade, retention: Recall) -> chrono::Duration {
    let s = fsrs::short_term_stability(stability, grade);
    let minutes = (fsrs::interval(retention, s) * MINUTES_PER_DAY).round();
    let minutes = if minutes.is_nan() {
        1.0
    } else {
        minutes.clamp(1.0, MINUTES_PER_DAY - 1.0)
    };
    chrono::Duration::minutes(minutes as i64)
}
