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

//! The individual FSRS formulas. Each function here is pure and total: out of
//! domain inputs are clamped rather than rejected. The state machine that
//! decides which formula applies lives in `scheduler`.

/// Recall probability, in [0, 1].
pub type Recall = f64;

/// Stability, in days.
pub type Stability = f64;

/// Difficulty, in [1, 10].
pub type Difficulty = f64;

/// Time, in days.
pub type T = f64;

/// The default FSRS-5 parameters.
const W: [f64; 19] = [
    0.40255, 1.18385, 3.173, 15.69105, 7.1949, 0.5345, 1.4604, 0.0046, 1.54575, 0.1192, 1.01925,
    1.9395, 0.11, 0.29605, 2.2698, 0.2315, 2.9898, 0.51655, 0.6621,
];

/// The smallest stability any formula will return.
pub const MIN_STABILITY: Stability = 0.01;

pub const MIN_DIFFICULTY: Difficulty = 1.0;
pub const MAX_DIFFICULTY: Difficulty = 10.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Again => "again",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }

    /// Position of this grade in `Grade::ALL`.
    pub fn index(self) -> usize {
        match self {
            Grade::Again => 0,
            Grade::Hard => 1,
            Grade::Good => 2,
            Grade::Easy => 3,
        }
    }

    fn as_float(self) -> f64 {
        (self.index() + 1) as f64
    }
}

/// The forgetting curve: probability of recall after `t` days for a memory
/// of stability `s`. A non-positive stability has nothing to recall.
pub fn retrievability(t: T, s: Stability) -> Recall {
    if s.is_nan() || s <= 0.0 {
        return 0.0;
    }
    let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
    1.0 / (1.0 + t / (9.0 * s))
}

/// Solve the forgetting curve for the time at which recall drops to `r_d`.
pub fn interval(r_d: Recall, s: Stability) -> T {
    9.0 * sanitize_stability(s) * (1.0 / r_d - 1.0)
}

pub fn initial_stability(g: Grade) -> Stability {
    W[g.index()]
}

pub fn initial_difficulty(g: Grade) -> Difficulty {
    clamp_difficulty(W[4] - (W[5] * (g.as_float() - 1.0)).exp() + 1.0)
}

/// Difficulty after a review: a grade-dependent step damped as difficulty
/// approaches the ceiling, then mean reversion towards `D0(Easy)`.
pub fn new_difficulty(d: Difficulty, g: Grade) -> Difficulty {
    let d = clamp_difficulty(d);
    let delta = -W[6] * (g.as_float() - 3.0);
    let damped = d + delta * (10.0 - d) / 9.0;
    clamp_difficulty(W[7] * initial_difficulty(Grade::Easy) + (1.0 - W[7]) * damped)
}

/// Stability after a successful recall (Hard, Good, or Easy) at least a day
/// after the previous review. Never below the previous stability.
pub fn recall_stability(d: Difficulty, s: Stability, r: Recall, g: Grade) -> Stability {
    let d = clamp_difficulty(d);
    let s = sanitize_stability(s);
    let r = sanitize_recall(r);
    let hard_penalty = if g == Grade::Hard { W[15] } else { 1.0 };
    let easy_bonus = if g == Grade::Easy { W[16] } else { 1.0 };
    let growth = W[8].exp()
        * (11.0 - d)
        * s.powf(-W[9])
        * ((W[10] * (1.0 - r)).exp() - 1.0)
        * hard_penalty
        * easy_bonus;
    let s_r = s * (1.0 + growth);
    if s_r.is_finite() { s_r.max(s) } else { s }
}

/// Stability after a lapse (Again) at least a day after the previous review.
/// Never above the previous stability.
pub fn lapse_stability(d: Difficulty, s: Stability, r: Recall) -> Stability {
    let d = clamp_difficulty(d);
    let s = sanitize_stability(s);
    let r = sanitize_recall(r);
    let s_f = W[11] * d.powf(-W[12]) * ((s + 1.0).powf(W[13]) - 1.0) * (W[14] * (1.0 - r)).exp();
    if s_f.is_finite() {
        s_f.clamp(MIN_STABILITY, s)
    } else {
        s
    }
}

/// Stability after a review on the same day as the previous one, where the
/// forgetting curve has not moved.
pub fn short_term_stability(s: Stability, g: Grade) -> Stability {
    let s = sanitize_stability(s);
    let s_s = s * (W[17] * (g.as_float() - 3.0 + W[18])).exp();
    if s_s.is_finite() {
        s_s.max(MIN_STABILITY)
    } else {
        s
    }
}

pub fn clamp_difficulty(d: Difficulty) -> Difficulty {
    if d.is_nan() {
        return initial_difficulty(Grade::Good);
    }
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn sanitize_stability(s: Stability) -> Stability {
    if s.is_finite() {
        s.max(MIN_STABILITY)
    } else if s > 0.0 {
        f64::MAX
    } else {
        MIN_STABILITY
    }
}

fn sanitize_recall(r: Recall) -> Recall {
    if r.is_nan() { 0.0 } else { r.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_retrievability_at_zero() {
        for s in [0.1, 1.0, 5.0, 365.0] {
            assert_eq!(retrievability(0.0, s), 1.0);
        }
    }

    #[test]
    fn test_retrievability_decreasing() {
        let s = 10.0;
        let mut previous = retrievability(0.0, s);
        for t in 1..200 {
            let r = retrievability(t as f64, s);
            assert!(r < previous);
            previous = r;
        }
    }

    #[test]
    fn test_retrievability_without_stability() {
        assert_eq!(retrievability(5.0, 0.0), 0.0);
        assert_eq!(retrievability(5.0, -1.0), 0.0);
        assert_eq!(retrievability(5.0, f64::NAN), 0.0);
    }

    #[test]
    fn test_retrievability_negative_time() {
        assert_eq!(retrievability(-3.0, 10.0), 1.0);
    }

    #[test]
    fn test_interval_inverts_retrievability() {
        let s = 12.5;
        let t = interval(0.9, s);
        assert!(approx_eq(t, s));
        assert!(approx_eq(retrievability(t, s), 0.9));
    }

    #[test]
    fn test_initial_difficulty_ordering() {
        let d: Vec<Difficulty> = Grade::ALL.iter().map(|g| initial_difficulty(*g)).collect();
        assert!(d[0] > d[1] && d[1] > d[2] && d[2] > d[3]);
        for value in d {
            assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&value));
        }
    }

    #[test]
    fn test_new_difficulty_clamped() {
        for d in [-5.0, 1.0, 5.0, 10.0, 42.0] {
            for g in Grade::ALL {
                let d = new_difficulty(d, g);
                assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&d));
            }
        }
    }

    #[test]
    fn test_again_raises_difficulty() {
        assert!(new_difficulty(5.0, Grade::Again) > 5.0);
        assert!(new_difficulty(5.0, Grade::Easy) < 5.0);
    }

    #[test]
    fn test_recall_stability_grade_ordering() {
        let (d, s, r) = (5.0, 10.0, retrievability(10.0, 10.0));
        let hard = recall_stability(d, s, r, Grade::Hard);
        let good = recall_stability(d, s, r, Grade::Good);
        let easy = recall_stability(d, s, r, Grade::Easy);
        assert!(s <= hard && hard < good && good < easy);
    }

    #[test]
    fn test_lapse_stability_bounded() {
        let s = 20.0;
        let s_f = lapse_stability(5.0, s, retrievability(30.0, s));
        assert!(s_f > 0.0 && s_f <= s);
    }

    #[test]
    fn test_short_term_stability() {
        let s = 2.0;
        assert!(short_term_stability(s, Grade::Again) < s);
        assert!(short_term_stability(s, Grade::Good) > s);
        assert!(short_term_stability(s, Grade::Easy) > short_term_stability(s, Grade::Good));
    }

    #[test]
    fn test_huge_stability_stays_finite() {
        let s = 100_000.0;
        let r = retrievability(10_000.0, s);
        assert!(recall_stability(5.0, s, r, Grade::Good).is_finite());
        assert!(interval(0.9, s).is_finite());
    }
}
