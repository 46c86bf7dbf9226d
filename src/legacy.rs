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

//! The SM-2 style ease factor, and the migration of SM-2 metadata onto FSRS.
//!
//! Ease is kept up to date for display and for tools that still read it, but
//! the scheduler never consults it.

use crate::fsrs::Difficulty;
use crate::fsrs::Grade;
use crate::fsrs::Stability;
use crate::fsrs::clamp_difficulty;
use crate::types::card::CardState;

/// Ease, in percent, of a card that has never been reviewed.
pub const DEFAULT_EASE: u32 = 250;

pub const MINIMUM_EASE: u32 = 130;

/// Smallest stability given to a migrated card.
const MIN_MIGRATED_STABILITY: Stability = 0.1;

pub fn next_ease(ease: u32, grade: Grade) -> u32 {
    let delta: i64 = match grade {
        Grade::Again => -20,
        Grade::Hard => -15,
        Grade::Good => 0,
        Grade::Easy => 15,
    };
    let ease = (i64::from(ease) + delta).max(i64::from(MINIMUM_EASE));
    u32::try_from(ease).unwrap_or(u32::MAX)
}

/// Higher ease means an easier card: each 30 points above the default is one
/// point less difficulty.
pub fn migrated_difficulty(ease: u32) -> Difficulty {
    let ease = f64::from(ease);
    clamp_difficulty(5.0 + (f64::from(DEFAULT_EASE) - ease) / 30.0)
}

/// An SM-2 interval was chosen to be recalled at about 90%, which is what
/// FSRS stability means.
pub fn migrated_stability(interval: u32) -> Stability {
    f64::from(interval).max(MIN_MIGRATED_STABILITY)
}

pub fn migrated_state(interval: u32) -> CardState {
    if interval <= 1 {
        CardState::Learning
    } else {
        CardState::Review
    }
}
