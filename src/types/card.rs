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

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ErrorReport;
use crate::error::fail;
use crate::fsrs::Difficulty;
use crate::fsrs::Recall;
use crate::fsrs::Stability;
use crate::fsrs::clamp_difficulty;
use crate::fsrs::retrievability;
use crate::legacy;
use crate::parser::ParsedCard;
use crate::scheduler::ReviewInput;
use crate::scheduler::ReviewResult;
use crate::tag::SchedulingTag;
use crate::types::card_hash::CardHash;
use crate::types::card_hash::Hasher;
use crate::types::date::Date;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CardKind {
    Basic,
    /// The back-to-front card of a bidirectional pair.
    Reversed,
    Cloze,
}

impl CardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CardKind::Basic => "basic",
            CardKind::Reversed => "reversed",
            CardKind::Cloze => "cloze",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CardState {
    /// Never reviewed.
    New,
    /// Reviewed, but not yet graduated to day-scale intervals.
    Learning,
    Review,
    /// Forgotten after graduating.
    Relearning,
}

impl CardState {
    #[cfg(test)]
    pub const ALL: [CardState; 4] = [
        CardState::New,
        CardState::Learning,
        CardState::Review,
        CardState::Relearning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CardState::New => "new",
            CardState::Learning => "learning",
            CardState::Review => "review",
            CardState::Relearning => "relearning",
        }
    }
}

impl TryFrom<&str> for CardState {
    type Error = ErrorReport;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "new" => Ok(CardState::New),
            "learning" => Ok(CardState::Learning),
            "review" => Ok(CardState::Review),
            "relearning" => Ok(CardState::Relearning),
            _ => fail(format!("Invalid card state: {value}")),
        }
    }
}

/// Whether a card's scheduling state has been written back to its file.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyncStatus {
    Synced,
    /// The last review could not be written; the state is only in memory.
    PendingSync,
}

/// Where a card came from, and what its block looked like at parse time.
#[derive(Clone, PartialEq, Debug)]
pub struct SourceLocation {
    file_path: PathBuf,
    /// Zero-based, inclusive.
    line_start: usize,
    /// Zero-based, inclusive.
    line_end: usize,
    checksum: CardHash,
}

impl SourceLocation {
    pub fn new(file_path: PathBuf, line_start: usize, line_end: usize, checksum: CardHash) -> Self {
        Self {
            file_path,
            line_start,
            line_end,
            checksum,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn range(&self) -> (usize, usize) {
        (self.line_start, self.line_end)
    }

    pub fn checksum(&self) -> CardHash {
        self.checksum
    }
}

/// A card's memory state and due date.
#[derive(Clone, PartialEq, Debug)]
pub struct Schedule {
    pub state: CardState,
    pub difficulty: Difficulty,
    pub stability: Stability,
    /// The recall probability predicted at the last review. Informational.
    pub retrievability: Recall,
    pub interval: u32,
    pub scheduled_days: u32,
    pub elapsed_days: u32,
    pub review_count: u32,
    /// Consecutive successful reviews since the last lapse.
    pub reps: u32,
    pub lapses: u32,
    pub last_review: Option<Date>,
    pub next_review: Date,
    pub legacy_ease: u32,
}

impl Schedule {
    /// A card that has never been reviewed, due on `today`.
    pub fn new_card(today: Date) -> Self {
        Self {
            state: CardState::New,
            difficulty: 0.0,
            stability: 0.0,
            retrievability: 0.0,
            interval: 0,
            scheduled_days: 0,
            elapsed_days: 0,
            review_count: 0,
            reps: 0,
            lapses: 0,
            last_review: None,
            next_review: today,
            legacy_ease: legacy::DEFAULT_EASE,
        }
    }

    /// Rebuild the schedule stored in a tag. Fields that older tags lack are
    /// filled in from the legacy interval and ease.
    pub fn from_tag(tag: &SchedulingTag) -> Self {
        let ease = if tag.ease == 0 {
            legacy::DEFAULT_EASE
        } else {
            tag.ease
        };
        let reviews = tag.reviews.unwrap_or(0);
        let never_reviewed = tag.interval == 0 && reviews == 0 && tag.last.is_none();
        if tag.state == Some(CardState::New) || (tag.state.is_none() && never_reviewed) {
            return Self {
                legacy_ease: ease,
                ..Self::new_card(tag.due)
            };
        }

        let difficulty = match tag.difficulty {
            Some(d) => clamp_difficulty(d),
            None => legacy::migrated_difficulty(ease),
        };
        let stability = match tag.stability {
            Some(s) if s > 0.0 => s,
            _ => legacy::migrated_stability(tag.interval),
        };
        let state = tag
            .state
            .unwrap_or_else(|| legacy::migrated_state(tag.interval));
        let last_review = tag
            .last
            .unwrap_or_else(|| tag.due.add_days(-i64::from(tag.interval)));
        Self {
            state,
            difficulty,
            stability,
            retrievability: 0.0,
            interval: tag.interval,
            scheduled_days: tag.interval,
            elapsed_days: 0,
            review_count: reviews.max(1),
            reps: tag.reps.unwrap_or(0),
            lapses: tag.lapses.unwrap_or(0),
            last_review: Some(last_review),
            next_review: tag.due,
            legacy_ease: ease,
        }
    }

    pub fn to_tag(&self) -> SchedulingTag {
        if self.state == CardState::New {
            return SchedulingTag::legacy(self.next_review, 0, self.legacy_ease);
        }
        SchedulingTag {
            due: self.next_review,
            interval: self.interval,
            ease: self.legacy_ease,
            difficulty: Some(self.difficulty),
            stability: Some(self.stability),
            reviews: Some(self.review_count),
            reps: Some(self.reps),
            lapses: Some(self.lapses),
            state: Some(self.state),
            last: self.last_review,
        }
    }

    /// The probability of recalling the card on `today`.
    pub fn current_retrievability(&self, today: Date) -> Recall {
        match self.last_review {
            Some(last) => retrievability(today.days_since(last) as f64, self.stability),
            None => 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Card {
    /// The name of the deck this card belongs to.
    deck_name: String,
    kind: CardKind,
    question: String,
    answer: String,
    location: SourceLocation,
    /// The cached hash of the card's content.
    hash: CardHash,
    schedule: Schedule,
    sync: SyncStatus,
}

impl Card {
    pub fn new(deck_name: String, file_path: PathBuf, parsed: ParsedCard, today: Date) -> Self {
        let hash = content_hash(parsed.kind, &parsed.question, &parsed.answer);
        let mut schedule = match &parsed.tag {
            Some(tag) => Schedule::from_tag(tag),
            None => Schedule::new_card(today),
        };
        schedule.retrievability = schedule.current_retrievability(today);
        let location = SourceLocation::new(
            file_path,
            parsed.line_start,
            parsed.line_end,
            parsed.checksum,
        );
        Self {
            deck_name,
            kind: parsed.kind,
            question: parsed.question,
            answer: parsed.answer,
            location,
            hash,
            schedule,
            sync: SyncStatus::Synced,
        }
    }

    pub fn deck_name(&self) -> &str {
        &self.deck_name
    }

    pub fn kind(&self) -> CardKind {
        self.kind
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn sync(&self) -> SyncStatus {
        self.sync
    }

    pub fn set_sync(&mut self, sync: SyncStatus) {
        self.sync = sync;
    }

    pub fn is_due(&self, today: Date) -> bool {
        self.schedule.next_review <= today
    }

    /// Everything the scheduler needs to know about this card.
    pub fn review_input(&self, response_time: Option<Duration>) -> ReviewInput {
        let s = &self.schedule;
        ReviewInput {
            state: s.state,
            difficulty: s.difficulty,
            stability: s.stability,
            last_review: s.last_review,
            lapses: s.lapses,
            reps: s.reps,
            review_count: s.review_count,
            legacy_ease: s.legacy_ease,
            fuzz_seed: self.hash.seed(),
            response_time,
        }
    }

    pub fn apply_review(&mut self, result: &ReviewResult) {
        self.schedule = Schedule {
            state: result.state,
            difficulty: result.difficulty,
            stability: result.stability,
            retrievability: result.retrievability,
            interval: result.interval,
            scheduled_days: result.scheduled_days,
            elapsed_days: result.elapsed_days,
            review_count: result.review_count,
            reps: result.reps,
            lapses: result.lapses,
            last_review: Some(result.reviewed_on),
            next_review: result.next_review,
            legacy_ease: result.legacy_ease,
        };
    }

    /// The tag to write back to this card's file.
    pub fn tag(&self) -> SchedulingTag {
        self.schedule.to_tag()
    }
}

fn content_hash(kind: CardKind, question: &str, answer: &str) -> CardHash {
    let mut hasher = Hasher::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(question.as_bytes());
    hasher.update(answer.as_bytes());
    hasher.finalize()
}
