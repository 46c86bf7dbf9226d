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

//! Reviewing a card and saving the result to its file.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Fallible;
use crate::files::FileAccess;
use crate::fsrs::Grade;
use crate::scheduler::ReviewResult;
use crate::scheduler::SchedulerOptions;
use crate::scheduler::preview;
use crate::scheduler::schedule;
use crate::types::card::Card;
use crate::types::card::SyncStatus;
use crate::types::timestamp::Timestamp;
use crate::writer::patch;
use crate::writer::patch_many;

pub struct Reviewer<F> {
    files: F,
    options: SchedulerOptions,
}

#[derive(Clone, Debug)]
pub struct ReviewOutcome {
    pub result: ReviewResult,
    pub sync: SyncStatus,
}

impl<F: FileAccess> Reviewer<F> {
    pub fn new(files: F, options: SchedulerOptions) -> Self {
        Self { files, options }
    }

    /// The interval each grade would give `card`, in `Grade::ALL` order.
    pub fn preview(&self, card: &Card, now: Timestamp) -> [u32; 4] {
        preview(&card.review_input(None), now, &self.options)
    }

    /// Grade a card and save its new state to its file.
    ///
    /// The new state is applied to `card` even when saving fails, in which
    /// case the card is marked as pending.
    pub async fn answer(
        &self,
        card: &mut Card,
        grade: Grade,
        now: Timestamp,
        response_time: Option<Duration>,
    ) -> ReviewOutcome {
        let result = schedule(&card.review_input(response_time), grade, now, &self.options);
        card.apply_review(&result);
        let sync = match self.save(card).await {
            Ok(()) => SyncStatus::Synced,
            Err(e) => {
                log::warn!(
                    "Failed to save review to {}: {e}",
                    card.location().file_path().display()
                );
                SyncStatus::PendingSync
            }
        };
        card.set_sync(sync);
        ReviewOutcome { result, sync }
    }

    async fn save(&self, card: &Card) -> Fallible<()> {
        let path = card.location().file_path();
        let text = self.files.read_file(path).await?;
        let text = patch(&text, card.location(), &card.tag())?;
        self.files.write_file(path, &text).await
    }

    /// Try again to save every pending card, one write per file. Returns the
    /// number of cards still pending.
    pub async fn flush(&self, cards: &mut [Card]) -> usize {
        let mut by_file: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        for (i, card) in cards.iter().enumerate() {
            if card.sync() == SyncStatus::PendingSync {
                by_file
                    .entry(card.location().file_path().to_path_buf())
                    .or_default()
                    .push(i);
            }
        }
        let mut pending = 0;
        for (path, indices) in by_file {
            match self.save_all(&path, cards, &indices).await {
                Ok(applied) => {
                    for (i, ok) in indices.into_iter().zip(applied) {
                        if ok {
                            cards[i].set_sync(SyncStatus::Synced);
                        } else {
                            pending += 1;
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Failed to save reviews to {}: {e}", path.display());
                    pending += indices.len();
                }
            }
        }
        pending
    }

    /// Patch every card in `indices` into one file, skipping stale ones.
    /// Returns which cards were written.
    async fn save_all(
        &self,
        path: &Path,
        cards: &[Card],
        indices: &[usize],
    ) -> Fallible<Vec<bool>> {
        let tags: Vec<_> = indices.iter().map(|&i| cards[i].tag()).collect();
        let updates = indices
            .iter()
            .zip(&tags)
            .map(|(&i, tag)| (cards[i].location(), tag));
        let text = self.files.read_file(path).await?;
        let (text, applied) = patch_many(&text, updates);
        if applied.contains(&true) {
            self.files.write_file(path, &text).await?;
        }
        Ok(applied)
    }
}
