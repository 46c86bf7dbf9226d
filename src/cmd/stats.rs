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

use std::collections::BTreeSet;
use std::fmt::Display;
use std::fmt::Formatter;

use clap::ValueEnum;
use serde::Serialize;

use crate::collection::Collection;
use crate::error::Fallible;
use crate::files::LocalFiles;
use crate::types::card::CardState;
use crate::types::card::SyncStatus;
use crate::types::date::Date;
use crate::types::timestamp::Timestamp;

#[derive(ValueEnum, Clone)]
pub enum StatsFormat {
    /// Human-readable output.
    Text,
    /// JSON output.
    Json,
}

impl Display for StatsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsFormat::Text => write!(f, "text"),
            StatsFormat::Json => write!(f, "json"),
        }
    }
}

pub async fn print_stats(directory: Option<String>, format: StatsFormat) -> Fallible<()> {
    let today = Timestamp::now().local_date();
    let collection = Collection::load(&LocalFiles, directory, today).await?;
    let stats = Stats::new(&collection, today);
    match format {
        StatsFormat::Text => print!("{stats}"),
        StatsFormat::Json => {
            let stats_json = serde_json::to_string_pretty(&stats)?;
            println!("{}", stats_json);
        }
    }
    Ok(())
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    card_count: usize,
    deck_count: usize,
    new_count: usize,
    learning_count: usize,
    review_count: usize,
    relearning_count: usize,
    due_today_count: usize,
    pending_sync_count: usize,
    /// Mean difficulty of the cards that have been reviewed.
    mean_difficulty: Option<f64>,
    /// Mean probability of recalling a reviewed card today.
    mean_retrievability: Option<f64>,
}

impl Stats {
    pub fn new(collection: &Collection, today: Date) -> Self {
        let cards = &collection.cards;
        let count_state = |state: CardState| {
            cards
                .iter()
                .filter(|card| card.schedule().state == state)
                .count()
        };
        let decks: BTreeSet<&str> = cards.iter().map(|card| card.deck_name()).collect();
        let reviewed: Vec<_> = cards
            .iter()
            .map(|card| card.schedule())
            .filter(|s| s.state != CardState::New)
            .collect();
        let mean = |values: Vec<f64>| {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        };
        Self {
            card_count: cards.len(),
            deck_count: decks.len(),
            new_count: count_state(CardState::New),
            learning_count: count_state(CardState::Learning),
            review_count: count_state(CardState::Review),
            relearning_count: count_state(CardState::Relearning),
            due_today_count: cards.iter().filter(|card| card.is_due(today)).count(),
            pending_sync_count: cards
                .iter()
                .filter(|card| card.sync() == SyncStatus::PendingSync)
                .count(),
            mean_difficulty: mean(reviewed.iter().map(|s| s.difficulty).collect()),
            mean_retrievability: mean(
                reviewed
                    .iter()
                    .map(|s| s.current_retrievability(today))
                    .collect(),
            ),
        }
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cards:        {}", self.card_count)?;
        writeln!(f, "Decks:        {}", self.deck_count)?;
        writeln!(f, "New:          {}", self.new_count)?;
        writeln!(f, "Learning:     {}", self.learning_count)?;
        writeln!(f, "Review:       {}", self.review_count)?;
        writeln!(f, "Relearning:   {}", self.relearning_count)?;
        writeln!(f, "Due today:    {}", self.due_today_count)?;
        writeln!(f, "Pending sync: {}", self.pending_sync_count)?;
        if let Some(d) = self.mean_difficulty {
            writeln!(f, "Difficulty:   {d:.2}")?;
        }
        if let Some(r) = self.mean_retrievability {
            writeln!(f, "Recall today: {:.1}%", r * 100.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_stats(today: &str) -> Fallible<Stats> {
        let today = Date::parse(today)?;
        let collection = Collection::load(&LocalFiles, Some("./test".to_string()), today).await?;
        Ok(Stats::new(&collection, today))
    }

    #[tokio::test]
    async fn test_counts() -> Fallible<()> {
        let stats = test_stats("2026-02-01").await?;
        assert_eq!(stats.card_count, 11);
        assert_eq!(stats.deck_count, 3);
        assert_eq!(stats.new_count, 7);
        assert_eq!(stats.learning_count, 0);
        assert_eq!(stats.review_count, 2);
        assert_eq!(stats.relearning_count, 2);
        assert_eq!(stats.due_today_count, 11);
        assert_eq!(stats.pending_sync_count, 0);
        let d = stats.mean_difficulty.unwrap();
        assert!((d - 5.425).abs() < 1e-9);
        let r = stats.mean_retrievability.unwrap();
        assert!(r > 0.0 && r < 1.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_due_before_tags() -> Fallible<()> {
        // Only the new cards are due before any tagged card comes up.
        let stats = test_stats("2025-11-01").await?;
        assert_eq!(stats.due_today_count, 7);
        Ok(())
    }

    #[tokio::test]
    async fn test_json() -> Fallible<()> {
        let stats = test_stats("2026-02-01").await?;
        let json = serde_json::to_value(&stats)?;
        assert_eq!(json["cardCount"], 11);
        assert_eq!(json["relearningCount"], 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_text() -> Fallible<()> {
        let stats = test_stats("2026-02-01").await?;
        let text = stats.to_string();
        assert!(text.starts_with("Cards:        11\n"));
        assert!(text.contains("Due today:    11\n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_print_stats() {
        assert!(print_stats(Some("./test".to_string()), StatsFormat::Json).await.is_ok());
        assert!(print_stats(Some("./derpherp".to_string()), StatsFormat::Text).await.is_err());
    }
}
