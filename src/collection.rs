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

use std::env::current_dir;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::Config;
use crate::error::Fallible;
use crate::error::fail;
use crate::files::FileAccess;
use crate::parser::parse_cards;
use crate::types::card::Card;
use crate::types::date::Date;

/// The deck name of files at the top of the collection.
pub const ROOT_DECK: &str = "Root";

pub struct Collection {
    pub directory: PathBuf,
    pub config: Config,
    pub cards: Vec<Card>,
}

impl Collection {
    /// Load every card under `directory` (the current directory if none is
    /// given). Files that cannot be read are skipped.
    pub async fn load(
        files: &impl FileAccess,
        directory: Option<String>,
        today: Date,
    ) -> Fallible<Self> {
        let directory: PathBuf = match directory {
            Some(dir) => PathBuf::from(dir),
            None => current_dir()?,
        };
        let directory = if directory.exists() {
            directory.canonicalize()?
        } else {
            return fail("directory does not exist.");
        };

        let config = Config::load(&directory)?;

        log::debug!("Loading deck...");
        let start = Instant::now();
        let mut cards = Vec::new();
        for path in files.list_files(&directory, "md").await? {
            let text = match files.read_file(&path).await {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Skipping {}: {e}", path.display());
                    continue;
                }
            };
            let deck_name = deck_name(&directory, &path);
            for parsed in parse_cards(&text, &path) {
                cards.push(Card::new(deck_name.clone(), path.clone(), parsed, today));
            }
        }
        let duration = start.elapsed().as_millis();
        log::debug!("Deck loaded in {duration}ms.");

        Ok(Self {
            directory,
            config,
            cards,
        })
    }

    /// Indices of the cards due on `today`, in file order.
    pub fn due_today(&self, today: Date) -> Vec<usize> {
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.is_due(today))
            .map(|(i, _)| i)
            .collect()
    }
}

/// The folder a file lives in, relative to the collection root.
fn deck_name(root: &Path, path: &Path) -> String {
    let folder = path
        .parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|relative| relative.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    if folder.is_empty() {
        ROOT_DECK.to_string()
    } else {
        folder
    }
}

#[cfg(test)]
mod tests {
    use std::fs::create_dir_all;
    use std::fs::write;

    use tempfile::tempdir;

    use super::*;
    use crate::files::LocalFiles;
    use crate::types::card::CardKind;
    use crate::types::card::CardState;

    #[test]
    fn test_deck_name() {
        let root = Path::new("/vault");
        assert_eq!(deck_name(root, Path::new("/vault/a.md")), "Root");
        assert_eq!(deck_name(root, Path::new("/vault/Spanish/a.md")), "Spanish");
        assert_eq!(
            deck_name(root, Path::new("/vault/Spanish/Verbs/a.md")),
            "Spanish/Verbs"
        );
    }

    #[tokio::test]
    async fn test_non_existent_directory() {
        let today = Date::parse("2026-02-01").unwrap();
        let result = Collection::load(&LocalFiles, Some("./derpherp".to_string()), today).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load() -> Fallible<()> {
        let dir = tempdir()?;
        let root = dir.path();
        create_dir_all(root.join("Geography"))?;
        write(root.join("basics.md"), "Q::A\n\nFront:::Back\n")?;
        write(
            root.join("Geography/capitals.md"),
            "Capital of France::Paris <!--SR:!2026-03-01,10,250-->\n",
        )?;
        let today = Date::parse("2026-02-01")?;
        let collection =
            Collection::load(&LocalFiles, Some(root.display().to_string()), today).await?;
        assert_eq!(collection.cards.len(), 4);

        let geography = &collection.cards[0];
        assert_eq!(geography.deck_name(), "Geography");
        assert_eq!(geography.schedule().state, CardState::Review);
        assert!(!geography.is_due(today));

        let kinds: Vec<CardKind> = collection.cards[1..].iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![CardKind::Basic, CardKind::Basic, CardKind::Reversed]);
        assert!(collection.cards[1..].iter().all(|c| c.deck_name() == ROOT_DECK));
        assert_eq!(collection.due_today(today), vec![1, 2, 3]);
        assert_eq!(collection.config, Config::default());
        Ok(())
    }
}
