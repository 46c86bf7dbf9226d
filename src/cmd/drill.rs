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

//! Drilling due cards in the terminal.

use std::collections::VecDeque;
use std::io::BufRead;
use std::io::Write;
use std::time::Instant;

use crate::collection::Collection;
use crate::error::Fallible;
use crate::files::FileAccess;
use crate::files::LocalFiles;
use crate::fsrs::Grade;
use crate::review::Reviewer;
use crate::types::card::Card;
use crate::types::card::CardKind;
use crate::types::card::SyncStatus;
use crate::types::timestamp::Timestamp;

pub async fn drill(
    directory: Option<String>,
    retention: Option<f64>,
    no_fuzz: bool,
    limit: Option<usize>,
) -> Fallible<()> {
    let today = Timestamp::now().local_date();
    let mut collection = Collection::load(&LocalFiles, directory, today).await?;
    let options = collection.config.scheduler_options(retention, no_fuzz);
    let reviewer = Reviewer::new(LocalFiles, options);

    let queue: VecDeque<usize> = collection
        .due_today(today)
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    if queue.is_empty() {
        println!("No cards due today.");
        return Ok(());
    }
    println!("{} cards due.", queue.len());

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    let summary = session(&reviewer, &mut collection.cards, queue, &mut input, &mut output).await?;
    println!("Reviewed {} cards.", summary.reviewed);
    if summary.pending > 0 {
        println!(
            "{} reviews could not be saved. Check that the files are writable and unchanged.",
            summary.pending
        );
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
struct Summary {
    reviewed: usize,
    /// Reviews that could not be written back.
    pending: usize,
}

/// Show each queued card, read a grade, and save the review. Cards answered
/// Again or Hard go to the back of the queue. Stops when the queue is empty,
/// the user quits, or input runs out.
async fn session<F: FileAccess>(
    reviewer: &Reviewer<F>,
    cards: &mut [Card],
    mut queue: VecDeque<usize>,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Fallible<Summary> {
    let mut reviewed = 0;
    while let Some(i) = queue.pop_front() {
        let card = &mut cards[i];
        writeln!(output)?;
        let label = match card.kind() {
            CardKind::Basic => card.deck_name().to_string(),
            kind => format!("{}, {}", card.deck_name(), kind.as_str()),
        };
        writeln!(output, "[{label}] {}", card.question())?;
        write!(output, "(press enter to reveal) ")?;
        output.flush()?;
        let shown = Instant::now();
        if read_line(input)?.is_none() {
            break;
        }
        let response_time = shown.elapsed();
        writeln!(output, "{}", card.answer())?;

        let intervals = reviewer.preview(card, Timestamp::now());
        let Some(grade) = read_grade(input, output, &intervals)? else {
            break;
        };
        let outcome = reviewer
            .answer(card, grade, Timestamp::now(), Some(response_time))
            .await;
        reviewed += 1;
        if outcome.sync == SyncStatus::PendingSync {
            writeln!(output, "Could not save this review, will retry at the end.")?;
        }
        if matches!(grade, Grade::Again | Grade::Hard) {
            queue.push_back(i);
        }
    }
    let pending = reviewer.flush(cards).await;
    Ok(Summary { reviewed, pending })
}

/// One line of input, or `None` at end of input.
fn read_line(input: &mut impl BufRead) -> Fallible<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask for a grade until a valid one is given. `None` means quit.
fn read_grade(
    input: &mut impl BufRead,
    output: &mut impl Write,
    intervals: &[u32; 4],
) -> Fallible<Option<Grade>> {
    loop {
        let choices: Vec<String> = Grade::ALL
            .iter()
            .map(|g| {
                format!(
                    "{} = {} ({})",
                    g.index() + 1,
                    g.as_str(),
                    format_interval(intervals[g.index()])
                )
            })
            .collect();
        write!(output, "{}, q = quit: ", choices.join(", "))?;
        output.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match line.as_str() {
            "1" => return Ok(Some(Grade::Again)),
            "2" => return Ok(Some(Grade::Hard)),
            "3" => return Ok(Some(Grade::Good)),
            "4" => return Ok(Some(Grade::Easy)),
            "q" => return Ok(None),
            _ => writeln!(output, "Invalid input. Please enter a number between 1 and 4.")?,
        }
    }
}

fn format_interval(days: u32) -> String {
    if days < 30 {
        format!("{days}d")
    } else if days < 365 {
        format!("{:.1}mo", f64::from(days) / 30.0)
    } else {
        format!("{:.1}y", f64::from(days) / 365.0)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;
    use std::fs::write;
    use std::io::Cursor;
    use std::path::PathBuf;

    use tempfile::TempDir;
    use tempfile::tempdir;

    use super::*;
    use crate::scheduler::SchedulerOptions;
    use crate::types::card::CardState;

    struct Fixture {
        _dir: TempDir,
        path: PathBuf,
        collection: Collection,
    }

    async fn fixture(text: &str) -> Fallible<Fixture> {
        let dir = tempdir()?;
        let path = dir.path().join("deck.md");
        write(&path, text)?;
        let today = Timestamp::now().local_date();
        let collection =
            Collection::load(&LocalFiles, Some(dir.path().display().to_string()), today).await?;
        let path = collection.directory.join("deck.md");
        Ok(Fixture {
            _dir: dir,
            path,
            collection,
        })
    }

    async fn run(fixture: &mut Fixture, keys: &str) -> Fallible<(Summary, String)> {
        let reviewer = Reviewer::new(LocalFiles, SchedulerOptions::new(0.9, false));
        let today = Timestamp::now().local_date();
        let queue = fixture.collection.due_today(today).into_iter().collect();
        let mut input = Cursor::new(keys.as_bytes().to_vec());
        let mut output = Vec::new();
        let summary = session(
            &reviewer,
            &mut fixture.collection.cards,
            queue,
            &mut input,
            &mut output,
        )
        .await?;
        Ok((summary, String::from_utf8_lossy(&output).to_string()))
    }

    #[tokio::test]
    async fn test_good_answer_saved() -> Fallible<()> {
        let mut fixture = fixture("Q::A\n").await?;
        let (summary, output) = run(&mut fixture, "\n3\n").await?;
        assert_eq!(summary, Summary { reviewed: 1, pending: 0 });
        assert!(output.contains("[Root] Q"));
        assert!(output.contains("3 = good (3d)"));
        let card = &fixture.collection.cards[0];
        assert_eq!(card.schedule().state, CardState::Review);
        assert_eq!(
            read_to_string(&fixture.path)?,
            format!("Q::A {}\n", card.tag().encode())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_again_requeued() -> Fallible<()> {
        let mut fixture = fixture("Q::A\n").await?;
        let (summary, _) = run(&mut fixture, "\n1\n\n3\n").await?;
        assert_eq!(summary.reviewed, 2);
        let card = &fixture.collection.cards[0];
        assert_eq!(card.schedule().review_count, 2);
        assert_eq!(card.schedule().lapses, 1);
        assert_eq!(card.schedule().state, CardState::Review);
        Ok(())
    }

    #[tokio::test]
    async fn test_quit() -> Fallible<()> {
        let mut fixture = fixture("A::1\n\nB::2\n").await?;
        let (summary, _) = run(&mut fixture, "\n4\n\nq\n").await?;
        assert_eq!(summary.reviewed, 1);
        assert_eq!(
            fixture.collection.cards[1].schedule().state,
            CardState::New
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_end_of_input() -> Fallible<()> {
        let mut fixture = fixture("Q::A\n").await?;
        let (summary, _) = run(&mut fixture, "").await?;
        assert_eq!(summary.reviewed, 0);
        assert_eq!(read_to_string(&fixture.path)?, "Q::A\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_grade() -> Fallible<()> {
        let mut fixture = fixture("Q::A\n").await?;
        let (summary, output) = run(&mut fixture, "\n7\n3\n").await?;
        assert_eq!(summary.reviewed, 1);
        assert!(output.contains("Invalid input"));
        Ok(())
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(29), "29d");
        assert_eq!(format_interval(45), "1.5mo");
        assert_eq!(format_interval(730), "2.0y");
    }
}
