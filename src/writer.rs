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

//! Writing scheduling tags back into markdown.
//!
//! The writer only ever touches the tag of the card block it is asked to
//! update. Before doing so it checks that the block is still where the card
//! was parsed from and still reads the same, since the file may have been
//! edited in the meantime.

use crate::error::Fallible;
use crate::error::fail;
use crate::parser::block_checksum;
use crate::parser::parse_cards;
use crate::tag::SchedulingTag;
use crate::tag::find_tag;
use crate::types::card::SourceLocation;

/// Write `tag` into the card block at `location`, returning the new text.
///
/// An existing tag in the block is replaced. Otherwise the tag is appended
/// to the block's last non-blank line, so no line moves.
pub fn patch(text: &str, location: &SourceLocation, tag: &SchedulingTag) -> Fallible<String> {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let (start, end) = location.range();
    if start > end || end >= lines.len() {
        return fail(format!(
            "{}: lines {}-{} are out of range.",
            location.file_path().display(),
            start + 1,
            end + 1
        ));
    }

    let block: Vec<&str> = lines[start..=end].iter().map(String::as_str).collect();
    if block_checksum(&block) != location.checksum() {
        return fail(format!(
            "{}: the card at lines {}-{} has changed since it was read.",
            location.file_path().display(),
            start + 1,
            end + 1
        ));
    }
    let still_a_card = parse_cards(text, location.file_path())
        .any(|card| card.line_start == start && card.line_end == end);
    if !still_a_card {
        return fail(format!(
            "{}: lines {}-{} are no longer a card.",
            location.file_path().display(),
            start + 1,
            end + 1
        ));
    }

    let encoded = tag.encode();
    let existing = (start..=end).find_map(|i| find_tag(&lines[i]).map(|span| (i, span)));
    match existing {
        Some((i, span)) => {
            lines[i].replace_range(span, &encoded);
        }
        None => {
            let i = (start..=end)
                .rev()
                .find(|&i| !lines[i].trim().is_empty())
                .unwrap_or(end);
            let line = &mut lines[i];
            let at = if line.ends_with('\r') {
                line.len() - 1
            } else {
                line.len()
            };
            line.insert_str(at, &format!(" {encoded}"));
        }
    }
    Ok(lines.join("\n"))
}

/// Apply several patches to one document. Stale locations are skipped and
/// logged; the returned flags say which updates were applied, in order.
pub fn patch_many<'a, I>(text: &str, updates: I) -> (String, Vec<bool>)
where
    I: IntoIterator<Item = (&'a SourceLocation, &'a SchedulingTag)>,
{
    let mut text = text.to_string();
    let mut applied = Vec::new();
    for (location, tag) in updates {
        match patch(&text, location, tag) {
            Ok(patched) => {
                text = patched;
                applied.push(true);
            }
            Err(e) => {
                log::warn!("Skipping stale card: {e}");
                applied.push(false);
            }
        }
    }
    (text, applied)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::parser::ParsedCard;
    use crate::types::card::CardState;
    use crate::types::date::Date;

    fn cards(text: &str) -> Vec<ParsedCard> {
        parse_cards(text, Path::new("deck.md")).collect()
    }

    fn location(card: &ParsedCard) -> SourceLocation {
        SourceLocation::new(
            "deck.md".into(),
            card.line_start,
            card.line_end,
            card.checksum,
        )
    }

    fn review_tag() -> Fallible<SchedulingTag> {
        Ok(SchedulingTag {
            due: Date::parse("2026-03-01")?,
            interval: 9,
            ease: 250,
            difficulty: Some(5.5),
            stability: Some(8.94),
            reviews: Some(1),
            reps: Some(1),
            lapses: Some(0),
            state: Some(CardState::Review),
            last: Some(Date::parse("2026-02-20")?),
        })
    }

    #[test]
    fn test_append_inline() -> Fallible<()> {
        let text = "# Deck\n\nQ::A\n\nTrailing prose.\n";
        let card = &cards(text)[0];
        let tag = review_tag()?;
        let patched = patch(text, &location(card), &tag)?;
        assert_eq!(
            patched,
            format!("# Deck\n\nQ::A {}\n\nTrailing prose.\n", tag.encode())
        );
        Ok(())
    }

    #[test]
    fn test_replace_existing() -> Fallible<()> {
        let text = "Before\n\nQ::A <!--SR:!2026-02-15,3,250-->\nAfter::x";
        let card = &cards(text)[0];
        let tag = review_tag()?;
        let patched = patch(text, &location(card), &tag)?;
        assert_eq!(
            patched,
            format!("Before\n\nQ::A {}\nAfter::x", tag.encode())
        );
        Ok(())
    }

    #[test]
    fn test_append_multiline() -> Fallible<()> {
        let text = "What is it?\n?\nThis.\nAnd that.\n\nOther.";
        let card = &cards(text)[0];
        let tag = review_tag()?;
        let patched = patch(text, &location(card), &tag)?;
        assert_eq!(
            patched,
            format!("What is it?\n?\nThis.\nAnd that. {}\n\nOther.", tag.encode())
        );
        Ok(())
    }

    #[test]
    fn test_crlf_preserved() -> Fallible<()> {
        let text = "Q::A\r\n\r\nMore text\r\n";
        let card = &cards(text)[0];
        let tag = review_tag()?;
        let patched = patch(text, &location(card), &tag)?;
        assert_eq!(
            patched,
            format!("Q::A {}\r\n\r\nMore text\r\n", tag.encode())
        );
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Fallible<()> {
        let text = "# Notes\n\nSome prose about things.\n\nCapital of France::Paris\n\nWhy?\n?\nBecause.\n\n```\nnot::a card\n```\n";
        let parsed = cards(text);
        assert_eq!(parsed.len(), 2);
        let tag = review_tag()?;
        let patched = patch(text, &location(&parsed[1]), &tag)?;

        let reparsed = cards(&patched);
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[0], parsed[0]);
        assert_eq!(reparsed[1].question, "Why?");
        assert_eq!(reparsed[1].answer, "Because.");
        assert_eq!(reparsed[1].tag, Some(tag));
        assert_eq!(reparsed[1].checksum, parsed[1].checksum);

        let untouched = |s: &str| -> Vec<String> {
            s.lines()
                .enumerate()
                .filter(|(i, _)| *i != 8)
                .map(|(_, l)| l.to_string())
                .collect()
        };
        assert_eq!(untouched(text), untouched(&patched));
        Ok(())
    }

    #[test]
    fn test_repeated_patch() -> Fallible<()> {
        let text = "Q::A\n";
        let card = &cards(text)[0];
        let first = patch(text, &location(card), &review_tag()?)?;
        let mut tag = review_tag()?;
        tag.reviews = Some(2);
        let second = patch(&first, &location(card), &tag)?;
        assert_eq!(second, format!("Q::A {}\n", tag.encode()));
        Ok(())
    }

    #[test]
    fn test_shifted_lines_rejected() -> Fallible<()> {
        let text = "Q::A\n";
        let card = &cards(text)[0];
        let edited = "New first line\n\nQ::A\n";
        assert!(patch(edited, &location(card), &review_tag()?).is_err());
        Ok(())
    }

    #[test]
    fn test_edited_card_rejected() -> Fallible<()> {
        let text = "Q::A\n";
        let card = &cards(text)[0];
        assert!(patch("Q::B\n", &location(card), &review_tag()?).is_err());
        Ok(())
    }

    #[test]
    fn test_out_of_range_rejected() -> Fallible<()> {
        let text = "Prose.\n\nQ::A";
        let card = &cards(text)[0];
        assert!(patch("Prose.", &location(card), &review_tag()?).is_err());
        Ok(())
    }

    #[test]
    fn test_no_longer_a_card_rejected() -> Fallible<()> {
        // The lines match the checksum, but they hold no card.
        let location = SourceLocation::new(
            "deck.md".into(),
            0,
            0,
            block_checksum(&["Just prose"]),
        );
        assert!(patch("Just prose", &location, &review_tag()?).is_err());
        Ok(())
    }

    #[test]
    fn test_patch_many() -> Fallible<()> {
        let text = "A::1\n\nB::2\n";
        let parsed = cards(text);
        let tag = review_tag()?;
        let locations: Vec<SourceLocation> = parsed.iter().map(location).collect();
        let (patched, applied) = patch_many(text, locations.iter().map(|l| (l, &tag)));
        let encoded = tag.encode();
        assert_eq!(patched, format!("A::1 {encoded}\n\nB::2 {encoded}\n"));
        assert_eq!(applied, vec![true, true]);
        Ok(())
    }

    #[test]
    fn test_patch_many_skips_stale() -> Fallible<()> {
        let text = "A::1\n";
        let card = &cards(text)[0];
        let stale = SourceLocation::new("deck.md".into(), 4, 4, card.checksum);
        let tag = review_tag()?;
        let good = location(card);
        let (patched, applied) = patch_many(text, [(&stale, &tag), (&good, &tag)]);
        assert_eq!(patched, format!("A::1 {}\n", tag.encode()));
        assert_eq!(applied, vec![false, true]);
        Ok(())
    }

    #[test]
    fn test_nested_list_card() -> Fallible<()> {
        let tag = review_tag()?;
        for text in ["- Parent\n    - Child::Answer\n", "- Parent\n\t- Child::Answer\n"] {
            let parsed = cards(text);
            assert_eq!(parsed.len(), 1);
            let patched = patch(text, &location(&parsed[0]), &tag)?;
            assert_eq!(patched, format!("{} {}\n", text.trim_end(), tag.encode()));
        }
        Ok(())
    }
}
