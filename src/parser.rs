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

//! Extracting flashcards from markdown.
//!
//! Four kinds of blocks are recognized:
//!
//! - `question::answer` on one line.
//! - `front:::back` on one line, which yields a card in each direction.
//! - A question, a line containing only `?` (or `??` for both directions),
//!   and an answer running until the next blank line.
//! - Cloze deletions, `==like this==` or `{{like this}}`, one card per
//!   deletion.
//!
//! Any of these may carry a scheduling tag (see `tag`). Parsing never fails:
//! anything that does not look like a well-formed card is skipped.

use std::collections::VecDeque;
use std::path::Path;

use pulldown_cmark::Event;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;

use crate::tag::SchedulingTag;
use crate::tag::TAG_OPEN;
use crate::tag::strip_tag;
use crate::types::card::CardKind;
use crate::types::card_hash::CardHash;
use crate::types::card_hash::Hasher;

const CLOZE_PLACEHOLDER: &str = "[...]";

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedCard {
    pub kind: CardKind,
    pub question: String,
    pub answer: String,
    /// First line of the block, zero-based.
    pub line_start: usize,
    /// Last line of the block, zero-based and inclusive.
    pub line_end: usize,
    /// Fingerprint of the block's lines with the scheduling tag removed.
    pub checksum: CardHash,
    /// The block's scheduling tag, if it has a valid one.
    pub tag: Option<SchedulingTag>,
}

/// Parse the cards in `text`. `path` is only used in log messages.
///
/// The returned iterator is lazy and cheap to clone. Parsing the same text
/// again yields the same cards.
pub fn parse_cards<'a>(text: &'a str, path: &'a Path) -> ParsedCards<'a> {
    let lines: Vec<&str> = text.split('\n').collect();
    let code = code_lines(text, lines.len());
    ParsedCards {
        path,
        lines,
        code,
        cursor: 0,
        pending: VecDeque::new(),
    }
}

#[derive(Clone)]
pub struct ParsedCards<'a> {
    path: &'a Path,
    lines: Vec<&'a str>,
    /// Whether each line is inside a code block.
    code: Vec<bool>,
    /// The next line to scan.
    cursor: usize,
    /// Cards found but not yet yielded.
    pending: VecDeque<ParsedCard>,
}

impl Iterator for ParsedCards<'_> {
    type Item = ParsedCard;

    fn next(&mut self) -> Option<ParsedCard> {
        loop {
            if let Some(card) = self.pending.pop_front() {
                return Some(card);
            }
            if self.cursor >= self.lines.len() {
                return None;
            }
            self.cursor = self.scan_paragraph(self.cursor);
        }
    }
}

impl<'a> ParsedCards<'a> {
    /// Scan the paragraph starting at `start`, queueing any cards found.
    /// Returns the line to continue from.
    fn scan_paragraph(&mut self, start: usize) -> usize {
        if self.is_boundary(start) {
            return start + 1;
        }
        let end = (start..self.lines.len())
            .find(|&i| self.is_boundary(i))
            .unwrap_or(self.lines.len());
        match (start..end).find(|&i| separator(self.lines[i]).is_some()) {
            Some(sep) => self.scan_multiline(start, sep, end),
            None => {
                for i in start..end {
                    self.scan_line(i);
                }
                end
            }
        }
    }

    fn scan_multiline(&mut self, start: usize, sep: usize, end: usize) -> usize {
        if sep == start {
            log::debug!(
                "{}:{}: separator without a question, skipping.",
                self.path.display(),
                sep + 1
            );
            return end;
        }
        let bidirectional = separator(self.lines[sep]) == Some(Separator::Bidirectional);

        // The answer may begin in the paragraph after the separator.
        let mut first = sep + 1;
        if first == end {
            while first < self.lines.len() && is_blank(self.lines[first]) {
                first += 1;
            }
        }

        let mut last = None;
        let mut i = first;
        while i < self.lines.len() && !self.is_boundary(i) && separator(self.lines[i]).is_none() {
            last = Some(i);
            if self.lines[i].trim_start().starts_with(TAG_OPEN) {
                break;
            }
            i += 1;
        }
        let Some(last) = last else {
            log::debug!(
                "{}:{}: question without an answer, skipping.",
                self.path.display(),
                start + 1
            );
            return end.max(first);
        };

        let mut tag_text = None;
        let question = strip_block(&self.lines[start..sep], &mut tag_text);
        let answer = strip_block(&self.lines[first..=last], &mut tag_text);

        if question.is_empty() || answer.is_empty() {
            log::debug!(
                "{}:{}: empty question or answer, skipping.",
                self.path.display(),
                start + 1
            );
            return last + 1;
        }

        let tag = self.decode_tag(tag_text, start);
        self.push_pair(question, answer, bidirectional, start, last, tag);
        last + 1
    }

    /// Scan a single line for inline and cloze cards.
    fn scan_line(&mut self, index: usize) {
        let (body, tag_text) = strip_tag(self.lines[index].trim());
        let body = body.trim();
        if let Some((front, back)) = body.split_once(":::") {
            let (front, back) = (front.trim(), back.trim());
            if !front.is_empty() && !back.is_empty() {
                let tag = self.decode_tag(tag_text, index);
                self.push_pair(front.to_string(), back.to_string(), true, index, index, tag);
            }
        } else if let Some((question, answer)) = body.split_once("::") {
            let (question, answer) = (question.trim(), answer.trim());
            if !question.is_empty() && !answer.is_empty() {
                let tag = self.decode_tag(tag_text, index);
                self.push_pair(question.to_string(), answer.to_string(), false, index, index, tag);
            }
        } else {
            let deletions = cloze_deletions(body);
            if deletions.is_empty() {
                return;
            }
            let tag = self.decode_tag(tag_text, index);
            let checksum = block_checksum(&self.lines[index..=index]);
            for (start, end) in deletions {
                let answer = body[start + 2..end - 2].trim().to_string();
                let mut question = String::with_capacity(body.len());
                question.push_str(&body[..start]);
                question.push_str(CLOZE_PLACEHOLDER);
                question.push_str(&body[end..]);
                let question = question.replace("==", "").replace("{{", "").replace("}}", "");
                self.pending.push_back(ParsedCard {
                    kind: CardKind::Cloze,
                    question: question.trim().to_string(),
                    answer,
                    line_start: index,
                    line_end: index,
                    checksum,
                    tag: tag.clone(),
                });
            }
        }
    }

    fn push_pair(
        &mut self,
        question: String,
        answer: String,
        bidirectional: bool,
        line_start: usize,
        line_end: usize,
        tag: Option<SchedulingTag>,
    ) {
        let checksum = block_checksum(&self.lines[line_start..=line_end]);
        let reversed = bidirectional.then(|| ParsedCard {
            kind: CardKind::Reversed,
            question: answer.clone(),
            answer: question.clone(),
            line_start,
            line_end,
            checksum,
            tag: tag.clone(),
        });
        self.pending.push_back(ParsedCard {
            kind: CardKind::Basic,
            question,
            answer,
            line_start,
            line_end,
            checksum,
            tag,
        });
        self.pending.extend(reversed);
    }

    fn decode_tag(&self, text: Option<&str>, line: usize) -> Option<SchedulingTag> {
        let text = text?;
        match SchedulingTag::decode(text) {
            Ok(tag) => Some(tag),
            Err(e) => {
                log::warn!(
                    "{}:{}: ignoring scheduling tag: {e}",
                    self.path.display(),
                    line + 1
                );
                None
            }
        }
    }

    /// Blank lines, headings, and code never belong to a card.
    fn is_boundary(&self, index: usize) -> bool {
        let line = self.lines[index];
        self.code[index] || is_blank(line) || line.trim_start().starts_with('#')
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Separator {
    Forward,
    Bidirectional,
}

fn separator(line: &str) -> Option<Separator> {
    match line.trim() {
        "?" => Some(Separator::Forward),
        "??" => Some(Separator::Bidirectional),
        _ => None,
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Join a run of lines into card text, removing the first scheduling tag
/// found into `tag`.
fn strip_block<'a>(lines: &[&'a str], tag: &mut Option<&'a str>) -> String {
    let mut text: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let (rest, found) = strip_tag(line);
        if tag.is_none() {
            *tag = found;
        }
        text.push(rest.trim_end_matches('\r').to_string());
    }
    text.join("\n").trim().to_string()
}

/// Byte spans of the cloze deletions in `line`, delimiters included, in
/// order of appearance.
fn cloze_deletions(line: &str) -> Vec<(usize, usize)> {
    let mut spans = delimited_spans(line, "==", "==");
    spans.extend(delimited_spans(line, "{{", "}}"));
    spans.sort();
    spans
}

fn delimited_spans(line: &str, open: &str, close: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut offset = 0;
    while let Some(start) = line[offset..].find(open) {
        let start = offset + start;
        let inner = start + open.len();
        let Some(length) = line[inner..].find(close) else {
            break;
        };
        let end = inner + length + close.len();
        let text = &line[inner..inner + length];
        if !text.trim().is_empty() && !text.contains(['=', '{', '}']) {
            spans.push((start, end));
            offset = end;
        } else {
            offset = inner;
        }
    }
    spans
}

/// Fingerprint a block of source lines, ignoring any scheduling tag in
/// them and trailing whitespace, so that rewriting the tag does not change
/// the fingerprint.
pub fn block_checksum(lines: &[&str]) -> CardHash {
    let mut hasher = Hasher::new();
    for line in lines {
        let (rest, _) = strip_tag(line);
        hasher.update(rest.trim_end().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize()
}

/// Mark the lines that fall inside fenced or indented code blocks.
fn code_lines(text: &str, line_count: usize) -> Vec<bool> {
    let mut code = vec![false; line_count];
    let line_of = |offset: usize| text[..offset].matches('\n').count();
    for (event, range) in Parser::new(text).into_offset_iter() {
        if let Event::Start(Tag::CodeBlock(_)) = event {
            if range.is_empty() {
                continue;
            }
            let first = line_of(range.start);
            let last = line_of(range.end - 1).min(line_count - 1);
            for flag in &mut code[first..=last] {
                *flag = true;
            }
        }
    }
    code
}
