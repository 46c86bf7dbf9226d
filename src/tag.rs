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

//! The scheduling metadata tag stored next to a card in its markdown file:
//!
//! ```text
//! <!--SR:!2026-02-15,7,250,5.12,6.93,reviews=3,reps=2,lapses=1,state=review,last=2026-02-08-->
//! ```
//!
//! The positional fields are the due date, the interval in days, the legacy
//! ease, and optionally the FSRS difficulty and stability. Everything after
//! that is `key=value` pairs. Tags written by older versions carry only the
//! first three (or five) fields.

use std::ops::Range;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::fsrs::Difficulty;
use crate::fsrs::Stability;
use crate::types::card::CardState;
use crate::types::date::Date;

pub const TAG_OPEN: &str = "<!--SR:";
pub const TAG_CLOSE: &str = "-->";

#[derive(Clone, Debug, PartialEq)]
pub struct SchedulingTag {
    pub due: Date,
    pub interval: u32,
    pub ease: u32,
    pub difficulty: Option<Difficulty>,
    pub stability: Option<Stability>,
    pub reviews: Option<u32>,
    pub reps: Option<u32>,
    pub lapses: Option<u32>,
    pub state: Option<CardState>,
    pub last: Option<Date>,
}

impl SchedulingTag {
    /// A tag carrying only the legacy fields.
    pub fn legacy(due: Date, interval: u32, ease: u32) -> Self {
        Self {
            due,
            interval,
            ease,
            difficulty: None,
            stability: None,
            reviews: None,
            reps: None,
            lapses: None,
            state: None,
            last: None,
        }
    }

    /// Decode a complete tag, including the `<!--SR:` and `-->` delimiters.
    pub fn decode(text: &str) -> Fallible<Self> {
        let body = text
            .trim()
            .strip_prefix(TAG_OPEN)
            .and_then(|s| s.strip_suffix(TAG_CLOSE))
            .ok_or_else(|| ErrorReport::new(format!("not a scheduling tag: {text}")))?;
        let body = body
            .trim()
            .strip_prefix('!')
            .ok_or_else(|| ErrorReport::new(format!("scheduling tag has no due date: {text}")))?;
        let mut fields = body.split(',').map(str::trim);
        let due = Date::parse(fields.next().unwrap_or_default())?;

        let mut positional: Vec<&str> = Vec::new();
        let mut tag = SchedulingTag::legacy(due, 0, 0);
        for field in fields {
            match field.split_once('=') {
                Some((key, value)) => tag.decode_pair(key.trim(), value.trim())?,
                None => positional.push(field),
            }
        }

        match positional.as_slice() {
            [interval, ease] => {
                tag.interval = parse_count(interval)?;
                tag.ease = parse_count(ease)?;
            }
            [interval, ease, difficulty, stability] => {
                tag.interval = parse_count(interval)?;
                tag.ease = parse_count(ease)?;
                tag.difficulty = Some(parse_real(difficulty)?);
                tag.stability = Some(parse_real(stability)?);
            }
            _ => {
                return fail(format!("wrong number of fields in scheduling tag: {text}"));
            }
        }
        Ok(tag)
    }

    fn decode_pair(&mut self, key: &str, value: &str) -> Fallible<()> {
        match key {
            "reviews" => self.reviews = Some(parse_count(value)?),
            "reps" => self.reps = Some(parse_count(value)?),
            "lapses" => self.lapses = Some(parse_count(value)?),
            "state" => self.state = Some(CardState::try_from(value)?),
            "last" => self.last = Some(Date::parse(value)?),
            _ => {
                log::debug!("Ignoring unknown scheduling tag key: {key}");
            }
        }
        Ok(())
    }

    pub fn encode(&self) -> String {
        let mut out = format!("{TAG_OPEN}!{},{},{}", self.due, self.interval, self.ease);
        if let (Some(difficulty), Some(stability)) = (self.difficulty, self.stability) {
            out.push_str(&format!(",{difficulty:.2},{stability:.2}"));
        }
        if let Some(reviews) = self.reviews {
            out.push_str(&format!(",reviews={reviews}"));
        }
        if let Some(reps) = self.reps {
            out.push_str(&format!(",reps={reps}"));
        }
        if let Some(lapses) = self.lapses {
            out.push_str(&format!(",lapses={lapses}"));
        }
        if let Some(state) = self.state {
            out.push_str(&format!(",state={}", state.as_str()));
        }
        if let Some(last) = self.last {
            out.push_str(&format!(",last={last}"));
        }
        out.push_str(TAG_CLOSE);
        out
    }
}

/// The byte span of the first scheduling tag in `line`, if any.
pub fn find_tag(line: &str) -> Option<Range<usize>> {
    let start = line.find(TAG_OPEN)?;
    let after_open = start + TAG_OPEN.len();
    let close = line[after_open..].find(TAG_CLOSE)?;
    Some(start..after_open + close + TAG_CLOSE.len())
}

/// Split the first scheduling tag off `line`. Returns the line without the
/// tag, and the tag's text.
pub fn strip_tag(line: &str) -> (String, Option<&str>) {
    match find_tag(line) {
        Some(span) => {
            let mut rest = String::with_capacity(line.len() - span.len());
            rest.push_str(&line[..span.start]);
            rest.push_str(&line[span.end..]);
            (rest, Some(&line[span]))
        }
        None => (line.to_string(), None),
    }
}

fn parse_count(s: &str) -> Fallible<u32> {
    s.parse::<u32>()
        .map_err(|_| ErrorReport::new(format!("invalid count in scheduling tag: {s}")))
}

fn parse_real(s: &str) -> Fallible<f64> {
    match s.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => fail(format!("invalid number in scheduling tag: {s}")),
    }
}
