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

use std::fmt::Display;
use std::fmt::Formatter;

use chrono::Datelike;
use chrono::NaiveDate;
use chrono::TimeDelta;

use crate::error::ErrorReport;
use crate::error::Fallible;

const FORMAT: &str = "%Y-%m-%d";

/// A calendar date, with no time zone.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Date(NaiveDate);

impl Date {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    #[cfg(test)]
    pub fn into_inner(self) -> NaiveDate {
        self.0
    }

    /// Parse a `YYYY-MM-DD` date.
    pub fn parse(s: &str) -> Fallible<Self> {
        NaiveDate::parse_from_str(s, FORMAT)
            .map(Self)
            .map_err(|_| ErrorReport::new(format!("invalid date: {s}")))
    }

    /// Add a (possibly negative) number of days. Saturates at the calendar's
    /// limits instead of overflowing.
    pub fn add_days(self, days: i64) -> Self {
        TimeDelta::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
            .unwrap_or(if days < 0 { Self(NaiveDate::MIN) } else { Self(NaiveDate::MAX) })
    }

    /// Whole days from `earlier` to `self`; negative if `earlier` is later.
    pub fn days_since(self, earlier: Date) -> i64 {
        (self.0 - earlier.0).num_days()
    }

    /// Days since the start of the common era, for seeding.
    pub fn ordinal(self) -> i64 {
        self.0.num_days_from_ce() as i64
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}
