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

use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::error::Fallible;
use crate::scheduler::DEFAULT_RETENTION;
use crate::scheduler::SchedulerOptions;
use crate::scheduler::clamp_retention;

/// The optional configuration file at the root of a collection.
pub const CONFIG_FILE: &str = "vaultcards.toml";

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The probability of recall to schedule reviews for.
    pub desired_retention: f64,
    /// Whether to spread out reviews by randomizing intervals a little.
    pub fuzz: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            desired_retention: DEFAULT_RETENTION,
            fuzz: true,
        }
    }
}

impl Config {
    /// Load the configuration file in `directory`, or the defaults if there
    /// isn't one.
    pub fn load(directory: &Path) -> Fallible<Self> {
        let path = directory.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = read_to_string(&path)?;
        let config = Self::parse(&text)?;
        log::debug!("Loaded configuration from {}.", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Fallible<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Scheduler options from this configuration, with command-line
    /// overrides applied.
    pub fn scheduler_options(&self, retention: Option<f64>, no_fuzz: bool) -> SchedulerOptions {
        let requested = retention.unwrap_or(self.desired_retention);
        let clamped = clamp_retention(requested);
        if clamped != requested {
            log::warn!("Desired retention {requested} is out of range, using {clamped}.");
        }
        SchedulerOptions::new(clamped, self.fuzz && !no_fuzz)
    }
}
