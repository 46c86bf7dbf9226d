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

use clap::Parser;

use crate::cmd::check::check_collection;
use crate::cmd::drill::drill;
use crate::cmd::stats::StatsFormat;
use crate::cmd::stats::print_stats;
use crate::error::Fallible;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Check that every card in a collection parses.
    Check {
        /// Path to the collection directory. By default, the current directory is used.
        directory: Option<String>,
    },
    /// Print collection statistics.
    Stats {
        /// Path to the collection directory. By default, the current directory is used.
        directory: Option<String>,
        /// Which output format to use.
        #[arg(long, default_value_t = StatsFormat::Text)]
        format: StatsFormat,
    },
    /// Drill the cards due today in the terminal.
    Drill {
        /// Path to the collection directory. By default, the current directory is used.
        directory: Option<String>,
        /// Target probability of recall, overriding the configuration file.
        #[arg(long)]
        retention: Option<f64>,
        /// Don't randomize intervals.
        #[arg(long)]
        no_fuzz: bool,
        /// Maximum number of cards to drill.
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Check { directory } => check_collection(directory).await,
        Command::Stats { directory, format } => print_stats(directory, format).await,
        Command::Drill {
            directory,
            retention,
            no_fuzz,
            limit,
        } => drill(directory, retention, no_fuzz, limit).await,
    }
}
