// AOF Compactor - Streaming append-only log compaction
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command-line arguments and input selection.

use crate::error::CliError;
use aof_stream::ScannerConfig;
use clap::Parser;
use std::fs::File;
use std::io::{self, IsTerminal, Read};

/// aofcompact - compact an append-only mutation log
///
/// Reads an AOF log from FILE or standard input and writes one line per touched
/// key to standard output: `CREATE <key> <value>` for keys that end live and
/// `DELETE <key>` for keys that end deleted, in the order their final mutations
/// appear.
///
/// # Examples
///
/// ```bash
/// # Compact a file
/// aofcompact mutations.aof > compacted.aof
///
/// # Compact a stream
/// cat mutations.aof | aofcompact
///
/// # Validate only
/// aofcompact --check mutations.aof
/// ```
#[derive(Parser, Debug, Clone)]
#[command(name = "aofcompact")]
#[command(author, version, about = "Compact AOF [FILE] or standard input to standard output", long_about = None)]
pub struct Cli {
    /// Input log; `-` reads standard input
    #[arg(value_name = "FILE")]
    pub file: Option<String>,

    /// Validate only, print nothing on success
    #[arg(long)]
    pub check: bool,

    /// Read buffer size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 64 * 1024)]
    pub buffer_size: usize,

    /// Maximum length of a single key or number in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 1_000_000)]
    pub max_token_length: usize,
}

/// Where the log comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(String),
}

impl Input {
    /// Human-readable name for log messages.
    pub fn name(&self) -> &str {
        match self {
            Self::Stdin => "<stdin>",
            Self::File(path) => path,
        }
    }

    /// Open the input for reading.
    pub fn open(&self) -> Result<Box<dyn Read + Send>, CliError> {
        match self {
            Self::Stdin => Ok(Box::new(io::stdin())),
            Self::File(path) => File::open(path)
                .map(|file| Box::new(file) as Box<dyn Read + Send>)
                .map_err(|e| CliError::open(path, e.to_string())),
        }
    }
}

impl Cli {
    /// Pick the input: a named file, `-` for stdin, or piped stdin.
    pub fn input(&self) -> Result<Input, CliError> {
        select_input(self.file.as_deref(), io::stdin().is_terminal())
    }

    /// Scanner configuration from the command line.
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            buffer_size: self.buffer_size,
            max_token_length: self.max_token_length,
        }
    }
}

/// Exit code for a failed argument parse.
///
/// Help and version requests exit successfully; malformed arguments are usage
/// errors.
pub fn arg_error_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        CliError::Usage.exit_code()
    } else {
        0
    }
}

fn select_input(file: Option<&str>, stdin_is_terminal: bool) -> Result<Input, CliError> {
    match file {
        Some("-") => Ok(Input::Stdin),
        Some(path) => Ok(Input::File(path.to_string())),
        None if stdin_is_terminal => Err(CliError::Usage),
        None => Ok(Input::Stdin),
    }
}
