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

//! aofcompact command line interface
//!
//! # Usage
//!
//! ```bash
//! aofcompact mutations.aof
//!
//! # With debug logging
//! RUST_LOG=aof_cli=debug,aof_stream=debug aofcompact mutations.aof
//! ```

use aof_cli::cli::{arg_error_exit_code, Cli};
use aof_cli::compact::run;
use aof_cli::error::CliError;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "aof_cli=warn";

fn main() -> ExitCode {
    // Initialize logging to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if let Err(e) = err.print() {
                tracing::warn!(error = %e, "cannot print argument error");
            }
            return ExitCode::from(arg_error_exit_code(&err));
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage) => {
            if let Err(e) = Cli::command().print_help() {
                tracing::warn!(error = %e, "cannot print usage");
            }
            ExitCode::from(CliError::Usage.exit_code())
        }
        Err(e) => {
            tracing::debug!(error = ?e, "run failed");
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
