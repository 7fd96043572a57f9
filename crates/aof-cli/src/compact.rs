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

//! Compaction command - stream a log through the pipeline into a writer

use crate::cli::{Cli, Input};
use crate::error::CliError;
use aof_stream::{Compactor, Pipeline, ScannerConfig};
use std::io::{self, BufWriter, Read, Write};
use tracing::{debug, info};

/// Options for one compaction run.
#[derive(Debug, Clone, Default)]
pub struct CompactOptions {
    /// Validate only; write nothing.
    pub check: bool,
    /// Scanner configuration.
    pub scanner: ScannerConfig,
}

/// Compact `reader` into `out`, one line per final record.
///
/// Records are written as soon as they are known, so on a parse error `out`
/// already holds every record that preceded it. Returns the number of records.
///
/// # Examples
///
/// ```rust
/// use aof_cli::compact::{compact, CompactOptions};
/// use std::io::Cursor;
///
/// let mut out = Vec::new();
/// let input = "1\nk 1\nCREATE k 1\nMODIFY k +1\n";
/// let count = compact(Cursor::new(input), &mut out, &CompactOptions::default()).unwrap();
///
/// assert_eq!(count, 1);
/// assert_eq!(String::from_utf8(out).unwrap(), "CREATE k 2\n");
/// ```
pub fn compact<R, W>(reader: R, mut out: W, options: &CompactOptions) -> Result<usize, CliError>
where
    R: Read + Send + 'static,
    W: Write,
{
    let pipeline = Pipeline::with_config(reader, options.scanner.clone())?;

    let mut count = 0;
    for record in Compactor::new(pipeline) {
        let record = record?;
        count += 1;
        if !options.check {
            writeln!(out, "{}", record).map_err(|e| CliError::Write(e.to_string()))?;
        }
    }
    Ok(count)
}

/// Run the command line: select the input, compact it to stdout.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let input = cli.input()?;
    let options = CompactOptions {
        check: cli.check,
        scanner: cli.scanner_config(),
    };
    run_input(&input, &options)
}

fn run_input(input: &Input, options: &CompactOptions) -> Result<(), CliError> {
    let reader = input.open()?;
    debug!(input = input.name(), check = options.check, "compacting");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = compact(reader, &mut out, options);

    // Whatever was compacted before a failure still reaches stdout.
    let flushed = out.flush().map_err(|e| CliError::Write(e.to_string()));
    let count = result?;
    flushed?;

    info!(input = input.name(), records = count, "compaction finished");
    Ok(())
}
