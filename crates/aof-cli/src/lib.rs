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

//! aofcompact CLI library.
//!
//! Argument parsing, input selection and the compaction command behind the
//! `aofcompact` binary. The heavy lifting happens in [`aof_stream`]; this crate
//! wires a [`aof_stream::Pipeline`] to stdout and maps failures to exit codes.
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0    | Log compacted (or validated with `--check`) |
//! | 1    | Input could not be opened, output could not be written, or the run was cancelled |
//! | 2    | Input is not a valid AOF log |
//! | 255  | Malformed arguments, or no input given while stdin is a terminal |
//!
//! # Examples
//!
//! ```no_run
//! use aof_cli::cli::Cli;
//! use aof_cli::compact::run;
//! use clap::Parser;
//!
//! let cli = Cli::parse_from(["aofcompact", "mutations.aof"]);
//! if let Err(err) = run(&cli) {
//!     eprintln!("{}", err);
//!     std::process::exit(i32::from(err.exit_code()));
//! }
//! ```

pub mod cli;
pub mod compact;
pub mod error;
