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

//! Structured error types for the aofcompact CLI.
//!
//! Every failure maps to one message on stderr and one process exit code.

use aof_stream::{ParseError, StreamError};
use thiserror::Error;

/// The main error type for aofcompact.
///
/// # Examples
///
/// ```rust
/// use aof_cli::error::CliError;
///
/// let err = CliError::open("missing.aof", "No such file or directory");
/// assert_eq!(err.to_string(), "Cannot open 'missing.aof' file");
/// assert_eq!(err.exit_code(), 1);
/// ```
#[derive(Error, Debug, Clone)]
pub enum CliError {
    /// No input was named and stdin is a terminal.
    #[error("no input file given and standard input is a terminal")]
    Usage,

    /// The input file could not be opened.
    #[error("Cannot open '{path}' file")]
    Open {
        /// The path as given on the command line
        path: String,
        /// The underlying error message
        message: String,
    },

    /// The log is malformed.
    #[error("Cannot parse input: {0}")]
    Parse(ParseError),

    /// The run was cancelled before the log was fully processed.
    #[error("Processing cancelled")]
    Cancelled,

    /// Compacted output could not be written.
    #[error("Cannot write output: {0}")]
    Write(String),

    /// A processing stage could not be started.
    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Create an open error for `path`.
    pub fn open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage => 255,
            Self::Parse(_) => 2,
            Self::Open { .. } | Self::Cancelled | Self::Write(_) | Self::Io(_) => 1,
        }
    }
}

impl From<StreamError> for CliError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Parse(err) => Self::Parse(err),
            StreamError::Cancelled => Self::Cancelled,
            StreamError::Io(err) => Self::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aof_stream::ParseErrorKind;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Usage.exit_code(), 255);
        assert_eq!(CliError::open("f", "gone").exit_code(), 1);
        assert_eq!(CliError::Cancelled.exit_code(), 1);
        assert_eq!(CliError::Write("pipe".into()).exit_code(), 1);
        let parse = ParseError::new(3, ParseErrorKind::UnknownAction("X".into()));
        assert_eq!(CliError::Parse(parse).exit_code(), 2);
    }

    #[test]
    fn test_parse_message() {
        let parse = ParseError::new(3, ParseErrorKind::UnknownAction("X".into()));
        assert_eq!(
            CliError::Parse(parse).to_string(),
            "Cannot parse input: error at line 3: unknown action: X"
        );
    }

    #[test]
    fn test_from_stream_error() {
        assert!(matches!(
            CliError::from(StreamError::Cancelled),
            CliError::Cancelled
        ));
        let io = std::io::Error::other("spawn failed");
        assert_eq!(
            CliError::from(StreamError::Io(io)).to_string(),
            "I/O error: spawn failed"
        );
    }
}
