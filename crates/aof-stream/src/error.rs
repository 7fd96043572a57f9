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

//! Error types for the AOF stream.
//!
//! Every data problem is reported as a single terminal [`ParseError`] carrying
//! the 1-based input line (header and body lines counted continuously) and a
//! [`ParseErrorKind`] naming the cause. Caller-initiated shutdown is never an
//! error of the data; it surfaces as [`StreamError::Cancelled`] at the API
//! boundaries that return `Result`.
//!
//! # Examples
//!
//! ```rust
//! use aof_stream::{Event, Validator};
//! use std::io::Cursor;
//!
//! let input = "1\nkey1 1\nCREATE key1 1\nMODIFY key1 +VALUE\n";
//!
//! let last = Validator::from_reader(Cursor::new(input)).last().unwrap();
//! if let Event::ParseError(err) = last {
//!     assert_eq!(err.line, 4);
//!     assert_eq!(
//!         err.to_string(),
//!         "error at line 4: unexpected token: text, expected number"
//!     );
//! }
//! ```

use crate::token::TokenKind;
use thiserror::Error;

/// Cause of a [`ParseError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The next significant token was not of an accepted kind.
    #[error("unexpected token: {actual}, expected {}", describe_expected(.expected))]
    UnexpectedToken {
        actual: TokenKind,
        expected: &'static [TokenKind],
    },

    /// Body line started with something other than CREATE/DELETE/MODIFY/SET.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// MODIFY operand without a leading `+` or `-`.
    #[error("unknown MODIFY operator: {0}")]
    UnknownModifyOperator(String),

    /// Body references a key the header never declared.
    #[error("key '{0}' was not defined in the header")]
    UndeclaredKey(String),

    /// CREATE of a key that is live.
    #[error("key '{0}' has already been created")]
    AlreadyCreated(String),

    /// SET, MODIFY or DELETE of a key that was never created.
    #[error("key '{0}' was not created")]
    NotCreated(String),

    /// DELETE of a key that is already deleted.
    #[error("key '{0}' has been deleted")]
    AlreadyDeleted(String),

    /// Input ended before the last declared body line.
    #[error("unexpected end of input, expected at least {missing} line(s)")]
    UnexpectedEnd { missing: i64 },

    /// A MODIFY delta overflowed the 64-bit value.
    #[error("MODIFY of key '{0}' overflows a 64-bit value")]
    Overflow(String),

    /// The input could not be read, or a text run exceeded the maximum length.
    #[error("scan failure: {0}")]
    Scan(String),
}

fn describe_expected(expected: &[TokenKind]) -> String {
    match expected {
        [single] => single.to_string(),
        many => {
            let names: Vec<String> = many.iter().map(ToString::to_string).collect();
            format!("one of {}", names.join(", "))
        }
    }
}

/// Terminal parse failure with its input line.
///
/// # Examples
///
/// ```rust
/// use aof_stream::{ParseError, ParseErrorKind};
///
/// let err = ParseError::new(3, ParseErrorKind::UnknownAction("ACTION".into()));
/// assert_eq!(err.to_string(), "error at line 3: unknown action: ACTION");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("error at line {line}: {kind}")]
pub struct ParseError {
    /// 1-based input line.
    pub line: usize,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// Create a parse error.
    #[inline]
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

/// Errors surfaced by the `Result`-returning parts of the crate.
#[derive(Error, Debug)]
pub enum StreamError {
    /// IO error, e.g. when a pipeline stage cannot be started.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The log is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The run was cancelled by the caller.
    #[error("stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// Get the line number if available.
    #[inline]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse(err) => Some(err.line),
            _ => None,
        }
    }
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
