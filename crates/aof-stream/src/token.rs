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

//! Lexical tokens produced by the [`Scanner`](crate::Scanner).

use std::fmt;

/// Classification of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A run of spaces and tabs. Carries no text.
    Whitespace,
    /// A text run that parses as a signed 64-bit integer (`42`, `-7`, `+4`).
    Number,
    /// Any other text run.
    Text,
    /// A line feed. Carriage returns never produce a token.
    LineEnd,
    /// Clean end of the input.
    EndOfInput,
    /// The input could not be read; the token text holds the cause.
    ScanError,
}

impl TokenKind {
    /// Returns `true` for the kinds that end a token stream.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::EndOfInput | Self::ScanError)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Whitespace => "whitespace",
            Self::Number => "number",
            Self::Text => "text",
            Self::LineEnd => "line end",
            Self::EndOfInput => "end of input",
            Self::ScanError => "scan error",
        };
        f.write_str(name)
    }
}

/// A classified lexical unit with its raw text.
///
/// `text` is empty for [`TokenKind::Whitespace`], [`TokenKind::LineEnd`] and
/// [`TokenKind::EndOfInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token classification.
    pub kind: TokenKind,
    /// Raw text of the token.
    pub text: String,
}

impl Token {
    /// Classify a text run as [`TokenKind::Number`] or [`TokenKind::Text`].
    ///
    /// ```rust
    /// use aof_stream::{Token, TokenKind};
    ///
    /// assert_eq!(Token::word("+4").kind, TokenKind::Number);
    /// assert_eq!(Token::word("-12").kind, TokenKind::Number);
    /// assert_eq!(Token::word("+VALUE").kind, TokenKind::Text);
    /// ```
    pub fn word(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = if text.parse::<i64>().is_ok() {
            TokenKind::Number
        } else {
            TokenKind::Text
        };
        Self { kind, text }
    }

    pub(crate) fn bare(kind: TokenKind) -> Self {
        Self {
            kind,
            text: String::new(),
        }
    }

    pub(crate) fn scan_error(message: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::ScanError,
            text: message.into(),
        }
    }

    /// Interpret the token text as a signed 64-bit integer.
    ///
    /// Only meaningful for [`TokenKind::Number`] tokens.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        self.text.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_classification() {
        assert_eq!(Token::word("0").kind, TokenKind::Number);
        assert_eq!(Token::word("1000").kind, TokenKind::Number);
        assert_eq!(Token::word("-1").kind, TokenKind::Number);
        assert_eq!(Token::word("+4").kind, TokenKind::Number);
        assert_eq!(Token::word("key1").kind, TokenKind::Text);
        assert_eq!(Token::word("+").kind, TokenKind::Text);
        assert_eq!(Token::word("1_000").kind, TokenKind::Text);
        assert_eq!(Token::word("0x10").kind, TokenKind::Text);
    }

    #[test]
    fn test_word_out_of_range_is_text() {
        assert_eq!(Token::word("9223372036854775807").kind, TokenKind::Number);
        assert_eq!(Token::word("9223372036854775808").kind, TokenKind::Text);
        assert_eq!(Token::word("-9223372036854775808").kind, TokenKind::Number);
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(Token::word("+4").as_i64(), Some(4));
        assert_eq!(Token::word("-4").as_i64(), Some(-4));
        assert_eq!(Token::word("abc").as_i64(), None);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TokenKind::Text.to_string(), "text");
        assert_eq!(TokenKind::Number.to_string(), "number");
        assert_eq!(TokenKind::LineEnd.to_string(), "line end");
        assert_eq!(TokenKind::EndOfInput.to_string(), "end of input");
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(TokenKind::EndOfInput.is_terminal());
        assert!(TokenKind::ScanError.is_terminal());
        assert!(!TokenKind::LineEnd.is_terminal());
        assert!(!TokenKind::Whitespace.is_terminal());
    }
}
