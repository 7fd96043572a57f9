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

//! Streaming scanner for AOF input.
//!
//! Converts a byte stream into a flat sequence of [`Token`]s without buffering
//! more than the current text run. Delimiters are ASCII only:
//!
//! - spaces and tabs form [`TokenKind::Whitespace`] runs
//! - each `\n` is one [`TokenKind::LineEnd`]; `\r` is dropped wherever it occurs
//! - everything else accumulates into a text run, classified on the next boundary
//!
//! The sequence always ends with exactly one [`TokenKind::EndOfInput`] or
//! [`TokenKind::ScanError`], after any pending text run has been flushed.

use crate::token::{Token, TokenKind};
use std::io::{self, BufRead, BufReader, Read};
use tracing::debug;

/// Configuration options for the scanner.
///
/// # Examples
///
/// ```rust
/// use aof_stream::ScannerConfig;
///
/// let config = ScannerConfig::default();
/// assert_eq!(config.buffer_size, 64 * 1024);
/// assert_eq!(config.max_token_length, 1_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Buffer size for reading input.
    ///
    /// Default: 64KB
    pub buffer_size: usize,

    /// Maximum length of a single text run in bytes.
    ///
    /// A longer run ends the token stream with a [`TokenKind::ScanError`]. This
    /// bounds memory use on inputs that never produce a delimiter.
    ///
    /// Default: 1,000,000 bytes
    pub max_token_length: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,
            max_token_length: 1_000_000,
        }
    }
}

/// Pull-based tokenizer over any [`Read`] source.
///
/// # Examples
///
/// ```rust
/// use aof_stream::{Scanner, TokenKind};
/// use std::io::Cursor;
///
/// let kinds: Vec<_> = Scanner::new(Cursor::new("SET key1 +4\r\n"))
///     .map(|token| token.kind)
///     .collect();
///
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::Text,
///         TokenKind::Whitespace,
///         TokenKind::Text,
///         TokenKind::Whitespace,
///         TokenKind::Number,
///         TokenKind::LineEnd,
///         TokenKind::EndOfInput,
///     ]
/// );
/// ```
pub struct Scanner<R: Read> {
    reader: BufReader<R>,
    config: ScannerConfig,
    text: Vec<u8>,
    /// Terminal token held back while a text run is flushed first.
    pending: Option<Token>,
    finished: bool,
}

impl<R: Read> Scanner<R> {
    /// Create a scanner with default configuration.
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, ScannerConfig::default())
    }

    /// Create a scanner with custom configuration.
    pub fn with_config(reader: R, config: ScannerConfig) -> Self {
        Self {
            reader: BufReader::with_capacity(config.buffer_size.max(1), reader),
            config,
            text: Vec::new(),
            pending: None,
            finished: false,
        }
    }

    /// Returns `true` once the terminal token has been handed out.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_none()
    }

    /// Scan the next token, or `None` after the terminal token.
    pub fn next_token(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.take() {
            self.finished = true;
            return Some(token);
        }
        if self.finished {
            return None;
        }

        loop {
            let byte = match self.peek_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => return Some(self.finish(Token::bare(TokenKind::EndOfInput))),
                Err(e) => {
                    debug!(error = %e, "input read failed");
                    return Some(self.finish(Token::scan_error(e.to_string())));
                }
            };

            match byte {
                b' ' | b'\t' => {
                    if !self.text.is_empty() {
                        return Some(self.take_word());
                    }
                    return Some(self.scan_whitespace());
                }
                b'\n' => {
                    if !self.text.is_empty() {
                        return Some(self.take_word());
                    }
                    self.reader.consume(1);
                    return Some(Token::bare(TokenKind::LineEnd));
                }
                b'\r' => {
                    if !self.text.is_empty() {
                        return Some(self.take_word());
                    }
                    self.reader.consume(1);
                }
                _ => {
                    if let Err(e) = self.scan_word_chunk() {
                        return Some(self.finish(Token::scan_error(e.to_string())));
                    }
                    if self.text.len() > self.config.max_token_length {
                        self.text.clear();
                        self.finished = true;
                        return Some(Token::scan_error(format!(
                            "token exceeds maximum length of {} bytes",
                            self.config.max_token_length
                        )));
                    }
                }
            }
        }
    }

    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Move every non-delimiter byte currently buffered into the text run.
    fn scan_word_chunk(&mut self) -> io::Result<()> {
        let buf = loop {
            match self.reader.fill_buf() {
                Ok(buf) => break buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        let len = buf
            .iter()
            .position(|&b| is_delimiter(b))
            .unwrap_or(buf.len());
        self.text.extend_from_slice(&buf[..len]);
        self.reader.consume(len);
        Ok(())
    }

    fn scan_whitespace(&mut self) -> Token {
        loop {
            match self.peek_byte() {
                Ok(Some(b' ' | b'\t')) => self.reader.consume(1),
                Ok(_) => break,
                Err(e) => {
                    debug!(error = %e, "input read failed");
                    self.pending = Some(Token::scan_error(e.to_string()));
                    break;
                }
            }
        }
        Token::bare(TokenKind::Whitespace)
    }

    fn take_word(&mut self) -> Token {
        let bytes = std::mem::take(&mut self.text);
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Token::word(text)
    }

    fn finish(&mut self, terminal: Token) -> Token {
        if self.text.is_empty() {
            self.finished = true;
            terminal
        } else {
            self.pending = Some(terminal);
            self.take_word()
        }
    }
}

impl<R: Read> Iterator for Scanner<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[inline]
fn is_delimiter(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}
