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

//! Validating state machine for AOF logs.
//!
//! The [`Validator`] pulls tokens, enforces the header/body grammar and the
//! per-key lifecycle, and yields one [`Event`] per body line. It never buffers
//! the body: the header promises, for every key, the index of the body line that
//! mutates it last, so each event can be flagged final the moment it is seen.
//!
//! # Grammar
//!
//! ```text
//! <count>
//! <key> <last-line>             x count
//! <ACTION> <key> [<operand>]    x (max(last-line) + 1)
//! ```
//!
//! Body lines are indexed from 0. Error lines are 1-based and counted across
//! header and body.
//!
//! # Basic Usage
//!
//! ```rust
//! use aof_stream::{Event, Validator};
//! use std::io::Cursor;
//!
//! let input = "1\nkey1 0\nCREATE key1 1000\n";
//!
//! let events: Vec<Event> = Validator::from_reader(Cursor::new(input)).collect();
//! assert_eq!(events.len(), 3);
//! assert!(matches!(events[0], Event::HeaderParsed(_)));
//! assert!(events[1].is_final());
//! assert_eq!(events[2], Event::Completed);
//! ```

use crate::error::{ParseError, ParseErrorKind};
use crate::event::{Action, Event, HeaderInfo, Mutation};
use crate::handoff::CancelToken;
use crate::scanner::{Scanner, ScannerConfig};
use crate::token::{Token, TokenKind};
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, trace};

const KEY: &[TokenKind] = &[TokenKind::Text, TokenKind::Number];
const NUMBER: &[TokenKind] = &[TokenKind::Number];
const ACTION: &[TokenKind] = &[TokenKind::Text];
const LINE_END: &[TokenKind] = &[TokenKind::LineEnd];
const NEXT_LINE: &[TokenKind] = &[TokenKind::LineEnd, TokenKind::EndOfInput];

/// Per-key value state. Present only once a key has been created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ValueState {
    value: i64,
    deleted: bool,
}

/// Parser states between two events.
#[derive(Debug)]
enum State {
    HeaderCount,
    HeaderEntries { declared: usize, remaining: i64 },
    BodyAction,
    BodyKey(Action),
    BodyOperand(Action, String),
    EmitBody(Action, String, i64),
    BodyLineAdvance,
    Done,
}

/// Why the machine stopped without an event of its own.
enum Halt {
    Error(ParseErrorKind),
    Cancelled,
}

impl From<ParseErrorKind> for Halt {
    fn from(kind: ParseErrorKind) -> Self {
        Self::Error(kind)
    }
}

type Step = Result<(State, Option<Event>), Halt>;

/// Streaming AOF validator.
///
/// Implements `Iterator<Item = Event>`; iteration ends right after the terminal
/// event (`Completed`, `ParseError` or `Cancelled`). The header mapping, value
/// states and line counters live only as long as the validator.
///
/// If the token source runs dry before a terminal token, or the attached
/// [`CancelToken`] fires, the run ends with [`Event::Cancelled`].
///
/// # Examples
///
/// ## Compacting by Hand
///
/// ```rust
/// use aof_stream::{Event, Validator};
/// use std::io::Cursor;
///
/// let input = "2\nk1 1\nk2 2\nCREATE k1 5\nMODIFY k1 -2\nCREATE k2 9\n";
///
/// let finals: Vec<String> = Validator::from_reader(Cursor::new(input))
///     .filter_map(|event| event.mutation().filter(|m| m.is_final).cloned())
///     .map(|m| format!("{}={}", m.key, m.value))
///     .collect();
///
/// assert_eq!(finals, vec!["k1=3", "k2=9"]);
/// ```
///
/// ## From Pre-scanned Tokens
///
/// ```rust
/// use aof_stream::{Event, Scanner, Validator};
/// use std::io::Cursor;
///
/// let tokens: Vec<_> = Scanner::new(Cursor::new("0")).collect();
/// let events: Vec<_> = Validator::new(tokens.into_iter()).collect();
/// assert_eq!(events, vec![Event::Completed]);
/// ```
pub struct Validator<I: Iterator<Item = Token>> {
    tokens: I,
    cancel: CancelToken,
    state: State,
    headers: HashMap<String, i64>,
    values: HashMap<String, ValueState>,
    header_lines: usize,
    body_line: i64,
    last_body_line: i64,
}

impl<R: Read> Validator<Scanner<R>> {
    /// Validate a reader with a default [`Scanner`].
    pub fn from_reader(reader: R) -> Self {
        Self::new(Scanner::new(reader))
    }

    /// Validate a reader with a configured [`Scanner`].
    pub fn from_reader_with_config(reader: R, config: ScannerConfig) -> Self {
        Self::new(Scanner::with_config(reader, config))
    }
}

impl<I: Iterator<Item = Token>> Validator<I> {
    /// Create a validator over a token source.
    pub fn new(tokens: I) -> Self {
        Self::with_cancel(tokens, CancelToken::new())
    }

    /// Create a validator that stops with [`Event::Cancelled`] once `cancel` fires.
    pub fn with_cancel(tokens: I, cancel: CancelToken) -> Self {
        Self {
            tokens,
            cancel,
            state: State::HeaderCount,
            headers: HashMap::new(),
            values: HashMap::new(),
            header_lines: 0,
            body_line: 0,
            last_body_line: 0,
        }
    }

    /// Token observed for cancellation.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns `true` once the terminal event has been yielded.
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Current 1-based input line.
    #[inline]
    pub fn line(&self) -> usize {
        let body = usize::try_from(self.body_line).unwrap_or(usize::MAX);
        self.header_lines.saturating_add(body).saturating_add(1)
    }

    /// Advance the machine to its next event.
    ///
    /// Returns `None` after the terminal event.
    pub fn next_event(&mut self) -> Option<Event> {
        loop {
            let state = std::mem::replace(&mut self.state, State::Done);
            if matches!(state, State::Done) {
                return None;
            }

            match self.step(state) {
                Ok((next, event)) => {
                    self.state = next;
                    if let Some(event) = event {
                        return Some(event);
                    }
                }
                Err(Halt::Error(kind)) => {
                    let err = ParseError::new(self.line(), kind);
                    debug!(%err, "log rejected");
                    return Some(Event::ParseError(err));
                }
                Err(Halt::Cancelled) => {
                    debug!(line = self.line(), "validation cancelled");
                    return Some(Event::Cancelled);
                }
            }
        }
    }

    fn step(&mut self, state: State) -> Step {
        match state {
            State::HeaderCount => self.header_count(),
            State::HeaderEntries {
                declared,
                remaining,
            } => self.header_entries(declared, remaining),
            State::BodyAction => self.body_action(),
            State::BodyKey(action) => self.body_key(action),
            State::BodyOperand(action, key) => self.body_operand(action, key),
            State::EmitBody(action, key, operand) => self.emit_body(action, key, operand),
            State::BodyLineAdvance => self.body_line_advance(),
            State::Done => Ok((State::Done, None)),
        }
    }

    fn header_count(&mut self) -> Step {
        let count = self.expect_number()?;
        if count <= 0 {
            debug!(count, "empty header, nothing to compact");
            return Ok((State::Done, Some(Event::Completed)));
        }
        self.expect(LINE_END)?;
        self.header_lines += 1;

        let declared = usize::try_from(count).unwrap_or(usize::MAX);
        Ok((
            State::HeaderEntries {
                declared,
                remaining: count,
            },
            None,
        ))
    }

    fn header_entries(&mut self, declared: usize, mut remaining: i64) -> Step {
        while remaining > 0 {
            let key = self.expect(KEY)?.text;
            let last_line = self.expect_number()?;
            // Later declarations of the same key replace earlier ones.
            self.headers.insert(key, last_line);
            self.last_body_line = self.last_body_line.max(last_line);
            self.expect(LINE_END)?;
            self.header_lines += 1;
            remaining -= 1;
        }

        let info = HeaderInfo {
            declared,
            keys: self.headers.len(),
            last_body_line: self.last_body_line,
        };
        debug!(
            declared = info.declared,
            keys = info.keys,
            last_body_line = info.last_body_line,
            "header parsed"
        );
        Ok((State::BodyAction, Some(Event::HeaderParsed(info))))
    }

    fn body_action(&mut self) -> Step {
        let raw = self.expect(ACTION)?.text;
        let action = raw
            .parse::<Action>()
            .map_err(|()| ParseErrorKind::UnknownAction(raw))?;
        Ok((State::BodyKey(action), None))
    }

    fn body_key(&mut self, action: Action) -> Step {
        let key = self.expect(KEY)?.text;
        let next = match action {
            Action::Create | Action::Set | Action::Modify => State::BodyOperand(action, key),
            Action::Delete => State::EmitBody(action, key, 0),
        };
        Ok((next, None))
    }

    fn body_operand(&mut self, action: Action, key: String) -> Step {
        let token = self.expect(NUMBER)?;
        if action == Action::Modify && !token.text.starts_with(['+', '-']) {
            return Err(ParseErrorKind::UnknownModifyOperator(token.text).into());
        }
        let operand = parse_number(&token)?;
        Ok((State::EmitBody(action, key, operand), None))
    }

    fn emit_body(&mut self, action: Action, key: String, operand: i64) -> Step {
        let Some(&last_line) = self.headers.get(&key) else {
            return Err(ParseErrorKind::UndeclaredKey(key).into());
        };

        let state = self.apply(action, &key, operand)?;
        let mutation = Mutation {
            is_final: last_line == self.body_line,
            value: state.value,
            deleted: state.deleted,
            line: self.line(),
            key,
        };
        trace!(
            action = %action,
            key = %mutation.key,
            value = mutation.value,
            is_final = mutation.is_final,
            "mutation"
        );
        Ok((
            State::BodyLineAdvance,
            Some(Event::mutation_of(action, mutation)),
        ))
    }

    /// Apply one mutation to the value state of `key`.
    fn apply(&mut self, action: Action, key: &str, operand: i64) -> Result<ValueState, Halt> {
        let current = self.values.get(key).copied();
        let not_created = || Halt::from(ParseErrorKind::NotCreated(key.to_string()));

        let next = match action {
            Action::Create => {
                if current.is_some_and(|state| !state.deleted) {
                    return Err(ParseErrorKind::AlreadyCreated(key.to_string()).into());
                }
                ValueState {
                    value: operand,
                    deleted: false,
                }
            }
            // SET revives a deleted key.
            Action::Set => {
                current.ok_or_else(not_created)?;
                ValueState {
                    value: operand,
                    deleted: false,
                }
            }
            // MODIFY keeps the deleted flag as it is.
            Action::Modify => {
                let current = current.ok_or_else(not_created)?;
                let value = current
                    .value
                    .checked_add(operand)
                    .ok_or_else(|| ParseErrorKind::Overflow(key.to_string()))?;
                ValueState {
                    value,
                    deleted: current.deleted,
                }
            }
            Action::Delete => {
                let current = current.ok_or_else(not_created)?;
                if current.deleted {
                    return Err(ParseErrorKind::AlreadyDeleted(key.to_string()).into());
                }
                ValueState {
                    value: current.value,
                    deleted: true,
                }
            }
        };

        self.values.insert(key.to_string(), next);
        Ok(next)
    }

    fn body_line_advance(&mut self) -> Step {
        self.body_line += 1;
        if self.body_line <= self.last_body_line {
            let token = self.expect(NEXT_LINE)?;
            if token.kind == TokenKind::LineEnd {
                return Ok((State::BodyAction, None));
            }
            if self.body_line < self.last_body_line {
                return Err(ParseErrorKind::UnexpectedEnd {
                    missing: self.last_body_line - self.body_line + 1,
                }
                .into());
            }
        }

        debug!(body_lines = self.body_line, "log validated");
        Ok((State::Done, Some(Event::Completed)))
    }

    /// Next token that is not whitespace.
    fn next_significant(&mut self) -> Result<Token, Halt> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Halt::Cancelled);
            }
            let token = self.tokens.next().ok_or(Halt::Cancelled)?;
            match token.kind {
                TokenKind::Whitespace => continue,
                TokenKind::ScanError => return Err(ParseErrorKind::Scan(token.text).into()),
                _ => return Ok(token),
            }
        }
    }

    fn expect(&mut self, expected: &'static [TokenKind]) -> Result<Token, Halt> {
        let token = self.next_significant()?;
        if expected.contains(&token.kind) {
            Ok(token)
        } else {
            Err(ParseErrorKind::UnexpectedToken {
                actual: token.kind,
                expected,
            }
            .into())
        }
    }

    fn expect_number(&mut self) -> Result<i64, Halt> {
        let token = self.expect(NUMBER)?;
        parse_number(&token)
    }
}

fn parse_number(token: &Token) -> Result<i64, Halt> {
    token.as_i64().ok_or_else(|| {
        ParseErrorKind::UnexpectedToken {
            actual: TokenKind::Text,
            expected: NUMBER,
        }
        .into()
    })
}

impl<I: Iterator<Item = Token>> Iterator for Validator<I> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}
