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

//! Event types for the AOF validator.
//!
//! # Event Flow
//!
//! A well-formed log produces events in this order:
//!
//! 1. `HeaderParsed` - all header entries read
//! 2. `Create` / `Delete` / `Modify` / `Set` - one per body line, in line order
//! 3. `Completed`
//!
//! A run ends with exactly one of `Completed`, `ParseError` or `Cancelled`. A log
//! whose header count is zero or negative produces `Completed` alone.
//!
//! # Example Event Sequence
//!
//! For this log:
//!
//! ```text
//! 1
//! keyX 2
//! CREATE keyX 1
//! DELETE keyX
//! CREATE keyX 1000
//! ```
//!
//! the validator yields:
//!
//! ```text
//! HeaderParsed(HeaderInfo { declared: 1, keys: 1, last_body_line: 2 })
//! Create(Mutation { key: "keyX", value: 1, deleted: false, is_final: false, .. })
//! Delete(Mutation { key: "keyX", value: 1, deleted: true, is_final: false, .. })
//! Create(Mutation { key: "keyX", value: 1000, deleted: false, is_final: true, .. })
//! Completed
//! ```

use crate::error::ParseError;
use std::fmt;
use std::str::FromStr;

/// Mutation keyword of a body line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Delete,
    Modify,
    Set,
}

impl Action {
    /// Keyword as written in a log.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
            Self::Modify => "MODIFY",
            Self::Set => "SET",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive keyword lookup.
///
/// ```rust
/// use aof_stream::Action;
///
/// assert_eq!("create".parse::<Action>(), Ok(Action::Create));
/// assert_eq!("Modify".parse::<Action>(), Ok(Action::Modify));
/// assert!("ACTION".parse::<Action>().is_err());
/// ```
impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "DELETE" => Ok(Self::Delete),
            "MODIFY" => Ok(Self::Modify),
            "SET" => Ok(Self::Set),
            _ => Err(()),
        }
    }
}

/// Summary of the parsed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    /// Entry count declared on the first line.
    pub declared: usize,
    /// Distinct keys after later declarations replaced earlier ones.
    pub keys: usize,
    /// Highest declared body line index; the body has this many lines plus one.
    pub last_body_line: i64,
}

/// State of one key after a body mutation was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Key as written in the log.
    pub key: String,
    /// Value after the mutation. A delete keeps the last value.
    pub value: i64,
    /// Whether the key is deleted after the mutation.
    pub deleted: bool,
    /// Whether this is the key's last mutation as promised by the header.
    pub is_final: bool,
    /// 1-based input line of the mutation.
    pub line: usize,
}

/// Event emitted by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Header has been parsed.
    HeaderParsed(HeaderInfo),
    /// A key was created (or re-created after a delete).
    Create(Mutation),
    /// A key was deleted.
    Delete(Mutation),
    /// A key's value was changed by a signed delta.
    Modify(Mutation),
    /// A key's value was replaced.
    Set(Mutation),
    /// The whole declared body was validated.
    Completed,
    /// The log is malformed; nothing follows.
    ParseError(ParseError),
    /// The run was cancelled by the caller.
    Cancelled,
}

impl Event {
    pub(crate) fn mutation_of(action: Action, mutation: Mutation) -> Self {
        match action {
            Action::Create => Self::Create(mutation),
            Action::Delete => Self::Delete(mutation),
            Action::Modify => Self::Modify(mutation),
            Action::Set => Self::Set(mutation),
        }
    }

    /// Returns `true` for `Completed`, `ParseError` and `Cancelled`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::ParseError(_) | Self::Cancelled)
    }

    /// The mutation payload, if this is a body event.
    pub fn mutation(&self) -> Option<&Mutation> {
        match self {
            Self::Create(m) | Self::Delete(m) | Self::Modify(m) | Self::Set(m) => Some(m),
            _ => None,
        }
    }

    /// The action of a body event.
    pub fn action(&self) -> Option<Action> {
        match self {
            Self::Create(_) => Some(Action::Create),
            Self::Delete(_) => Some(Action::Delete),
            Self::Modify(_) => Some(Action::Modify),
            Self::Set(_) => Some(Action::Set),
            _ => None,
        }
    }

    /// Returns `true` if this is a key's final mutation.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.mutation().is_some_and(|m| m.is_final)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderParsed(info) => write!(
                f,
                "HeaderParsed({} entries, {} keys)",
                info.declared, info.keys
            ),
            Self::Completed => f.write_str("Completed"),
            Self::ParseError(err) => write!(f, "ParseError({err})"),
            Self::Cancelled => f.write_str("Cancelled"),
            _ => {
                // Body events
                let (Some(action), Some(m)) = (self.action(), self.mutation()) else {
                    return Ok(());
                };
                write!(f, "{action}")?;
                if m.is_final {
                    f.write_str("|final")?;
                }
                write!(f, "({}, {}", m.key, m.value)?;
                if m.deleted {
                    f.write_str(", deleted")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    fn mutation(key: &str, value: i64, deleted: bool, is_final: bool) -> Mutation {
        Mutation {
            key: key.to_string(),
            value,
            deleted,
            is_final,
            line: 3,
        }
    }

    #[test]
    fn test_action_parse_case_insensitive() {
        assert_eq!("CREATE".parse::<Action>(), Ok(Action::Create));
        assert_eq!("delete".parse::<Action>(), Ok(Action::Delete));
        assert_eq!("mOdIfY".parse::<Action>(), Ok(Action::Modify));
        assert_eq!("set".parse::<Action>(), Ok(Action::Set));
        assert_eq!("SETS".parse::<Action>(), Err(()));
        assert_eq!("".parse::<Action>(), Err(()));
    }

    #[test]
    fn test_terminal_events() {
        assert!(Event::Completed.is_terminal());
        assert!(Event::Cancelled.is_terminal());
        assert!(Event::ParseError(ParseError::new(1, ParseErrorKind::Scan("x".into()))).is_terminal());
        assert!(!Event::Create(mutation("k", 1, false, true)).is_terminal());
    }

    #[test]
    fn test_mutation_accessors() {
        let event = Event::mutation_of(Action::Modify, mutation("k", 5, false, true));
        assert_eq!(event.action(), Some(Action::Modify));
        assert_eq!(event.mutation().map(|m| m.value), Some(5));
        assert!(event.is_final());

        assert_eq!(Event::Completed.action(), None);
        assert!(Event::Completed.mutation().is_none());
        assert!(!Event::Completed.is_final());
    }

    #[test]
    fn test_display() {
        let event = Event::Delete(mutation("keyX", 1, true, true));
        assert_eq!(event.to_string(), "DELETE|final(keyX, 1, deleted)");

        let event = Event::Create(mutation("keyX", 1, false, false));
        assert_eq!(event.to_string(), "CREATE(keyX, 1)");

        assert_eq!(Event::Completed.to_string(), "Completed");
    }
}
