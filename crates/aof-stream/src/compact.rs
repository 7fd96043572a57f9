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

//! Compacted output records.
//!
//! A compacted log keeps exactly one line per key that the source log touches:
//! the key's final state. [`Compactor`] turns an event stream into those lines.

use crate::error::{StreamError, StreamResult};
use crate::event::Event;
use std::fmt;

/// One line of a compacted log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactRecord {
    /// The key ends live with `value`.
    Create { key: String, value: i64 },
    /// The key ends deleted.
    Delete { key: String },
}

impl CompactRecord {
    /// Record for a final event; `None` for anything else.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use aof_stream::{CompactRecord, Event, Validator};
    /// use std::io::Cursor;
    ///
    /// let input = "1\nk 1\nCREATE k 1\nMODIFY k +41\n";
    /// let records: Vec<_> = Validator::from_reader(Cursor::new(input))
    ///     .filter_map(|event| CompactRecord::from_event(&event))
    ///     .collect();
    ///
    /// assert_eq!(records.len(), 1);
    /// assert_eq!(records[0].to_string(), "CREATE k 42");
    /// ```
    pub fn from_event(event: &Event) -> Option<Self> {
        let record = match event {
            Event::Delete(m) if m.is_final => Self::Delete { key: m.key.clone() },
            Event::Create(m) | Event::Set(m) | Event::Modify(m) if m.is_final => Self::Create {
                key: m.key.clone(),
                value: m.value,
            },
            _ => return None,
        };
        Some(record)
    }

    /// The key this record describes.
    pub fn key(&self) -> &str {
        match self {
            Self::Create { key, .. } | Self::Delete { key } => key,
        }
    }
}

impl fmt::Display for CompactRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { key, value } => write!(f, "CREATE {} {}", key, value),
            Self::Delete { key } => write!(f, "DELETE {}", key),
        }
    }
}

/// Iterator adaptor from events to compacted records.
///
/// Ends after `Completed`. A `ParseError` is yielded as
/// `Err(StreamError::Parse)` and a `Cancelled` event (or an event source that
/// ends without a terminal event) as `Err(StreamError::Cancelled)`; nothing is
/// yielded afterwards.
///
/// # Examples
///
/// ```rust
/// use aof_stream::{Compactor, Pipeline};
/// use std::io::Cursor;
///
/// let input = "2\na 1\nb 0\nCREATE b 2\nCREATE a 1\n";
/// let lines: Vec<String> = Compactor::new(Pipeline::spawn(Cursor::new(input))?)
///     .map(|record| record.map(|r| r.to_string()))
///     .collect::<Result<_, _>>()?;
///
/// assert_eq!(lines, vec!["CREATE b 2", "CREATE a 1"]);
/// # Ok::<(), aof_stream::StreamError>(())
/// ```
pub struct Compactor<I> {
    events: I,
    done: bool,
}

impl<I: Iterator<Item = Event>> Compactor<I> {
    /// Wrap an event source.
    pub fn new(events: I) -> Self {
        Self {
            events,
            done: false,
        }
    }
}

impl<I: Iterator<Item = Event>> Iterator for Compactor<I> {
    type Item = StreamResult<CompactRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let Some(event) = self.events.next() else {
                self.done = true;
                return Some(Err(StreamError::Cancelled));
            };
            match event {
                Event::Completed => {
                    self.done = true;
                    return None;
                }
                Event::ParseError(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
                Event::Cancelled => {
                    self.done = true;
                    return Some(Err(StreamError::Cancelled));
                }
                other => {
                    if let Some(record) = CompactRecord::from_event(&other) {
                        return Some(Ok(record));
                    }
                }
            }
        }
    }
}
