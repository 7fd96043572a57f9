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

//! Two-stage threaded pipeline.
//!
//! [`Pipeline`] runs the [`Scanner`] and the [`Validator`] on dedicated threads,
//! connected by capacity-zero [`handoff`]s: the scanner never runs more than one
//! token ahead of the validator, and the validator never more than one event
//! ahead of the caller. One [`CancelToken`] is shared by all stages.
//!
//! ```text
//! reader -> [aof-scanner] -token-> [aof-validator] -event-> caller
//! ```
//!
//! # Examples
//!
//! ```rust
//! use aof_stream::{Event, Pipeline};
//! use std::io::Cursor;
//!
//! let input = "1\nkey1 0\nCREATE key1 1000\n";
//! let events: Vec<Event> = Pipeline::spawn(Cursor::new(input))?.collect();
//!
//! assert_eq!(events.len(), 3);
//! assert_eq!(events.last(), Some(&Event::Completed));
//! # Ok::<(), aof_stream::StreamError>(())
//! ```

use crate::error::StreamResult;
use crate::event::Event;
use crate::handoff::{handoff, CancelToken, HandoffError, HandoffReceiver, HandoffSender};
use crate::scanner::{Scanner, ScannerConfig};
use crate::token::Token;
use crate::validator::Validator;
use std::io::Read;
use std::thread;
use tracing::{debug, trace, warn};

/// Handle to a running scanner/validator pipeline.
///
/// Yields events through [`Pipeline::next_event`] or `Iterator`. Dropping the
/// handle cancels both stages; the threads are detached, since the scanner may
/// still be blocked inside `read` and only notices cancellation once it returns.
pub struct Pipeline {
    events: HandoffReceiver<Event>,
    cancel: CancelToken,
    finished: bool,
}

impl Pipeline {
    /// Start a pipeline over `reader` with the default [`ScannerConfig`].
    pub fn spawn<R: Read + Send + 'static>(reader: R) -> StreamResult<Self> {
        Self::with_config(reader, ScannerConfig::default())
    }

    /// Start a pipeline over `reader` with a custom [`ScannerConfig`].
    ///
    /// Fails only if a stage thread cannot be spawned.
    pub fn with_config<R: Read + Send + 'static>(
        reader: R,
        config: ScannerConfig,
    ) -> StreamResult<Self> {
        let cancel = CancelToken::new();
        let (token_tx, token_rx) = handoff::<Token>(&cancel);
        let (event_tx, event_rx) = handoff::<Event>(&cancel);

        thread::Builder::new()
            .name("aof-scanner".to_string())
            .spawn(move || scan_stage(Scanner::with_config(reader, config), token_tx))?;

        let validator_cancel = cancel.clone();
        let spawned = thread::Builder::new()
            .name("aof-validator".to_string())
            .spawn(move || validate_stage(token_rx, event_tx, validator_cancel));
        if let Err(err) = spawned {
            cancel.cancel();
            return Err(err.into());
        }

        debug!("pipeline started");
        Ok(Self {
            events: event_rx,
            cancel,
            finished: false,
        })
    }

    /// Next event, blocking until the validator produces one.
    ///
    /// Returns `None` after the terminal event. A cancelled pipeline yields
    /// [`Event::Cancelled`] once, then `None`.
    pub fn next_event(&mut self) -> Option<Event> {
        if self.finished {
            return None;
        }

        let event = match self.events.recv() {
            Ok(event) => event,
            Err(HandoffError::Cancelled) => Event::Cancelled,
            Err(HandoffError::Disconnected) => {
                warn!("validator stage ended without a terminal event");
                Event::Cancelled
            }
        };
        self.finished = event.is_terminal();
        Some(event)
    }

    /// Cancel both stages and wake anything blocked on them.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token shared by all stages, e.g. to cancel from another thread.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns `true` once the terminal event has been returned.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Iterator for Pipeline {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if !self.finished {
            debug!("pipeline dropped before completion, cancelling");
        }
        self.cancel.cancel();
    }
}

fn scan_stage<R: Read>(scanner: Scanner<R>, tokens: HandoffSender<Token>) {
    for token in scanner {
        let terminal = token.kind.is_terminal();
        if let Err(err) = tokens.send(token) {
            trace!(%err, "scanner stage stopped");
            return;
        }
        if terminal {
            break;
        }
    }
    trace!("scanner stage finished");
}

fn validate_stage(
    tokens: HandoffReceiver<Token>,
    events: HandoffSender<Event>,
    cancel: CancelToken,
) {
    // Dropping the validator drops `tokens`, which disconnects the scanner
    // from any input past the terminal event.
    for event in Validator::with_cancel(tokens, cancel) {
        if let Err(err) = events.send(event) {
            trace!(%err, "validator stage stopped");
            return;
        }
    }
    trace!("validator stage finished");
}
