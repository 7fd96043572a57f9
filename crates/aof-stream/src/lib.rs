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

//! Streaming AOF Validator
//!
//! This crate validates and compacts append-only mutation logs (AOF) in a single
//! forward pass. A log declares its keys up front together with the body line that
//! mutates each key for the last time; the body is then a sequence of
//! `CREATE`/`SET`/`MODIFY`/`DELETE` lines. Because the header announces where each
//! key ends, the final state of a key is known the moment its last line is read,
//! and nothing but one value per key is ever held in memory.
//!
//! # Features
//!
//! - **Single Pass**: Events are emitted while reading, never after buffering
//! - **Iterator-based**: [`Scanner`], [`Validator`] and [`Compactor`] are plain iterators
//! - **Pipelined**: [`Pipeline`] runs scanning and validation on their own threads
//! - **Cancellable**: One [`CancelToken`] stops every stage, even while blocked
//! - **Precise Errors**: Every failure carries its 1-based input line
//!
//! # Log Format
//!
//! ```text
//! 2              <- number of header entries
//! key1 2         <- key1 is last mutated on body line 2
//! key2 1         <- key2 is last mutated on body line 1
//! CREATE key1 10
//! CREATE key2 20 <- final for key2
//! MODIFY key1 +5 <- final for key1
//! ```
//!
//! Body lines are indexed from 0. Compacting that log yields `CREATE key2 20`
//! followed by `CREATE key1 15`.
//!
//! # Synchronous API
//!
//! ```rust
//! use aof_stream::{Event, Validator};
//! use std::io::Cursor;
//!
//! let input = "2\nkey1 2\nkey2 1\nCREATE key1 10\nCREATE key2 20\nMODIFY key1 +5\n";
//!
//! for event in Validator::from_reader(Cursor::new(input)) {
//!     match event {
//!         Event::ParseError(err) => {
//!             eprintln!("{}", err);
//!             break;
//!         }
//!         event if event.is_final() => println!("{}", event),
//!         _ => {}
//!     }
//! }
//! ```
//!
//! # Pipelined API
//!
//! ```rust,no_run
//! use aof_stream::{Compactor, Pipeline};
//! use std::fs::File;
//!
//! let pipeline = Pipeline::spawn(File::open("mutations.aof")?)?;
//! let cancel = pipeline.cancel_token().clone();
//!
//! // `cancel.cancel()` from any thread stops both stages.
//! # let _ = cancel;
//! for record in Compactor::new(pipeline) {
//!     println!("{}", record?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod compact;
mod error;
mod event;
mod handoff;
mod pipeline;
mod scanner;
mod token;
mod validator;

pub use compact::{CompactRecord, Compactor};
pub use error::{ParseError, ParseErrorKind, StreamError, StreamResult};
pub use event::{Action, Event, HeaderInfo, Mutation};
pub use handoff::{handoff, CancelToken, HandoffError, HandoffReceiver, HandoffSender};
pub use pipeline::Pipeline;
pub use scanner::{Scanner, ScannerConfig};
pub use token::{Token, TokenKind};
pub use validator::Validator;
