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

#![no_main]

use aof_stream::{Event, ScannerConfig, Validator};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

/// Fuzz target for the validator.
///
/// Feeds arbitrary bytes (including invalid UTF-8) through the scanner and the
/// validator and checks the event stream contract.
///
/// # Running the Fuzzer
///
/// ```bash
/// cd crates/aof-stream
/// cargo fuzz run fuzz_validator -- -max_len=4096
/// ```
///
/// # Expected Behavior
///
/// - The validator never panics
/// - Exactly one terminal event is produced, and it is the last one
/// - Every parse error carries a 1-based line number
fuzz_target!(|data: &[u8]| {
    let config = ScannerConfig {
        buffer_size: 7,
        max_token_length: 64,
    };
    let events: Vec<Event> = Validator::from_reader_with_config(Cursor::new(data), config).collect();

    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1);
    assert!(events.last().is_some_and(Event::is_terminal));

    if let Some(Event::ParseError(err)) = events.last() {
        assert!(err.line >= 1);
    }
});
