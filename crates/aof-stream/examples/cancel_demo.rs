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

//! Demonstration of pipelined compaction with cancellation

use aof_stream::{Compactor, Event, Pipeline, StreamError};
use std::io::{self, Cursor, Read};
use std::thread;
use std::time::Duration;

/// Reader that trickles its input out slowly, like a remote log being tailed.
struct SlowReader {
    inner: Cursor<Vec<u8>>,
    delay: Duration,
}

impl Read for SlowReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        thread::sleep(self.delay);
        let len = buf.len().min(64);
        self.inner.read(&mut buf[..len])
    }
}

fn generate_log(keys: usize) -> String {
    let mut text = format!("{}\n", keys);
    for key in 0..keys {
        text.push_str(&format!("key{} {}\n", key, keys + key));
    }
    for key in 0..keys {
        text.push_str(&format!("CREATE key{} {}\n", key, key));
    }
    for key in 0..keys {
        text.push_str(&format!("MODIFY key{} +1\n", key));
    }
    text
}

fn main() -> Result<(), StreamError> {
    println!("AOF Pipeline Cancellation Demo\n");

    // Example 1: Compact a small log end to end
    println!("Example 1: Compacting a complete log");
    let log = "3\nkey1 1\nkey2 2\nkey3 0\nCREATE key3 30\nCREATE key1 10\nCREATE key2 20\n";
    for record in Compactor::new(Pipeline::spawn(Cursor::new(log))?) {
        println!("  {}", record?);
    }
    println!();

    // Example 2: Cancel a slow stream from another thread
    println!("Example 2: Cancelling a slow stream after 200ms");
    let reader = SlowReader {
        inner: Cursor::new(generate_log(10_000).into_bytes()),
        delay: Duration::from_millis(5),
    };
    let mut pipeline = Pipeline::spawn(reader)?;
    let cancel = pipeline.cancel_token().clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        cancel.cancel();
    });

    let mut mutations = 0;
    while let Some(event) = pipeline.next_event() {
        match event {
            Event::Cancelled => println!("  Cancelled after {} mutations", mutations),
            Event::Completed => println!("  Completed after {} mutations", mutations),
            Event::ParseError(err) => println!("  Failed: {}", err),
            Event::HeaderParsed(info) => println!("  Header declares {} keys", info.keys),
            _ => mutations += 1,
        }
    }
    let _ = canceller.join();

    Ok(())
}
