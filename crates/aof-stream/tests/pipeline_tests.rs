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

//! Pipeline and cancellation tests for aof-stream

use aof_stream::{
    handoff, CancelToken, Compactor, Event, HandoffError, Pipeline, ScannerConfig, StreamError,
    Validator,
};
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Reader fed chunk by chunk from the test; blocks while no chunk is available.
struct ChannelReader {
    chunks: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.chunks.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

fn channel_reader() -> (mpsc::Sender<Vec<u8>>, ChannelReader) {
    let (tx, rx) = mpsc::channel();
    (
        tx,
        ChannelReader {
            chunks: rx,
            pending: Vec::new(),
        },
    )
}

/// Reader that counts how many bytes were pulled from it.
struct CountingReader<R> {
    inner: R,
    read: Arc<AtomicUsize>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }
}

// ==================== Pipeline Results ====================

#[test]
fn test_pipeline_compacts() {
    let input = "3\na 2\nb 0\nc 1\nCREATE b 1\nCREATE c 2\nCREATE a 3\n";
    let lines: Vec<String> = Compactor::new(Pipeline::spawn(Cursor::new(input)).unwrap())
        .map(|r| r.unwrap().to_string())
        .collect();
    assert_eq!(lines, vec!["CREATE b 1", "CREATE c 2", "CREATE a 3"]);
}

#[test]
fn test_pipeline_same_events_as_validator() {
    let inputs = [
        "0",
        "",
        "1\nkeyX 2\nCREATE keyX 1\nDELETE keyX\nCREATE keyX 1000\n",
        "1\nkeyX 10\nCREATE keyX 1",
        "2\nk 1\nj 0\nCREATE j 1\nCREATE j 2\n",
    ];
    for input in inputs {
        let config = ScannerConfig {
            buffer_size: 3,
            ..Default::default()
        };
        let piped: Vec<_> = Pipeline::with_config(Cursor::new(input), config)
            .unwrap()
            .collect();
        let direct: Vec<_> = Validator::from_reader(Cursor::new(input)).collect();
        assert_eq!(piped, direct, "input: {:?}", input);
    }
}

#[test]
fn test_pipeline_events_arrive_before_input_ends() {
    let (feed, reader) = channel_reader();
    let mut pipeline = Pipeline::spawn(reader).unwrap();

    feed.send(b"2\na 0\nb 1\nCREATE a 1\n".to_vec()).unwrap();
    assert!(matches!(pipeline.next_event(), Some(Event::HeaderParsed(_))));
    let create = pipeline.next_event().unwrap();
    assert!(create.is_final());

    feed.send(b"CREATE b 2\n".to_vec()).unwrap();
    assert!(pipeline.next_event().unwrap().is_final());
    assert_eq!(pipeline.next_event(), Some(Event::Completed));
    assert_eq!(pipeline.next_event(), None);
}

#[test]
fn test_trailing_input_not_consumed() {
    let mut input = b"1\nk 0\nCREATE k 1\n".to_vec();
    for _ in 0..(1 << 19) {
        input.extend_from_slice(b"x ");
    }

    let read = Arc::new(AtomicUsize::new(0));
    let reader = CountingReader {
        inner: Cursor::new(input),
        read: Arc::clone(&read),
    };
    let config = ScannerConfig {
        buffer_size: 16,
        ..Default::default()
    };
    let events: Vec<_> = Pipeline::with_config(reader, config).unwrap().collect();
    assert_eq!(events.last(), Some(&Event::Completed));

    // Give the scanner thread time to notice the disconnect.
    thread::sleep(Duration::from_millis(50));
    assert!(read.load(Ordering::SeqCst) < 1 << 20);
}

// ==================== Cancellation ====================

#[test]
fn test_cancel_from_another_thread() {
    let (feed, reader) = channel_reader();
    feed.send(b"1\nk 5\nCREATE k 1\n".to_vec()).unwrap();

    let mut pipeline = Pipeline::spawn(reader).unwrap();
    let cancel = pipeline.cancel_token().clone();

    assert!(matches!(pipeline.next_event(), Some(Event::HeaderParsed(_))));
    assert!(matches!(pipeline.next_event(), Some(Event::Create(_))));

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
    });

    assert_eq!(pipeline.next_event(), Some(Event::Cancelled));
    assert!(pipeline.is_finished());
    canceller.join().unwrap();
}

#[test]
fn test_compactor_reports_cancellation() {
    let (_feed, reader) = channel_reader();
    let pipeline = Pipeline::spawn(reader).unwrap();
    pipeline.cancel();

    let results: Vec<_> = Compactor::new(pipeline).collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(StreamError::Cancelled)));
}

#[test]
fn test_validator_observes_shared_token() {
    let cancel = CancelToken::new();
    let (tx, rx) = handoff(&cancel);

    let validator = thread::spawn({
        let cancel = cancel.clone();
        move || Validator::with_cancel(rx, cancel).collect::<Vec<_>>()
    });

    tx.send(aof_stream::Token::word("1")).unwrap();
    thread::sleep(Duration::from_millis(20));
    cancel.cancel();

    assert_eq!(validator.join().unwrap(), vec![Event::Cancelled]);
    assert_eq!(
        tx.send(aof_stream::Token::word("x")),
        Err(HandoffError::Cancelled)
    );
}

#[test]
fn test_drop_stops_blocked_stages() {
    let (feed, reader) = channel_reader();
    let pipeline = Pipeline::spawn(reader).unwrap();
    let cancel = pipeline.cancel_token().clone();

    drop(pipeline);
    assert!(cancel.is_cancelled());

    // The scanner is released once its read returns.
    drop(feed);
}
