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

//! Rendezvous handoff between pipeline stages.
//!
//! A [`handoff`] is a capacity-zero channel: [`HandoffSender::send`] returns only
//! once the receiver has taken the item, so a fast producer can never run ahead
//! of its consumer. Every handoff is bound to a [`CancelToken`]; once the token
//! is cancelled, blocked and future calls on either side fail with
//! [`HandoffError::Cancelled`]. An item still waiting in the slot at that moment
//! is dropped.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Why a handoff did not complete.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    /// The bound [`CancelToken`] was cancelled.
    #[error("handoff cancelled")]
    Cancelled,
    /// The other side of the handoff was dropped.
    #[error("handoff disconnected")]
    Disconnected,
}

/// Something blocked on a condition that must re-check the cancel flag.
trait Wake: Send + Sync {
    fn wake(&self);
}

/// One-shot, level-triggered cancellation signal shared by all pipeline stages.
///
/// Clones observe the same signal. Cancelling is idempotent and cannot be undone.
///
/// # Examples
///
/// ```rust
/// use aof_stream::CancelToken;
///
/// let token = CancelToken::new();
/// let observer = token.clone();
/// assert!(!observer.is_cancelled());
///
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    watchers: Mutex<Vec<Weak<dyn Wake>>>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake every handoff bound to this token.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let watchers = std::mem::take(&mut *self.inner.watchers.lock());
        for watcher in watchers.iter().filter_map(Weak::upgrade) {
            watcher.wake();
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn watch(&self, watcher: Weak<dyn Wake>) {
        let mut watchers = self.inner.watchers.lock();
        watchers.retain(|w| w.strong_count() > 0);
        watchers.push(watcher);
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct Slot<T> {
    item: Option<T>,
    sender_alive: bool,
    receiver_alive: bool,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
    cancel: CancelToken,
}

impl<T: Send> Wake for Shared<T> {
    fn wake(&self) {
        // Taking the lock orders the wake-up after any waiter's flag check.
        let _slot = self.slot.lock();
        self.ready.notify_all();
    }
}

/// Create a rendezvous handoff bound to `cancel`.
///
/// # Examples
///
/// ```rust
/// use aof_stream::{handoff, CancelToken};
/// use std::thread;
///
/// let cancel = CancelToken::new();
/// let (tx, rx) = handoff::<u32>(&cancel);
///
/// let producer = thread::spawn(move || {
///     for i in 0..3 {
///         tx.send(i).unwrap();
///     }
/// });
///
/// let received: Vec<u32> = rx.collect();
/// producer.join().unwrap();
/// assert_eq!(received, vec![0, 1, 2]);
/// ```
pub fn handoff<T: Send + 'static>(cancel: &CancelToken) -> (HandoffSender<T>, HandoffReceiver<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            item: None,
            sender_alive: true,
            receiver_alive: true,
        }),
        ready: Condvar::new(),
        cancel: cancel.clone(),
    });
    let weak: Weak<Shared<T>> = Arc::downgrade(&shared);
    cancel.watch(weak);
    (
        HandoffSender {
            shared: Arc::clone(&shared),
        },
        HandoffReceiver { shared },
    )
}

/// Producing side of a [`handoff`].
pub struct HandoffSender<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> HandoffSender<T> {
    /// Hand `item` to the receiver, blocking until it has been taken.
    pub fn send(&self, item: T) -> Result<(), HandoffError> {
        let shared = &*self.shared;
        let mut slot = shared.slot.lock();

        loop {
            if shared.cancel.is_cancelled() {
                return Err(HandoffError::Cancelled);
            }
            if !slot.receiver_alive {
                return Err(HandoffError::Disconnected);
            }
            if slot.item.is_none() {
                break;
            }
            shared.ready.wait(&mut slot);
        }

        slot.item = Some(item);
        shared.ready.notify_all();

        loop {
            if slot.item.is_none() {
                return Ok(());
            }
            if shared.cancel.is_cancelled() {
                slot.item = None;
                return Err(HandoffError::Cancelled);
            }
            if !slot.receiver_alive {
                slot.item = None;
                return Err(HandoffError::Disconnected);
            }
            shared.ready.wait(&mut slot);
        }
    }
}

impl<T: Send + 'static> Drop for HandoffSender<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        slot.sender_alive = false;
        self.shared.ready.notify_all();
    }
}

/// Consuming side of a [`handoff`].
///
/// Iterating yields items until the handoff is cancelled or the sender is gone.
pub struct HandoffReceiver<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> HandoffReceiver<T> {
    /// Take the next item, blocking until the sender offers one.
    pub fn recv(&self) -> Result<T, HandoffError> {
        let shared = &*self.shared;
        let mut slot = shared.slot.lock();

        loop {
            if shared.cancel.is_cancelled() {
                return Err(HandoffError::Cancelled);
            }
            if let Some(item) = slot.item.take() {
                shared.ready.notify_all();
                return Ok(item);
            }
            if !slot.sender_alive {
                return Err(HandoffError::Disconnected);
            }
            shared.ready.wait(&mut slot);
        }
    }
}

impl<T: Send + 'static> Iterator for HandoffReceiver<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv().ok()
    }
}

impl<T: Send + 'static> Drop for HandoffReceiver<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        slot.receiver_alive = false;
        slot.item = None;
        self.shared.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_items_arrive_in_order() {
        let cancel = CancelToken::new();
        let (tx, rx) = handoff(&cancel);

        let producer = thread::spawn(move || {
            for i in 0..100 {
                tx.send(i).unwrap();
            }
        });

        let items: Vec<i32> = rx.collect();
        producer.join().unwrap();
        assert_eq!(items, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_send_waits_for_receiver() {
        let cancel = CancelToken::new();
        let (tx, rx) = handoff(&cancel);
        let delivered = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&delivered);
        let producer = thread::spawn(move || {
            tx.send("first").unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(delivered.load(Ordering::SeqCst), 0);

        assert_eq!(rx.recv(), Ok("first"));
        producer.join().unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_wakes_blocked_receiver() {
        let cancel = CancelToken::new();
        let (tx, rx) = handoff::<u8>(&cancel);

        let consumer = thread::spawn(move || rx.recv());
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();

        assert_eq!(consumer.join().unwrap(), Err(HandoffError::Cancelled));
        drop(tx);
    }

    #[test]
    fn test_cancel_wakes_blocked_sender() {
        let cancel = CancelToken::new();
        let (tx, rx) = handoff::<u8>(&cancel);

        let producer = thread::spawn(move || tx.send(7));
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();

        assert_eq!(producer.join().unwrap(), Err(HandoffError::Cancelled));
        assert_eq!(rx.recv(), Err(HandoffError::Cancelled));
    }

    #[test]
    fn test_cancel_is_level_triggered() {
        let cancel = CancelToken::new();
        cancel.cancel();
        cancel.cancel();

        let (tx, rx) = handoff::<u8>(&cancel);
        assert_eq!(tx.send(1), Err(HandoffError::Cancelled));
        assert_eq!(rx.recv(), Err(HandoffError::Cancelled));
        assert!(cancel.clone().is_cancelled());
    }

    #[test]
    fn test_one_token_cancels_many_handoffs() {
        let cancel = CancelToken::new();
        let (_tx1, rx1) = handoff::<u8>(&cancel);
        let (_tx2, rx2) = handoff::<u8>(&cancel);

        let a = thread::spawn(move || rx1.recv());
        let b = thread::spawn(move || rx2.recv());
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();

        assert_eq!(a.join().unwrap(), Err(HandoffError::Cancelled));
        assert_eq!(b.join().unwrap(), Err(HandoffError::Cancelled));
    }

    #[test]
    fn test_sender_drop_disconnects() {
        let cancel = CancelToken::new();
        let (tx, rx) = handoff::<u8>(&cancel);
        drop(tx);
        assert_eq!(rx.recv(), Err(HandoffError::Disconnected));
    }

    #[test]
    fn test_receiver_drop_unblocks_sender() {
        let cancel = CancelToken::new();
        let (tx, rx) = handoff::<u8>(&cancel);

        let producer = thread::spawn(move || tx.send(1));
        thread::sleep(Duration::from_millis(20));
        drop(rx);

        assert_eq!(producer.join().unwrap(), Err(HandoffError::Disconnected));
    }

    #[test]
    fn test_token_debug() {
        let token = CancelToken::new();
        assert!(format!("{:?}", token).contains("cancelled: false"));
    }
}
