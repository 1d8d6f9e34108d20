//! Blocking FIFO with a depth limit, an unfinished-work counter and an in-band close marker.

use log::warn;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::QueueError;

use super::iter::QueueIter;

/// What comes out of a queue: a work item or the marker that no more items follow.
///
/// The marker is a separate variant, so no payload value can ever be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    Item(T),
    EndOfStream,
}

impl<T> Message<T> {
    pub fn is_end(&self) -> bool {
        matches!(self, Message::EndOfStream)
    }

    pub fn into_item(self) -> Option<T> {
        match self {
            Message::Item(item) => Some(item),
            Message::EndOfStream => None,
        }
    }
}

struct State<T> {
    messages: VecDeque<Message<T>>,
    /// Messages put but not yet acknowledged with `mark_done`.
    unfinished: usize,
}

/// Thread-safe bounded FIFO. Share it with `Arc`.
///
/// `put` blocks while full, `get` blocks while empty, `join` blocks until every message put
/// (close markers included) has been matched by a `mark_done`. A capacity of 0 means unbounded.
pub struct ClosableQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    all_done: Condvar,
    capacity: usize,
}

impl<T> ClosableQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let initial = if capacity == 0 { 16 } else { capacity };
        Self {
            state: Mutex::new(State {
                messages: VecDeque::with_capacity(initial),
                unfinished: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            all_done: Condvar::new(),
            capacity,
        }
    }

    /// Queue without a depth limit.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages currently waiting (close markers included).
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    /// Messages put but not yet acknowledged.
    pub fn unfinished(&self) -> usize {
        self.lock().unfinished
    }

    /// Append `item`, blocking until there is room.
    pub fn put(&self, item: T) {
        self.put_message(Message::Item(item));
    }

    /// Like [`put`](Self::put) but gives up after `timeout`, handing the item back.
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), QueueError<T>> {
        match self.lock_with_room(timeout) {
            Some(mut state) => {
                self.push_locked(&mut state, Message::Item(item));
                Ok(())
            }
            None => Err(QueueError::PutTimeout {
                item,
                waited: timeout,
            }),
        }
    }

    /// Enqueue one close marker. Each consumer stops after seeing one, so close once per consumer.
    pub fn close(&self) {
        self.put_message(Message::EndOfStream);
    }

    /// Like [`close`](Self::close) but gives up after `timeout` if the queue stays full.
    pub fn close_timeout(&self, timeout: Duration) -> Result<(), QueueError<T>> {
        match self.lock_with_room(timeout) {
            Some(mut state) => {
                self.push_locked(&mut state, Message::EndOfStream);
                Ok(())
            }
            None => Err(QueueError::CloseTimeout(timeout)),
        }
    }

    /// Remove the head message, blocking until one is available.
    pub fn get(&self) -> Message<T> {
        let mut state = self.lock();
        loop {
            if let Some(msg) = state.messages.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return msg;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`get`](Self::get) but gives up after `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Message<T>, QueueError<T>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Ok(self.get());
        };
        let mut state = self.lock();
        loop {
            if let Some(msg) = state.messages.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Ok(msg);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(QueueError::GetTimeout(timeout));
            }
            state = self
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Acknowledge one message taken with `get`. Wakes joiners when nothing is left unfinished.
    pub fn mark_done(&self) {
        let mut state = self.lock();
        match state.unfinished {
            0 => warn!("mark_done called more times than messages were put"),
            1 => {
                state.unfinished = 0;
                drop(state);
                self.all_done.notify_all();
            }
            _ => state.unfinished -= 1,
        }
    }

    /// Block until every message put so far has been acknowledged.
    pub fn join(&self) {
        let mut state = self.lock();
        while state.unfinished > 0 {
            state = self
                .all_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`join`](Self::join) but gives up after `timeout`.
    pub fn join_timeout(&self, timeout: Duration) -> Result<(), QueueError<T>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.join();
            return Ok(());
        };
        let mut state = self.lock();
        while state.unfinished > 0 {
            let now = Instant::now();
            if now >= deadline {
                return Err(QueueError::JoinTimeout {
                    waited: timeout,
                    unfinished: state.unfinished,
                });
            }
            state = self
                .all_done
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        Ok(())
    }

    /// Iterate items until a close marker, acknowledging each one as the next is requested.
    pub fn iter(&self) -> QueueIter<'_, T> {
        QueueIter::new(self)
    }

    fn put_message(&self, msg: Message<T>) {
        let mut state = self.wait_for_room(self.lock());
        self.push_locked(&mut state, msg);
    }

    fn wait_for_room<'a>(&self, mut state: MutexGuard<'a, State<T>>) -> MutexGuard<'a, State<T>> {
        while self.is_full(&state) {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state
    }

    /// Lock once there is room, or `None` when `timeout` passes first. A timeout too large to
    /// form a deadline waits without one.
    fn lock_with_room(&self, timeout: Duration) -> Option<MutexGuard<'_, State<T>>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.wait_for_room(self.lock()));
        };
        let mut state = self.lock();
        while self.is_full(&state) {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            state = self
                .not_full
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        Some(state)
    }

    fn push_locked(&self, state: &mut MutexGuard<'_, State<T>>, msg: Message<T>) {
        state.messages.push_back(msg);
        state.unfinished += 1;
        self.not_empty.notify_one();
    }

    fn is_full(&self, state: &State<T>) -> bool {
        self.capacity > 0 && state.messages.len() >= self.capacity
    }

    // State is consistent between operations, so a panic elsewhere never leaves it torn.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for ClosableQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<'a, T> IntoIterator for &'a ClosableQueue<T> {
    type Item = T;
    type IntoIter = QueueIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
