// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tick-based timer scheduling
//!
//! Deadlines are measured in host ticks, not wall-clock time, so a script
//! that stalls the host delays its timers rather than bunching them up.

use quill_engine::Value;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Unique identifier for a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// A timer waiting for its deadline
#[derive(Debug, Clone)]
pub struct Timer {
    /// Unique timer ID
    pub id: TimerId,
    /// Tick at which the timer fires
    pub deadline: u64,
    /// Callback to execute
    pub callback: Value,
    /// Period in ticks for repeating timers
    pub period: Option<u64>,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; equal deadlines fire in creation order
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Pending timers of one script
#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    /// Current tick, advanced by [`due`](Self::due)
    now: u64,
    heap: BinaryHeap<Timer>,
    /// Live timers and their current deadline; heap entries that disagree
    /// are stale
    live: FxHashMap<TimerId, u64>,
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// The last tick seen by [`due`](Self::due)
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move the clock forward without firing anything. Scripts loaded late
    /// start counting from the host's current tick.
    pub fn advance_to(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    /// Run `callback` once, `delay` ticks from now (at least one)
    pub fn schedule(&mut self, delay: u64, callback: Value) -> TimerId {
        self.insert(delay.max(1), callback, None)
    }

    /// Run `callback` every `period` ticks (at least one), starting one
    /// period from now
    pub fn repeat(&mut self, period: u64, callback: Value) -> TimerId {
        let period = period.max(1);
        self.insert(period, callback, Some(period))
    }

    fn insert(&mut self, delay: u64, callback: Value, period: Option<u64>) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let deadline = self.now + delay;
        self.live.insert(id, deadline);
        self.heap.push(Timer {
            id,
            deadline,
            callback,
            period,
        });
        id
    }

    /// Cancel a timer. Returns false if it already fired or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.live.remove(&id).is_some()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    /// Number of live timers
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no timers are pending
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Advance to tick `now` and return every timer whose deadline has
    /// passed, earliest first. Repeating timers are re-armed before they
    /// are returned, so a callback may cancel its own timer.
    pub fn due(&mut self, now: u64) -> Vec<Timer> {
        self.now = self.now.max(now);
        let mut fired = Vec::new();
        while self.heap.peek().is_some_and(|timer| timer.deadline <= self.now) {
            let Some(timer) = self.heap.pop() else {
                break;
            };
            if self.live.get(&timer.id) != Some(&timer.deadline) {
                continue;
            }
            match timer.period {
                Some(period) => {
                    let deadline = self.now + period;
                    self.live.insert(timer.id, deadline);
                    self.heap.push(Timer {
                        deadline,
                        ..timer.clone()
                    });
                }
                None => {
                    self.live.remove(&timer.id);
                }
            }
            fired.push(timer);
        }
        fired
    }
}
