//! FIFO event queue owned by the engine.

use crate::domain::{Event, EventKind};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
    pushed: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: impl Into<Event>) {
        self.events.push_back(event.into());
        self.pushed += 1;
    }

    pub fn extend<I, E>(&mut self, events: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<Event>,
    {
        for event in events {
            self.push(event);
        }
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total events ever pushed.
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Kinds currently queued, front to back.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.iter().map(Event::kind).collect()
    }
}
