//! FIFO event queue drained by the engine loop.

use std::collections::VecDeque;

use super::event::Event;

/// Single-consumer FIFO of events. Owned by the engine loop and lent mutably
/// to whichever handler is currently running, so there is never more than one
/// writer.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
    pushed: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.pushed += 1;
        self.events.push_back(event);
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

    /// Events pushed over the queue's lifetime.
    pub fn total_pushed(&self) -> usize {
        self.pushed
    }
}
