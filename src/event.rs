//! Per-tick event queues: producers append, consumers read, someone clears.
//!
//! No backpressure, no timestamps, no ordering across queues. Each queue is
//! owned by whoever created it; the world is not involved.

/// Append-only buffer of `T` events for one simulation tick.
pub struct EventQueue<T: Copy> {
    events: Vec<T>,
}

impl<T: Copy> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    /// Append one event.
    pub fn send(&mut self, event: T) {
        self.events.push(event);
    }

    /// Everything sent since the last clear.
    pub fn read(&self) -> &[T] {
        &self.events
    }

    /// Reset the queue for the next tick. Capacity is retained.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<T: Copy> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Collision {
        a: u32,
        b: u32,
    }

    #[test]
    fn send_read_clear() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());

        queue.send(Collision { a: 0, b: 1 });
        queue.send(Collision { a: 2, b: 3 });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.read()[1], Collision { a: 2, b: 3 });

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.read(), &[]);
    }
}
