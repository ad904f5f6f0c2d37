use super::{Event, EventHandler};
use crate::simulator::abstractions::Tick;
use crate::simulator::errors::SimError;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

//--------------------------------------------------------------------
// Heap entry

/// Min-heap entry ordered by `(time, seq)`, so same-time events pop in
/// insertion order.
struct Scheduled(Event);

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.0.time == other.0.time && self.0.seq == other.0.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0.time, self.0.seq)
            .cmp(&(other.0.time, other.0.seq))
            .reverse()
    }
}

//--------------------------------------------------------------------
// EventSystem

/// Priority-time event queue with a virtual clock and the attached
/// handler list. The drain loop itself lives on the engine, which owns
/// the elements the handlers mutate; the queue stays consistent while
/// handlers schedule new events mid-drain.
pub struct EventSystem {
    now: Tick,
    seq: u64,
    capacity: usize,
    queue: BinaryHeap<Scheduled>,
    handlers: Vec<Rc<EventHandler>>,
}

impl EventSystem {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Bounded queue; `schedule` reports overflow instead of dropping.
    pub fn with_capacity(capacity: usize) -> Self {
        EventSystem {
            now: 0,
            seq: 0,
            capacity,
            queue: BinaryHeap::new(),
            handlers: Vec::new(),
        }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// The time `dt` units after the current virtual time.
    #[inline]
    pub fn after(&self, dt: Tick) -> Tick {
        self.now.saturating_add(dt)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn schedule(&mut self, mut event: Event) -> Result<(), SimError> {
        if self.queue.len() >= self.capacity {
            return Err(SimError::QueueFull {
                capacity: self.capacity,
            });
        }
        event.seq = self.seq;
        self.seq += 1;
        self.queue.push(Scheduled(event));
        Ok(())
    }

    pub fn peek(&self) -> Option<&Event> {
        self.queue.peek().map(|s| &s.0)
    }

    /// Pop the next event due at or before `deadline`.
    pub(crate) fn pop_due(&mut self, deadline: Tick) -> Option<Event> {
        if self.peek()?.time > deadline {
            return None;
        }
        self.queue.pop().map(|s| s.0)
    }

    /// Move the clock forward. Never rewinds.
    pub(crate) fn set_now(&mut self, time: Tick) {
        if time > self.now {
            self.now = time;
        }
    }

    pub fn attach(&mut self, handler: Rc<EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn detach(&mut self, handler: &Rc<EventHandler>) {
        self.handlers.retain(|h| !Rc::ptr_eq(h, handler));
    }

    pub fn detach_when(&mut self, predicate: impl Fn(&EventHandler) -> bool) {
        self.handlers.retain(|h| !predicate(h));
    }

    /// Handlers in attach order, cloned so dispatch can run while new
    /// handlers attach or detach.
    pub(crate) fn handlers(&self) -> Vec<Rc<EventHandler>> {
        self.handlers.clone()
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::abstractions::{Data, Element, Pin};

    fn write_at(pin: &Pin, time: Tick, value: i64) -> Event {
        Event::write(None, pin.id(), time, value)
    }

    #[test]
    fn events_pop_in_time_order() {
        let pin = Pin::new(Data::binary(8), None);
        let mut system = EventSystem::new();
        system.schedule(write_at(&pin, 7, 1)).unwrap();
        system.schedule(write_at(&pin, 3, 2)).unwrap();
        system.schedule(write_at(&pin, 5, 3)).unwrap();

        let mut times = Vec::new();
        while let Some(event) = system.pop_due(Tick::MAX) {
            times.push(event.time);
        }
        assert_eq!(times, vec![3, 5, 7]);
    }

    #[test]
    fn same_time_events_pop_in_insertion_order() {
        let pin = Pin::new(Data::binary(8), None);
        let mut system = EventSystem::new();
        for value in 0..5 {
            system.schedule(write_at(&pin, 4, value)).unwrap();
        }
        let mut order = Vec::new();
        while let Some(event) = system.pop_due(Tick::MAX) {
            order.push(event.seq());
        }
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn pop_due_respects_the_deadline() {
        let pin = Pin::new(Data::binary(8), None);
        let mut system = EventSystem::new();
        system.schedule(write_at(&pin, 5, 1)).unwrap();
        assert!(system.pop_due(4).is_none());
        assert!(system.pop_due(5).is_some());
    }

    #[test]
    fn overflow_is_an_error_not_a_drop() {
        let pin = Pin::new(Data::binary(8), None);
        let mut system = EventSystem::with_capacity(2);
        system.schedule(write_at(&pin, 0, 1)).unwrap();
        system.schedule(write_at(&pin, 0, 2)).unwrap();
        assert!(matches!(
            system.schedule(write_at(&pin, 0, 3)),
            Err(SimError::QueueFull { capacity: 2 })
        ));
        assert_eq!(system.pending(), 2);
    }

    #[test]
    fn handlers_detach_by_handle_or_predicate() {
        let mut system = EventSystem::new();
        let h1 = EventHandler::simple("one", &[], vec![], vec![], None, |_, _| Ok(()));
        let h2 = EventHandler::simple("two", &[], vec![], vec![], None, |_, _| Ok(()));
        system.attach(Rc::clone(&h1));
        system.attach(Rc::clone(&h2));
        assert_eq!(system.handlers().len(), 2);
        assert_eq!(system.handlers()[0].label(), "one");

        system.detach(&h1);
        assert_eq!(system.handlers().len(), 1);
        system.detach_when(|h| h.label() == "two");
        assert!(system.handlers().is_empty());
    }

    #[test]
    fn the_clock_never_rewinds() {
        let mut system = EventSystem::new();
        system.set_now(10);
        system.set_now(4);
        assert_eq!(system.now(), 10);
        assert_eq!(system.after(5), 15);
    }
}
