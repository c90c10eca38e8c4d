use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Engine actions; rake payloads are indices into the rake pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    GenerateOrder,
    DispatchRake { rake: usize },
    ArriveAtStockyard { rake: usize },
    LoadingComplete { rake: usize },
    Depart { rake: usize },
    ArriveAtDestination { rake: usize },
    DeliveryComplete { rake: usize },
    RakeReturned { rake: usize },
}

impl Event {
    /// Events that free resources sort first within the same millisecond.
    fn priority(&self) -> u8 {
        match self {
            Event::RakeReturned { .. } => 0,
            Event::LoadingComplete { .. } => 1,
            Event::DeliveryComplete { .. } => 2,
            Event::ArriveAtDestination { .. } | Event::Depart { .. } => 3,
            Event::ArriveAtStockyard { .. } | Event::DispatchRake { .. } => 4,
            Event::GenerateOrder => 5,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScheduledEvent {
    pub time_ms: u64,
    pub seq: u64,
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(time_ms: u64, seq: u64, event: Event) -> Self {
        Self {
            time_ms,
            seq,
            event,
        }
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time_ms
            .cmp(&other.time_ms)
            .then_with(|| self.event.priority().cmp(&other.event.priority()))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Virtual-time queue: events fire in (time, priority, insertion) order.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, time_ms: u64, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue
            .push(Reverse(ScheduledEvent::new(time_ms, seq, event)));
    }

    pub fn peek_time(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(scheduled)| scheduled.time_ms)
    }

    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.queue.pop().map(|Reverse(scheduled)| scheduled)
    }

    /// Pops the next event only if it fires at or before `until_ms`.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<ScheduledEvent> {
        match self.peek_time() {
            Some(time_ms) if time_ms <= until_ms => self.pop(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_fire_in_time_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(30, Event::GenerateOrder);
        scheduler.schedule(10, Event::Depart { rake: 0 });
        scheduler.schedule(20, Event::DispatchRake { rake: 1 });

        let times: Vec<u64> = std::iter::from_fn(|| scheduler.pop())
            .map(|scheduled| scheduled.time_ms)
            .collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn resource_releases_sort_before_new_work() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(100, Event::GenerateOrder);
        scheduler.schedule(100, Event::RakeReturned { rake: 2 });

        assert_eq!(
            scheduler.pop().map(|scheduled| scheduled.event),
            Some(Event::RakeReturned { rake: 2 })
        );
    }

    #[test]
    fn same_kind_same_time_keeps_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(5, Event::Depart { rake: 3 });
        scheduler.schedule(5, Event::Depart { rake: 1 });

        assert_eq!(scheduler.pop().unwrap().event, Event::Depart { rake: 3 });
        assert_eq!(scheduler.pop().unwrap().event, Event::Depart { rake: 1 });
    }

    #[test]
    fn pop_due_respects_horizon() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(50, Event::GenerateOrder);

        assert!(scheduler.pop_due(49).is_none());
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.pop_due(50).is_some());
        assert!(scheduler.is_empty());
    }
}
