/// Deferred actions on a logical millisecond clock.
///
/// Nothing here reads wall time. The caller advances the clock and pops due
/// actions one at a time; an action scheduled while handling another is
/// timed from the moment the handled one fell due, so chains of delays stay
/// exact however coarse the caller's ticks are.
use std::collections::BTreeMap;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct Scheduler<A> {
    now: u64,
    next_seq: u64,
    queue: BTreeMap<(u64, u64), A>,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Scheduler { now: 0, next_seq: 0, queue: BTreeMap::new() }
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule_in(&mut self, delay_ms: u64, action: A) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((self.now + delay_ms, seq), action);
        TimerId(seq)
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.queue.keys().find(|(_, seq)| *seq == id.0).copied();
        match key {
            Some(k) => self.queue.remove(&k).is_some(),
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.queue.keys().any(|(_, seq)| *seq == id.0)
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Remove the earliest action due at or before `now`, moving the clock
    /// to its due time.
    pub fn pop_due(&mut self, now: u64) -> Option<A> {
        let (&(due, seq), _) = self.queue.iter().next()?;
        if due > now {
            return None;
        }
        self.now = self.now.max(due);
        self.queue.remove(&(due, seq))
    }

    /// Move the clock forward once nothing more is due. Never goes back.
    pub fn settle(&mut self, now: u64) {
        self.now = self.now.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule_in(500, "swap");
        s.schedule_in(1000, "end");
        s.schedule_in(0, "now");
        let mut fired = vec![];
        while let Some(a) = s.pop_due(2000) {
            fired.push(a);
        }
        assert_eq!(fired, vec!["now", "swap", "end"]);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn nothing_fires_early() {
        let mut s = Scheduler::new();
        s.schedule_in(500, 1);
        assert_eq!(s.pop_due(499), None);
        s.settle(499);
        assert_eq!(s.pop_due(500), Some(1));
    }

    #[test]
    fn same_time_keeps_insertion_order() {
        let mut s = Scheduler::new();
        for i in 0..5 {
            s.schedule_in(100, i);
        }
        let fired: Vec<_> = std::iter::from_fn(|| s.pop_due(100)).collect();
        assert_eq!(fired, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancel_removes_pending() {
        let mut s = Scheduler::new();
        let a = s.schedule_in(100, 'a');
        let b = s.schedule_in(200, 'b');
        assert!(s.cancel(a));
        assert!(!s.cancel(a));
        assert!(!s.is_pending(a));
        assert!(s.is_pending(b));
        assert_eq!(s.pop_due(1000), Some('b'));
    }

    #[test]
    fn chained_delay_counts_from_due_time() {
        let mut s = Scheduler::new();
        s.schedule_in(100, "first");
        // caller ticks late, at 250
        assert_eq!(s.pop_due(250), Some("first"));
        assert_eq!(s.now(), 100);
        s.schedule_in(100, "second");
        assert_eq!(s.pop_due(250), Some("second"));
        assert_eq!(s.now(), 200);
        s.settle(250);
        assert_eq!(s.now(), 250);
    }
}
