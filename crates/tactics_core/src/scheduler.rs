//! Tick-based delayed task queue.
//!
//! Timed effects (an attack's damage landing at its impact keyframe) are
//! scheduled a number of ticks ahead and released by [`Scheduler::advance`].
//! Cancelling a task only removes it from the queue; whatever it already
//! did stays done.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// Queue of tasks keyed by the tick they become due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler<T> {
    current_tick: u64,
    next_id: u64,
    // (due tick, id) keeps FIFO order among tasks due on the same tick.
    queue: BTreeMap<(u64, TaskId), T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler at tick zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current_tick: 0,
            next_id: 0,
            queue: BTreeMap::new(),
        }
    }

    /// Tick of the last [`Self::advance`].
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue a task `delay` ticks after the current tick.
    pub fn schedule(&mut self, delay: u64, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let due = self.current_tick.saturating_add(delay);
        self.queue.insert((due, id), task);
        id
    }

    /// Remove a queued task. Returns it if it had not fired yet.
    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let key = self.queue.keys().find(|(_, task)| *task == id).copied()?;
        self.queue.remove(&key)
    }

    /// Iterate queued tasks in firing order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, u64, &T)> {
        self.queue.iter().map(|((due, id), task)| (*id, *due, task))
    }

    /// Move to `tick` and release every task due at or before it.
    pub fn advance(&mut self, tick: u64) -> Vec<(TaskId, T)> {
        self.current_tick = self.current_tick.max(tick);
        let later = self
            .queue
            .split_off(&(self.current_tick.saturating_add(1), TaskId(0)));
        let due = std::mem::replace(&mut self.queue, later);
        due.into_iter().map(|((_, id), task)| (id, task)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_fire_when_due() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(2, "late");
        scheduler.schedule(0, "now");

        let fired: Vec<_> = scheduler.advance(0).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fired, vec!["now"]);
        assert!(scheduler.advance(1).is_empty());
        let fired: Vec<_> = scheduler.advance(2).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fired, vec!["late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_same_tick_is_fifo() {
        let mut scheduler = Scheduler::new();
        for n in 0..5 {
            scheduler.schedule(3, n);
        }
        let fired: Vec<_> = scheduler.advance(10).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fired, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_due_tick_orders_before_insertion() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(5, 'b');
        scheduler.schedule(1, 'a');
        let fired: Vec<_> = scheduler.advance(5).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fired, vec!['a', 'b']);
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let keep = scheduler.schedule(1, 1);
        let dropped = scheduler.schedule(1, 2);
        assert_eq!(scheduler.cancel(dropped), Some(2));
        assert_eq!(scheduler.cancel(dropped), None);
        let fired = scheduler.advance(1);
        assert_eq!(fired, vec![(keep, 1)]);
        assert_eq!(scheduler.cancel(keep), None);
    }

    #[test]
    fn test_delay_is_relative_to_current_tick() {
        let mut scheduler = Scheduler::new();
        scheduler.advance(10);
        scheduler.schedule(2, ());
        assert!(scheduler.advance(11).is_empty());
        assert_eq!(scheduler.advance(12).len(), 1);
    }

    #[test]
    fn test_time_never_goes_backwards() {
        let mut scheduler: Scheduler<()> = Scheduler::new();
        scheduler.advance(8);
        scheduler.advance(3);
        assert_eq!(scheduler.current_tick(), 8);
    }
}
