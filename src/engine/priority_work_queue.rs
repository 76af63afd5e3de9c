use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::chain::StepIndex;

/// A ready step waiting for a free worker slot.
#[derive(Debug, Clone, Copy)]
pub struct PrioritizedTask {
    pub step: StepIndex,
    pub wave: usize,
}

impl PrioritizedTask {
    pub fn new(step: StepIndex, wave: usize) -> Self {
        Self { step, wave }
    }

    fn key(&self) -> (usize, StepIndex) {
        (self.wave, self.step)
    }
}

impl PartialEq for PrioritizedTask {
    fn eq(&self, other: &Self) -> bool {
        self.step == other.step
    }
}

impl Eq for PrioritizedTask {}

impl PartialOrd for PrioritizedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Ready queue: lowest wave first, then declaration order.
///
/// Readiness is decided by the executor's dependency counts; the ordering
/// here only makes dispatch deterministic when more steps are ready than
/// there are free workers.
#[derive(Debug, Default)]
pub struct PriorityWorkQueue {
    heap: BinaryHeap<Reverse<PrioritizedTask>>,
}

impl PriorityWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: PrioritizedTask) {
        self.heap.push(Reverse(task));
    }

    pub fn extend<I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = PrioritizedTask>,
    {
        self.heap.extend(tasks.into_iter().map(Reverse));
    }

    pub fn pop(&mut self) -> Option<PrioritizedTask> {
        self.heap.pop().map(|Reverse(task)| task)
    }

    pub fn peek(&self) -> Option<&PrioritizedTask> {
        self.heap.peek().map(|Reverse(task)| task)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Drop every queued task, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.heap.len();
        self.heap.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(step: usize, wave: usize) -> PrioritizedTask {
        PrioritizedTask::new(StepIndex::new(step), wave)
    }

    #[test]
    fn test_lower_wave_first() {
        let mut queue = PriorityWorkQueue::new();
        queue.push(task(0, 2));
        queue.push(task(1, 0));
        queue.push(task(2, 1));

        assert_eq!(queue.pop().map(|t| t.wave), Some(0));
        assert_eq!(queue.pop().map(|t| t.wave), Some(1));
        assert_eq!(queue.pop().map(|t| t.wave), Some(2));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let mut queue = PriorityWorkQueue::new();
        queue.extend([task(5, 1), task(3, 1), task(4, 1)]);

        assert_eq!(queue.peek().map(|t| t.step), Some(StepIndex::new(3)));
        let order: Vec<usize> = std::iter::from_fn(|| queue.pop())
            .map(|t| t.step.index())
            .collect();
        assert_eq!(order, vec![3, 4, 5]);
    }

    #[test]
    fn test_clear_reports_dropped_tasks() {
        let mut queue = PriorityWorkQueue::new();
        queue.extend([task(0, 0), task(1, 0)]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }
}
