//! Cancellable timer queue driven by a host-supplied clock.
//!
//! Nothing fires on its own: the owner calls [`Scheduler::pop_due`] with the
//! current time and handles what comes back. A cancelled task is removed
//! from the queue, so it can never be returned afterwards.

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// A task whose deadline has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    pub id: TaskId,
    pub due_ms: u64,
    pub payload: T,
}

#[derive(Debug, Clone)]
struct ScheduledTask<T> {
    id: TaskId,
    due_ms: u64,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tasks: Vec<ScheduledTask<T>>,
    next_id: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire at `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, payload: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(ScheduledTask {
            id,
            due_ms,
            payload,
        });
        id
    }

    /// Cancel one task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Cancel every task whose payload matches `predicate`.
    pub fn cancel_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.tasks.len();
        self.tasks.retain(|t| !predicate(&t.payload));
        before - self.tasks.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.tasks.len();
        self.tasks.clear();
        cancelled
    }

    /// Remove and return the earliest task due at or before `now_ms`.
    /// Ties go to the task scheduled first.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Fired<T>> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.id))
            .map(|(i, _)| i)?;
        let task = self.tasks.remove(index);
        Some(Fired {
            id: task.id,
            due_ms: task.due_ms,
            payload: task.payload,
        })
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<u64> {
        self.tasks.iter().map(|t| t.due_ms).min()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
