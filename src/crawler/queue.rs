use std::collections::VecDeque;
use std::sync::Mutex;

/// FIFO task queue shared by all workers
///
/// Tasks leave the queue in the order they were seeded; completion order is
/// up to the workers.
#[derive(Debug)]
pub struct TaskQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> TaskQueue<T> {
    pub fn new(tasks: impl IntoIterator<Item = T>) -> Self {
        Self {
            inner: Mutex::new(tasks.into_iter().collect()),
        }
    }

    /// Takes the next task, if any
    pub fn pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Number of tasks not yet taken
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking worker cannot leave the deque half-modified, so a poisoned
    // lock still guards a consistent queue.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
