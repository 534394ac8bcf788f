use crate::frame::Frame;

pub type JobFn<C> = Box<dyn FnMut(Frame, &mut C)>;

/// A per-frame unit of work executed by the [`Scheduler`](crate::Scheduler).
///
/// Jobs run every tick in a stable order based on their `(priority, id)`.
pub struct Job<C> {
    pub id: &'static str,
    /// Smaller values run earlier.
    pub priority: i32,
    pub run: JobFn<C>,
}

impl<C> Job<C> {
    pub fn new(id: &'static str, run: impl FnMut(Frame, &mut C) + 'static) -> Self {
        Self::with_priority(id, 0, run)
    }

    pub fn with_priority(
        id: &'static str,
        priority: i32,
        run: impl FnMut(Frame, &mut C) + 'static,
    ) -> Self {
        Self {
            id,
            priority,
            run: Box::new(run),
        }
    }
}

impl<C> std::fmt::Debug for Job<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
