use crate::frame::Frame;
use crate::job::Job;

type Deferred<C> = Box<dyn FnOnce(&mut C)>;

/// Default fixed frame delta (60 Hz).
pub const DEFAULT_FRAME_DT_S: f64 = 1.0 / 60.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TickSummary {
    pub frame: Frame,
    pub ran_jobs: usize,
    pub ran_deferred: usize,
}

/// Caller-driven frame loop over a context `C`.
///
/// The owner calls [`Scheduler::tick`] once per animation frame. Each tick runs
/// every registered job, then the one-shots that were deferred before the tick
/// started. One-shots deferred while a tick is running wait for the next tick.
/// After [`Scheduler::stop`] ticks do nothing.
pub struct Scheduler<C> {
    next_frame: Frame,
    next_order: u64,
    jobs: Vec<(u64, Job<C>)>,
    deferred: Vec<Deferred<C>>,
    stopped: bool,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self::with_frame_dt(DEFAULT_FRAME_DT_S)
    }

    pub fn with_frame_dt(dt_s: f64) -> Self {
        Self {
            next_frame: Frame::new(0, dt_s),
            next_order: 0,
            jobs: Vec::new(),
            deferred: Vec::new(),
            stopped: false,
        }
    }

    pub fn add_job(&mut self, job: Job<C>) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.jobs.push((order, job));
        // Total ordering: (priority, id, insertion_order). This stays deterministic even if
        // callers register duplicate job ids.
        self.jobs.sort_by(|(oa, a), (ob, b)| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.id.cmp(b.id))
                .then_with(|| oa.cmp(ob))
        });
    }

    /// Removes every job registered under `id`. Returns how many were removed.
    pub fn remove_job(&mut self, id: &str) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|(_, job)| job.id != id);
        before - self.jobs.len()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Queues a one-shot to run at the end of the next tick.
    pub fn defer(&mut self, task: impl FnOnce(&mut C) + 'static) {
        self.deferred.push(Box::new(task));
    }

    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Stops the loop: later ticks are no-ops and queued one-shots are dropped.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.deferred.clear();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The frame the next tick will run.
    pub fn next_frame(&self) -> Frame {
        self.next_frame
    }

    /// Runs one frame. Returns `None` once the scheduler has been stopped.
    pub fn tick(&mut self, ctx: &mut C) -> Option<TickSummary> {
        if self.stopped {
            return None;
        }

        let frame = self.next_frame;
        self.next_frame = frame.next();
        let due = std::mem::take(&mut self.deferred);

        for (_order, job) in &mut self.jobs {
            (job.run)(frame, ctx);
        }

        let ran_deferred = due.len();
        for task in due {
            task(ctx);
        }

        Some(TickSummary {
            frame,
            ran_jobs: self.jobs.len(),
            ran_deferred,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Scheduler;
    use crate::frame::Frame;
    use crate::job::Job;

    fn push(tag: &'static str) -> impl FnMut(Frame, &mut Vec<String>) {
        move |frame, log| log.push(format!("{tag}@{}", frame.index))
    }

    #[test]
    fn runs_jobs_in_stable_id_order() {
        let mut sched = Scheduler::new();
        sched.add_job(Job::new("b", push("b")));
        sched.add_job(Job::new("a", push("a")));

        let mut log = Vec::new();
        sched.tick(&mut log);
        assert_eq!(log, vec!["a@0", "b@0"]);
    }

    #[test]
    fn runs_duplicate_ids_in_insertion_order() {
        let mut sched = Scheduler::new();
        sched.add_job(Job::new("a", push("first")));
        sched.add_job(Job::new("a", push("second")));

        let mut log = Vec::new();
        sched.tick(&mut log);
        assert_eq!(log, vec!["first@0", "second@0"]);
    }

    #[test]
    fn runs_higher_priority_first() {
        let mut sched = Scheduler::new();
        sched.add_job(Job::with_priority("a", 10, push("a")));
        sched.add_job(Job::with_priority("b", -1, push("b")));

        let mut log = Vec::new();
        sched.tick(&mut log);
        assert_eq!(log, vec!["b@0", "a@0"]);
    }

    #[test]
    fn frames_advance_per_tick() {
        let mut sched = Scheduler::new();
        sched.add_job(Job::new("a", push("a")));

        let mut log = Vec::new();
        let first = sched.tick(&mut log).expect("running");
        let second = sched.tick(&mut log).expect("running");
        assert_eq!(first.frame.index, 0);
        assert_eq!(second.frame.index, 1);
        assert_eq!(log, vec!["a@0", "a@1"]);
    }

    #[test]
    fn deferred_runs_after_jobs_of_the_next_tick() {
        let mut sched: Scheduler<Vec<String>> = Scheduler::new();
        sched.add_job(Job::new("job", push("job")));
        sched.defer(|log| log.push("deferred".to_string()));
        assert_eq!(sched.pending_deferred(), 1);

        let mut log = Vec::new();
        let summary = sched.tick(&mut log).expect("running");
        assert_eq!(summary.ran_deferred, 1);
        sched.tick(&mut log);
        assert_eq!(log, vec!["job@0", "deferred", "job@1"]);
    }

    #[test]
    fn stop_makes_ticks_no_ops() {
        let mut sched = Scheduler::new();
        sched.add_job(Job::new("a", push("a")));
        sched.defer(|log: &mut Vec<String>| log.push("never".to_string()));
        sched.stop();

        let mut log = Vec::new();
        assert!(sched.tick(&mut log).is_none());
        assert!(log.is_empty());
        assert!(sched.is_stopped());
    }

    #[test]
    fn remove_job_drops_all_matching_ids() {
        let mut sched: Scheduler<Vec<String>> = Scheduler::new();
        sched.add_job(Job::new("a", push("a1")));
        sched.add_job(Job::new("a", push("a2")));
        sched.add_job(Job::new("b", push("b")));
        assert_eq!(sched.remove_job("a"), 2);
        assert_eq!(sched.job_count(), 1);
    }
}
