use foundation::time::Time;

/// One tick of the frame loop.
///
/// Time is derived from the index and a fixed step, never from a wall clock,
/// so two runs with the same step see the same frame times.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub index: u64,
    /// Fixed step (seconds).
    pub dt_s: f64,
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self {
            index,
            dt_s,
            time: Time(index as f64 * dt_s),
        }
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }
}
