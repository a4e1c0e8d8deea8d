use foundation::time::Time;

/// Animation-frame metadata supplied by the host.
///
/// This is the timebase for camera flights. Deterministic frames
/// (`Frame::new`) derive time from the index; hosts driven by a real
/// animation-frame clock use `Frame::at`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Delta time since the previous frame (seconds).
    pub dt_s: f64,
    /// Host time at the start of the frame (seconds).
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

    pub fn at(index: u64, time: Time, dt_s: f64) -> Self {
        Self { index, dt_s, time }
    }

    pub fn next(self) -> Self {
        Self::at(self.index + 1, Time(self.time.0 + self.dt_s), self.dt_s)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(0, 1.0 / 60.0)
    }
}
