//! Debounce policy for profile writes.
//!
//! The throttle owns no timer; callers pass the current monotonic time on
//! every call and act on the returned decision.

#[derive(Clone, Debug)]
pub struct WriteThrottle {
    min_interval_secs: f64,
    last_persisted_secs: f64,
    pending: bool,
}

impl WriteThrottle {
    /// Creates a throttle; negative intervals are treated as zero.
    pub fn new(min_interval_secs: f64) -> Self {
        Self {
            min_interval_secs: min_interval_secs.max(0.0),
            last_persisted_secs: f64::NEG_INFINITY,
            pending: false,
        }
    }

    pub fn min_interval_secs(&self) -> f64 {
        self.min_interval_secs
    }

    pub fn last_persisted_secs(&self) -> Option<f64> {
        self.last_persisted_secs
            .is_finite()
            .then_some(self.last_persisted_secs)
    }

    pub fn has_pending_request(&self) -> bool {
        self.pending
    }

    /// Returns `true` when the caller should write now. A deferred request
    /// is remembered as pending.
    pub fn request(&mut self, now_secs: f64, force_immediate: bool) -> bool {
        if force_immediate || self.can_persist(now_secs) {
            return true;
        }
        self.pending = true;
        false
    }

    /// Returns `true` when a pending request became eligible. The pending
    /// flag is only cleared by [`WriteThrottle::mark_persisted`].
    pub fn try_flush(&self, now_secs: f64) -> bool {
        self.pending && self.can_persist(now_secs)
    }

    /// Records one successful write.
    pub fn mark_persisted(&mut self, now_secs: f64) {
        self.last_persisted_secs = now_secs;
        self.pending = false;
    }

    /// Re-arms the pending flag after a failed write without touching timing.
    pub fn mark_pending(&mut self) {
        self.pending = true;
    }

    fn can_persist(&self, now_secs: f64) -> bool {
        if self.min_interval_secs <= 0.0 {
            return true;
        }
        now_secs - self.last_persisted_secs >= self.min_interval_secs
    }
}
