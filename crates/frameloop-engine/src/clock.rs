//! Host frame timing.
//!
//! Hosts report the time since the previous frame in milliseconds and may
//! report nothing useful on the first frame. Everything downstream works in
//! seconds and must never see a NaN.

/// Replace a NaN frame delta with `0.0`. Every other value passes through.
pub fn sanitize_dt(dt: f64) -> f64 {
    if dt.is_nan() {
        0.0
    } else {
        dt
    }
}

/// Converts host millisecond deltas to seconds and keeps frame totals.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    frames: u64,
    elapsed: f64,
    last_dt: f64,
}

impl FrameClock {
    /// A clock at frame zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a host delta in milliseconds to seconds, sanitized.
    pub fn delta_seconds(host_delta_ms: f64) -> f64 {
        sanitize_dt(host_delta_ms / 1000.0)
    }

    /// Record one host frame and return its delta in seconds.
    pub fn advance(&mut self, host_delta_ms: f64) -> f64 {
        let dt = Self::delta_seconds(host_delta_ms);
        self.frames += 1;
        self.elapsed += dt;
        self.last_dt = dt;
        dt
    }

    /// Host frames recorded so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Total seconds advanced so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Delta of the most recent frame, in seconds.
    pub fn last_dt(&self) -> f64 {
        self.last_dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milliseconds_to_seconds() {
        assert_eq!(FrameClock::delta_seconds(500.0), 0.5);
        assert_eq!(FrameClock::delta_seconds(0.0), 0.0);
    }

    #[test]
    fn nan_delta_becomes_zero() {
        assert_eq!(FrameClock::delta_seconds(f64::NAN), 0.0);
        assert_eq!(sanitize_dt(f64::NAN), 0.0);
        assert_eq!(sanitize_dt(0.25), 0.25);
    }

    #[test]
    fn other_deltas_pass_through() {
        assert_eq!(FrameClock::delta_seconds(-16.0), -0.016);
        assert_eq!(sanitize_dt(-0.5), -0.5);
        assert_eq!(sanitize_dt(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn advance_accumulates() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(250.0), 0.25);
        assert_eq!(clock.advance(f64::NAN), 0.0);
        assert_eq!(clock.advance(750.0), 0.75);
        assert_eq!(clock.frames(), 3);
        assert_eq!(clock.elapsed(), 1.0);
        assert_eq!(clock.last_dt(), 0.75);
    }
}
