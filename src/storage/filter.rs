//! Low-pass filter for displayed transfer power.

/// Default smoothing time constant in seconds.
pub const DEFAULT_TAU_SECONDS: f64 = 2.0;

/// Exponential smoothing of a signed power signal.
///
/// The smoothing factor is `dt / (tau + dt)`, so the response to a step
/// change depends on elapsed simulated time rather than on the number of
/// ticks. A single very long tick (time warp) moves the value almost all the
/// way to the input without overshooting.
///
/// # Examples
///
/// ```
/// use battery_bus_sim::storage::StatusFilter;
///
/// let mut filter = StatusFilter::new(1.0);
/// filter.update(10.0, 1.0);
/// assert_eq!(filter.value(), 5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusFilter {
    tau: f64,
    value: f64,
}

impl StatusFilter {
    /// Creates a filter at rest with time constant `tau` seconds.
    ///
    /// Negative or non-finite `tau` is treated as zero (no smoothing).
    pub fn new(tau: f64) -> Self {
        let tau = if tau.is_finite() { tau.max(0.0) } else { 0.0 };
        Self { tau, value: 0.0 }
    }

    /// Feeds one sample of `power` held for `dt` seconds and returns the new value.
    pub fn update(&mut self, power: f64, dt: f64) -> f64 {
        if !(dt > 0.0 && dt.is_finite()) || !power.is_finite() {
            return self.value;
        }
        let alpha = dt / (self.tau + dt);
        self.value += alpha * (power - self.value);
        self.value
    }

    /// Current smoothed value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Time constant in seconds.
    pub fn tau(&self) -> f64 {
        self.tau
    }
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TAU_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_rest() {
        assert_eq!(StatusFilter::default().value(), 0.0);
    }

    #[test]
    fn converges_to_step_input() {
        let mut filter = StatusFilter::new(2.0);
        for _ in 0..200 {
            filter.update(4.0, 0.1);
        }
        assert!((filter.value() - 4.0).abs() < 1e-3);
    }

    #[test]
    fn response_independent_of_tick_length() {
        // Same simulated time, different tick sizes: the result must be close.
        let mut fine = StatusFilter::new(1.0);
        for _ in 0..100 {
            fine.update(1.0, 0.01);
        }
        let mut coarse = StatusFilter::new(1.0);
        for _ in 0..10 {
            coarse.update(1.0, 0.1);
        }
        assert!((fine.value() - coarse.value()).abs() < 0.05);
    }

    #[test]
    fn huge_tick_does_not_overshoot() {
        let mut filter = StatusFilter::new(2.0);
        filter.update(-8.0, 1e6);
        assert!(filter.value() >= -8.0 && filter.value() < -7.99);
    }

    #[test]
    fn decays_toward_zero() {
        let mut filter = StatusFilter::new(1.0);
        filter.update(10.0, 1.0);
        let before = filter.value();
        filter.update(0.0, 1.0);
        assert!(filter.value().abs() < before.abs());
        assert!(filter.value() > 0.0);
    }

    #[test]
    fn ignores_invalid_samples() {
        let mut filter = StatusFilter::new(1.0);
        filter.update(2.0, 1.0);
        filter.update(f64::NAN, 1.0);
        filter.update(5.0, 0.0);
        filter.update(5.0, -1.0);
        assert_eq!(filter.value(), 1.0);
    }

    #[test]
    fn zero_tau_tracks_input() {
        let mut filter = StatusFilter::new(-3.0);
        assert_eq!(filter.tau(), 0.0);
        filter.update(7.5, 0.02);
        assert_eq!(filter.value(), 7.5);
    }
}
