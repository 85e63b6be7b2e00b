/// A fixed-tick simulation clock with a time-warp multiplier.
///
/// Each tick advances simulated time by `tick_seconds * warp`. Warp lets a
/// run cover long stretches with few, large ticks.
///
/// # Examples
///
/// ```
/// use battery_bus_sim::sim::clock::TickClock;
///
/// let mut clock = TickClock::new(3, 0.5, 4.0);
/// let mut ticks = Vec::new();
///
/// clock.run(|tick, elapsed| ticks.push((tick, elapsed)));
/// assert_eq!(ticks, vec![(0, 0.0), (1, 2.0), (2, 4.0)]);
/// ```
#[derive(Debug, Clone)]
pub struct TickClock {
    /// Current tick index
    current: usize,
    /// Total ticks to run
    total: usize,
    /// Effective seconds per tick
    dt: f64,
}

impl TickClock {
    /// Creates a clock running `total` ticks of `tick_seconds * warp` each.
    ///
    /// # Panics
    ///
    /// Panics if the effective tick length is not a positive finite number.
    pub fn new(total: usize, tick_seconds: f64, warp: f64) -> Self {
        let dt = tick_seconds * warp;
        assert!(dt > 0.0 && dt.is_finite(), "effective tick length must be > 0");
        Self { current: 0, total, dt }
    }

    /// Effective seconds per tick.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Seconds simulated so far.
    pub fn elapsed(&self) -> f64 {
        self.current as f64 * self.dt
    }

    /// Advances one tick.
    ///
    /// Returns the tick index and the simulated time at its start, or `None`
    /// once all ticks have run.
    pub fn tick(&mut self) -> Option<(usize, f64)> {
        if self.current < self.total {
            let tick = self.current;
            let elapsed = self.elapsed();
            self.current += 1;
            Some((tick, elapsed))
        } else {
            None
        }
    }

    /// Runs `f` for every remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(usize, f64)) {
        while let Some((tick, elapsed)) = self.tick() {
            f(tick, elapsed);
        }
    }
}
