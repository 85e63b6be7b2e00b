use rand::{Rng, SeedableRng, rngs::StdRng};

/// Net bus production profile for stand-alone runs.
///
/// Models a host that produces a constant `generation` per second while a
/// consumer draws a sinusoidally varying load around `load`:
///
/// `net = generation - load * (1 + sin(2π t / period + phase)) + noise`
///
/// Positive net energy is production onto the bus.
///
/// # Examples
///
/// ```
/// use battery_bus_sim::sim::profile::BusProfile;
///
/// let mut profile = BusProfile::new(10.0, 5.0, 60.0, 0.0, 0.0, 42);
/// // At t = 0 the sine term is zero: 10 - 5 = 5 per second.
/// assert!((profile.net_energy(0.0, 2.0) - 10.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct BusProfile {
    /// Constant production per second (bus units/s).
    pub generation: f64,
    /// Mean consumption per second (bus units/s).
    pub load: f64,
    /// Load cycle period in seconds.
    pub period_seconds: f64,
    /// Load phase offset in radians.
    pub phase_rad: f64,
    /// Standard deviation of the per-second noise (bus units/s).
    pub noise_std: f64,
    rng: StdRng,
}

impl BusProfile {
    /// Creates a profile; non-positive periods are raised to one second.
    pub fn new(
        generation: f64,
        load: f64,
        period_seconds: f64,
        phase_rad: f64,
        noise_std: f64,
        seed: u64,
    ) -> Self {
        Self {
            generation,
            load,
            period_seconds: if period_seconds > 0.0 { period_seconds } else { 1.0 },
            phase_rad,
            noise_std,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Net energy produced onto the bus over `dt` seconds starting at `elapsed`.
    pub fn net_energy(&mut self, elapsed: f64, dt: f64) -> f64 {
        let angle = 2.0 * std::f64::consts::PI * elapsed / self.period_seconds + self.phase_rad;
        let demand = (self.load * (1.0 + angle.sin())).max(0.0);
        let noise = gaussian_noise(&mut self.rng, self.noise_std);
        (self.generation - demand + noise) * dt
    }
}

/// Gaussian noise with mean 0 via the Box-Muller transform.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if !(std_dev > 0.0) {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}
