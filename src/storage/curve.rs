//! Piecewise efficiency curves keyed on SOC or temperature.

use serde::{Deserialize, Serialize};

use crate::error::BatteryError;

/// How values between two neighbouring keys are blended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Straight line between keys.
    #[default]
    Linear,
    /// Smoothstep easing between keys. Never overshoots the key values.
    Smooth,
}

/// A monotonic-domain piecewise function mapping an input to a multiplier in `[0, 1]`.
///
/// Inputs outside the key range evaluate to the nearest edge value; the
/// curve never extrapolates.
///
/// # Examples
///
/// ```
/// use battery_bus_sim::storage::EfficiencyCurve;
///
/// let curve = EfficiencyCurve::new(vec![(0.0, 1.0), (0.5, 1.0), (1.0, 0.5)]).unwrap();
/// assert_eq!(curve.evaluate(0.25), 1.0);
/// assert_eq!(curve.evaluate(0.75), 0.75);
/// assert_eq!(curve.evaluate(1.2), curve.evaluate(1.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveKeys", into = "CurveKeys")]
pub struct EfficiencyCurve {
    keys: Vec<(f64, f64)>,
    interpolation: Interpolation,
}

impl EfficiencyCurve {
    /// Builds a linearly interpolated curve from `(x, y)` keys ordered by `x`.
    ///
    /// # Errors
    ///
    /// Returns [`BatteryError::InvalidCurve`] for an empty key list,
    /// [`BatteryError::UnorderedCurve`] when `x` is non-finite or not strictly
    /// increasing, and [`BatteryError::CurveValueOutOfRange`] when `y` falls
    /// outside `[0, 1]`.
    pub fn new(keys: Vec<(f64, f64)>) -> Result<Self, BatteryError> {
        Self::with_interpolation(keys, Interpolation::Linear)
    }

    /// Builds a curve with an explicit interpolation mode.
    ///
    /// # Errors
    ///
    /// Same as [`EfficiencyCurve::new`].
    pub fn with_interpolation(
        keys: Vec<(f64, f64)>,
        interpolation: Interpolation,
    ) -> Result<Self, BatteryError> {
        if keys.is_empty() {
            return Err(BatteryError::InvalidCurve);
        }

        for (index, &(x, y)) in keys.iter().enumerate() {
            if !x.is_finite() {
                return Err(BatteryError::UnorderedCurve { index });
            }
            if index > 0 && x <= keys[index - 1].0 {
                return Err(BatteryError::UnorderedCurve { index });
            }
            if !(0.0..=1.0).contains(&y) {
                return Err(BatteryError::CurveValueOutOfRange { index, value: y });
            }
        }

        Ok(Self {
            keys,
            interpolation,
        })
    }

    /// A curve that evaluates to `1.0` everywhere.
    pub fn flat() -> Self {
        Self {
            keys: vec![(0.0, 1.0)],
            interpolation: Interpolation::Linear,
        }
    }

    /// Evaluates the curve at `x`, clamping to the edge keys outside the domain.
    ///
    /// A NaN input evaluates to the first key's value.
    pub fn evaluate(&self, x: f64) -> f64 {
        let (first_x, first_y) = self.keys[0];
        let (last_x, last_y) = self.keys[self.keys.len() - 1];

        if x.is_nan() || x <= first_x {
            return first_y;
        }
        if x >= last_x {
            return last_y;
        }

        // First key strictly greater than x; guaranteed 1..len by the edge checks.
        let upper = self.keys.partition_point(|&(kx, _)| kx <= x);
        let (x0, y0) = self.keys[upper - 1];
        let (x1, y1) = self.keys[upper];

        let t = (x - x0) / (x1 - x0);
        let t = match self.interpolation {
            Interpolation::Linear => t,
            Interpolation::Smooth => t * t * (3.0 - 2.0 * t),
        };
        y0 + (y1 - y0) * t
    }

    /// Returns the curve keys.
    pub fn keys(&self) -> &[(f64, f64)] {
        &self.keys
    }

    /// Returns the interpolation mode.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }
}

/// Serialized form: either a bare key list or a table with an interpolation mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CurveKeys {
    Bare(Vec<[f64; 2]>),
    Table {
        keys: Vec<[f64; 2]>,
        #[serde(default)]
        interpolation: Interpolation,
    },
}

impl TryFrom<CurveKeys> for EfficiencyCurve {
    type Error = BatteryError;

    fn try_from(raw: CurveKeys) -> Result<Self, Self::Error> {
        let (keys, interpolation) = match raw {
            CurveKeys::Bare(keys) => (keys, Interpolation::Linear),
            CurveKeys::Table {
                keys,
                interpolation,
            } => (keys, interpolation),
        };
        Self::with_interpolation(
            keys.into_iter().map(|[x, y]| (x, y)).collect(),
            interpolation,
        )
    }
}

impl From<EfficiencyCurve> for CurveKeys {
    fn from(curve: EfficiencyCurve) -> Self {
        let keys = curve.keys.into_iter().map(|(x, y)| [x, y]).collect();
        match curve.interpolation {
            Interpolation::Linear => CurveKeys::Bare(keys),
            interpolation => CurveKeys::Table {
                keys,
                interpolation,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soc_curve() -> EfficiencyCurve {
        EfficiencyCurve::new(vec![(0.0, 1.0), (0.5, 1.0), (0.8, 0.8), (1.0, 0.5)])
            .expect("valid curve")
    }

    #[test]
    fn empty_keys_rejected() {
        assert_eq!(
            EfficiencyCurve::new(Vec::new()),
            Err(BatteryError::InvalidCurve)
        );
    }

    #[test]
    fn unordered_keys_rejected() {
        let err = EfficiencyCurve::new(vec![(0.0, 1.0), (0.5, 0.9), (0.5, 0.8)]);
        assert_eq!(err, Err(BatteryError::UnorderedCurve { index: 2 }));
    }

    #[test]
    fn non_finite_key_rejected() {
        let err = EfficiencyCurve::new(vec![(f64::NAN, 1.0)]);
        assert_eq!(err, Err(BatteryError::UnorderedCurve { index: 0 }));
    }

    #[test]
    fn value_out_of_range_rejected() {
        let err = EfficiencyCurve::new(vec![(0.0, 1.0), (1.0, 1.5)]);
        assert!(matches!(
            err,
            Err(BatteryError::CurveValueOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn single_key_is_constant() {
        let curve = EfficiencyCurve::new(vec![(300.0, 0.7)]).expect("valid curve");
        assert_eq!(curve.evaluate(-10.0), 0.7);
        assert_eq!(curve.evaluate(300.0), 0.7);
        assert_eq!(curve.evaluate(1e9), 0.7);
    }

    #[test]
    fn linear_interpolation_between_keys() {
        let curve = soc_curve();
        assert!((curve.evaluate(0.65) - 0.9).abs() < 1e-12);
        assert!((curve.evaluate(0.9) - 0.65).abs() < 1e-12);
        assert_eq!(curve.evaluate(0.5), 1.0);
    }

    #[test]
    fn clamps_outside_domain() {
        let curve = soc_curve();
        assert_eq!(curve.evaluate(1.2), curve.evaluate(1.0));
        assert_eq!(curve.evaluate(-0.3), curve.evaluate(0.0));
        assert_eq!(curve.evaluate(f64::INFINITY), 0.5);
        assert_eq!(curve.evaluate(f64::NAN), 1.0);
    }

    #[test]
    fn smooth_stays_within_neighbouring_keys() {
        let curve = EfficiencyCurve::with_interpolation(
            vec![(0.0, 0.2), (1.0, 0.8)],
            Interpolation::Smooth,
        )
        .expect("valid curve");
        assert!((curve.evaluate(0.5) - 0.5).abs() < 1e-12);
        for i in 0..=20 {
            let y = curve.evaluate(f64::from(i) / 20.0);
            assert!((0.2..=0.8).contains(&y));
        }
        assert!(curve.evaluate(0.1) < 0.2 + 0.6 * 0.1);
    }

    #[test]
    fn deserializes_bare_and_table_forms() {
        #[derive(Deserialize)]
        struct Holder {
            a: EfficiencyCurve,
            b: EfficiencyCurve,
        }

        let toml = r#"
a = [[0.0, 1.0], [1.0, 0.5]]
b = { keys = [[0.0, 1.0], [1.0, 0.5]], interpolation = "smooth" }
"#;
        let holder: Holder = toml::from_str(toml).expect("curves should parse");
        assert_eq!(holder.a.interpolation(), Interpolation::Linear);
        assert_eq!(holder.b.interpolation(), Interpolation::Smooth);
        assert_eq!(holder.a.keys().len(), 2);
    }

    #[test]
    fn deserialize_rejects_empty_curve() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Holder {
            a: EfficiencyCurve,
        }

        let result: Result<Holder, _> = toml::from_str("a = []");
        assert!(result.is_err());
    }
}
