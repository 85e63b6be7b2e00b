//! Error types for battery construction and configuration loading.

/// Errors raised while building curves, chemistries, or battery units.
///
/// Numeric clamps during transfers are never errors; these variants only
/// describe configuration that cannot produce a working battery.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatteryError {
    /// The curve was given no keys at all.
    #[error("efficiency curve has no keys")]
    InvalidCurve,

    /// A curve key's x value is non-finite or not strictly increasing.
    #[error("efficiency curve key {index} is not strictly increasing in x")]
    UnorderedCurve { index: usize },

    /// A curve key's y value lies outside `[0, 1]`.
    #[error("efficiency curve key {index} has value {value} outside [0, 1]")]
    CurveValueOutOfRange { index: usize, value: f64 },

    /// Neither the requested chemistry nor the table default exists.
    #[error("no chemistry named \"{requested}\" and default \"{default}\" is missing")]
    MissingChemistry { requested: String, default: String },

    /// Persisted reserve energy does not fit the unit's capacity.
    #[error("stored energy {stored} outside [0, {capacity}]")]
    InitialChargeOutOfRange { stored: f64, capacity: f64 },
}
