//! Battery chemistry table: physical parameters and curves keyed by type.
//!
//! Densities are per tonne of battery mass. A unit's reserve capacity is
//! `mass * energy_density` and its bus rate is `mass * power_density`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BatteryError;
use crate::storage::{BatteryUnit, EfficiencyCurve, ThermalMass, UnitId, UnitParams};

/// Type key of the built-in lead-acid chemistry, the table default.
pub const LEAD_ACID: &str = "lead_acid";
/// Type key of the non-rechargeable lead-acid chemistry.
pub const LEAD_ACID_SINGLE_USE: &str = "lead_acid_single_use";
/// Type key of the built-in lithium-ion chemistry.
pub const LI_ION: &str = "li_ion";

/// Static parameters for one battery chemistry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChemistryParams {
    /// Name shown to operators.
    #[serde(default)]
    pub display_name: String,
    /// Bus energy per second per tonne (kW/t).
    pub power_density: f64,
    /// Reserve energy per tonne (kWh/t).
    pub energy_density: f64,
    /// Fraction of drawn bus energy that reaches the reserve.
    pub charge_efficiency: f64,
    /// Fraction of the discharge rate usable while charging.
    pub charge_ratio: f64,
    /// Bus fill fraction above which surplus charges the reserve.
    pub high_level: f64,
    /// Bus fill fraction below which the reserve discharges.
    pub low_level: f64,
    /// Fraction of squared transfer power turned into heat.
    pub thermal_losses: f64,
    /// Core temperature the host regulates toward (K).
    pub core_temp_goal: f64,
    /// Seconds of full-rate discharge the unit adds to bus capacity.
    pub bus_buffer_ratio: f64,
    /// Rate multiplier by state of charge.
    pub soc_curve: EfficiencyCurve,
    /// Rate multiplier by core temperature (K).
    pub temperature_curve: EfficiencyCurve,
}

/// Partial chemistry from a scenario's `[chemistry.<type>]` section.
///
/// Unset fields keep the value of the chemistry being overridden, or of the
/// table default when the type is new.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChemistryOverride {
    pub display_name: Option<String>,
    pub power_density: Option<f64>,
    pub energy_density: Option<f64>,
    pub charge_efficiency: Option<f64>,
    pub charge_ratio: Option<f64>,
    pub high_level: Option<f64>,
    pub low_level: Option<f64>,
    pub thermal_losses: Option<f64>,
    pub core_temp_goal: Option<f64>,
    pub bus_buffer_ratio: Option<f64>,
    pub soc_curve: Option<EfficiencyCurve>,
    pub temperature_curve: Option<EfficiencyCurve>,
}

impl ChemistryOverride {
    /// Returns `base` with every set field replaced.
    pub fn apply(&self, base: &ChemistryParams) -> ChemistryParams {
        ChemistryParams {
            display_name: self
                .display_name
                .clone()
                .unwrap_or_else(|| base.display_name.clone()),
            power_density: self.power_density.unwrap_or(base.power_density),
            energy_density: self.energy_density.unwrap_or(base.energy_density),
            charge_efficiency: self.charge_efficiency.unwrap_or(base.charge_efficiency),
            charge_ratio: self.charge_ratio.unwrap_or(base.charge_ratio),
            high_level: self.high_level.unwrap_or(base.high_level),
            low_level: self.low_level.unwrap_or(base.low_level),
            thermal_losses: self.thermal_losses.unwrap_or(base.thermal_losses),
            core_temp_goal: self.core_temp_goal.unwrap_or(base.core_temp_goal),
            bus_buffer_ratio: self.bus_buffer_ratio.unwrap_or(base.bus_buffer_ratio),
            soc_curve: self
                .soc_curve
                .clone()
                .unwrap_or_else(|| base.soc_curve.clone()),
            temperature_curve: self
                .temperature_curve
                .clone()
                .unwrap_or_else(|| base.temperature_curve.clone()),
        }
    }
}

impl ChemistryParams {
    /// Derives unit parameters for a battery of `mass` tonnes.
    pub fn unit_params(&self, mass: f64, priority: i32) -> UnitParams {
        let discharge_rate = mass * self.power_density;
        UnitParams {
            capacity: mass * self.energy_density,
            discharge_rate,
            charge_ratio: self.charge_ratio,
            charge_efficiency: self.charge_efficiency,
            thermal_losses: self.thermal_losses,
            priority,
            soc_curve: self.soc_curve.clone(),
            temperature_curve: self.temperature_curve.clone(),
            bus_buffer: discharge_rate * self.bus_buffer_ratio,
        }
    }

    /// Builds a unit of `mass` tonnes filled to `initial_soc`.
    ///
    /// # Errors
    ///
    /// Returns [`BatteryError::InitialChargeOutOfRange`] if `initial_soc` is
    /// outside `[0, 1]`.
    pub fn build_unit(
        &self,
        id: UnitId,
        name: impl Into<String>,
        mass: f64,
        priority: i32,
        initial_soc: f64,
    ) -> Result<BatteryUnit, BatteryError> {
        let params = self.unit_params(mass, priority);
        let stored = params.capacity * initial_soc;
        if !(0.0..=1.0).contains(&initial_soc) {
            return Err(BatteryError::InitialChargeOutOfRange {
                stored,
                capacity: params.capacity,
            });
        }
        BatteryUnit::new(id, name, params, stored)
    }

    /// Like [`ChemistryParams::build_unit`], with a thermal sink at `temperature`
    /// regulating toward this chemistry's core goal.
    ///
    /// # Errors
    ///
    /// Same as [`ChemistryParams::build_unit`].
    pub fn build_thermal_unit(
        &self,
        id: UnitId,
        name: impl Into<String>,
        mass: f64,
        priority: i32,
        initial_soc: f64,
        temperature: f64,
    ) -> Result<BatteryUnit, BatteryError> {
        let sink = ThermalMass::for_mass(mass, temperature, self.core_temp_goal);
        Ok(self
            .build_unit(id, name, mass, priority, initial_soc)?
            .with_thermal(Box::new(sink)))
    }

    fn lead_acid() -> Self {
        Self {
            display_name: "Lead Acid".to_string(),
            power_density: 400.0,
            energy_density: 20.0,
            charge_efficiency: 0.9,
            charge_ratio: 0.1,
            high_level: 0.9,
            low_level: 0.1,
            thermal_losses: 0.1,
            core_temp_goal: 320.0,
            bus_buffer_ratio: 1.0,
            soc_curve: builtin_curve(&[(0.0, 1.0), (0.5, 1.0), (0.8, 0.8), (1.0, 0.5)]),
            temperature_curve: builtin_curve(&[
                (0.0, 0.5),
                (200.0, 0.5),
                (250.0, 0.5),
                (300.0, 1.0),
                (350.0, 1.0),
                (400.0, 0.3),
                (500.0, 0.0),
            ]),
        }
    }

    fn lead_acid_single_use() -> Self {
        Self {
            display_name: "Single use Lead Acid".to_string(),
            charge_ratio: 0.0,
            ..Self::lead_acid()
        }
    }

    fn li_ion() -> Self {
        Self {
            display_name: "Li Ion".to_string(),
            power_density: 1800.0,
            energy_density: 180.0,
            charge_efficiency: 0.95,
            charge_ratio: 1.0,
            high_level: 0.9,
            low_level: 0.1,
            thermal_losses: 0.1,
            core_temp_goal: 340.0,
            bus_buffer_ratio: 1.0,
            soc_curve: builtin_curve(&[(0.0, 1.0), (0.5, 1.0), (0.9, 0.8), (1.0, 0.7)]),
            temperature_curve: builtin_curve(&[
                (0.0, 0.5),
                (200.0, 0.5),
                (250.0, 0.5),
                (280.0, 1.0),
                (340.0, 1.0),
                (360.0, 0.7),
                (410.0, 0.0),
            ]),
        }
    }
}

/// Built-in keys are sorted and within `[0, 1]`; fall back to a flat curve
/// rather than panic if that ever stops holding.
fn builtin_curve(keys: &[(f64, f64)]) -> EfficiencyCurve {
    EfficiencyCurve::new(keys.to_vec()).unwrap_or_else(|_| EfficiencyCurve::flat())
}

/// Chemistry parameters keyed by type name, with a designated default.
#[derive(Debug, Clone, PartialEq)]
pub struct ChemistryTable {
    entries: BTreeMap<String, ChemistryParams>,
    default_type: String,
}

impl ChemistryTable {
    /// An empty table whose default is `default_type`.
    pub fn empty(default_type: impl Into<String>) -> Self {
        Self {
            entries: BTreeMap::new(),
            default_type: default_type.into(),
        }
    }

    /// The built-in lead-acid, single-use lead-acid, and Li-ion chemistries.
    pub fn builtin() -> Self {
        let mut table = Self::empty(LEAD_ACID);
        table.insert(LEAD_ACID, ChemistryParams::lead_acid());
        table.insert(LEAD_ACID_SINGLE_USE, ChemistryParams::lead_acid_single_use());
        table.insert(LI_ION, ChemistryParams::li_ion());
        table
    }

    /// Adds or replaces a chemistry.
    pub fn insert(&mut self, type_name: impl Into<String>, params: ChemistryParams) {
        self.entries.insert(type_name.into(), params);
    }

    /// Merges `overlay` into `type_name`.
    ///
    /// A new type starts from the default type's parameters and is displayed
    /// under its own key unless the overlay names it.
    pub fn apply_override(&mut self, type_name: &str, overlay: &ChemistryOverride) {
        let existing = self.entries.get(type_name);
        let is_new = existing.is_none();
        let base = existing
            .or_else(|| self.entries.get(&self.default_type))
            .cloned()
            .unwrap_or_else(ChemistryParams::lead_acid);

        let mut params = overlay.apply(&base);
        if is_new && overlay.display_name.is_none() {
            params.display_name = type_name.to_string();
        }
        self.insert(type_name, params);
    }

    /// Looks up `type_name`, falling back to the default type when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`BatteryError::MissingChemistry`] if neither exists.
    pub fn lookup(&self, type_name: &str) -> Result<&ChemistryParams, BatteryError> {
        if let Some(params) = self.entries.get(type_name) {
            return Ok(params);
        }
        match self.entries.get(&self.default_type) {
            Some(params) => {
                tracing::warn!(
                    requested = type_name,
                    default = %self.default_type,
                    "unknown battery chemistry, using default"
                );
                Ok(params)
            }
            None => Err(BatteryError::MissingChemistry {
                requested: type_name.to_string(),
                default: self.default_type.clone(),
            }),
        }
    }

    /// Whether `type_name` is present without fallback.
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// The type that follows `type_name` in sorted order, wrapping to the first.
    ///
    /// Unknown names also yield the first type. Returns `None` for an empty table.
    pub fn next_type(&self, type_name: &str) -> Option<&str> {
        use std::ops::Bound::{Excluded, Unbounded};

        let known = self.entries.contains_key(type_name);
        let next = if known {
            self.entries
                .range::<str, _>((Excluded(type_name), Unbounded))
                .next()
        } else {
            None
        };
        next.or_else(|| self.entries.iter().next())
            .map(|(name, _)| name.as_str())
    }

    /// Operator-facing name for `type_name`, or `"unknown"`.
    pub fn display_name(&self, type_name: &str) -> &str {
        self.entries
            .get(type_name)
            .map_or("unknown", |p| p.display_name.as_str())
    }

    /// The designated default type.
    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    /// Iterates `(type, params)` in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChemistryParams)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of chemistries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no chemistries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ChemistryTable {
    fn default() -> Self {
        Self::builtin()
    }
}
