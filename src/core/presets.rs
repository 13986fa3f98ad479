//! Continuous-infusion drug presets.
//!
//! A preset supplies the usual syringe composition and the unit the dose is
//! charted in. Reference thresholds are clinical configuration, not
//! pharmacology: the table here is only a default and can be replaced from
//! the settings file.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CalcError;
use crate::models::form::Field;

/// Weight-normalised dose unit a drug is charted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoseUnit {
    #[default]
    #[serde(rename = "ug/kg/min")]
    McgPerKgPerMin,
    #[serde(rename = "ug/kg/h")]
    McgPerKgPerHour,
    #[serde(rename = "mg/kg/h")]
    MgPerKgPerHour,
}

impl DoseUnit {
    /// Weight-normalised dose for a mass rate in mg/h.
    pub fn from_mass_rate(self, mg_per_hour: f64, weight_kg: f64) -> f64 {
        match self {
            DoseUnit::McgPerKgPerMin => mg_per_hour * 1000.0 / (weight_kg * 60.0),
            DoseUnit::McgPerKgPerHour => mg_per_hour * 1000.0 / weight_kg,
            DoseUnit::MgPerKgPerHour => mg_per_hour / weight_kg,
        }
    }

    /// Mass rate in mg/h for a weight-normalised dose.
    pub fn to_mass_rate(self, dose: f64, weight_kg: f64) -> f64 {
        match self {
            DoseUnit::McgPerKgPerMin => dose * 60.0 * weight_kg / 1000.0,
            DoseUnit::McgPerKgPerHour => dose * weight_kg / 1000.0,
            DoseUnit::MgPerKgPerHour => dose * weight_kg,
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseUnit::McgPerKgPerMin => f.write_str("μg/kg/min"),
            DoseUnit::McgPerKgPerHour => f.write_str("μg/kg/h"),
            DoseUnit::MgPerKgPerHour => f.write_str("mg/kg/h"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugPreset {
    pub name: String,
    pub drug_mg: f64,
    pub solvent_ml: f64,
    #[serde(default)]
    pub unit: DoseUnit,
    /// Advisory upper reference in `unit`; never blocks a result.
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl DrugPreset {
    fn new(name: &str, drug_mg: f64, solvent_ml: f64, unit: DoseUnit, threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            drug_mg,
            solvent_ml,
            unit,
            threshold: Some(threshold),
        }
    }

    pub fn defaults(&self) -> PresetDefaults {
        PresetDefaults {
            drug_mg: self.drug_mg,
            solvent_ml: self.solvent_ml,
        }
    }
}

/// Syringe composition a preset fills in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetDefaults {
    pub drug_mg: f64,
    pub solvent_ml: f64,
}

/// Lookup table of drug presets, matched by case-insensitive name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetTable {
    presets: Vec<DrugPreset>,
}

impl PresetTable {
    pub fn new(presets: Vec<DrugPreset>) -> Self {
        Self { presets }
    }

    pub fn get(&self, name: &str) -> Option<&DrugPreset> {
        let name = name.trim();
        self.presets.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Composition for `name`; an unknown name is invalid input.
    pub fn preset_defaults(&self, name: &str) -> Result<PresetDefaults, CalcError> {
        self.get(name)
            .map(DrugPreset::defaults)
            .ok_or_else(|| CalcError::invalid(Field::DrugPreset, format!("unknown drug preset `{}`", name)))
    }

    /// Resolve the preset named on a form, if any.
    pub fn resolve(&self, name: Option<&str>) -> Result<Option<&DrugPreset>, CalcError> {
        match name {
            None => Ok(None),
            Some(name) => self
                .get(name)
                .map(Some)
                .ok_or_else(|| CalcError::invalid(Field::DrugPreset, format!("unknown drug preset `{}`", name))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrugPreset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        use DoseUnit::*;

        Self::new(vec![
            DrugPreset::new("Norepinephrine", 5.0, 50.0, McgPerKgPerMin, 0.3),
            DrugPreset::new("Epinephrine", 5.0, 50.0, McgPerKgPerMin, 0.3),
            DrugPreset::new("Dopamine", 150.0, 50.0, McgPerKgPerMin, 10.0),
            DrugPreset::new("Dobutamine", 150.0, 50.0, McgPerKgPerMin, 10.0),
            DrugPreset::new("Nicardipine", 50.0, 50.0, McgPerKgPerMin, 5.0),
            DrugPreset::new("Propofol", 500.0, 50.0, MgPerKgPerHour, 4.0),
            DrugPreset::new("Midazolam", 50.0, 50.0, MgPerKgPerHour, 0.2),
            DrugPreset::new("Dexmedetomidine", 0.2, 50.0, McgPerKgPerHour, 0.7),
            DrugPreset::new("Fentanyl", 0.5, 50.0, McgPerKgPerHour, 2.0),
        ])
    }
}
