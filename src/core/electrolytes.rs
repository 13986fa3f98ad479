//! mg/dL ↔ mmol/L ↔ mEq/L conversion for the common electrolytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CalcError;
use crate::models::form::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ion {
    Na,
    K,
    Cl,
    Ca,
    Mg,
    P,
}

impl Ion {
    pub const ALL: [Ion; 6] = [Ion::Na, Ion::K, Ion::Cl, Ion::Ca, Ion::Mg, Ion::P];

    /// g/mol
    pub fn molar_mass(&self) -> f64 {
        match self {
            Ion::Na => 22.99,
            Ion::K => 39.10,
            Ion::Cl => 35.45,
            Ion::Ca => 40.08,
            Ion::Mg => 24.31,
            Ion::P => 30.97,
        }
    }

    /// Charge per mmol. Phosphate is a pH-dependent mix of HPO4²⁻ and
    /// H2PO4⁻; 1.8 is the usual value at pH 7.4.
    pub fn valence(&self) -> f64 {
        match self {
            Ion::Na | Ion::K | Ion::Cl => 1.0,
            Ion::Ca | Ion::Mg => 2.0,
            Ion::P => 1.8,
        }
    }
}

impl FromStr for Ion {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "na" | "sodium" => Ok(Ion::Na),
            "k" | "potassium" => Ok(Ion::K),
            "cl" | "chloride" => Ok(Ion::Cl),
            "ca" | "calcium" => Ok(Ion::Ca),
            "mg" | "magnesium" => Ok(Ion::Mg),
            "p" | "ip" | "phosphate" | "phosphorus" => Ok(Ion::P),
            other => Err(CalcError::invalid(
                Field::Ion,
                format!("`{}` is not one of Na, K, Cl, Ca, Mg, P", other),
            )),
        }
    }
}

impl fmt::Display for Ion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Ion::Na => "Na",
            Ion::K => "K",
            Ion::Cl => "Cl",
            Ion::Ca => "Ca",
            Ion::Mg => "Mg",
            Ion::P => "P",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcentrationUnit {
    #[serde(rename = "mg/dL")]
    MgPerDl,
    #[serde(rename = "mmol/L")]
    MmolPerL,
    #[serde(rename = "mEq/L")]
    MeqPerL,
}

impl FromStr for ConcentrationUnit {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mg/dl" | "mgdl" | "mg_dl" => Ok(ConcentrationUnit::MgPerDl),
            "mmol/l" | "mmoll" | "mmol_l" | "mm" => Ok(ConcentrationUnit::MmolPerL),
            "meq/l" | "meql" | "meq_l" => Ok(ConcentrationUnit::MeqPerL),
            other => Err(CalcError::invalid(
                Field::Unit,
                format!("`{}` is not one of mg/dL, mmol/L, mEq/L", other),
            )),
        }
    }
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcentrationUnit::MgPerDl => f.write_str("mg/dL"),
            ConcentrationUnit::MmolPerL => f.write_str("mmol/L"),
            ConcentrationUnit::MeqPerL => f.write_str("mEq/L"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub ion: Ion,
    pub mg_dl: f64,
    pub mmol_l: f64,
    pub meq_l: f64,
}

impl Conversion {
    pub fn get(&self, unit: ConcentrationUnit) -> f64 {
        match unit {
            ConcentrationUnit::MgPerDl => self.mg_dl,
            ConcentrationUnit::MmolPerL => self.mmol_l,
            ConcentrationUnit::MeqPerL => self.meq_l,
        }
    }
}

pub fn mg_dl_to_mmol_l(ion: Ion, mg_dl: f64) -> f64 {
    mg_dl * 10.0 / ion.molar_mass()
}

pub fn mmol_l_to_mg_dl(ion: Ion, mmol_l: f64) -> f64 {
    mmol_l * ion.molar_mass() / 10.0
}

pub fn mmol_l_to_meq_l(ion: Ion, mmol_l: f64) -> f64 {
    mmol_l * ion.valence()
}

/// Express `value` (in `unit`) in all three units.
pub fn convert(ion: Ion, value: f64, unit: ConcentrationUnit) -> Result<Conversion, CalcError> {
    if value < 0.0 {
        return Err(CalcError::invalid(Field::Value, "concentration must not be negative"));
    }

    let mmol_l = match unit {
        ConcentrationUnit::MgPerDl => mg_dl_to_mmol_l(ion, value),
        ConcentrationUnit::MmolPerL => value,
        ConcentrationUnit::MeqPerL => value / ion.valence(),
    };
    let conversion = Conversion {
        ion,
        mg_dl: mmol_l_to_mg_dl(ion, mmol_l),
        mmol_l,
        meq_l: mmol_l_to_meq_l(ion, mmol_l),
    };
    debug!(%ion, %unit, value, ?conversion, "electrolyte converted");
    Ok(conversion)
}
