//! Infusion-rate / γ conversion.
//!
//! γ is the weight-normalised infusion rate. Most vasoactive drugs are
//! charted in μg/kg/min; sedatives and opioids use per-hour units, which is
//! why the unit travels with the preset rather than with the number.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::presets::DoseUnit;
use crate::error::CalcError;
use crate::models::form::Field;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfusionInput {
    pub drug_mg: f64,
    pub solvent_ml: f64,
    pub flow_ml_h: f64,
    pub weight_kg: Option<f64>,
    pub unit: DoseUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfusionResult {
    /// mg/mL
    pub concentration: f64,
    /// mg/h
    pub dose_mg_h: f64,
    /// Weight-normalised dose in `unit`; `None` without a usable weight.
    pub gamma: Option<f64>,
    pub unit: DoseUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowResult {
    pub concentration: f64,
    pub dose_mg_h: f64,
    pub flow_ml_h: f64,
}

/// Where a dose sits relative to a drug's reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdStatus {
    WithinReference,
    AboveReference,
}

fn require_positive(field: Field, value: f64) -> Result<f64, CalcError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(CalcError::invalid(field, format!("must be greater than 0 (got {})", value)))
    }
}

/// Syringe concentration in mg/mL.
pub fn concentration(drug_mg: f64, solvent_ml: f64) -> Result<f64, CalcError> {
    let drug_mg = require_positive(Field::DrugMg, drug_mg)?;
    let solvent_ml = require_positive(Field::SolventMl, solvent_ml)?;
    Ok(drug_mg / solvent_ml)
}

/// γ in μg/kg/min for a mass rate in mg/h.
pub fn gamma_mcg_kg_min(dose_mg_h: f64, weight_kg: f64) -> f64 {
    DoseUnit::McgPerKgPerMin.from_mass_rate(dose_mg_h, weight_kg)
}

/// Forward conversion: flow rate → mass rate → γ.
pub fn infusion_rate(input: &InfusionInput) -> Result<InfusionResult, CalcError> {
    let concentration = concentration(input.drug_mg, input.solvent_ml)?;
    let flow_ml_h = require_positive(Field::FlowMlH, input.flow_ml_h)?;
    let dose_mg_h = flow_ml_h * concentration;

    let gamma = input
        .weight_kg
        .filter(|w| *w > 0.0)
        .map(|w| input.unit.from_mass_rate(dose_mg_h, w));

    debug!(concentration, dose_mg_h, ?gamma, "infusion rate computed");

    Ok(InfusionResult {
        concentration,
        dose_mg_h,
        gamma,
        unit: input.unit,
    })
}

/// Reverse conversion: target γ → required flow rate in mL/h.
pub fn flow_for_gamma(
    drug_mg: f64,
    solvent_ml: f64,
    target: f64,
    weight_kg: f64,
    unit: DoseUnit,
) -> Result<FlowResult, CalcError> {
    let concentration = concentration(drug_mg, solvent_ml)?;
    let weight_kg = require_positive(Field::WeightKg, weight_kg)?;
    if target < 0.0 {
        return Err(CalcError::invalid(Field::TargetGamma, "must not be negative"));
    }

    let dose_mg_h = unit.to_mass_rate(target, weight_kg);
    let flow_ml_h = dose_mg_h / concentration;
    debug!(concentration, dose_mg_h, flow_ml_h, "flow for target γ computed");

    Ok(FlowResult {
        concentration,
        dose_mg_h,
        flow_ml_h,
    })
}

pub fn compare_to_reference(dose: f64, threshold: f64) -> ThresholdStatus {
    if dose > threshold {
        ThresholdStatus::AboveReference
    } else {
        ThresholdStatus::WithinReference
    }
}

/// Substituted formula as shown beside a forward result.
pub fn forward_formula(input: &InfusionInput, result: &InfusionResult) -> String {
    let weight = input.weight_kg.unwrap_or_default();
    match input.unit {
        DoseUnit::McgPerKgPerMin => format!(
            "({} mL/h × {:.2} mg/mL × 1000) ÷ (60 min × {} kg)",
            input.flow_ml_h, result.concentration, weight
        ),
        DoseUnit::McgPerKgPerHour => format!(
            "({} mL/h × {:.2} mg/mL × 1000) ÷ {} kg",
            input.flow_ml_h, result.concentration, weight
        ),
        DoseUnit::MgPerKgPerHour => format!(
            "({} mL/h × {:.2} mg/mL) ÷ {} kg",
            input.flow_ml_h, result.concentration, weight
        ),
    }
}

pub fn reverse_formula(target: f64, weight_kg: f64, unit: DoseUnit, concentration: f64) -> String {
    match unit {
        DoseUnit::McgPerKgPerMin => format!(
            "({} γ × 60 min × {} kg) ÷ 1000 ÷ {:.2} mg/mL",
            target, weight_kg, concentration
        ),
        DoseUnit::McgPerKgPerHour => format!(
            "({} μg/kg/h × {} kg) ÷ 1000 ÷ {:.2} mg/mL",
            target, weight_kg, concentration
        ),
        DoseUnit::MgPerKgPerHour => format!(
            "({} mg/kg/h × {} kg) ÷ {:.2} mg/mL",
            target, weight_kg, concentration
        ),
    }
}
