use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::presets::PresetTable;
use crate::error::CalcError;

/// Every field a calculator form can hold.
///
/// The snake_case names double as the exported draft keys, so `Field::ALL`
/// is the draft allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    DrugPreset,
    DrugMg,
    SolventMl,
    FlowMlH,
    TargetGamma,
    WeightKg,
    HeightCm,
    Age,
    Sex,
    SerumCreatinine,
    Ph,
    Pco2,
    Hco3,
    Na,
    Cl,
    Albumin,
    UrineNa,
    PlasmaNa,
    UrineCr,
    PlasmaCr,
    UrineUrea,
    PlasmaUrea,
    CardiacOutput,
    Bsa,
    Pcwp,
    Sbp,
    Dbp,
    Lactate,
    Skin,
    Lung,
    Infection,
    Bleeding,
    Jvd,
    Ion,
    Value,
    Unit,
}

impl Field {
    pub const ALL: [Field; 36] = [
        Field::DrugPreset,
        Field::DrugMg,
        Field::SolventMl,
        Field::FlowMlH,
        Field::TargetGamma,
        Field::WeightKg,
        Field::HeightCm,
        Field::Age,
        Field::Sex,
        Field::SerumCreatinine,
        Field::Ph,
        Field::Pco2,
        Field::Hco3,
        Field::Na,
        Field::Cl,
        Field::Albumin,
        Field::UrineNa,
        Field::PlasmaNa,
        Field::UrineCr,
        Field::PlasmaCr,
        Field::UrineUrea,
        Field::PlasmaUrea,
        Field::CardiacOutput,
        Field::Bsa,
        Field::Pcwp,
        Field::Sbp,
        Field::Dbp,
        Field::Lactate,
        Field::Skin,
        Field::Lung,
        Field::Infection,
        Field::Bleeding,
        Field::Jvd,
        Field::Ion,
        Field::Value,
        Field::Unit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::DrugPreset => "drug_preset",
            Field::DrugMg => "drug_mg",
            Field::SolventMl => "solvent_ml",
            Field::FlowMlH => "flow_ml_h",
            Field::TargetGamma => "target_gamma",
            Field::WeightKg => "weight_kg",
            Field::HeightCm => "height_cm",
            Field::Age => "age",
            Field::Sex => "sex",
            Field::SerumCreatinine => "serum_creatinine",
            Field::Ph => "ph",
            Field::Pco2 => "pco2",
            Field::Hco3 => "hco3",
            Field::Na => "na",
            Field::Cl => "cl",
            Field::Albumin => "albumin",
            Field::UrineNa => "urine_na",
            Field::PlasmaNa => "plasma_na",
            Field::UrineCr => "urine_cr",
            Field::PlasmaCr => "plasma_cr",
            Field::UrineUrea => "urine_urea",
            Field::PlasmaUrea => "plasma_urea",
            Field::CardiacOutput => "cardiac_output",
            Field::Bsa => "bsa",
            Field::Pcwp => "pcwp",
            Field::Sbp => "sbp",
            Field::Dbp => "dbp",
            Field::Lactate => "lactate",
            Field::Skin => "skin",
            Field::Lung => "lung",
            Field::Infection => "infection",
            Field::Bleeding => "bleeding",
            Field::Jvd => "jvd",
            Field::Ion => "ion",
            Field::Value => "value",
            Field::Unit => "unit",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or(())
    }
}

/// A raw scalar as entered on a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Explicit form state handed to each calculator.
///
/// Unset fields are simply absent. Blank text counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Form {
    values: BTreeMap<Field, FieldValue>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: Field, value: impl Into<FieldValue>) {
        self.values.insert(field, value.into());
    }

    pub fn clear(&mut self, field: Field) {
        self.values.remove(&field);
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        match self.values.get(&field) {
            Some(FieldValue::Text(text)) if text.trim().is_empty() => None,
            other => other,
        }
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.values.iter().map(|(field, value)| (*field, value))
    }

    /// Merge `other` on top of this form; fields set in `other` win.
    pub fn merged(mut self, other: &Form) -> Form {
        for (field, value) in other.iter() {
            self.values.insert(field, value.clone());
        }
        self
    }

    /// Optional numeric field. Numeric text is accepted.
    pub fn number(&self, field: Field) -> Result<Option<f64>, CalcError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Number(n)) if n.is_finite() => Ok(Some(*n)),
            Some(FieldValue::Number(_)) => Err(CalcError::invalid(field, "must be a finite number")),
            Some(FieldValue::Text(text)) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| CalcError::invalid(field, format!("`{}` is not a number", text))),
            Some(FieldValue::Flag(_)) => Err(CalcError::invalid(field, "expected a number, got a flag")),
        }
    }

    pub fn require_number(&self, field: Field) -> Result<f64, CalcError> {
        self.number(field)?.ok_or(CalcError::MissingInput(field))
    }

    /// Optional text field. Numbers are rendered as text.
    pub fn text(&self, field: Field) -> Option<String> {
        match self.get(field)? {
            FieldValue::Text(text) => Some(text.trim().to_string()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Flag(b) => Some(b.to_string()),
        }
    }

    pub fn require_text(&self, field: Field) -> Result<String, CalcError> {
        self.text(field).ok_or(CalcError::MissingInput(field))
    }

    /// Yes/no field; unset reads as `false`.
    pub fn flag(&self, field: Field) -> Result<bool, CalcError> {
        match self.get(field) {
            None => Ok(false),
            Some(FieldValue::Flag(b)) => Ok(*b),
            Some(FieldValue::Number(n)) => Ok(*n != 0.0),
            Some(FieldValue::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" | "on" => Ok(true),
                "false" | "no" | "n" | "0" | "off" => Ok(false),
                other => Err(CalcError::invalid(field, format!("`{}` is not yes/no", other))),
            },
        }
    }

    /// Fill `drug_mg`/`solvent_ml` from the selected preset.
    ///
    /// Values already on the form are kept. Returns a new form; `self` is
    /// not touched.
    pub fn with_preset(&self, presets: &PresetTable) -> Result<Form, CalcError> {
        let Some(name) = self.text(Field::DrugPreset) else {
            return Ok(self.clone());
        };
        let defaults = presets.preset_defaults(&name)?;

        let mut form = self.clone();
        if !form.is_set(Field::DrugMg) {
            form.set(Field::DrugMg, defaults.drug_mg);
        }
        if !form.is_set(Field::SolventMl) {
            form.set(Field::SolventMl, defaults.solvent_ml);
        }
        Ok(form)
    }
}
