//! Renal function: Cockcroft-Gault creatinine clearance and the fractional
//! excretion indices used to separate prerenal from intrinsic injury.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CalcError;
use crate::models::form::Field;

const FEMALE_FACTOR: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl FromStr for Sex {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "male" | "man" => Ok(Sex::Male),
            "f" | "female" | "woman" => Ok(Sex::Female),
            other => Err(CalcError::invalid(Field::Sex, format!("`{}` is not male/female", other))),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => f.write_str("male"),
            Sex::Female => f.write_str("female"),
        }
    }
}

/// Renal function band for dose adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearanceBand {
    /// CCr < 30 mL/min
    Severe,
    /// 30 <= CCr < 60 mL/min
    Moderate,
    Normal,
}

impl ClearanceBand {
    pub fn from_ccr(ccr: f64) -> Self {
        if ccr < 30.0 {
            ClearanceBand::Severe
        } else if ccr < 60.0 {
            ClearanceBand::Moderate
        } else {
            ClearanceBand::Normal
        }
    }
}

impl fmt::Display for ClearanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearanceBand::Severe => f.write_str("severe"),
            ClearanceBand::Moderate => f.write_str("moderate"),
            ClearanceBand::Normal => f.write_str("normal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClearanceResult {
    /// mL/min
    pub ccr: f64,
    pub band: ClearanceBand,
}

/// Cockcroft-Gault: (140 − age) × weight / (72 × Scr), × 0.85 for women.
pub fn cockcroft_gault(age: f64, weight_kg: f64, serum_creatinine: f64, sex: Sex) -> Result<ClearanceResult, CalcError> {
    if serum_creatinine <= 0.0 {
        return Err(CalcError::invalid(Field::SerumCreatinine, "must be greater than 0"));
    }

    let mut ccr = (140.0 - age) * weight_kg / (72.0 * serum_creatinine);
    if sex == Sex::Female {
        ccr *= FEMALE_FACTOR;
    }
    debug!(ccr, %sex, "creatinine clearance computed");

    Ok(ClearanceResult {
        ccr,
        band: ClearanceBand::from_ccr(ccr),
    })
}

/// Prerenal vs intrinsic reading of a fractional excretion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenalPattern {
    Prerenal,
    Indeterminate,
    /// Intrinsic renal injury, typically ATN.
    Intrinsic,
}

impl fmt::Display for RenalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenalPattern::Prerenal => f.write_str("prerenal"),
            RenalPattern::Indeterminate => f.write_str("indeterminate"),
            RenalPattern::Intrinsic => f.write_str("intrinsic renal (ATN)"),
        }
    }
}

/// Fractional excretion in percent: (U_x × P_Cr) / (P_x × U_Cr) × 100.
///
/// `None` when the denominator is zero.
pub fn fractional_excretion(urine_x: f64, plasma_x: f64, urine_cr: f64, plasma_cr: f64) -> Option<f64> {
    let denominator = plasma_x * urine_cr;
    if denominator == 0.0 {
        return None;
    }
    Some(urine_x * plasma_cr / denominator * 100.0)
}

pub fn fena(urine_na: f64, plasma_na: f64, urine_cr: f64, plasma_cr: f64) -> Option<f64> {
    fractional_excretion(urine_na, plasma_na, urine_cr, plasma_cr)
}

pub fn fe_urea(urine_urea: f64, plasma_urea: f64, urine_cr: f64, plasma_cr: f64) -> Option<f64> {
    fractional_excretion(urine_urea, plasma_urea, urine_cr, plasma_cr)
}

pub fn classify_fena(fena: f64) -> RenalPattern {
    if fena < 1.0 {
        RenalPattern::Prerenal
    } else if fena > 2.0 {
        RenalPattern::Intrinsic
    } else {
        RenalPattern::Indeterminate
    }
}

pub fn classify_fe_urea(fe_urea: f64) -> RenalPattern {
    if fe_urea < 35.0 {
        RenalPattern::Prerenal
    } else if fe_urea > 50.0 {
        RenalPattern::Intrinsic
    } else {
        RenalPattern::Indeterminate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenalPanel {
    pub urine_na: f64,
    pub plasma_na: f64,
    pub urine_cr: f64,
    pub plasma_cr: f64,
    pub urine_urea: Option<f64>,
    pub plasma_urea: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Excretion {
    pub percent: f64,
    pub pattern: RenalPattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenalDifferential {
    /// `None` when FeNa is undefined.
    pub fena: Option<Excretion>,
    /// `None` without urea inputs or when undefined.
    pub fe_urea: Option<Excretion>,
}

pub fn renal_differential(panel: &RenalPanel) -> RenalDifferential {
    let fena = fena(panel.urine_na, panel.plasma_na, panel.urine_cr, panel.plasma_cr).map(|percent| Excretion {
        percent,
        pattern: classify_fena(percent),
    });

    let fe_urea = match (panel.urine_urea, panel.plasma_urea) {
        (Some(urine_urea), Some(plasma_urea)) => {
            fe_urea(urine_urea, plasma_urea, panel.urine_cr, panel.plasma_cr).map(|percent| Excretion {
                percent,
                pattern: classify_fe_urea(percent),
            })
        }
        _ => None,
    };

    debug!(?fena, ?fe_urea, "renal differential computed");
    RenalDifferential { fena, fe_urea }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn cockcroft_gault_example() {
        let result = cockcroft_gault(60.0, 60.0, 1.0, Sex::Male).unwrap();
        assert!((result.ccr - 66.666_666_7).abs() < 1e-6);
        assert_eq!(result.band, ClearanceBand::Normal);
    }

    #[test_case(40.0, 80.0, 0.8 ; "young")]
    #[test_case(85.0, 45.0, 1.9 ; "elderly")]
    #[test_case(70.0, 60.0, 3.2 ; "ckd")]
    fn female_is_085_of_male(age: f64, weight: f64, scr: f64) {
        let male = cockcroft_gault(age, weight, scr, Sex::Male).unwrap().ccr;
        let female = cockcroft_gault(age, weight, scr, Sex::Female).unwrap().ccr;
        assert!((female - 0.85 * male).abs() < 1e-9);
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-0.5 ; "negative")]
    fn non_positive_creatinine_is_rejected(scr: f64) {
        let err = cockcroft_gault(60.0, 60.0, scr, Sex::Male).unwrap_err();
        assert_eq!(err.field(), Field::SerumCreatinine);
    }

    #[test_case(29.9, ClearanceBand::Severe)]
    #[test_case(30.0, ClearanceBand::Moderate)]
    #[test_case(59.9, ClearanceBand::Moderate)]
    #[test_case(60.0, ClearanceBand::Normal)]
    fn band_boundaries(ccr: f64, band: ClearanceBand) {
        assert_eq!(ClearanceBand::from_ccr(ccr), band);
    }

    #[test]
    fn sex_parses_common_spellings() {
        assert_eq!("F".parse::<Sex>(), Ok(Sex::Female));
        assert_eq!("male".parse::<Sex>(), Ok(Sex::Male));
        assert!("x".parse::<Sex>().is_err());
    }

    #[test]
    fn fena_example_is_prerenal() {
        let value = fena(20.0, 140.0, 100.0, 1.0).unwrap();
        assert!((value - 0.142_857).abs() < 1e-5);
        assert_eq!(classify_fena(value), RenalPattern::Prerenal);
    }

    #[test_case(0.99, RenalPattern::Prerenal)]
    #[test_case(1.0, RenalPattern::Indeterminate)]
    #[test_case(2.0, RenalPattern::Indeterminate)]
    #[test_case(2.01, RenalPattern::Intrinsic)]
    fn fena_boundaries(value: f64, pattern: RenalPattern) {
        assert_eq!(classify_fena(value), pattern);
    }

    #[test]
    fn zero_denominators_are_undefined() {
        assert_eq!(fena(20.0, 0.0, 100.0, 1.0), None);
        assert_eq!(fena(20.0, 140.0, 0.0, 1.0), None);
        assert_eq!(fe_urea(300.0, 0.0, 100.0, 1.0), None);
    }

    #[test]
    fn fe_urea_only_with_both_urea_inputs() {
        let mut panel = RenalPanel {
            urine_na: 40.0,
            plasma_na: 135.0,
            urine_cr: 50.0,
            plasma_cr: 2.0,
            urine_urea: Some(300.0),
            plasma_urea: None,
        };
        assert_eq!(renal_differential(&panel).fe_urea, None);

        panel.plasma_urea = Some(40.0);
        let result = renal_differential(&panel);
        let fe_urea = result.fe_urea.unwrap();
        // (300 × 2) / (40 × 50) × 100 = 30 %
        assert!((fe_urea.percent - 30.0).abs() < 1e-9);
        assert_eq!(fe_urea.pattern, RenalPattern::Prerenal);
        // FeNa here is 1.185 %: indeterminate, which is what FeUrea resolves
        assert_eq!(result.fena.unwrap().pattern, RenalPattern::Indeterminate);
    }
}
