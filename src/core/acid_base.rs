//! Blood gas interpretation: anion gap, delta ratio and Winter's formula.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NORMAL_ALBUMIN: f64 = 4.0;
pub const NORMAL_ANION_GAP: f64 = 12.0;
pub const NORMAL_HCO3: f64 = 24.0;
const WINTERS_TOLERANCE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodGas {
    pub ph: f64,
    pub pco2: f64,
    pub hco3: f64,
    pub na: f64,
    pub cl: f64,
    /// g/dL; 4.0 when not measured.
    pub albumin: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhStatus {
    Acidemia,
    Normal,
    Alkalemia,
}

impl PhStatus {
    pub fn from_ph(ph: f64) -> Self {
        if ph < 7.35 {
            PhStatus::Acidemia
        } else if ph > 7.45 {
            PhStatus::Alkalemia
        } else {
            PhStatus::Normal
        }
    }
}

impl fmt::Display for PhStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhStatus::Acidemia => f.write_str("acidemia"),
            PhStatus::Normal => f.write_str("normal pH"),
            PhStatus::Alkalemia => f.write_str("alkalemia"),
        }
    }
}

/// What the delta ratio says about a coexisting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaFinding {
    /// ratio < 0.4
    ConcurrentHyperchloremicAcidosis,
    PureAnionGapAcidosis,
    /// ratio > 2.0
    ConcurrentMetabolicAlkalosis,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaRatio {
    pub ratio: f64,
    pub finding: DeltaFinding,
}

/// Respiratory response relative to Winter's expected PaCO2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compensation {
    Appropriate,
    /// PaCO2 above the band.
    ConcurrentRespiratoryAcidosis,
    /// PaCO2 below the band.
    ConcurrentRespiratoryAlkalosis,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WintersBand {
    pub expected: f64,
    pub low: f64,
    pub high: f64,
    pub compensation: Compensation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcidBaseResult {
    pub anion_gap: f64,
    pub corrected_anion_gap: f64,
    pub albumin: f64,
    pub ph_status: PhStatus,
    pub high_anion_gap: bool,
    /// Only for a high-gap acidosis with HCO3 below 24.
    pub delta: Option<DeltaRatio>,
    /// Only when HCO3 < 24 and pH < 7.40.
    pub winters: Option<WintersBand>,
}

pub fn anion_gap(na: f64, cl: f64, hco3: f64) -> f64 {
    na - (cl + hco3)
}

/// Each 1 g/dL of albumin below 4.0 hides 2.5 mEq/L of gap.
pub fn corrected_anion_gap(anion_gap: f64, albumin: f64) -> f64 {
    anion_gap + 2.5 * (NORMAL_ALBUMIN - albumin)
}

/// (corrected AG − 12) / (24 − HCO3); `None` when HCO3 is exactly 24.
pub fn delta_ratio(corrected_anion_gap: f64, hco3: f64) -> Option<f64> {
    let delta_hco3 = NORMAL_HCO3 - hco3;
    if delta_hco3 == 0.0 {
        return None;
    }
    Some((corrected_anion_gap - NORMAL_ANION_GAP) / delta_hco3)
}

pub fn classify_delta_ratio(ratio: f64) -> DeltaFinding {
    if ratio < 0.4 {
        DeltaFinding::ConcurrentHyperchloremicAcidosis
    } else if ratio > 2.0 {
        DeltaFinding::ConcurrentMetabolicAlkalosis
    } else {
        DeltaFinding::PureAnionGapAcidosis
    }
}

/// Expected PaCO2 = 1.5 × HCO3 + 8 ± 2.
pub fn winters_formula(hco3: f64, pco2: f64) -> WintersBand {
    let expected = 1.5 * hco3 + 8.0;
    let low = expected - WINTERS_TOLERANCE;
    let high = expected + WINTERS_TOLERANCE;

    let compensation = if pco2 > high {
        Compensation::ConcurrentRespiratoryAcidosis
    } else if pco2 < low {
        Compensation::ConcurrentRespiratoryAlkalosis
    } else {
        Compensation::Appropriate
    };

    WintersBand {
        expected,
        low,
        high,
        compensation,
    }
}

pub fn interpret(gas: &BloodGas) -> AcidBaseResult {
    let albumin = gas.albumin.unwrap_or(NORMAL_ALBUMIN);
    let anion_gap = anion_gap(gas.na, gas.cl, gas.hco3);
    let corrected = corrected_anion_gap(anion_gap, albumin);
    let high_anion_gap = corrected > NORMAL_ANION_GAP;

    let delta = if high_anion_gap && gas.hco3 < NORMAL_HCO3 {
        delta_ratio(corrected, gas.hco3).map(|ratio| DeltaRatio {
            ratio,
            finding: classify_delta_ratio(ratio),
        })
    } else {
        None
    };

    let winters = (gas.hco3 < NORMAL_HCO3 && gas.ph < 7.40).then(|| winters_formula(gas.hco3, gas.pco2));

    debug!(anion_gap, corrected, ?delta, ?winters, "acid-base panel interpreted");

    AcidBaseResult {
        anion_gap,
        corrected_anion_gap: corrected,
        albumin,
        ph_status: PhStatus::from_ph(gas.ph),
        high_anion_gap,
        delta,
        winters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn gas(ph: f64, pco2: f64, hco3: f64, na: f64, cl: f64, albumin: Option<f64>) -> BloodGas {
        BloodGas {
            ph,
            pco2,
            hco3,
            na,
            cl,
            albumin,
        }
    }

    #[test]
    fn anion_gap_example() {
        let result = interpret(&gas(7.40, 40.0, 24.0, 140.0, 100.0, Some(4.0)));
        assert_eq!(result.anion_gap, 16.0);
        assert_eq!(result.corrected_anion_gap, 16.0);
        assert!(result.high_anion_gap);
        // HCO3 == 24: no delta ratio, no Winter's
        assert_eq!(result.delta, None);
        assert_eq!(result.winters, None);
    }

    #[test]
    fn missing_albumin_defaults_to_normal() {
        let result = interpret(&gas(7.40, 40.0, 24.0, 140.0, 104.0, None));
        assert_eq!(result.albumin, 4.0);
        assert_eq!(result.corrected_anion_gap, result.anion_gap);
    }

    #[test]
    fn low_albumin_unmasks_a_gap() {
        // AG 10, albumin 2.0 -> corrected 15
        let result = interpret(&gas(7.30, 30.0, 18.0, 138.0, 110.0, Some(2.0)));
        assert_eq!(result.anion_gap, 10.0);
        assert_eq!(result.corrected_anion_gap, 15.0);
        assert!(result.high_anion_gap);
    }

    #[test]
    fn winters_example_flags_respiratory_alkalosis() {
        let band = winters_formula(18.0, 25.0);
        assert_eq!(band.expected, 35.0);
        assert_eq!((band.low, band.high), (33.0, 37.0));
        assert_eq!(band.compensation, Compensation::ConcurrentRespiratoryAlkalosis);

        let result = interpret(&gas(7.28, 25.0, 18.0, 140.0, 108.0, None));
        assert_eq!(result.winters, Some(band));
    }

    #[test_case(33.0, Compensation::Appropriate ; "lower edge")]
    #[test_case(37.0, Compensation::Appropriate ; "upper edge")]
    #[test_case(45.0, Compensation::ConcurrentRespiratoryAcidosis ; "above")]
    fn winters_band_edges(pco2: f64, compensation: Compensation) {
        assert_eq!(winters_formula(18.0, pco2).compensation, compensation);
    }

    #[test]
    fn winters_skipped_when_not_acidemic_enough() {
        let result = interpret(&gas(7.42, 30.0, 20.0, 140.0, 106.0, None));
        assert_eq!(result.winters, None);
    }

    #[test_case(7.34, PhStatus::Acidemia)]
    #[test_case(7.35, PhStatus::Normal)]
    #[test_case(7.45, PhStatus::Normal)]
    #[test_case(7.46, PhStatus::Alkalemia)]
    fn ph_status(ph: f64, status: PhStatus) {
        assert_eq!(PhStatus::from_ph(ph), status);
    }

    #[test]
    fn delta_ratio_guards_zero_denominator() {
        assert_eq!(delta_ratio(20.0, 24.0), None);
    }

    #[test]
    fn delta_ratio_findings() {
        // gap 26, HCO3 10: (26 - 12) / 14 = 1.0
        let pure = interpret(&gas(7.10, 22.0, 10.0, 140.0, 104.0, None));
        assert_eq!(pure.delta.unwrap().finding, DeltaFinding::PureAnionGapAcidosis);

        // gap 14, HCO3 10: 2 / 14 = 0.14
        let mixed = interpret(&gas(7.10, 22.0, 10.0, 140.0, 116.0, None));
        assert_eq!(mixed.delta.unwrap().finding, DeltaFinding::ConcurrentHyperchloremicAcidosis);

        // gap 30, HCO3 20: 18 / 4 = 4.5
        let alkalosis = interpret(&gas(7.33, 36.0, 20.0, 140.0, 90.0, None));
        assert_eq!(alkalosis.delta.unwrap().finding, DeltaFinding::ConcurrentMetabolicAlkalosis);
    }
}
