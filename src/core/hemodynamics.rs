//! Haemodynamic classification: Forrester quadrants and bedside shock
//! assessment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CalcError;
use crate::models::form::Field;

const WET_PCWP: f64 = 18.0;
const COLD_CARDIAC_INDEX: f64 = 2.2;

/// (SBP + 2 × DBP) / 3
pub fn mean_arterial_pressure(sbp: f64, dbp: f64) -> f64 {
    (sbp + 2.0 * dbp) / 3.0
}

/// Du Bois body surface area in m².
pub fn body_surface_area(height_cm: f64, weight_kg: f64) -> Result<f64, CalcError> {
    if height_cm <= 0.0 {
        return Err(CalcError::invalid(Field::HeightCm, "must be greater than 0"));
    }
    if weight_kg <= 0.0 {
        return Err(CalcError::invalid(Field::WeightKg, "must be greater than 0"));
    }
    Ok(0.007184 * height_cm.powf(0.725) * weight_kg.powf(0.425))
}

// ===== Forrester =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForresterClass {
    /// warm / dry
    I,
    /// warm / wet
    II,
    /// cold / dry
    III,
    /// cold / wet
    IV,
}

impl ForresterClass {
    pub fn from_profile(wet: bool, cold: bool) -> Self {
        match (cold, wet) {
            (false, false) => ForresterClass::I,
            (false, true) => ForresterClass::II,
            (true, false) => ForresterClass::III,
            (true, true) => ForresterClass::IV,
        }
    }

    pub fn profile(&self) -> &'static str {
        match self {
            ForresterClass::I => "warm/dry",
            ForresterClass::II => "warm/wet",
            ForresterClass::III => "cold/dry",
            ForresterClass::IV => "cold/wet",
        }
    }

    pub fn therapy(&self) -> &'static str {
        match self {
            ForresterClass::I => "observe; no specific haemodynamic therapy",
            ForresterClass::II => "vasodilator + diuretic",
            ForresterClass::III => "fluid challenge, then inotrope if no response",
            ForresterClass::IV => "inotrope + vasopressor; consider mechanical circulatory support",
        }
    }
}

impl fmt::Display for ForresterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numeral = match self {
            ForresterClass::I => "I",
            ForresterClass::II => "II",
            ForresterClass::III => "III",
            ForresterClass::IV => "IV",
        };
        write!(f, "Forrester {} ({})", numeral, self.profile())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForresterResult {
    /// L/min/m²
    pub cardiac_index: f64,
    pub wet: bool,
    pub cold: bool,
    pub class: ForresterClass,
}

pub fn forrester(cardiac_output: f64, bsa: f64, pcwp: f64) -> Result<ForresterResult, CalcError> {
    if bsa <= 0.0 {
        return Err(CalcError::invalid(Field::Bsa, "must be greater than 0"));
    }

    let cardiac_index = cardiac_output / bsa;
    let wet = pcwp >= WET_PCWP;
    let cold = cardiac_index < COLD_CARDIAC_INDEX;
    let class = ForresterClass::from_profile(wet, cold);
    debug!(cardiac_index, wet, cold, ?class, "forrester classified");

    Ok(ForresterResult {
        cardiac_index,
        wet,
        cold,
        class,
    })
}

// ===== Shock =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skin {
    Warm,
    Cold,
}

impl FromStr for Skin {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warm" => Ok(Skin::Warm),
            "cold" | "cool" => Ok(Skin::Cold),
            other => Err(CalcError::invalid(Field::Skin, format!("`{}` is not warm/cold", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lung {
    Dry,
    Wet,
}

impl FromStr for Lung {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dry" | "clear" => Ok(Lung::Dry),
            "wet" | "crackles" => Ok(Lung::Wet),
            other => Err(CalcError::invalid(Field::Lung, format!("`{}` is not wet/dry", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShockType {
    Distributive,
    Cardiogenic,
    Hypovolemic,
    Obstructive,
}

impl fmt::Display for ShockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShockType::Distributive => f.write_str("distributive"),
            ShockType::Cardiogenic => f.write_str("cardiogenic"),
            ShockType::Hypovolemic => f.write_str("hypovolemic"),
            ShockType::Obstructive => f.write_str("obstructive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShockSeverity {
    None,
    /// Raised lactate without hypotension.
    Hypoperfusion,
    Shock,
    /// Hypotension with lactate >= 4 mmol/L.
    Severe,
}

impl fmt::Display for ShockSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShockSeverity::None => f.write_str("no shock"),
            ShockSeverity::Hypoperfusion => f.write_str("occult hypoperfusion"),
            ShockSeverity::Shock => f.write_str("shock"),
            ShockSeverity::Severe => f.write_str("severe shock"),
        }
    }
}

/// Bedside findings fed to the etiology table.
///
/// An unset skin or lung finding only matches rules that do not ask for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedsideFindings {
    pub skin: Option<Skin>,
    pub lung: Option<Lung>,
    pub infection: bool,
    pub bleeding: bool,
    pub jvd: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShockInput {
    pub sbp: f64,
    pub dbp: f64,
    /// mmol/L
    pub lactate: Option<f64>,
    pub findings: BedsideFindings,
}

/// One row of the etiology table. `None` matches anything.
struct ShockRule {
    skin: Option<Skin>,
    lung: Option<Lung>,
    infection: Option<bool>,
    bleeding: Option<bool>,
    jvd: Option<bool>,
    etiology: ShockType,
    action: &'static str,
}

impl ShockRule {
    fn matches(&self, f: &BedsideFindings) -> bool {
        self.skin.map_or(true, |s| f.skin == Some(s))
            && self.lung.map_or(true, |l| f.lung == Some(l))
            && self.infection.map_or(true, |i| i == f.infection)
            && self.bleeding.map_or(true, |b| b == f.bleeding)
            && self.jvd.map_or(true, |j| j == f.jvd)
    }
}

const SHOCK_RULES: &[ShockRule] = &[
    ShockRule {
        skin: None,
        lung: None,
        infection: None,
        bleeding: Some(true),
        jvd: Some(false),
        etiology: ShockType::Hypovolemic,
        action: "control bleeding; transfuse and give volume",
    },
    ShockRule {
        skin: Some(Skin::Warm),
        lung: None,
        infection: Some(true),
        bleeding: None,
        jvd: None,
        etiology: ShockType::Distributive,
        action: "blood cultures, early antibiotics, 30 mL/kg crystalloid, norepinephrine",
    },
    ShockRule {
        skin: Some(Skin::Cold),
        lung: Some(Lung::Wet),
        infection: None,
        bleeding: Some(false),
        jvd: None,
        etiology: ShockType::Cardiogenic,
        action: "echocardiography; inotrope (dobutamine), avoid fluid loading",
    },
    ShockRule {
        skin: Some(Skin::Cold),
        lung: Some(Lung::Dry),
        infection: None,
        bleeding: None,
        jvd: Some(true),
        etiology: ShockType::Obstructive,
        action: "echocardiography for tamponade/PE/tension pneumothorax; relieve obstruction",
    },
    ShockRule {
        skin: Some(Skin::Cold),
        lung: Some(Lung::Dry),
        infection: None,
        bleeding: None,
        jvd: Some(false),
        etiology: ShockType::Hypovolemic,
        action: "fluid challenge and reassess",
    },
    ShockRule {
        skin: Some(Skin::Warm),
        lung: None,
        infection: Some(false),
        bleeding: Some(false),
        jvd: None,
        etiology: ShockType::Distributive,
        action: "look for anaphylaxis/neurogenic cause; vasopressor, adrenaline if anaphylaxis",
    },
    ShockRule {
        skin: Some(Skin::Cold),
        lung: None,
        infection: Some(true),
        bleeding: None,
        jvd: None,
        etiology: ShockType::Distributive,
        action: "late septic shock: antibiotics, norepinephrine, consider inotrope",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShockAssessment {
    pub map: f64,
    /// MAP < 65 or SBP < 90.
    pub hypotension: bool,
    pub severity: ShockSeverity,
    /// Distinct etiologies of every matching rule, in table order.
    pub candidates: Vec<ShockType>,
    /// Action of the first matching rule.
    pub first_action: Option<&'static str>,
}

pub fn shock_severity(hypotension: bool, lactate: Option<f64>) -> ShockSeverity {
    let lactate = lactate.unwrap_or(0.0);
    match (hypotension, lactate) {
        (true, l) if l >= 4.0 => ShockSeverity::Severe,
        (true, _) => ShockSeverity::Shock,
        (false, l) if l > 2.0 => ShockSeverity::Hypoperfusion,
        _ => ShockSeverity::None,
    }
}

pub fn candidate_etiologies(findings: &BedsideFindings) -> (Vec<ShockType>, Option<&'static str>) {
    let mut candidates = Vec::new();
    let mut first_action = None;
    for rule in SHOCK_RULES.iter().filter(|rule| rule.matches(findings)) {
        if first_action.is_none() {
            first_action = Some(rule.action);
        }
        if !candidates.contains(&rule.etiology) {
            candidates.push(rule.etiology);
        }
    }
    (candidates, first_action)
}

pub fn assess_shock(input: &ShockInput) -> ShockAssessment {
    let map = mean_arterial_pressure(input.sbp, input.dbp);
    let hypotension = map < 65.0 || input.sbp < 90.0;
    let severity = shock_severity(hypotension, input.lactate);
    let (candidates, first_action) = candidate_etiologies(&input.findings);
    debug!(map, hypotension, ?severity, ?candidates, "shock assessed");

    ShockAssessment {
        map,
        hypotension,
        severity,
        candidates,
        first_action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn findings(skin: Skin, lung: Lung, infection: bool, bleeding: bool, jvd: bool) -> BedsideFindings {
        BedsideFindings {
            skin: Some(skin),
            lung: Some(lung),
            infection,
            bleeding,
            jvd,
        }
    }

    #[test]
    fn map_formula() {
        assert_eq!(mean_arterial_pressure(120.0, 60.0), 80.0);
        assert_eq!(mean_arterial_pressure(90.0, 45.0), 60.0);
    }

    #[test]
    fn du_bois_for_an_average_adult() {
        let bsa = body_surface_area(170.0, 65.0).unwrap();
        assert!((bsa - 1.75).abs() < 0.01, "{bsa}");
        assert!(body_surface_area(0.0, 65.0).is_err());
    }

    #[test_case(5.0, 1.8, 12.0, ForresterClass::I ; "warm dry")]
    #[test_case(5.0, 1.8, 18.0, ForresterClass::II ; "wedge at threshold is wet")]
    #[test_case(3.0, 1.6, 10.0, ForresterClass::III ; "cold dry")]
    #[test_case(3.0, 1.6, 25.0, ForresterClass::IV ; "cold wet")]
    fn forrester_quadrants(co: f64, bsa: f64, pcwp: f64, class: ForresterClass) {
        assert_eq!(forrester(co, bsa, pcwp).unwrap().class, class);
    }

    #[test]
    fn cardiac_index_at_threshold_is_warm() {
        let result = forrester(4.4, 2.0, 10.0).unwrap();
        assert!(!result.cold);
    }

    #[test]
    fn forrester_rejects_non_positive_bsa() {
        assert_eq!(forrester(5.0, 0.0, 10.0).unwrap_err().field(), Field::Bsa);
    }

    #[test_case(false, None, ShockSeverity::None)]
    #[test_case(false, Some(2.5), ShockSeverity::Hypoperfusion)]
    #[test_case(true, Some(2.0), ShockSeverity::Shock)]
    #[test_case(true, Some(4.0), ShockSeverity::Severe)]
    fn severity_table(hypotension: bool, lactate: Option<f64>, severity: ShockSeverity) {
        assert_eq!(shock_severity(hypotension, lactate), severity);
    }

    #[test]
    fn hypotension_by_sbp_alone() {
        // MAP 70 but SBP 86
        let input = ShockInput {
            sbp: 86.0,
            dbp: 62.0,
            lactate: None,
            findings: findings(Skin::Warm, Lung::Dry, false, false, false),
        };
        let assessment = assess_shock(&input);
        assert!(assessment.map >= 65.0);
        assert!(assessment.hypotension);
    }

    #[test]
    fn no_findings_no_shortlist() {
        let input = ShockInput {
            sbp: 80.0,
            dbp: 50.0,
            lactate: Some(5.1),
            findings: BedsideFindings::default(),
        };
        let assessment = assess_shock(&input);
        assert_eq!(assessment.severity, ShockSeverity::Severe);
        assert!(assessment.candidates.is_empty());
        assert_eq!(assessment.first_action, None);
    }

    #[test]
    fn septic_picture() {
        let (candidates, action) = candidate_etiologies(&findings(Skin::Warm, Lung::Dry, true, false, false));
        assert_eq!(candidates, vec![ShockType::Distributive]);
        assert!(action.unwrap().contains("antibiotics"));
    }

    #[test]
    fn cardiogenic_picture() {
        let (candidates, _) = candidate_etiologies(&findings(Skin::Cold, Lung::Wet, false, false, true));
        assert_eq!(candidates, vec![ShockType::Cardiogenic]);
    }

    #[test]
    fn obstructive_picture() {
        let (candidates, action) = candidate_etiologies(&findings(Skin::Cold, Lung::Dry, false, false, true));
        assert_eq!(candidates, vec![ShockType::Obstructive]);
        assert!(action.unwrap().contains("tamponade"));
    }

    #[test]
    fn bleeding_leads_the_shortlist() {
        let (candidates, action) = candidate_etiologies(&findings(Skin::Cold, Lung::Dry, true, true, false));
        assert_eq!(
            candidates,
            vec![ShockType::Hypovolemic, ShockType::Distributive]
        );
        assert!(action.unwrap().contains("bleeding"));
    }

    #[test]
    fn bleeding_without_skin_or_lung_still_matches() {
        let bleeding = BedsideFindings {
            bleeding: true,
            ..BedsideFindings::default()
        };
        let (candidates, action) = candidate_etiologies(&bleeding);
        assert_eq!(candidates, vec![ShockType::Hypovolemic]);
        assert!(action.unwrap().contains("control bleeding"));
    }

    #[test]
    fn unset_skin_never_matches_a_skin_rule() {
        let infection_only = BedsideFindings {
            infection: true,
            ..BedsideFindings::default()
        };
        assert_eq!(candidate_etiologies(&infection_only), (Vec::new(), None));
    }

    #[test]
    fn skin_and_lung_parse() {
        assert_eq!("COLD".parse::<Skin>(), Ok(Skin::Cold));
        assert_eq!("wet".parse::<Lung>(), Ok(Lung::Wet));
        assert_eq!("blue".parse::<Skin>().unwrap_err().field(), Field::Skin);
    }
}
