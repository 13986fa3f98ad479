//! Calculators: thin form-bound adapters over the formula library.
//!
//! Each calculator reads what it needs from an explicit [`Form`], calls into
//! `core`, and renders a [`Report`]. Required fields that are blank fail with
//! `MissingInput`; optional blanks only drop the dependent lines.

use tracing::{info, instrument, warn};

use crate::core::acid_base::{self, BloodGas, Compensation, DeltaFinding};
use crate::core::electrolytes::{self, ConcentrationUnit, Ion};
use crate::core::gamma::{self, InfusionInput, ThresholdStatus};
use crate::core::hemodynamics::{self, BedsideFindings, ForresterClass, Lung, ShockInput, ShockSeverity, Skin};
use crate::core::presets::{DrugPreset, PresetTable};
use crate::core::renal::{self, ClearanceBand, RenalPanel, Sex};
use crate::error::CalcError;
use crate::models::form::{Field, Form};
use crate::models::report::{Level, Measurement, Report};

pub trait Calculator: Send + Sync {
    /// Short name used on the command line.
    fn name(&self) -> &'static str;
    fn title(&self) -> &'static str;
    /// Form fields this calculator reads.
    fn fields(&self) -> &'static [Field];
    fn compute(&self, form: &Form) -> Result<Report, CalcError>;
}

/// Run one calculation and log the outcome.
#[instrument(skip(calculator, form), fields(calculator = calculator.name()))]
pub fn run(calculator: &dyn Calculator, form: &Form) -> Result<Report, CalcError> {
    match calculator.compute(form) {
        Ok(report) => {
            info!(classification = ?report.classification, "calculation complete");
            Ok(report)
        }
        Err(err) => {
            warn!(error = %err, "calculation blocked");
            Err(err)
        }
    }
}

/// Every calculator, in menu order.
pub fn all(presets: &PresetTable) -> Vec<Box<dyn Calculator>> {
    vec![
        Box::new(InfusionRate::new(presets.clone())),
        Box::new(FlowForDose::new(presets.clone())),
        Box::new(CreatinineClearance),
        Box::new(AcidBase),
        Box::new(RenalDifferential),
        Box::new(Forrester),
        Box::new(Shock),
        Box::new(ElectrolyteConverter),
    ]
}

pub fn find(name: &str, presets: &PresetTable) -> Option<Box<dyn Calculator>> {
    let calculator: Box<dyn Calculator> = match name {
        "gamma" => Box::new(InfusionRate::new(presets.clone())),
        "flow" => Box::new(FlowForDose::new(presets.clone())),
        "ccr" => Box::new(CreatinineClearance),
        "acid-base" => Box::new(AcidBase),
        "renal" => Box::new(RenalDifferential),
        "forrester" => Box::new(Forrester),
        "shock" => Box::new(Shock),
        "convert" => Box::new(ElectrolyteConverter),
        _ => return None,
    };
    Some(calculator)
}

// ===== γ =====

fn threshold_advisory(report: Report, preset: Option<&DrugPreset>, dose: f64) -> Report {
    let Some((preset, threshold)) = preset.and_then(|p| p.threshold.map(|t| (p, t))) else {
        return report;
    };
    match gamma::compare_to_reference(dose, threshold) {
        ThresholdStatus::AboveReference => {
            warn!(drug = %preset.name, dose, threshold, "dose above reference");
            report.classification("above reference").advisory(
                Level::Warning,
                format!(
                    "{} dose exceeds the reference of {} {}; confirm the order",
                    preset.name, threshold, preset.unit
                ),
            )
        }
        ThresholdStatus::WithinReference => report.classification("within reference"),
    }
}

/// Flow rate → γ.
pub struct InfusionRate {
    presets: PresetTable,
}

impl InfusionRate {
    pub fn new(presets: PresetTable) -> Self {
        Self { presets }
    }
}

impl Calculator for InfusionRate {
    fn name(&self) -> &'static str {
        "gamma"
    }

    fn title(&self) -> &'static str {
        "γ calculator (flow → dose)"
    }

    fn fields(&self) -> &'static [Field] {
        &[Field::DrugPreset, Field::DrugMg, Field::SolventMl, Field::FlowMlH, Field::WeightKg]
    }

    fn compute(&self, form: &Form) -> Result<Report, CalcError> {
        let form = form.with_preset(&self.presets)?;
        let preset_name = form.text(Field::DrugPreset);
        let preset = self.presets.resolve(preset_name.as_deref())?;

        let input = InfusionInput {
            drug_mg: form.require_number(Field::DrugMg)?,
            solvent_ml: form.require_number(Field::SolventMl)?,
            flow_ml_h: form.require_number(Field::FlowMlH)?,
            weight_kg: form.number(Field::WeightKg)?,
            unit: preset.map(|p| p.unit).unwrap_or_default(),
        };
        let result = gamma::infusion_rate(&input)?;
        let concentration = Measurement::new("Concentration", result.concentration, "mg/mL");
        let dose = Measurement::new("Dose", result.dose_mg_h, "mg/h").precision(3);

        let report = match result.gamma {
            Some(value) => {
                let report = Report::new(self.title(), Measurement::new("Dose (γ)", value, result.unit.to_string()))
                    .detail(concentration)
                    .detail(dose)
                    .formula(gamma::forward_formula(&input, &result));
                threshold_advisory(report, preset, value)
            }
            None => Report::new(self.title(), dose)
                .detail(concentration)
                .advisory(Level::Info, "enter body weight to report γ"),
        };
        Ok(report)
    }
}

/// Target γ → flow rate.
pub struct FlowForDose {
    presets: PresetTable,
}

impl FlowForDose {
    pub fn new(presets: PresetTable) -> Self {
        Self { presets }
    }
}

impl Calculator for FlowForDose {
    fn name(&self) -> &'static str {
        "flow"
    }

    fn title(&self) -> &'static str {
        "γ calculator (dose → flow)"
    }

    fn fields(&self) -> &'static [Field] {
        &[Field::DrugPreset, Field::DrugMg, Field::SolventMl, Field::TargetGamma, Field::WeightKg]
    }

    fn compute(&self, form: &Form) -> Result<Report, CalcError> {
        let form = form.with_preset(&self.presets)?;
        let preset_name = form.text(Field::DrugPreset);
        let preset = self.presets.resolve(preset_name.as_deref())?;
        let unit = preset.map(|p| p.unit).unwrap_or_default();

        let target = form.require_number(Field::TargetGamma)?;
        let weight_kg = form.require_number(Field::WeightKg)?;
        let result = gamma::flow_for_gamma(
            form.require_number(Field::DrugMg)?,
            form.require_number(Field::SolventMl)?,
            target,
            weight_kg,
            unit,
        )?;

        let report = Report::new(self.title(), Measurement::new("Required flow", result.flow_ml_h, "mL/h").precision(1))
            .detail(Measurement::new("Concentration", result.concentration, "mg/mL"))
            .detail(Measurement::new("Dose", result.dose_mg_h, "mg/h").precision(3))
            .formula(gamma::reverse_formula(target, weight_kg, unit, result.concentration));
        Ok(threshold_advisory(report, preset, target))
    }
}

// ===== Renal =====

pub struct CreatinineClearance;

impl Calculator for CreatinineClearance {
    fn name(&self) -> &'static str {
        "ccr"
    }

    fn title(&self) -> &'static str {
        "Creatinine clearance (Cockcroft-Gault)"
    }

    fn fields(&self) -> &'static [Field] {
        &[Field::Age, Field::WeightKg, Field::SerumCreatinine, Field::Sex]
    }

    fn compute(&self, form: &Form) -> Result<Report, CalcError> {
        let age = form.require_number(Field::Age)?;
        let weight_kg = form.require_number(Field::WeightKg)?;
        let scr = form.require_number(Field::SerumCreatinine)?;
        let sex: Sex = form.require_text(Field::Sex)?.parse()?;

        let result = renal::cockcroft_gault(age, weight_kg, scr, sex)?;

        let mut formula = String::from("(140 − age) × weight / (72 × Scr)");
        if sex == Sex::Female {
            formula.push_str(" × 0.85 (female)");
        }

        let report = Report::new(self.title(), Measurement::new("CCr", result.ccr, "mL/min").precision(1))
            .classification(result.band.to_string())
            .formula(formula);
        let report = match result.band {
            ClearanceBand::Severe => report.advisory(
                Level::Critical,
                "severe renal impairment likely; check doses of renally cleared drugs",
            ),
            ClearanceBand::Moderate => report.advisory(Level::Warning, "moderate renal impairment possible"),
            ClearanceBand::Normal => report.advisory(Level::Info, "renal function likely preserved"),
        };
        Ok(report)
    }
}

pub struct RenalDifferential;

impl Calculator for RenalDifferential {
    fn name(&self) -> &'static str {
        "renal"
    }

    fn title(&self) -> &'static str {
        "Renal differential (FeNa / FeUrea)"
    }

    fn fields(&self) -> &'static [Field] {
        &[
            Field::UrineNa,
            Field::PlasmaNa,
            Field::UrineCr,
            Field::PlasmaCr,
            Field::UrineUrea,
            Field::PlasmaUrea,
        ]
    }

    fn compute(&self, form: &Form) -> Result<Report, CalcError> {
        let panel = RenalPanel {
            urine_na: form.require_number(Field::UrineNa)?,
            plasma_na: form.require_number(Field::PlasmaNa)?,
            urine_cr: form.require_number(Field::UrineCr)?,
            plasma_cr: form.require_number(Field::PlasmaCr)?,
            urine_urea: form.number(Field::UrineUrea)?,
            plasma_urea: form.number(Field::PlasmaUrea)?,
        };
        let result = renal::renal_differential(&panel);

        let mut report = match result.fena {
            Some(fena) => Report::new(self.title(), Measurement::new("FeNa", fena.percent, "%").precision(3))
                .classification(fena.pattern.to_string()),
            None => Report::new(self.title(), Measurement::undefined("FeNa", "%"))
                .advisory(Level::Warning, "FeNa undefined: plasma Na × urine Cr is zero"),
        }
        .formula("FeNa = (U_Na × P_Cr) / (P_Na × U_Cr) × 100");

        let urea_supplied = (panel.urine_urea.is_some(), panel.plasma_urea.is_some());
        match (urea_supplied, result.fe_urea) {
            (_, Some(fe_urea)) => {
                report = report
                    .detail(Measurement::new("FeUrea", fe_urea.percent, "%").precision(1))
                    .finding(format!("FeUrea suggests {}", fe_urea.pattern))
                    .advisory(Level::Info, "prefer FeUrea when diuretics have been given");
            }
            ((true, true), None) => {
                report = report
                    .detail(Measurement::undefined("FeUrea", "%"))
                    .advisory(Level::Warning, "FeUrea undefined: plasma urea × urine Cr is zero");
            }
            ((true, false), None) | ((false, true), None) => {
                report = report.advisory(Level::Info, "both urine and plasma urea are needed for FeUrea");
            }
            ((false, false), None) => {}
        }
        Ok(report)
    }
}

// ===== Acid-base =====

pub struct AcidBase;

impl Calculator for AcidBase {
    fn name(&self) -> &'static str {
        "acid-base"
    }

    fn title(&self) -> &'static str {
        "Acid-base interpretation"
    }

    fn fields(&self) -> &'static [Field] {
        &[Field::Ph, Field::Pco2, Field::Hco3, Field::Na, Field::Cl, Field::Albumin]
    }

    fn compute(&self, form: &Form) -> Result<Report, CalcError> {
        let gas = BloodGas {
            ph: form.require_number(Field::Ph)?,
            pco2: form.require_number(Field::Pco2)?,
            hco3: form.require_number(Field::Hco3)?,
            na: form.require_number(Field::Na)?,
            cl: form.require_number(Field::Cl)?,
            albumin: form.number(Field::Albumin)?,
        };
        let result = acid_base::interpret(&gas);

        let mut report = Report::new(
            self.title(),
            Measurement::new("Corrected anion gap", result.corrected_anion_gap, "mEq/L").precision(1),
        )
        .detail(Measurement::new("Anion gap", result.anion_gap, "mEq/L").precision(1))
        .detail(Measurement::new("Albumin used", result.albumin, "g/dL").precision(1))
        .classification(result.ph_status.to_string())
        .formula("AG = Na − (Cl + HCO3); corrected AG = AG + 2.5 × (4.0 − Alb)");

        if result.high_anion_gap {
            report = report
                .finding("high anion-gap metabolic acidosis")
                .advisory(Level::Warning, "look for lactate, ketones, toxins, uraemia");
        }

        if let Some(delta) = result.delta {
            report = report.detail(Measurement::new("Delta ratio", delta.ratio, ""));
            match delta.finding {
                DeltaFinding::ConcurrentHyperchloremicAcidosis => {
                    report = report.finding("concurrent hyperchloremic (non-gap) metabolic acidosis");
                }
                DeltaFinding::ConcurrentMetabolicAlkalosis => {
                    report = report.finding("concurrent metabolic alkalosis");
                }
                DeltaFinding::PureAnionGapAcidosis => {}
            }
        }

        if let Some(winters) = result.winters {
            report = report.detail(
                Measurement::new("Expected PaCO2", winters.expected, "mmHg").precision(1),
            );
            let band = format!("{:.1}–{:.1} mmHg", winters.low, winters.high);
            report = match winters.compensation {
                Compensation::Appropriate => report.finding(format!("appropriate respiratory compensation ({})", band)),
                Compensation::ConcurrentRespiratoryAcidosis => report
                    .finding(format!("PaCO2 above {}: concurrent respiratory acidosis", band))
                    .advisory(Level::Warning, "inadequate respiratory compensation"),
                Compensation::ConcurrentRespiratoryAlkalosis => report
                    .finding(format!(
                        "PaCO2 below {}: over-compensation / concurrent respiratory alkalosis",
                        band
                    ))
                    .advisory(Level::Warning, "respiratory alkalosis on top of the metabolic acidosis"),
            };
        }
        Ok(report)
    }
}

// ===== Haemodynamics =====

pub struct Forrester;

impl Calculator for Forrester {
    fn name(&self) -> &'static str {
        "forrester"
    }

    fn title(&self) -> &'static str {
        "Forrester classification"
    }

    fn fields(&self) -> &'static [Field] {
        &[Field::CardiacOutput, Field::Bsa, Field::HeightCm, Field::WeightKg, Field::Pcwp]
    }

    fn compute(&self, form: &Form) -> Result<Report, CalcError> {
        let cardiac_output = form.require_number(Field::CardiacOutput)?;
        let pcwp = form.require_number(Field::Pcwp)?;

        let (bsa, derived) = match form.number(Field::Bsa)? {
            Some(bsa) => (bsa, false),
            None => match (form.number(Field::HeightCm)?, form.number(Field::WeightKg)?) {
                (Some(height), Some(weight)) => (hemodynamics::body_surface_area(height, weight)?, true),
                _ => return Err(CalcError::MissingInput(Field::Bsa)),
            },
        };

        let result = hemodynamics::forrester(cardiac_output, bsa, pcwp)?;
        let bsa_label = if derived { "BSA (Du Bois)" } else { "BSA" };

        let level = match result.class {
            ForresterClass::I => Level::Info,
            ForresterClass::II | ForresterClass::III => Level::Warning,
            ForresterClass::IV => Level::Critical,
        };

        Ok(
            Report::new(self.title(), Measurement::new("Cardiac index", result.cardiac_index, "L/min/m²"))
                .detail(Measurement::new(bsa_label, bsa, "m²"))
                .detail(Measurement::new("PCWP", pcwp, "mmHg").precision(0))
                .classification(result.class.to_string())
                .advisory(level, result.class.therapy())
                .formula("CI = CO / BSA; wet if PCWP ≥ 18, cold if CI < 2.2"),
        )
    }
}

pub struct Shock;

impl Shock {
    fn findings(form: &Form) -> Result<BedsideFindings, CalcError> {
        Ok(BedsideFindings {
            skin: form.text(Field::Skin).map(|s| s.parse::<Skin>()).transpose()?,
            lung: form.text(Field::Lung).map(|l| l.parse::<Lung>()).transpose()?,
            infection: form.flag(Field::Infection)?,
            bleeding: form.flag(Field::Bleeding)?,
            jvd: form.flag(Field::Jvd)?,
        })
    }
}

impl Calculator for Shock {
    fn name(&self) -> &'static str {
        "shock"
    }

    fn title(&self) -> &'static str {
        "Shock assessment"
    }

    fn fields(&self) -> &'static [Field] {
        &[
            Field::Sbp,
            Field::Dbp,
            Field::Lactate,
            Field::Skin,
            Field::Lung,
            Field::Infection,
            Field::Bleeding,
            Field::Jvd,
        ]
    }

    fn compute(&self, form: &Form) -> Result<Report, CalcError> {
        let input = ShockInput {
            sbp: form.require_number(Field::Sbp)?,
            dbp: form.require_number(Field::Dbp)?,
            lactate: form.number(Field::Lactate)?,
            findings: Self::findings(form)?,
        };
        let assessment = hemodynamics::assess_shock(&input);

        let mut report = Report::new(self.title(), Measurement::new("MAP", assessment.map, "mmHg").precision(0))
            .classification(assessment.severity.to_string())
            .formula("MAP = (SBP + 2 × DBP) / 3; shock if MAP < 65 or SBP < 90");
        if let Some(lactate) = input.lactate {
            report = report.detail(Measurement::new("Lactate", lactate, "mmol/L").precision(1));
        }

        let partial = input.findings.skin.is_none() || input.findings.lung.is_none();
        if !assessment.candidates.is_empty() {
            let names: Vec<String> = assessment.candidates.iter().map(|c| c.to_string()).collect();
            report = report.finding(format!("candidate etiologies: {}", names.join(", ")));
        } else if !partial {
            report = report.finding("no etiology rule matched these findings");
        }
        if partial {
            report = report.advisory(Level::Info, "enter skin and lung findings for a complete etiology shortlist");
        }

        if let Some(action) = assessment.first_action {
            let level = match assessment.severity {
                ShockSeverity::Severe => Level::Critical,
                ShockSeverity::Shock | ShockSeverity::Hypoperfusion => Level::Warning,
                ShockSeverity::None => Level::Info,
            };
            report = report.advisory(level, format!("first action: {}", action));
        } else if assessment.hypotension {
            report = report.advisory(Level::Critical, "hypotension: start resuscitation and reassess");
        }
        Ok(report)
    }
}

// ===== Electrolytes =====

pub struct ElectrolyteConverter;

impl Calculator for ElectrolyteConverter {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn title(&self) -> &'static str {
        "Electrolyte unit conversion"
    }

    fn fields(&self) -> &'static [Field] {
        &[Field::Ion, Field::Value, Field::Unit]
    }

    fn compute(&self, form: &Form) -> Result<Report, CalcError> {
        let ion: Ion = form.require_text(Field::Ion)?.parse()?;
        let value = form.require_number(Field::Value)?;
        let unit: ConcentrationUnit = form.require_text(Field::Unit)?.parse()?;

        let conversion = electrolytes::convert(ion, value, unit)?;
        let target = match unit {
            ConcentrationUnit::MgPerDl => ConcentrationUnit::MmolPerL,
            ConcentrationUnit::MmolPerL | ConcentrationUnit::MeqPerL => ConcentrationUnit::MgPerDl,
        };

        let mut report = Report::new(
            self.title(),
            Measurement::new(format!("{}", ion), conversion.get(target), target.to_string()).precision(3),
        );
        for unit in [ConcentrationUnit::MgPerDl, ConcentrationUnit::MmolPerL, ConcentrationUnit::MeqPerL] {
            if unit != target {
                report = report.detail(Measurement::new(format!("{}", ion), conversion.get(unit), unit.to_string()).precision(3));
            }
        }
        Ok(report.formula(format!(
            "mmol/L = mg/dL × 10 / {} ; mEq/L = mmol/L × {}",
            ion.molar_mass(),
            ion.valence()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let calculators = all(&PresetTable::default());
        let mut names: Vec<_> = calculators.iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), calculators.len());
    }

    #[test]
    fn fields_are_in_the_allow_list() {
        for calculator in all(&PresetTable::default()) {
            for field in calculator.fields() {
                assert!(Field::ALL.contains(field), "{} reads {}", calculator.name(), field);
            }
        }
    }

    #[test]
    fn find_agrees_with_the_registry() {
        let presets = PresetTable::default();
        for calculator in all(&presets) {
            let found = find(calculator.name(), &presets).unwrap();
            assert_eq!(found.name(), calculator.name());
            assert_eq!(found.title(), calculator.title());
        }
    }

    #[test]
    fn find_by_name() {
        let presets = PresetTable::default();
        assert_eq!(find("ccr", &presets).map(|c| c.name()), Some("ccr"));
        assert!(find("sofa", &presets).is_none());
    }
}
