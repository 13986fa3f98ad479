//! ICU pharmacist helper
//!
//! Command-line entry point: one subcommand per calculator.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use icu_helper::models::{Field, FieldValue, Form};
use icu_helper::{drafts, settings, tools};

#[derive(Parser)]
#[command(name = "icu-helper", about = "ICU pharmacist bedside calculators", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Load form values from a draft before applying flags
    #[arg(long, global = true)]
    draft: Option<PathBuf>,
    /// Save the form values as a draft; without a path a timestamped file
    /// is written to the configured draft directory
    #[arg(long, global = true, num_args = 0..=1)]
    save: Option<Option<PathBuf>>,
    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Flow rate (mL/h) → γ
    Gamma(GammaArgs),
    /// Target γ → flow rate (mL/h)
    Flow(FlowArgs),
    /// Creatinine clearance (Cockcroft-Gault)
    Ccr(CcrArgs),
    /// Anion gap, delta ratio and Winter's formula
    AcidBase(AcidBaseArgs),
    /// FeNa / FeUrea
    Renal(RenalArgs),
    /// Forrester haemodynamic quadrant
    Forrester(ForresterArgs),
    /// MAP, shock severity and etiology shortlist
    Shock(ShockArgs),
    /// Electrolyte mg/dL ↔ mmol/L ↔ mEq/L
    Convert(ConvertArgs),
    /// List drug presets
    Presets,
}

fn put<T: Into<FieldValue>>(form: &mut Form, field: Field, value: Option<T>) {
    if let Some(value) = value {
        form.set(field, value);
    }
}

#[derive(Args)]
struct GammaArgs {
    /// Drug preset (fills drug mg / solvent mL)
    #[arg(long)]
    preset: Option<String>,
    #[arg(long)]
    drug_mg: Option<f64>,
    #[arg(long)]
    solvent_ml: Option<f64>,
    #[arg(long)]
    flow: Option<f64>,
    #[arg(long)]
    weight: Option<f64>,
}

#[derive(Args)]
struct FlowArgs {
    #[arg(long)]
    preset: Option<String>,
    #[arg(long)]
    drug_mg: Option<f64>,
    #[arg(long)]
    solvent_ml: Option<f64>,
    /// Target dose in the preset's unit (μg/kg/min by default)
    #[arg(long)]
    target: Option<f64>,
    #[arg(long)]
    weight: Option<f64>,
}

#[derive(Args)]
struct CcrArgs {
    #[arg(long)]
    age: Option<f64>,
    #[arg(long)]
    weight: Option<f64>,
    /// Serum creatinine (mg/dL)
    #[arg(long)]
    scr: Option<f64>,
    /// male / female
    #[arg(long)]
    sex: Option<String>,
}

#[derive(Args)]
struct AcidBaseArgs {
    #[arg(long)]
    ph: Option<f64>,
    #[arg(long)]
    pco2: Option<f64>,
    #[arg(long)]
    hco3: Option<f64>,
    #[arg(long)]
    na: Option<f64>,
    #[arg(long)]
    cl: Option<f64>,
    /// g/dL, 4.0 when omitted
    #[arg(long)]
    albumin: Option<f64>,
}

#[derive(Args)]
struct RenalArgs {
    #[arg(long)]
    urine_na: Option<f64>,
    #[arg(long)]
    plasma_na: Option<f64>,
    #[arg(long)]
    urine_cr: Option<f64>,
    #[arg(long)]
    plasma_cr: Option<f64>,
    #[arg(long)]
    urine_urea: Option<f64>,
    #[arg(long)]
    plasma_urea: Option<f64>,
}

#[derive(Args)]
struct ForresterArgs {
    /// Cardiac output (L/min)
    #[arg(long)]
    co: Option<f64>,
    /// Body surface area (m²); derived from height and weight when omitted
    #[arg(long)]
    bsa: Option<f64>,
    #[arg(long)]
    height: Option<f64>,
    #[arg(long)]
    weight: Option<f64>,
    #[arg(long)]
    pcwp: Option<f64>,
}

#[derive(Args)]
struct ShockArgs {
    #[arg(long)]
    sbp: Option<f64>,
    #[arg(long)]
    dbp: Option<f64>,
    #[arg(long)]
    lactate: Option<f64>,
    /// warm / cold
    #[arg(long)]
    skin: Option<String>,
    /// wet / dry
    #[arg(long)]
    lung: Option<String>,
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    infection: Option<bool>,
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    bleeding: Option<bool>,
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    jvd: Option<bool>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Na, K, Cl, Ca, Mg or P
    #[arg(long)]
    ion: Option<String>,
    #[arg(long)]
    value: Option<f64>,
    /// mg/dL, mmol/L or mEq/L
    #[arg(long)]
    unit: Option<String>,
}

impl Commands {
    /// Calculator name and the form values given on the command line.
    fn into_form(self) -> Option<(&'static str, Form)> {
        let mut form = Form::new();
        let name = match self {
            Commands::Gamma(args) => {
                put(&mut form, Field::DrugPreset, args.preset);
                put(&mut form, Field::DrugMg, args.drug_mg);
                put(&mut form, Field::SolventMl, args.solvent_ml);
                put(&mut form, Field::FlowMlH, args.flow);
                put(&mut form, Field::WeightKg, args.weight);
                "gamma"
            }
            Commands::Flow(args) => {
                put(&mut form, Field::DrugPreset, args.preset);
                put(&mut form, Field::DrugMg, args.drug_mg);
                put(&mut form, Field::SolventMl, args.solvent_ml);
                put(&mut form, Field::TargetGamma, args.target);
                put(&mut form, Field::WeightKg, args.weight);
                "flow"
            }
            Commands::Ccr(args) => {
                put(&mut form, Field::Age, args.age);
                put(&mut form, Field::WeightKg, args.weight);
                put(&mut form, Field::SerumCreatinine, args.scr);
                put(&mut form, Field::Sex, args.sex);
                "ccr"
            }
            Commands::AcidBase(args) => {
                put(&mut form, Field::Ph, args.ph);
                put(&mut form, Field::Pco2, args.pco2);
                put(&mut form, Field::Hco3, args.hco3);
                put(&mut form, Field::Na, args.na);
                put(&mut form, Field::Cl, args.cl);
                put(&mut form, Field::Albumin, args.albumin);
                "acid-base"
            }
            Commands::Renal(args) => {
                put(&mut form, Field::UrineNa, args.urine_na);
                put(&mut form, Field::PlasmaNa, args.plasma_na);
                put(&mut form, Field::UrineCr, args.urine_cr);
                put(&mut form, Field::PlasmaCr, args.plasma_cr);
                put(&mut form, Field::UrineUrea, args.urine_urea);
                put(&mut form, Field::PlasmaUrea, args.plasma_urea);
                "renal"
            }
            Commands::Forrester(args) => {
                put(&mut form, Field::CardiacOutput, args.co);
                put(&mut form, Field::Bsa, args.bsa);
                put(&mut form, Field::HeightCm, args.height);
                put(&mut form, Field::WeightKg, args.weight);
                put(&mut form, Field::Pcwp, args.pcwp);
                "forrester"
            }
            Commands::Shock(args) => {
                put(&mut form, Field::Sbp, args.sbp);
                put(&mut form, Field::Dbp, args.dbp);
                put(&mut form, Field::Lactate, args.lactate);
                put(&mut form, Field::Skin, args.skin);
                put(&mut form, Field::Lung, args.lung);
                put(&mut form, Field::Infection, args.infection);
                put(&mut form, Field::Bleeding, args.bleeding);
                put(&mut form, Field::Jvd, args.jvd);
                "shock"
            }
            Commands::Convert(args) => {
                put(&mut form, Field::Ion, args.ion);
                put(&mut form, Field::Value, args.value);
                put(&mut form, Field::Unit, args.unit);
                "convert"
            }
            Commands::Presets => return None,
        };
        Some((name, form))
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_presets(settings: &settings::Settings) {
    for preset in settings.presets.iter() {
        let threshold = preset
            .threshold
            .map(|t| format!("reference ≤ {} {}", t, preset.unit))
            .unwrap_or_else(|| "no reference".to_string());
        println!(
            "{:<16} {} mg / {} mL  ({})  {}",
            preset.name, preset.drug_mg, preset.solvent_ml, preset.unit, threshold
        );
    }
}

/// Draft values (if any) with the command-line values on top.
fn build_form(draft: Option<&Path>, overrides: &Form) -> Result<Form> {
    let base = match draft {
        Some(path) => drafts::load(path, &Form::new())
            .with_context(|| format!("Failed to load draft {}", path.display()))?,
        None => Form::new(),
    };
    Ok(base.merged(overrides))
}

/// Where `--save` writes: the given path, or a timestamped file in `draft_dir`.
fn save_target(save: Option<Option<PathBuf>>, draft_dir: &Path) -> Option<PathBuf> {
    save.map(|path| path.unwrap_or_else(|| drafts::default_draft_path(draft_dir)))
}

fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = settings::load().context("Failed to load configuration")?;
    init_tracing(&settings.log_level);
    debug!(?settings, "settings loaded");

    let Some((name, overrides)) = cli.command.into_form() else {
        print_presets(&settings);
        return Ok(ExitCode::SUCCESS);
    };

    let form = build_form(cli.draft.as_deref(), &overrides)?;

    if let Some(path) = save_target(cli.save, &settings.draft_dir) {
        drafts::save(&path, &form).with_context(|| format!("Failed to save draft {}", path.display()))?;
        eprintln!("draft saved to {}", path.display());
    }

    let calculator = tools::find(name, &settings.presets)
        .with_context(|| format!("Unknown calculator: {}", name))?;

    match tools::run(calculator.as_ref(), &form) {
        Ok(report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("error: {}", err);
            Ok(ExitCode::from(2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("icu-helper").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn gamma_flags_map_to_fields() {
        let cli = parse(&["gamma", "--preset", "Dopamine", "--flow", "4.5", "--weight", "70"]);
        let (name, form) = cli.command.into_form().unwrap();

        assert_eq!(name, "gamma");
        assert_eq!(form.text(Field::DrugPreset).as_deref(), Some("Dopamine"));
        assert_eq!(form.require_number(Field::FlowMlH), Ok(4.5));
        assert_eq!(form.require_number(Field::WeightKg), Ok(70.0));
        assert!(!form.is_set(Field::DrugMg));
    }

    #[test_case(&["ccr", "--scr", "1.2"], "ccr", Field::SerumCreatinine)]
    #[test_case(&["flow", "--target", "0.1"], "flow", Field::TargetGamma)]
    #[test_case(&["acid-base", "--hco3", "18"], "acid-base", Field::Hco3)]
    #[test_case(&["renal", "--urine-urea", "300"], "renal", Field::UrineUrea)]
    #[test_case(&["forrester", "--co", "4"], "forrester", Field::CardiacOutput)]
    #[test_case(&["convert", "--value", "10"], "convert", Field::Value)]
    fn subcommands_pick_their_calculator(args: &[&str], calculator: &str, field: Field) {
        let (name, form) = parse(args).command.into_form().unwrap();
        assert_eq!(name, calculator);
        assert!(form.is_set(field));
        assert_eq!(form.iter().count(), 1);
    }

    #[test]
    fn shock_flags_take_an_optional_value() {
        let cli = parse(&["shock", "--sbp", "80", "--dbp", "40", "--bleeding", "--jvd", "false"]);
        let (_, form) = cli.command.into_form().unwrap();

        assert_eq!(form.get(Field::Bleeding), Some(&FieldValue::Flag(true)));
        assert_eq!(form.get(Field::Jvd), Some(&FieldValue::Flag(false)));
        assert!(!form.is_set(Field::Infection));
    }

    #[test]
    fn presets_has_no_form() {
        assert!(parse(&["presets"]).command.into_form().is_none());
    }

    #[test]
    fn flags_override_the_draft() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bed-2.json");
        let draft = Form::new().with(Field::Age, 80.0).with(Field::WeightKg, 55.0);
        drafts::save(&path, &draft).unwrap();

        let cli = parse(&["--draft", path.to_str().unwrap(), "ccr", "--age", "60"]);
        let (_, overrides) = cli.command.into_form().unwrap();
        let form = build_form(cli.draft.as_deref(), &overrides).unwrap();

        assert_eq!(form.require_number(Field::Age), Ok(60.0));
        assert_eq!(form.require_number(Field::WeightKg), Ok(55.0));
    }

    #[test]
    fn missing_draft_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(build_form(Some(&dir.path().join("absent.json")), &Form::new()).is_err());
    }

    #[test]
    fn save_without_path_goes_to_the_draft_dir() {
        let cli = parse(&["ccr", "--save"]);
        let target = save_target(cli.save, Path::new("drafts")).unwrap();
        assert_eq!(target.parent(), Some(Path::new("drafts")));

        let cli = parse(&["ccr", "--save", "bed-1.json"]);
        assert_eq!(save_target(cli.save, Path::new("drafts")), Some(PathBuf::from("bed-1.json")));

        assert_eq!(save_target(parse(&["ccr"]).save, Path::new("drafts")), None);
    }
}
