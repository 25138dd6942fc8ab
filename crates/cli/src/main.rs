use api_shared::{EstimateEgfrRes, HealthService};
use clap::{Parser, Subcommand};
use drc_core::config::resolve_history_file;
use drc_core::validation::{self, parse_numeric};
use drc_core::{
    egfr, export, CkdStage, CreatinineInput, DialysisType, LabField, PatientLabRecord, Sex,
};
use drc_history::{History, JsonFileHistoryStore};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drc")]
#[command(about = "CKD lab analyser CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the tool is alive
    Health,
    /// Estimate eGFR (CKD-EPI 2021) and the resulting stage
    Egfr {
        /// Serum creatinine (mg/dL)
        #[arg(long)]
        creatinine: f64,
        /// Age (years)
        #[arg(long)]
        age: f64,
        /// male or female
        #[arg(long)]
        sex: Sex,
        /// Current stage (3a, 3b, 4, 5, 5D); defaults to 5D
        #[arg(long)]
        stage: Option<CkdStage>,
        /// Current dialysis type (Hemodialysis, "Peritoneal Dialysis", None); defaults to Hemodialysis
        #[arg(long)]
        dialysis: Option<DialysisType>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate one lab value
    Validate {
        /// Field name, e.g. hemoglobin or alkalinePhosphatase
        field: String,
        /// Value as typed into the form
        value: String,
    },
    /// Validate a patient record stored as JSON
    Check {
        /// Path to the record file
        record: PathBuf,
    },
    /// Inspect the analysis history
    History {
        /// History file
        #[arg(long, env = "DRC_HISTORY_FILE")]
        history_file: Option<PathBuf>,
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List entries, newest first
    List,
    /// Print one entry as JSON
    Show { id: String },
    /// Delete one entry
    Delete { id: String },
    /// Delete every entry
    Clear,
    /// Compare two entries, oldest first
    Compare { a: String, b: String },
    /// Write an entry's analysis result to `analise-drc-<timestamp>.json`
    Export {
        id: String,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Some(Commands::Health) => {
            writeln!(out, "{}", HealthService::check_health().message)?;
        }
        Some(Commands::Egfr {
            creatinine,
            age,
            sex,
            stage,
            dialysis,
            json,
        }) => {
            let input = CreatinineInput {
                creatinine,
                age,
                sex,
            };
            let Some(estimate) = egfr::estimate_egfr(&input) else {
                return Err("creatinine and age must be positive".into());
            };
            let defaults = PatientLabRecord::default();
            let res = EstimateEgfrRes {
                egfr: estimate.egfr,
                suggested_stage: estimate.suggested_stage,
                ckd_stage: egfr::final_stage(
                    stage.unwrap_or(defaults.ckd_stage),
                    dialysis.unwrap_or(defaults.dialysis_type),
                    estimate.suggested_stage,
                ),
            };
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&res)?)?;
            } else {
                let suggested = res
                    .suggested_stage
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none (eGFR >= 60)".into());
                writeln!(out, "eGFR: {} mL/min/1.73m²", res.egfr)?;
                writeln!(out, "Suggested stage: {suggested}")?;
                writeln!(out, "Stage: {}", res.ckd_stage)?;
            }
        }
        Some(Commands::Validate { field, value }) => {
            if LabField::from_name(&field).is_none() {
                return Err(format!("unknown field: {field}").into());
            }
            match validation::validate_field(&field, parse_numeric(&value)) {
                Some(error) => writeln!(out, "{field}: {error}")?,
                None => writeln!(out, "{field}: ok")?,
            }
        }
        Some(Commands::Check { record }) => {
            let contents = std::fs::read_to_string(&record)?;
            let record: PatientLabRecord = serde_json::from_str(&contents)?;
            let errors = validation::validate_record(&record);
            if errors.is_clear() {
                writeln!(out, "Record is valid")?;
            } else {
                for (field, message) in errors.violations() {
                    writeln!(out, "{field}: {message}")?;
                }
            }
        }
        Some(Commands::History {
            history_file,
            command,
        }) => {
            let path = resolve_history_file(history_file)?;
            let mut history = History::load(JsonFileHistoryStore::new(path))?;
            run_history(&mut history, command, out)?;
        }
        None => {
            writeln!(out, "Use 'drc --help' for commands")?;
        }
    }

    Ok(())
}

fn run_history(
    history: &mut History,
    command: HistoryCommands,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match command {
        HistoryCommands::List => {
            if history.is_empty() {
                writeln!(out, "No history entries found.")?;
            }
            for entry in history.entries() {
                let when = entry
                    .recorded_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| entry.timestamp.to_string());
                writeln!(
                    out,
                    "{}  {}  stage {}  {}",
                    entry.id, when, entry.patient_data.ckd_stage, entry.result.overall_summary
                )?;
            }
        }
        HistoryCommands::Show { id } => {
            let entry = history
                .get(&id)
                .ok_or_else(|| format!("history entry not found: {id}"))?;
            writeln!(out, "{}", serde_json::to_string_pretty(entry)?)?;
        }
        HistoryCommands::Delete { id } => {
            if history.delete(&id)? {
                writeln!(out, "Deleted {id}")?;
            } else {
                return Err(format!("history entry not found: {id}").into());
            }
        }
        HistoryCommands::Clear => {
            history.clear()?;
            writeln!(out, "History cleared")?;
        }
        HistoryCommands::Compare { a, b } => {
            let comparison = history.compare(&a, &b)?;
            for row in &comparison.rows {
                writeln!(
                    out,
                    "{:<22} {:>8} -> {:>8} {:<6} ({:+.1})",
                    row.label, row.previous, row.current, row.unit, row.delta
                )?;
            }
            writeln!(out, "Previous: {}", comparison.previous_summary)?;
            writeln!(out, "Current: {}", comparison.current_summary)?;
        }
        HistoryCommands::Export { id, out: dir } => {
            let entry = history
                .get(&id)
                .ok_or_else(|| format!("history entry not found: {id}"))?;
            let path = dir.join(export::export_file_name(chrono::Utc::now()));
            std::fs::write(&path, export::export_result_json(&entry.result)?)?;
            writeln!(out, "Wrote {}", path.display())?;
        }
    }
    Ok(())
}
