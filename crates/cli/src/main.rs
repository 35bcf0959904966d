use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use medcode_core::constants::{DEFAULT_BASE_URL, DEFAULT_CODING_FLOW_ID, DEFAULT_SIMPLIFY_FLOW_ID};
use medcode_core::simplify::fallback_notice;
use medcode_core::{
    extract_stage_outputs, pacing_from_env_value, stage_catalog_from_env_value, ClientConfig,
    Gender, NonEmptyText, PatientMetadata, PipelineRequest, PlaybackPacing, SimplificationLevel,
    SimplifyRequest, StageCatalog, StageStatus, StageUpdate, TargetAudience, WorkflowClient,
};
use medcode_export::{format_stage_output, ExportService};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output key of the stage whose result is exported and reported on.
const EXPLANATIONS_KEY: &str = "explanations";

#[derive(Parser)]
#[command(name = "medcode")]
#[command(about = "Clinical note coding workflow client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a clinical note through the coding workflow
    Code {
        /// Note text
        #[arg(long, conflicts_with = "note_file")]
        note: Option<String>,
        /// Read the note from a file
        #[arg(long)]
        note_file: Option<PathBuf>,
        #[command(flatten)]
        patient: PatientArgs,
        /// Write the JSON export and coding report into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Play stage results back without pauses
        #[arg(long)]
        no_delay: bool,
    },
    /// Rewrite clinical text in plain language
    Simplify {
        /// Text to simplify
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Read the text from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Reading level: basic, moderate or advanced
        #[arg(long, default_value = "moderate")]
        level: SimplificationLevel,
        /// Audience: general, elderly or pediatric
        #[arg(long, default_value = "general")]
        audience: TargetAudience,
        #[command(flatten)]
        patient: PatientArgs,
        /// Write the simplification record into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Extract stage outputs from a saved workflow response
    Extract {
        /// Path to the saved JSON response
        response: PathBuf,
    },
    /// List the configured stages
    Stages,
}

/// Optional patient details sent with a note.
#[derive(Args)]
struct PatientArgs {
    /// Patient identifier
    #[arg(long)]
    patient_id: Option<String>,
    /// Patient name
    #[arg(long)]
    patient_name: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    dob: Option<String>,
    /// Gender: male, female or other
    #[arg(long)]
    gender: Option<Gender>,
}

impl PatientArgs {
    fn into_metadata(self) -> PatientMetadata {
        PatientMetadata {
            patient_id: self.patient_id.and_then(NonEmptyText::optional),
            patient_name: self.patient_name.and_then(NonEmptyText::optional),
            date_of_birth: self.dob.and_then(NonEmptyText::optional),
            gender: self.gender,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medcode=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Code {
            note,
            note_file,
            patient,
            out_dir,
            no_delay,
        }) => {
            let mut config = config_from_env()?;
            if no_delay {
                config = config.with_pacing(PlaybackPacing::immediate());
            }
            let note = read_text(note, note_file.as_deref(), "note")?;
            run_coding(
                WorkflowClient::new(config),
                note,
                patient.into_metadata(),
                out_dir,
            )
            .await?;
        }
        Some(Commands::Simplify {
            text,
            file,
            level,
            audience,
            patient,
            out_dir,
        }) => {
            let client = WorkflowClient::new(config_from_env()?);
            let request = SimplifyRequest {
                text: read_text(text, file.as_deref(), "text")?,
                level,
                audience,
                patient: patient.into_metadata(),
            };

            let outcome = client.simplify_or_fallback(&request).await;
            if let Some(reason) = &outcome.fallback_reason {
                eprintln!("{}", fallback_notice(reason));
            }
            let result = &outcome.simplification;
            println!("{}", result.text);
            println!();
            println!(
                "Target: {} for {}",
                request.level.description(),
                request.audience.description()
            );
            println!(
                "Reading level: {:.1} | Source: {:?} | Time: {:.2}s",
                result.reading_level,
                result.source,
                result.processing_time.as_secs_f64()
            );

            if let Some(dir) = out_dir {
                let path = ExportService::new(&dir)?.write_simplification(
                    &request,
                    result,
                    chrono::Utc::now(),
                )?;
                println!("Wrote {}", path.display());
            }
        }
        Some(Commands::Extract { response }) => {
            let stages = catalog_from_env()?;
            let raw = std::fs::read_to_string(&response)
                .with_context(|| format!("failed to read {}", response.display()))?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", response.display()))?;

            let outputs = extract_stage_outputs(&value, &stages);
            let listing: Vec<serde_json::Value> = stages
                .iter()
                .zip(outputs.iter())
                .enumerate()
                .map(|(index, (stage, output))| {
                    serde_json::json!({
                        "id": stage.id,
                        "name": stage.name,
                        "matched": outputs.is_matched(index),
                        "output": output,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Some(Commands::Stages) => {
            let stages = catalog_from_env()?;
            for (index, stage) in stages.iter().enumerate() {
                println!(
                    "{}. {} ({}) key={}",
                    index + 1,
                    stage.label,
                    stage.name,
                    stage.signature_key
                );
            }
        }
        None => {
            println!("Use 'medcode --help' for commands");
        }
    }

    Ok(())
}

/// Resolves client configuration from `MEDCODE_*` environment variables.
fn config_from_env() -> anyhow::Result<ClientConfig> {
    let base_url = std::env::var("MEDCODE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let coding_flow_id =
        std::env::var("MEDCODE_FLOW_ID").unwrap_or_else(|_| DEFAULT_CODING_FLOW_ID.into());
    let simplify_flow_id = std::env::var("MEDCODE_SIMPLIFY_FLOW_ID")
        .unwrap_or_else(|_| DEFAULT_SIMPLIFY_FLOW_ID.into());
    let pacing = pacing_from_env_value(std::env::var("MEDCODE_PLAYBACK_DELAY_MS").ok())?;

    Ok(ClientConfig::new(&base_url, coding_flow_id, simplify_flow_id)?
        .with_pacing(pacing)
        .with_stages(catalog_from_env()?))
}

fn catalog_from_env() -> anyhow::Result<StageCatalog> {
    Ok(stage_catalog_from_env_value(
        std::env::var("MEDCODE_STAGES_FILE").ok(),
    )?)
}

fn read_text(inline: Option<String>, file: Option<&Path>, what: &str) -> anyhow::Result<NonEmptyText> {
    let raw = match (inline, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("no {what} given: pass --{what} or a file"),
    };
    NonEmptyText::new(raw).with_context(|| format!("{what} cannot be empty"))
}

async fn run_coding(
    client: WorkflowClient,
    note: NonEmptyText,
    metadata: PatientMetadata,
    out_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let metadata = (!metadata.is_empty()).then_some(metadata);
    let request = PipelineRequest::new(note, metadata);
    let stages = client.stages();
    let total = stages.len();
    let mut run = client.new_run();

    let result = client
        .run_pipeline_with(&request, &mut run, |update: &StageUpdate| {
            let label = stages
                .get(update.index)
                .map(|s| s.label.as_str())
                .unwrap_or("?");
            println!("[{}/{}] {} {}", update.index + 1, total, label, update.status);
        })
        .await;

    if let Err(e) = result {
        if let Some(stage) = run
            .stages()
            .iter()
            .find(|s| s.status == StageStatus::Error)
        {
            eprintln!(
                "{}: {}",
                stage.name,
                stage.error.as_deref().unwrap_or_default()
            );
        }
        return Err(e).context("coding workflow failed");
    }

    for stage in run.completed_stages() {
        let (Some(definition), Some(output)) = (
            stages.position(&stage.id).and_then(|i| stages.get(i)),
            stage.output.as_ref(),
        ) else {
            continue;
        };
        println!();
        println!("== {} ==", definition.label);
        println!("{}", format_stage_output(definition, output));
    }

    if let Some(dir) = out_dir {
        let service = ExportService::new(&dir)?;
        let explainer_output = stages
            .iter()
            .find(|s| s.signature_key == EXPLANATIONS_KEY)
            .and_then(|s| run.output_of(&s.id));
        if explainer_output.is_none() {
            tracing::warn!("no explanations stage in the catalog; nothing to export");
        }

        let now = chrono::Utc::now();
        let json_path = service.write_json(explainer_output, now.date_naive())?;
        let report_path = service.write_coding_report(explainer_output, now)?;
        println!();
        println!("Wrote {}", json_path.display());
        println!("Wrote {}", report_path.display());
    }

    Ok(())
}
