use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use encounter_narrative_lib::config::{self, BackendKind, GenerationConfig};
use encounter_narrative_lib::models::TableName;
use encounter_narrative_lib::pipeline::loader::load_directory;
use encounter_narrative_lib::pipeline::narrative::NarrativeGenerator;
use encounter_narrative_lib::pipeline::processor::{pick_encounter, render_encounter, NarrativePipeline};

/// Generate a clinical narrative for one synthetic EHR encounter.
#[derive(Parser, Debug)]
#[command(name = "encounter-narrative", version)]
struct Cli {
    /// Directory holding the CSV tables (encounters.csv, patients.csv, ...)
    #[arg(long, env = "ENCOUNTER_DATA_DIR", default_value = config::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Encounter to narrate; sampled with --seed when omitted
    #[arg(long)]
    encounter_id: Option<String>,

    #[arg(long, env = "ENCOUNTER_OUTPUT_DIR", default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[arg(long, value_enum, env = "NARRATIVE_BACKEND", default_value_t = BackendKind::Ollama)]
    backend: BackendKind,

    /// Model name; backend default when omitted
    #[arg(long, env = "NARRATIVE_MODEL")]
    model: Option<String>,

    /// Backend base URL; backend default when omitted
    #[arg(long, env = "NARRATIVE_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, default_value_t = config::DEFAULT_TEMPERATURE)]
    temperature: f32,

    #[arg(long, default_value_t = config::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    #[arg(long, default_value_t = config::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    #[arg(long, default_value_t = config::DEFAULT_BACKOFF_BASE_MS)]
    backoff_ms: u64,

    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Seeds encounter sampling and backend sampling
    #[arg(long, default_value_t = config::DEFAULT_SEED)]
    seed: u64,

    /// Print the rendered profile and exit without calling a backend
    #[arg(long)]
    render_only: bool,
}

impl Cli {
    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            backend: self.backend,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| self.backend.default_model().to_string()),
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| self.backend.default_base_url().to_string()),
            api_key: self.api_key.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            seed: Some(self.seed),
            max_attempts: self.max_attempts,
            backoff_base_ms: self.backoff_ms,
            timeout_secs: self.timeout_secs,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let store = load_directory(&cli.data_dir)
        .with_context(|| format!("loading tables from {}", cli.data_dir.display()))?;

    let encounter_id = match &cli.encounter_id {
        Some(id) => id.clone(),
        None => {
            let ids = store.ids(TableName::Encounters);
            let picked = pick_encounter(&ids, cli.seed)
                .context("no encounters available to sample")?
                .to_string();
            tracing::info!(encounter_id = %picked, seed = cli.seed, "Encounter sampled");
            picked
        }
    };

    if cli.render_only {
        print!("{}", render_encounter(&store, &encounter_id)?);
        return Ok(());
    }

    let cfg = cli.generation_config();
    cfg.validate().context("invalid generation settings")?;

    let generator = NarrativeGenerator::from_config(&cfg)?;
    let pipeline = NarrativePipeline::new(store, generator);

    let (narrative, dir) = pipeline.run_and_save(&encounter_id, &cli.output_dir)?;
    println!("{}", narrative.text);
    tracing::info!(dir = %dir.display(), attempts = narrative.provenance.attempts, "Done");
    Ok(())
}
