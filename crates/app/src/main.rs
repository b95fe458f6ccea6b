mod chat;
mod error;
mod listen;
mod serve;
mod settings;
mod wake;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use snafu::{OptionExt, ResultExt};

use hintline_catalog::Catalog;
use hintline_engine::{Engine, KeywordClassifier};
use hintline_llm::create_provider;

use error::{
    AppResult, BuildRuntimeSnafu, CreateProviderSnafu, LoadCatalogSnafu, MissingApiKeySnafu,
};
use settings::SettingsStore;
use wake::WakeGate;

#[derive(Debug, Parser)]
#[command(name = "hintline", version, about = "Escape-room puzzle hint assistant")]
struct Cli {
    /// Settings file to use instead of the per-user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Puzzle catalog TSV; overrides the configured path.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat loop on stdin/stdout.
    Chat,
    /// Wake-phrase-gated loop over transcribed speech lines on stdin.
    Listen,
    /// Minimal HTTP chat endpoint (POST /api/chat, POST /api/clear).
    Serve {
        #[arg(long, default_value_t = 5004)]
        port: u16,
    },
}

fn main() -> ExitCode {
    // Initialize tracing for development debugging
    tracing_subscriber::fmt::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", snafu::Report::from_error(error));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let settings_store = match cli.config {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::load(),
    };
    let settings = settings_store.settings();

    let catalog_path = cli
        .catalog
        .unwrap_or_else(|| PathBuf::from(&settings.catalog_path));
    let catalog = Arc::new(Catalog::load(&catalog_path).context(LoadCatalogSnafu {
        stage: "startup-load-catalog",
    })?);

    let provider_config = settings.to_provider_config().context(MissingApiKeySnafu {
        stage: "startup-provider-config",
    })?;
    let provider = create_provider(provider_config).context(CreateProviderSnafu {
        stage: "startup-create-provider",
    })?;

    let classifier = Arc::new(KeywordClassifier::new(settings.help_keywords.iter().cloned()));
    let mut engine = Engine::new(catalog, provider, classifier);
    if !settings.persona.trim().is_empty() {
        engine = engine.with_persona(settings.persona.clone());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context(BuildRuntimeSnafu {
            stage: "build-tokio-runtime",
        })?;

    match cli.command {
        Command::Chat => chat::run(&runtime, &engine),
        Command::Listen => {
            let gate = WakeGate::new(settings.wake_phrases.iter().cloned());
            listen::run(&runtime, &engine, &gate)
        }
        Command::Serve { port } => serve::run(&runtime, &engine, port),
    }
}
