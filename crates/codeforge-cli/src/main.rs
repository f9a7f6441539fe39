//! CodeForge CLI - command-line host for the code-generation core.

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use std::path::PathBuf;

mod commands;
mod response;

use response::ErrorResponse;

/// CodeForge - generate, review and analyse code with AI models
#[derive(Parser)]
#[command(name = "codeforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// AI model id (e.g. gpt-4, anthropic-claude-2, codellama-34b)
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code from a prompt
    Code {
        prompt: String,
        #[arg(short, long, default_value = "python")]
        language: String,
    },

    /// Generate a whole project structure
    Project {
        prompt: String,
        #[arg(short, long, default_value = "python")]
        language: String,
    },

    /// Fill in a template's variables
    Template {
        /// Template file
        file: PathBuf,
        /// Variable as KEY=VALUE (VALUE may be JSON)
        #[arg(long = "var")]
        vars: Vec<String>,
        /// JSON object file with variables
        #[arg(long)]
        vars_file: Option<PathBuf>,
    },

    /// Ask for quality feedback on a file
    Quality {
        file: PathBuf,
        #[arg(short, long, default_value = "python")]
        language: String,
    },

    /// Review a file for bugs, security and performance issues
    Review {
        file: PathBuf,
        #[arg(short, long, default_value = "python")]
        language: String,
    },

    /// Compute static metrics for a file
    Metrics {
        file: PathBuf,
        #[arg(short, long, default_value = "python")]
        language: String,
    },

    /// Single-turn chat
    Chat { message: String },

    /// Generate with the local model
    Local {
        prompt: String,
        #[arg(long, default_value_t = 16, allow_negative_numbers = true)]
        max_length: i64,
        #[arg(long, default_value_t = 0.7, allow_negative_numbers = true)]
        temperature: f32,
        /// Wait for the model to finish loading first
        #[arg(long)]
        wait: bool,
        /// Generation deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List registered providers and the current model selection
    Providers,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "warn" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    match runtime.block_on(run(cli.command, cli.model.as_deref())) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
            Ok(())
        }
        Err(err) => {
            println!("{}", err.to_json());
            Err(miette::miette!("{} (status {})", err.error, err.status))
        }
    }
}

async fn run(command: Commands, model: Option<&str>) -> Result<serde_json::Value, ErrorResponse> {
    match command {
        Commands::Code { prompt, language } => {
            commands::generate::code(model, &prompt, &language).await
        }
        Commands::Project { prompt, language } => {
            commands::generate::project(model, &prompt, &language).await
        }
        Commands::Template {
            file,
            vars,
            vars_file,
        } => commands::generate::template(model, &file, &vars, vars_file.as_deref()).await,
        Commands::Quality { file, language } => {
            commands::generate::quality(model, &file, &language).await
        }
        Commands::Review { file, language } => {
            commands::generate::review(model, &file, &language).await
        }
        Commands::Metrics { file, language } => commands::metrics::run(&file, &language),
        Commands::Chat { message } => commands::generate::chat(model, &message).await,
        Commands::Local {
            prompt,
            max_length,
            temperature,
            wait,
            timeout_ms,
        } => commands::local::run(&prompt, max_length, temperature, wait, timeout_ms).await,
        Commands::Providers => commands::providers::run(model),
    }
}
