//! uxstep CLI
//!
//! Command-line access to the usability step harness: run a step across
//! profiles and models, detect UI elements, list the catalog, or serve the
//! REST API.
//!
//! Copyright (c) 2025 Michael A Wright

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use llm_bridge::{NvidiaDetectionClient, Orchestrator, ProviderClients, ServiceRegistry};
use std::path::{Path, PathBuf};
use step_core::catalog::available_models;
use step_core::imaging::encode_image_file;
use step_core::{profiles, DetectionResponse, Profile, StepRunRequest};
use tracing_subscriber::EnvFilter;
use uxstep_server::{ServerConfig, ServiceScope};

#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "uxstep")]
#[command(
    about = "Ask vision models for the next usability step on a screenshot",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the models offered to callers
    Models,

    /// List prompt profiles, or print one profile's system prompt
    Profiles {
        /// Profile key whose prompt to print
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Run one step across profiles and models
    Step {
        /// The user's goal
        #[arg(short, long)]
        objective: String,

        /// Position of the step in the task
        #[arg(short = 'n', long, default_value_t = 1)]
        step_index: u32,

        /// Screenshot file
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// File holding a JSON list of UI components
        #[arg(long)]
        ui_json: Option<PathBuf>,

        /// Summary of previous steps
        #[arg(long)]
        history_summary: Option<String>,

        /// Profile key, repeatable (default: AnalisysComponentsLLM)
        #[arg(short, long = "profile")]
        profiles: Vec<String>,

        /// Model id, repeatable (default: the catalog)
        #[arg(short, long = "model")]
        models: Vec<String>,

        /// Session label echoed in the output (default: random)
        #[arg(long)]
        session_id: Option<String>,

        /// Report failing pairs instead of failing the whole run
        #[arg(long)]
        isolate_failures: bool,
    },

    /// Detect UI elements on a screenshot
    Detect {
        /// Screenshot file
        #[arg(short, long)]
        image: PathBuf,

        /// Session label echoed in the output (default: random)
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Serve the REST API
    Serve {
        /// Interface to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Service lifetime: request or shared
        #[arg(long, default_value = "request")]
        scope: ServiceScope,
    },

    /// Print build information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Models => {
            for model in available_models() {
                println!("{}", model);
            }
            Ok(())
        }
        Commands::Profiles { prompt } => {
            match prompt {
                Some(key) => println!("{}", profiles::lookup(&key)),
                None => {
                    for profile in Profile::ALL {
                        let marker = if profile == Profile::DEFAULT { " (default)" } else { "" };
                        println!("{}{}", profile.key(), marker);
                    }
                }
            }
            Ok(())
        }
        Commands::Step {
            objective,
            step_index,
            image,
            ui_json,
            history_summary,
            profiles,
            models,
            session_id,
            isolate_failures,
        } => {
            let request = StepRunRequest {
                session_id: session_id.unwrap_or_else(new_session_id),
                objective,
                step_index,
                image_base64: image.as_deref().map(encode_image_file).transpose()?,
                ui_json: ui_json.as_deref().map(read_text).transpose()?,
                history_summary,
                profiles,
                models: if models.is_empty() {
                    available_models().into_iter().map(str::to_string).collect()
                } else {
                    models
                },
                isolate_failures,
            };

            let orchestrator =
                Orchestrator::shared(ServiceRegistry::standard(&ProviderClients::from_env()));
            let response = orchestrator.run_step(request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Detect { image, session_id } => {
            let image_base64 = encode_image_file(&image)?;
            let client = NvidiaDetectionClient::from_env()?;
            let result = client.detect(&image_base64, None).await?;

            let response = DetectionResponse {
                session_id: session_id.unwrap_or_else(new_session_id),
                detections: result.detections,
                raw_response: result.raw_response,
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Serve { host, port, scope } => {
            uxstep_server::serve(ServerConfig { host, port, scope }).await
        }
        Commands::Version => {
            println!("uxstep {}", built_info::PKG_VERSION);
            println!("target: {}", built_info::TARGET);
            println!("rustc: {}", built_info::RUSTC_VERSION);
            println!("commit: {}", env!("BUILT_GIT_COMMIT_HASH"));
            println!("built: {}", env!("BUILT_TIME_UTC"));
            Ok(())
        }
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
