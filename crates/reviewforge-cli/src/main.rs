use clap::{Parser, Subcommand};
use reviewforge_core::AgentOutput;
use reviewforge_orchestrator::{aggregate, OrchestratorConfig, ReviewOrchestrator, TaskContext};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reviewforge", about = "Multi-agent code review planner")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "reviewforge.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a task description into a profile
    Classify {
        description: String,
        /// Files touched by the change (repeatable)
        #[arg(short, long = "file")]
        files: Vec<String>,
        /// Diff size in lines
        #[arg(long)]
        diff_lines: Option<usize>,
    },
    /// Rank every known agent against a task
    Rank {
        description: String,
        #[arg(short, long = "file")]
        files: Vec<String>,
    },
    /// Select a review team for a task
    Select {
        description: String,
        #[arg(short, long = "file")]
        files: Vec<String>,
        /// Team cap (overrides config)
        #[arg(short, long)]
        max_agents: Option<usize>,
    },
    /// Pick the single best agent to implement a change
    Implementer {
        description: String,
        #[arg(short, long = "file")]
        files: Vec<String>,
    },
    /// Check one agent output file against the output contract
    Validate { output: PathBuf },
    /// Merge agent output files into one result, skipping invalid records
    Aggregate {
        outputs: Vec<PathBuf>,
        /// Run id to stamp on the result (generated when omitted)
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Print engine health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = load_config(&cli.config)?;
    let engine = ReviewOrchestrator::from_config(config);

    match cli.command {
        Commands::Classify {
            description,
            files,
            diff_lines,
        } => {
            let mut context = TaskContext::with_files(files);
            if let Some(lines) = diff_lines {
                context = context.with_diff_lines(lines);
            }
            print_json(&engine.classify(&description, &context))?;
        }
        Commands::Rank { description, files } => {
            let profile = engine.classify(&description, &TaskContext::with_files(files));
            print_json(&engine.rank(&profile))?;
        }
        Commands::Select {
            description,
            files,
            max_agents,
        } => {
            let profile = engine.classify(&description, &TaskContext::with_files(files));
            let max_agents = max_agents.unwrap_or(engine.config().max_agents);
            let team = engine.select_team(&profile, max_agents);
            info!(total_agents = team.total_agents, "Team selected");
            print_json(&team)?;
        }
        Commands::Implementer { description, files } => {
            let profile = engine.classify(&description, &TaskContext::with_files(files));
            match engine.select_implementer(&profile) {
                Some(agent_id) => println!("{agent_id}"),
                None => anyhow::bail!("No agents registered"),
            }
        }
        Commands::Validate { output } => {
            let raw = read_json(&output).await?;
            match engine.validate(&raw) {
                Ok(validated) => print_json(&validated)?,
                Err(violation) => {
                    print_json(&serde_json::json!({
                        "agent_id": violation.agent_id,
                        "field_path": violation.field_path,
                        "expected_type": violation.expected_type,
                        "received_value": violation.received_value,
                    }))?;
                    return Err(violation.into());
                }
            }
        }
        Commands::Aggregate { outputs, run_id } => {
            let mut accepted: Vec<AgentOutput> = Vec::new();
            for path in &outputs {
                let raw = match read_json(path).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable output file");
                        continue;
                    }
                };
                for record in records(raw) {
                    match engine.validate(&record) {
                        Ok(output) => accepted.push(output),
                        Err(violation) => warn!(
                            path = %path.display(),
                            agent_id = %violation.agent_id,
                            field_path = %violation.field_path,
                            "Excluding invalid agent output"
                        ),
                    }
                }
            }
            print_json(&aggregate(run_id, accepted))?;
        }
        Commands::Health => {
            print_json(&engine.telemetry().health_status())?;
        }
    }

    Ok(())
}

/// Read the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> anyhow::Result<OrchestratorConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(OrchestratorConfig::default());
    }
    let config = OrchestratorConfig::load(path)?;
    info!(path = %path.display(), agents = config.agents.len(), "Loaded config");
    Ok(config)
}

async fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        anyhow::anyhow!("Failed to read '{}': {}", path.display(), e)
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// A file holds either one record or an array of them.
fn records(raw: Value) -> Vec<Value> {
    match raw {
        Value::Array(items) => items,
        single => vec![single],
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
