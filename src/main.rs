//! Porch CLI
//!
//! Drive the signal engine from a shell: parse agent output, inspect
//! protocols, and step persisted workflow runs.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use porch::hq::{
    kind, BuilderUpdatePayload, GateCompletedPayload, Message, ProjectInfo, RegisterPayload,
};
use porch::workflow::{StateStore, TurnOutcome, WorkflowRun};
use porch::{protocol, Config, PhaseState, Result};

#[derive(Parser)]
#[command(name = "porch")]
#[command(author, version, about = "Protocol orchestration for agent builders")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and validate the governing signal in agent output
    Parse {
        /// Current state (`phase` or `phase:substate`)
        #[arg(long, short)]
        state: String,

        /// Protocol name (default: from config)
        #[arg(long, short)]
        protocol: Option<String>,

        /// Read output from this file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// List the signals a phase accepts
    Signals {
        /// Phase id
        phase: String,

        /// Protocol name (default: from config)
        #[arg(long, short)]
        protocol: Option<String>,
    },

    /// Remove simple signal markers from agent output
    Strip {
        /// Read output from this file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,
    },

    /// Protocol definition commands
    Protocol {
        #[command(subcommand)]
        action: ProtocolCommands,
    },

    /// Workflow run commands
    Run {
        #[command(subcommand)]
        action: RunCommands,
    },

    /// Coordination hub messages
    Hq {
        #[command(subcommand)]
        action: HqCommands,
    },

    /// Initialize .porch directory
    Init,
}

#[derive(Subcommand)]
enum HqCommands {
    /// Print the register message for this instance and its projects
    Register,
}

#[derive(Subcommand)]
enum ProtocolCommands {
    /// List available protocols
    List,

    /// Show a protocol definition
    Show {
        /// Protocol name
        name: String,

        /// Output format
        #[arg(long, value_enum, default_value = "toml")]
        format: Format,
    },

    /// Write a built-in protocol to the protocols directory for editing
    Init {
        /// Built-in protocol name
        name: String,

        /// Force overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum RunCommands {
    /// Start a run for a builder
    Start {
        /// Builder id
        #[arg(long, short)]
        builder: String,

        /// Protocol name (default: from config)
        #[arg(long, short)]
        protocol: Option<String>,

        /// Project path
        #[arg(long, default_value = ".")]
        project: String,
    },

    /// Apply one agent turn to a run
    Turn {
        /// Run id
        id: String,

        /// Read output from this file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Also print the hub gate_completed message when a phase is left
        #[arg(long)]
        hq: bool,
    },

    /// Show run status
    Status {
        /// Run id
        #[arg(required_unless_present = "builder")]
        id: Option<String>,

        /// Latest run for this builder instead
        #[arg(long, conflicts_with = "id")]
        builder: Option<String>,

        /// Emit the hub builder_update message instead of a summary
        #[arg(long)]
        hq: bool,
    },

    /// List runs
    List {
        /// Show only last N runs
        #[arg(long, default_value = "10")]
        last: usize,
    },

    /// Delete all but the newest runs
    Clean {
        /// Number of runs to keep
        #[arg(long, default_value = "20")]
        keep: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Toml,
    Json,
    Yaml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load config
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse {
            state,
            protocol,
            file,
            pretty,
        } => {
            let protocol = resolve(&config, protocol.as_deref())?;
            let output = read_input(file.as_deref())?;
            let result = porch::parse_signal(&output, &protocol, &PhaseState::parse(&state));

            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", json);
        }

        Commands::Signals { phase, protocol } => {
            let protocol = resolve(&config, protocol.as_deref())?;
            if !protocol.has_phase(&phase) {
                eprintln!("Unknown phase {} in protocol {}", phase, protocol.name);
            }
            for signal in porch::valid_signals(&protocol, &phase) {
                println!("{}", signal);
            }
        }

        Commands::Strip { file } => {
            let output = read_input(file.as_deref())?;
            println!("{}", porch::strip_signals(&output));
        }

        Commands::Protocol { action } => {
            handle_protocol_command(action, &config)?;
        }

        Commands::Run { action } => {
            handle_run_command(action, &config)?;
        }

        Commands::Hq { action } => {
            handle_hq_command(action, &config)?;
        }

        Commands::Init => {
            let path = porch::config::init(&config.state_dir())?;
            info!("Initialized porch config at {:?}", path);
        }
    }

    Ok(())
}

/// Handle protocol subcommands
fn handle_protocol_command(action: ProtocolCommands, config: &Config) -> Result<()> {
    match action {
        ProtocolCommands::List => {
            for name in protocol::available(config) {
                println!("{}", name);
            }
        }

        ProtocolCommands::Show { name, format } => {
            let protocol = protocol::resolve(config, &name)?;
            let content = match format {
                Format::Toml => toml::to_string_pretty(&protocol)
                    .map_err(|e| porch::Error::Config(e.to_string()))?,
                Format::Json => serde_json::to_string_pretty(&protocol)?,
                Format::Yaml => serde_yaml::to_string(&protocol)?,
            };
            println!("{}", content);
        }

        ProtocolCommands::Init { name, force } => {
            let protocol = protocol::builtin(&name).ok_or_else(|| {
                porch::Error::Protocol(format!("No built-in protocol named {}", name))
            })?;

            let dir = config.protocols_dir();
            let path = dir.join(format!("{}.toml", name));
            if path.exists() && !force {
                eprintln!("Protocol file already exists. Use --force to overwrite.");
                return Ok(());
            }

            std::fs::create_dir_all(&dir)?;
            let content = toml::to_string_pretty(&protocol)
                .map_err(|e| porch::Error::Config(e.to_string()))?;
            std::fs::write(&path, content)?;

            info!("Wrote protocol {} to {:?}", name, path);
        }
    }

    Ok(())
}

/// Handle run subcommands
fn handle_run_command(action: RunCommands, config: &Config) -> Result<()> {
    let store = StateStore::new(config.state_dir());

    match action {
        RunCommands::Start {
            builder,
            protocol,
            project,
        } => {
            let protocol = resolve(config, protocol.as_deref())?;
            let run = WorkflowRun::new(&protocol, &builder, &project)?;
            let path = store.save(&run)?;
            info!("Started run {} at {:?}", run.id, path);

            println!("{}", run.id);
            println!("Expected signals: {}", run.valid_signals(&protocol).join(", "));
        }

        RunCommands::Turn { id, file, hq } => {
            let mut run = store.load(&id)?;
            let protocol = protocol::resolve(config, &run.protocol)?;
            let output = read_input(file.as_deref())?;

            let outcome = run.apply_turn(&output, &protocol);
            // Persist even a failed turn so the failure is visible in status
            store.save(&run)?;

            match outcome? {
                TurnOutcome::Advanced(t) => {
                    println!("{} → {} [{}]", t.from, t.to, t.signal);
                    if hq {
                        let project = ProjectInfo::from_path(&run.project_path);
                        let gate = GateCompletedPayload::from_transition(&run, &project.name, &t);
                        if let Some(gate) = gate {
                            let message = Message::new(kind::GATE_COMPLETED, &gate)?;
                            println!("{}", message.to_json()?);
                        }
                    }
                }
                TurnOutcome::Held { signal, warning } => {
                    let signal = signal.unwrap_or_else(|| "no signal".to_string());
                    match warning {
                        Some(w) => println!("held at {} ({}): {}", run.state, signal, w),
                        None => println!("held at {} ({})", run.state, signal),
                    }
                }
            }

            if !run.is_complete() {
                println!("Expected signals: {}", run.valid_signals(&protocol).join(", "));
            }
        }

        RunCommands::Status { id, builder, hq } => {
            let run = match (id, builder) {
                (Some(id), _) => store.load(&id)?,
                (None, Some(builder)) => store.find_latest(&builder)?.ok_or_else(|| {
                    porch::Error::State(format!("No runs found for builder {}", builder))
                })?,
                (None, None) => {
                    return Err(porch::Error::State("Run id or --builder required".to_string()))
                }
            };

            if hq {
                let payload = BuilderUpdatePayload::from_run(&run);
                let message = Message::new(kind::BUILDER_UPDATE, &payload)?;
                println!("{}", message.to_json()?);
            } else {
                println!("{}", run.summary());
            }
        }

        RunCommands::List { last } => {
            for run in store.list()?.into_iter().take(last) {
                println!(
                    "{} | {} | {} | {} | {}",
                    run.id,
                    run.builder_id,
                    run.protocol,
                    run.state,
                    run.started_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        RunCommands::Clean { keep } => {
            let removed = store.cleanup(keep)?;
            info!("Removed {} run(s), kept up to {}", removed, keep);
        }
    }

    Ok(())
}

/// Handle hub subcommands
fn handle_hq_command(action: HqCommands, config: &Config) -> Result<()> {
    match action {
        HqCommands::Register => {
            match &config.hq.url {
                Some(url) => info!(
                    "Registering with {} (heartbeat every {})",
                    url,
                    humantime::format_duration(config.hq.heartbeat)
                ),
                None => warn!("No hub url configured; printing the message only"),
            }

            let store = StateStore::new(config.state_dir());
            let paths: BTreeSet<String> =
                store.list()?.into_iter().map(|run| run.project_path).collect();
            let projects = paths.iter().map(|p| ProjectInfo::from_path(p)).collect();

            let payload = RegisterPayload::new(&config.hq, projects);
            let message = Message::new(kind::REGISTER, &payload)?;
            println!("{}", message.to_json()?);
        }
    }

    Ok(())
}

/// Resolve a named protocol, falling back to the configured default
fn resolve(config: &Config, name: Option<&str>) -> Result<porch::Protocol> {
    protocol::resolve(config, name.unwrap_or(&config.default_protocol))
}

/// Read agent output from a file, or stdin when no file is given
fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
