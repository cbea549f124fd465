use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use drift_core::{Coordinates, DriftConfig, TransactionStatus};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;

const DEFAULT_CONFIG: &str = "drift.yaml";

#[derive(Parser, Debug)]
#[command(name = "drift", version, about = "DriftSystem creation pipeline")]
struct Cli {
    /// Configuration file. Defaults to ./drift.yaml when present.
    #[arg(long, global = true, env = "DRIFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a chat message and print the decision.
    Classify(MessageArgs),

    /// Classify and plan a chat message without executing anything.
    Plan(MessageArgs),

    /// Validate a message's plan and record it as `validated`.
    DryRun {
        #[command(flatten)]
        message: MessageArgs,

        /// Override the derived patch id.
        #[arg(long)]
        patch_id: Option<String>,
    },

    /// Plan a message and send its safe templates to the game.
    Apply {
        #[command(flatten)]
        message: MessageArgs,

        #[arg(long)]
        patch_id: Option<String>,
    },

    /// Undo what is still applied of a patch.
    Rollback {
        patch_id: String,

        #[arg(long, default_value = "console", env = "DRIFT_PLAYER")]
        player: String,
    },

    /// Print transaction log entries.
    Log {
        #[arg(long)]
        patch_id: Option<String>,

        #[arg(long)]
        step_id: Option<String>,

        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Keep only the last N matching entries.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Resolve material tokens against the resource catalog.
    Resolve {
        #[arg(required = true)]
        tokens: Vec<String>,
    },

    /// Validate the configuration and the resource manifest.
    Check,
}

/// A chat message plus the context it was sent in.
#[derive(Args, Debug, Clone)]
pub struct MessageArgs {
    /// The player's chat line.
    pub message: String,

    #[arg(long, default_value = "console", env = "DRIFT_PLAYER")]
    pub player: String,

    /// Player position, used for proximity checks.
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
    pub pos: Option<Vec<i64>>,

    /// The player's previous chat line.
    #[arg(long)]
    pub previous: Option<String>,

    /// Language hint (zh, en).
    #[arg(long)]
    pub lang: Option<String>,
}

impl MessageArgs {
    pub fn position(&self) -> Option<Coordinates> {
        match self.pos.as_deref() {
            Some([x, y, z]) => Some(Coordinates::new(*x, *y, *z)),
            _ => None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StatusArg {
    Validated,
    Applied,
    RolledBack,
    Failed,
}

impl From<StatusArg> for TransactionStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Validated => Self::Validated,
            StatusArg::Applied => Self::Applied,
            StatusArg::RolledBack => Self::RolledBack,
            StatusArg::Failed => Self::Failed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    let config = match cli.cmd {
        // `check` reports a broken config instead of failing on it.
        Command::Check => DriftConfig::default(),
        _ => load_config(cli.config.as_deref())?,
    };
    init_logging(&config.logging.level);

    match cli.cmd {
        Command::Classify(args) => commands::plan::classify(&config, &args),
        Command::Plan(args) => commands::plan::plan(&config, &args).await,
        Command::DryRun { message, patch_id } => {
            commands::plan::dry_run(&config, &message, patch_id).await
        }
        Command::Apply { message, patch_id } => {
            commands::plan::apply(&config, &message, patch_id).await
        }
        Command::Rollback { patch_id, player } => {
            commands::log::rollback(&config, &player, &patch_id).await
        }
        Command::Log {
            patch_id,
            step_id,
            status,
            limit,
        } => {
            let filter = drift_txlog::TransactionFilter {
                patch_id,
                step_id,
                status: status.map(Into::into),
                limit,
            };
            commands::log::show(&config, &filter).await
        }
        Command::Resolve { tokens } => commands::resolve::resolve(&config, &tokens),
        Command::Check => commands::check::check(&config_path),
    }
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so stdout
/// stays machine-readable.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// An explicit path must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> Result<DriftConfig> {
    match path {
        Some(path) => DriftConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => DriftConfig::from_file(DEFAULT_CONFIG)
            .with_context(|| format!("failed to load config {}", DEFAULT_CONFIG)),
        None => Ok(DriftConfig::default()),
    }
}
