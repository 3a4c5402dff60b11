use std::path::PathBuf;

use clap::{Parser, Subcommand};
use health_upload::cli::{commands, Context};
use health_upload::config::{self, Settings, SettingsOverrides};
use health_upload::visibility::DEFAULT_RECENT_LIMIT;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "health-upload")]
#[command(author, version, about = "Mirror health-store samples into a document store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of the local document store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of a remote document store
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Participant ID
    #[arg(short, long, global = true, env = "HEALTH_UPLOAD_USER")]
    user: Option<String>,

    /// Access token for the remote store
    #[arg(long, global = true, env = "HEALTH_UPLOAD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Dry run: write to an in-memory store only
    #[arg(long, global = true)]
    disable_upload: bool,

    /// Use the local store emulator
    #[arg(long, global = true)]
    use_emulator: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a batch file of added and deleted samples
    Upload {
        /// JSON file with `added` and `deleted` arrays
        file: PathBuf,
    },
    /// Toggle the hide flag of one uploaded sample
    Hide {
        /// Sample type identifier
        #[arg(long)]
        category: String,
        /// Document ID (the sample's local start timestamp)
        #[arg(long)]
        id: String,
        /// Always hide instead of toggling
        #[arg(long)]
        always: bool,
    },
    /// Hide every sample issued in a time range
    HideRange {
        /// Sample type identifier
        #[arg(long)]
        category: String,
        /// Range start (RFC 3339)
        #[arg(long)]
        from: String,
        /// Range end (RFC 3339)
        #[arg(long)]
        to: String,
    },
    /// List the newest uploaded samples of a type
    Recent {
        /// Sample type identifier
        #[arg(long)]
        category: String,
        /// Number of samples to show
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    /// Print the calendar index for an interval
    Index {
        /// Interval start (RFC 3339)
        #[arg(long)]
        start: String,
        /// Interval end (RFC 3339)
        #[arg(long)]
        end: String,
    },
    /// Record that a push notification was received
    NotifyReceived {
        /// Receipt timestamp, used as the document ID
        timestamp: String,
    },
}

#[tokio::main]
async fn main() -> health_upload::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {}", health_upload::error::format_user_error(&e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> health_upload::Result<()> {
    // Index preview needs no store
    if let Commands::Index { start, end } = &cli.command {
        return commands::show_index(start, end);
    }

    let settings_path = match cli.config {
        Some(path) => path,
        None => config::settings_path()?,
    };
    let settings = Settings::load(&settings_path)?.with_overrides(SettingsOverrides {
        data_dir: cli.data_dir,
        remote_url: cli.remote,
        user_id: cli.user,
        access_token: cli.token,
        disable_upload: cli.disable_upload,
        use_emulator: cli.use_emulator,
    });
    let ctx = Context::from_settings(settings)?;

    match cli.command {
        Commands::Upload { file } => commands::upload(&ctx, &file).await,
        Commands::Hide {
            category,
            id,
            always,
        } => commands::hide(&ctx, &category, &id, always).await,
        Commands::HideRange { category, from, to } => {
            commands::hide_range(&ctx, &category, &from, &to).await
        }
        Commands::Recent { category, limit } => commands::recent(&ctx, &category, limit).await,
        Commands::Index { .. } => Ok(()),
        Commands::NotifyReceived { timestamp } => {
            commands::notify_received(&ctx, &timestamp).await
        }
    }
}
