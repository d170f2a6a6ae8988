//! Planboard: editor and job week planner.
//!
//! Subcommands:
//! - `week`: Print the week grid with per-editor capacity
//! - `optimize`: Balance the week's per-day load across editors
//! - `move`: Move a job to another editor, day or position

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "planboard")]
#[command(about = "Editor and job week planner", long_about = None)]
struct Cli {
    /// Store base URL
    #[arg(long, env = "PLANBOARD_URL", global = true)]
    url: Option<String>,

    /// Store API key
    #[arg(long, env = "PLANBOARD_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Account email
    #[arg(long, env = "PLANBOARD_EMAIL", global = true)]
    email: Option<String>,

    /// Account password
    #[arg(long, env = "PLANBOARD_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the week grid
    Week {
        /// Any date in the week to show (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Balance per-day load across editors (pro plan)
    Optimize {
        /// Any date in the week to balance (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Move a job within its week
    Move {
        /// Job id
        #[arg(long)]
        job: String,

        /// Target editor id
        #[arg(long)]
        editor: String,

        /// Target day, 0 = Monday
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..7))]
        day: u8,

        /// Target position within the cell
        #[arg(long, default_value = "0")]
        order: u32,
    },
}

impl Cli {
    fn connection(&self) -> Result<commands::Connection> {
        let missing = |name: &str| miette::miette!("missing --{name} (or PLANBOARD_* env var)");
        Ok(commands::Connection {
            url: self.url.clone().ok_or_else(|| missing("url"))?,
            api_key: self.api_key.clone().ok_or_else(|| missing("api-key"))?,
            email: self.email.clone().ok_or_else(|| missing("email"))?,
            password: self.password.clone().ok_or_else(|| missing("password"))?,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "planboard=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let connection = cli.connection()?;

    match cli.command {
        Commands::Week { date } => commands::week(&connection, date).await,
        Commands::Optimize { date } => commands::optimize(&connection, date).await,
        Commands::Move {
            job,
            editor,
            day,
            order,
        } => commands::move_job(&connection, &job, &editor, day, order).await,
    }
}
